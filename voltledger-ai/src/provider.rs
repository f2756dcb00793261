use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, error};

use voltledger_common::models::{ChatMessage, Language};
use voltledger_common::traits::ChatBackend;
use voltledger_common::Error;

use crate::models::ProviderConfig;
use crate::prompt::{assistant_prompt, translation_prompt};

const CHAT_TEMPERATURE: f32 = 0.7;
const CHAT_MAX_TOKENS: u32 = 500;
const TRANSLATE_TEMPERATURE: f32 = 0.3;
const TRANSLATE_MAX_TOKENS: u32 = 300;

/// Reply used when the model answers with an empty message.
pub const FALLBACK_REPLY: &str = "Sorry, I could not process your request.";

/// Chat backend for any OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiChatBackend {
    config: ProviderConfig,
    client: Client,
}

impl OpenAiChatBackend {
    pub fn new(config: ProviderConfig) -> Result<Self, Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    async fn chat(&self, messages: Vec<Value>, temperature: f32, max_tokens: u32) -> anyhow::Result<Option<String>> {
        let url = format!("{}/chat/completions", self.config.api_base());
        let payload = json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": temperature,
            "max_tokens": max_tokens,
        });
        debug!("POST {} ({} messages)", url, payload["messages"].as_array().map_or(0, Vec::len));

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await?;
        let text = response.text().await?;
        let data: Value = serde_json::from_str(&text)
            .map_err(|e| anyhow::anyhow!("API returned non-JSON response: {}", e))?;
        extract_content(&data)
    }
}

/// Builds the message list: system prompt, prior turns oldest first, then the new message.
pub fn build_messages(system: &str, history: &[ChatMessage], message: &str) -> Vec<Value> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(json!({ "role": "system", "content": system }));
    messages.extend(
        history
            .iter()
            .map(|m| json!({ "role": m.role.to_string(), "content": m.content })),
    );
    messages.push(json!({ "role": "user", "content": message }));
    messages
}

/// Pulls the first choice's text out of a completion response.
pub fn extract_content(data: &Value) -> anyhow::Result<Option<String>> {
    if let Some(err) = data.get("error") {
        let message = err.get("message").and_then(Value::as_str).unwrap_or("Unknown error");
        return Err(anyhow::anyhow!("API error: {}", message));
    }
    let choice = data
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .ok_or_else(|| anyhow::anyhow!("No completions returned"))?;
    Ok(choice
        .pointer("/message/content")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string))
}

#[async_trait]
impl ChatBackend for OpenAiChatBackend {
    async fn complete(&self, message: &str, history: &[ChatMessage], language: Language) -> Result<String, Error> {
        let messages = build_messages(&assistant_prompt(language), history, message);
        match self.chat(messages, CHAT_TEMPERATURE, CHAT_MAX_TOKENS).await {
            Ok(reply) => Ok(reply.unwrap_or_else(|| FALLBACK_REPLY.to_string())),
            Err(e) => {
                error!("chat completion failed: {:?}", e);
                Err(Error::ServiceUnavailable("Failed to get chat response".into()))
            }
        }
    }

    async fn translate(&self, text: &str, target: Language) -> Result<String, Error> {
        let messages = build_messages(&translation_prompt(target), &[], text);
        let translated = self
            .chat(messages, TRANSLATE_TEMPERATURE, TRANSLATE_MAX_TOKENS)
            .await
            .map_err(|e| Error::ServiceUnavailable(format!("Translation failed: {}", e)))?;
        Ok(translated.unwrap_or_else(|| text.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use voltledger_common::models::ChatRole;

    #[test]
    fn history_sits_between_prompt_and_message() {
        let session = Uuid::new_v4();
        let history = vec![
            ChatMessage::new(session, ChatRole::User, "What is my balance?"),
            ChatMessage::new(session, ChatRole::Assistant, "You have 12 kWh."),
        ];
        let messages = build_messages("sys", &history, "Thanks");

        let roles: Vec<&str> = messages.iter().filter_map(|m| m["role"].as_str()).collect();
        assert_eq!(roles, ["system", "user", "assistant", "user"]);
        assert_eq!(messages[3]["content"], "Thanks");
    }

    #[test]
    fn content_is_read_from_first_choice() {
        let data = json!({ "choices": [{ "message": { "role": "assistant", "content": " Hello " } }] });
        assert_eq!(extract_content(&data).unwrap(), Some("Hello".to_string()));

        let empty = json!({ "choices": [{ "message": { "content": "" } }] });
        assert_eq!(extract_content(&empty).unwrap(), None);
    }

    #[test]
    fn api_errors_surface() {
        let data = json!({ "error": { "message": "invalid api key" } });
        let err = extract_content(&data).unwrap_err();
        assert!(err.to_string().contains("invalid api key"));
        assert!(extract_content(&json!({ "choices": [] })).is_err());
    }
}
