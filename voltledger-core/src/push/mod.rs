// File: voltledger-core/src/push/mod.rs

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use voltledger_common::traits::PushSender;
use crate::config::PushConfig;
use crate::Error;

/// Sends device pushes through an FCM-style HTTP endpoint.
pub struct HttpPushSender {
    config: PushConfig,
    client: Client,
}

impl HttpPushSender {
    pub fn new(config: PushConfig) -> Result<Self, Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }
}

/// Push `data` values must be strings.
fn stringify_data(data: &Value) -> Value {
    let Some(obj) = data.as_object() else {
        return json!({});
    };
    let map: Map<String, Value> = obj
        .iter()
        .map(|(k, v)| {
            let s = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), Value::String(s))
        })
        .collect();
    Value::Object(map)
}

#[async_trait]
impl PushSender for HttpPushSender {
    async fn send(&self, device_token: &str, title: &str, body: &str, data: &Value) -> Result<(), Error> {
        let payload = json!({
            "to": device_token,
            "notification": { "title": title, "body": body },
            "data": stringify_data(data),
        });
        self.client
            .post(&self.config.endpoint)
            .header("Authorization", format!("key={}", self.config.server_key))
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        debug!("push delivered: {}", title);
        Ok(())
    }
}

/// Used when no push endpoint is configured.
pub struct LogPushSender;

#[async_trait]
impl PushSender for LogPushSender {
    async fn send(&self, _device_token: &str, title: &str, body: &str, _data: &Value) -> Result<(), Error> {
        info!("(push disabled) {}: {}", title, body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_values_become_strings() {
        let out = stringify_data(&json!({ "amount": 12.5, "ref": "TXN-1", "ok": true }));
        assert_eq!(out, json!({ "amount": "12.5", "ref": "TXN-1", "ok": "true" }));
        assert_eq!(stringify_data(&Value::Null), json!({}));
    }
}
