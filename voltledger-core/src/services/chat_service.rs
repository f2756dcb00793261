// File: voltledger-core/src/services/chat_service.rs

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use voltledger_common::models::{
    ChatMessage, ChatRole, ChatSession, ChatTranscript, Language,
};
use voltledger_common::traits::{ChatBackend, ChatRepository, UserRepository};
use crate::Error;

/// Messages of prior conversation sent along with each new one.
pub const CONTEXT_MESSAGES: i64 = 20;
const TRANSCRIPT_LIMIT: i64 = 500;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub session_id: Uuid,
    pub message: String,
    pub language: Language,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
    pub original: String,
    pub translated: String,
    pub target_language: Language,
}

pub struct ChatService {
    chat: Arc<dyn ChatRepository>,
    users: Arc<dyn UserRepository>,
    backend: Option<Arc<dyn ChatBackend>>,
}

impl ChatService {
    pub fn new(
        chat: Arc<dyn ChatRepository>,
        users: Arc<dyn UserRepository>,
        backend: Option<Arc<dyn ChatBackend>>,
    ) -> Self {
        Self { chat, users, backend }
    }

    fn backend(&self) -> Result<&Arc<dyn ChatBackend>, Error> {
        self.backend
            .as_ref()
            .ok_or_else(|| Error::ServiceUnavailable("Chat service is not configured".into()))
    }

    async fn owned_session(&self, user_id: Uuid, id: Uuid) -> Result<ChatSession, Error> {
        self.chat
            .get_session(id)
            .await?
            .filter(|s| s.user_id == user_id)
            .ok_or_else(|| Error::NotFound("Chat session not found".into()))
    }

    async fn session_for(
        &self,
        user_id: Uuid,
        session_id: Option<Uuid>,
        language: Option<Language>,
    ) -> Result<ChatSession, Error> {
        if let Some(id) = session_id {
            let session = self.owned_session(user_id, id).await?;
            if !session.is_active {
                return Err(Error::BadRequest("Chat session has ended".into()));
            }
            return Ok(session);
        }
        if let Some(active) = self.chat.find_active_session(user_id).await? {
            return Ok(active);
        }

        let language = match language {
            Some(l) => l,
            None => self
                .users
                .get(user_id)
                .await?
                .map(|u| u.language)
                .unwrap_or_default(),
        };
        let session = ChatSession::new(user_id, language);
        self.chat.create_session(&session).await?;
        debug!("opened chat session {} for {}", session.id, user_id);
        Ok(session)
    }

    pub async fn send(
        &self,
        user_id: Uuid,
        message: &str,
        session_id: Option<Uuid>,
        language: Option<Language>,
    ) -> Result<ChatReply, Error> {
        let backend = self.backend()?.clone();
        let session = self.session_for(user_id, session_id, language).await?;
        let language = language.unwrap_or(session.language);

        let history = self.chat.recent_messages(session.id, CONTEXT_MESSAGES).await?;
        self.chat
            .insert_message(&ChatMessage::new(session.id, ChatRole::User, message))
            .await?;

        let reply = backend.complete(message, &history, language).await?;
        self.chat
            .insert_message(&ChatMessage::new(session.id, ChatRole::Assistant, &reply))
            .await?;

        Ok(ChatReply { session_id: session.id, message: reply, language })
    }

    /// Falls back to the untranslated text when the model is unreachable.
    pub async fn translate(&self, text: &str, target: Language) -> Translation {
        let translated = match &self.backend {
            Some(b) => match b.translate(text, target).await {
                Ok(t) => t,
                Err(e) => {
                    warn!("translation to {} failed: {:?}", target, e);
                    text.to_string()
                }
            },
            None => text.to_string(),
        };
        Translation {
            original: text.to_string(),
            translated,
            target_language: target,
        }
    }

    pub async fn end_session(&self, user_id: Uuid, id: Uuid) -> Result<(), Error> {
        if self.chat.end_session(user_id, id).await? {
            Ok(())
        } else {
            Err(Error::NotFound("Chat session not found".into()))
        }
    }

    pub async fn sessions(&self, user_id: Uuid) -> Result<Vec<ChatSession>, Error> {
        self.chat.list_sessions(user_id).await
    }

    pub async fn transcript(&self, user_id: Uuid, id: Uuid) -> Result<ChatTranscript, Error> {
        let session = self.owned_session(user_id, id).await?;
        let messages = self.chat.recent_messages(session.id, TRANSCRIPT_LIMIT).await?;
        Ok(ChatTranscript { session, messages })
    }
}
