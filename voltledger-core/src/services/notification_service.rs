// File: voltledger-core/src/services/notification_service.rs

use std::sync::Arc;

use uuid::Uuid;

use voltledger_common::models::Notification;
use voltledger_common::traits::NotificationRepository;
use crate::eventbus::{EventBus, LedgerEvent};
use crate::Error;

const LIST_LIMIT: i64 = 50;

pub struct NotificationService {
    repo: Arc<dyn NotificationRepository>,
    events: Arc<EventBus>,
}

impl NotificationService {
    pub fn new(repo: Arc<dyn NotificationRepository>, events: Arc<EventBus>) -> Self {
        Self { repo, events }
    }

    /// Stores the notification, then announces it so it can be pushed.
    pub async fn create(&self, notification: Notification) -> Result<Notification, Error> {
        self.repo.insert(&notification).await?;
        self.events
            .publish(LedgerEvent::NotificationCreated(notification.clone()))
            .await;
        Ok(notification)
    }

    pub async fn list(&self, user_id: Uuid, unread_only: bool) -> Result<Vec<Notification>, Error> {
        self.repo.list_for_user(user_id, unread_only, LIST_LIMIT).await
    }

    pub async fn mark_read(&self, user_id: Uuid, id: Uuid) -> Result<(), Error> {
        if self.repo.mark_read(user_id, id).await? {
            Ok(())
        } else {
            Err(Error::NotFound("Notification not found".into()))
        }
    }
}
