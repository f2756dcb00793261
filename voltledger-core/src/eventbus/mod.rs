//! src/eventbus/mod.rs
//!
//! In-process event bus. Each subscriber owns a bounded MPSC queue, so a
//! slow subscriber applies backpressure to publishers instead of losing events.

use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use voltledger_common::models::{CarbonCredit, Notification, Transaction};

/// Ledger-side events that background tasks react to.
#[derive(Debug, Clone)]
pub enum LedgerEvent {
    /// A notification row has been stored and may be pushed to a device.
    NotificationCreated(Notification),

    /// A purchase left PENDING (either way).
    PurchaseSettled(Transaction),

    /// Renewable usage earned a credit.
    CreditsAccrued(CarbonCredit),
}

impl LedgerEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::NotificationCreated(_) => "notification.created",
            LedgerEvent::PurchaseSettled(_) => "purchase.settled",
            LedgerEvent::CreditsAccrued(_) => "credits.accrued",
        }
    }
}

#[derive(Clone)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<mpsc::Sender<LedgerEvent>>>>,
    shutdown_tx: watch::Sender<bool>,
    pub shutdown_rx: watch::Receiver<bool>,
}

const DEFAULT_BUFFER_SIZE: usize = 10000;

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            subscribers: Arc::new(Mutex::new(vec![])),
            shutdown_tx: tx,
            shutdown_rx: rx,
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Returns a receiver on which events will be delivered.
    pub async fn subscribe(&self, buffer_size: Option<usize>) -> mpsc::Receiver<LedgerEvent> {
        let size = buffer_size.unwrap_or(DEFAULT_BUFFER_SIZE);
        let (tx, rx) = mpsc::channel(size);
        let mut subs = self.subscribers.lock().await;
        subs.push(tx);
        rx
    }

    /// Publish an event to all live subscribers; closed queues are pruned.
    pub async fn publish(&self, event: LedgerEvent) {
        if self.is_shutdown() {
            return;
        }
        let senders = {
            let subs = self.subscribers.lock().await;
            subs.clone()
        };
        let mut dropped = false;
        for s in senders {
            if s.send(event.clone()).await.is_err() {
                dropped = true;
            }
        }
        if dropped {
            let mut subs = self.subscribers.lock().await;
            subs.retain(|s| !s.is_closed());
        }
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, timeout, Duration};
    use uuid::Uuid;
    use voltledger_common::models::NotificationType;

    fn sample() -> LedgerEvent {
        LedgerEvent::NotificationCreated(Notification::new(
            Uuid::new_v4(),
            NotificationType::SystemUpdate,
            "t".into(),
            "b".into(),
        ))
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe(Some(5)).await;
        let mut rx2 = bus.subscribe(Some(5)).await;

        bus.publish(sample()).await;

        let evt1 = rx1.recv().await.expect("rx1 should get event");
        let evt2 = rx2.recv().await.expect("rx2 should get event");
        assert_eq!(evt1.event_type(), "notification.created");
        assert_eq!(evt2.event_type(), "notification.created");
    }

    #[tokio::test]
    async fn test_backpressure_blocking() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe(Some(1)).await;

        bus.publish(sample()).await;

        let handle = tokio::spawn(async move {
            sleep(Duration::from_millis(50)).await;
            let first = rx.recv().await;
            let second = rx.recv().await;
            first.is_some() && second.is_some()
        });

        // Blocks until the reader drains the first message.
        timeout(Duration::from_secs(1), bus.publish(sample()))
            .await
            .expect("publish should complete once the reader catches up");
        assert!(handle.await.unwrap());
    }

    #[tokio::test]
    async fn test_closed_subscribers_are_pruned() {
        let bus = EventBus::new();
        let rx = bus.subscribe(Some(1)).await;
        let _keep = bus.subscribe(Some(4)).await;
        drop(rx);

        bus.publish(sample()).await;
        assert_eq!(bus.subscriber_count().await, 1);
    }

    #[tokio::test]
    async fn test_publish_after_shutdown_is_dropped() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe(Some(1)).await;
        bus.shutdown();
        bus.publish(sample()).await;
        assert!(rx.try_recv().is_err());
    }
}
