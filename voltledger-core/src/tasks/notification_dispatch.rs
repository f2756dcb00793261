//! src/tasks/notification_dispatch.rs
//!
//! Subscribes to the EventBus and turns ledger events into stored
//! notifications and device pushes. Runs until the bus shuts down, then
//! drains whatever is still queued.

use std::sync::Arc;

use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use voltledger_common::models::{
    CarbonCredit, Notification, NotificationType, Transaction, TransactionStatus,
};
use voltledger_common::traits::{NotificationRepository, PushSender, UserRepository};
use crate::eventbus::{EventBus, LedgerEvent};
use crate::Error;

#[derive(Clone)]
pub struct NotificationDispatcher {
    users: Arc<dyn UserRepository>,
    notifications: Arc<dyn NotificationRepository>,
    push: Arc<dyn PushSender>,
}

impl NotificationDispatcher {
    pub fn new(
        users: Arc<dyn UserRepository>,
        notifications: Arc<dyn NotificationRepository>,
        push: Arc<dyn PushSender>,
    ) -> Self {
        Self { users, notifications, push }
    }

    pub async fn handle(&self, event: &LedgerEvent) -> Result<(), Error> {
        match event {
            LedgerEvent::NotificationCreated(n) => self.deliver(n).await,
            LedgerEvent::PurchaseSettled(tx) => match purchase_notification(tx) {
                Some(n) => self.store_and_deliver(n).await,
                None => Ok(()),
            },
            LedgerEvent::CreditsAccrued(credit) => {
                self.store_and_deliver(credit_notification(credit)).await
            }
        }
    }

    // Stored here rather than through the service so the dispatcher never
    // publishes into its own queue.
    async fn store_and_deliver(&self, n: Notification) -> Result<(), Error> {
        self.notifications.insert(&n).await?;
        self.deliver(&n).await
    }

    async fn deliver(&self, n: &Notification) -> Result<(), Error> {
        let Some(user) = self.users.get(n.user_id).await? else {
            return Ok(());
        };
        let Some(device) = user.push_token.as_deref() else {
            debug!("no device registered for {}, skipping push", user.id);
            return Ok(());
        };
        self.push.send(device, &n.title, &n.body, &n.data).await
    }
}

fn purchase_notification(tx: &Transaction) -> Option<Notification> {
    let data = json!({
        "transactionId": tx.id,
        "reference": tx.reference,
        "amount": tx.amount,
        "quantity": tx.quantity,
    });
    let n = match tx.status {
        TransactionStatus::Success => Notification::new(
            tx.user_id,
            NotificationType::PaymentSuccess,
            "Payment Successful".into(),
            format!(
                "Your purchase of {} kWh was successful.",
                tx.quantity.unwrap_or_default().normalize()
            ),
        ),
        TransactionStatus::Failed => Notification::new(
            tx.user_id,
            NotificationType::PaymentFailed,
            "Payment Failed".into(),
            format!("Your payment with reference {} could not be completed.", tx.reference),
        ),
        _ => return None,
    };
    Some(n.with_data(data))
}

fn credit_notification(credit: &CarbonCredit) -> Notification {
    Notification::new(
        credit.user_id,
        NotificationType::CarbonCreditEarned,
        "Carbon Credits Earned".into(),
        format!(
            "You earned {} carbon credit(s) from {} kWh of renewable energy.",
            credit.amount.normalize(),
            credit.renewable_kwh.normalize()
        ),
    )
    .with_data(json!({ "creditId": credit.id, "amount": credit.amount }))
}

/// Spawns the dispatcher loop. Returns a handle so shutdown can await the drain.
pub async fn spawn_notification_dispatcher(
    event_bus: &EventBus,
    dispatcher: NotificationDispatcher,
    buffer_size: usize,
) -> JoinHandle<()> {
    let mut rx = event_bus.subscribe(Some(buffer_size)).await;
    let mut shutdown_rx = event_bus.shutdown_rx.clone();

    tokio::spawn(async move {
        info!("Notification dispatcher started");
        loop {
            tokio::select! {
                biased;
                maybe_event = rx.recv() => {
                    match maybe_event {
                        Some(event) => {
                            if let Err(e) = dispatcher.handle(&event).await {
                                error!("Dispatch of {} failed: {:?}", event.event_type(), e);
                            }
                        }
                        None => break,
                    }
                },
                Ok(_) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Notification dispatcher shutting down");
                        break;
                    }
                },
            }
        }

        while let Ok(event) = rx.try_recv() {
            if let Err(e) = dispatcher.handle(&event).await {
                error!("Dispatch of {} failed during drain: {:?}", event.event_type(), e);
            }
        }
        info!("Notification dispatcher exited");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use voltledger_common::models::TransactionType;

    #[test]
    fn only_settled_purchases_notify() {
        let mut tx = Transaction::new(
            uuid::Uuid::new_v4(),
            TransactionType::Purchase,
            TransactionStatus::Pending,
            dec!(1500),
            "TXN-1".into(),
        );
        tx.quantity = Some(dec!(20));
        assert!(purchase_notification(&tx).is_none());

        tx.status = TransactionStatus::Success;
        let n = purchase_notification(&tx).unwrap();
        assert_eq!(n.kind, NotificationType::PaymentSuccess);
        assert!(n.body.contains("20 kWh"));

        tx.status = TransactionStatus::Failed;
        assert_eq!(purchase_notification(&tx).unwrap().kind, NotificationType::PaymentFailed);
    }
}
