// tests/collaborator_tests.rs
//
// Chat and notification delivery against mocked outside services.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockall::mock;
use rust_decimal_macros::dec;
use serde_json::Value;

use voltledger_common::models::{
    CarbonCredit, ChatMessage, ChatRole, Language, NotificationType, Transaction,
    TransactionStatus, TransactionType,
};
use voltledger_common::traits::{ChatBackend, NotificationRepository, PushSender, UserRepository};
use voltledger_core::eventbus::{EventBus, LedgerEvent};
use voltledger_core::services::ChatService;
use voltledger_core::tasks::{spawn_notification_dispatcher, NotificationDispatcher};
use voltledger_core::test_utils::fixtures::{seed, Seeded};
use voltledger_core::Error;

mock! {
    pub Backend {}

    #[async_trait]
    impl ChatBackend for Backend {
        async fn complete(&self, message: &str, history: &[ChatMessage], language: Language) -> Result<String, Error>;
        async fn translate(&self, text: &str, target: Language) -> Result<String, Error>;
    }
}

mock! {
    pub Push {}

    #[async_trait]
    impl PushSender for Push {
        async fn send(&self, device_token: &str, title: &str, body: &str, data: &Value) -> Result<(), Error>;
    }
}

fn chat(s: &Seeded, backend: Option<MockBackend>) -> ChatService {
    ChatService::new(
        s.repos.chat.clone(),
        s.repos.users.clone(),
        backend.map(|b| Arc::new(b) as Arc<dyn ChatBackend>),
    )
}

async fn with_device(s: &Seeded) -> Result<(), Error> {
    let mut user = s.customer.clone();
    user.push_token = Some("device-abc".into());
    s.repos.users.update(&user).await
}

fn settled_purchase(s: &Seeded) -> Transaction {
    let mut tx = Transaction::new(
        s.customer.id,
        TransactionType::Purchase,
        TransactionStatus::Success,
        dec!(150),
        "TXN_test".into(),
    );
    tx.quantity = Some(dec!(2));
    tx
}

#[tokio::test]
async fn conversation_reuses_active_session_with_history() -> Result<(), Error> {
    let s = seed().await?;
    let mut backend = MockBackend::new();
    backend
        .expect_complete()
        .times(2)
        .returning(|_, history, _| Ok(format!("seen {}", history.len())));
    let chat = chat(&s, Some(backend));

    let first = chat.send(s.customer.id, "How do I save power?", None, None).await?;
    assert_eq!(first.message, "seen 0");
    assert_eq!(first.language, Language::En);

    let second = chat.send(s.customer.id, "And at night?", None, None).await?;
    assert_eq!(second.session_id, first.session_id);
    assert_eq!(second.message, "seen 2");

    let transcript = chat.transcript(s.customer.id, first.session_id).await?;
    let roles: Vec<ChatRole> = transcript.messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![ChatRole::User, ChatRole::Assistant, ChatRole::User, ChatRole::Assistant]);
    assert_eq!(transcript.messages[0].content, "How do I save power?");
    Ok(())
}

#[tokio::test]
async fn ended_or_foreign_sessions_are_refused() -> Result<(), Error> {
    let s = seed().await?;
    let mut backend = MockBackend::new();
    backend.expect_complete().returning(|_, _, _| Ok("ok".into()));
    let chat = chat(&s, Some(backend));

    let reply = chat.send(s.customer.id, "hi", None, Some(Language::Yo)).await?;
    assert_eq!(reply.language, Language::Yo);

    let err = chat.send(s.admin.id, "hi", Some(reply.session_id), None).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    chat.end_session(s.customer.id, reply.session_id).await?;
    let err = chat.send(s.customer.id, "hi", Some(reply.session_id), None).await.unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));

    let err = chat.end_session(s.admin.id, reply.session_id).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn chat_without_backend_is_unavailable() -> Result<(), Error> {
    let s = seed().await?;
    let chat = chat(&s, None);
    let err = chat.send(s.customer.id, "hi", None, None).await.unwrap_err();
    assert!(matches!(err, Error::ServiceUnavailable(_)));
    Ok(())
}

#[tokio::test]
async fn translation_falls_back_to_original() -> Result<(), Error> {
    let s = seed().await?;
    let mut backend = MockBackend::new();
    backend
        .expect_translate()
        .returning(|_, _| Err(Error::ServiceUnavailable("model offline".into())));
    let chat = chat(&s, Some(backend));

    let t = chat.translate("Good morning", Language::Ha).await;
    assert_eq!(t.original, "Good morning");
    assert_eq!(t.translated, "Good morning");
    assert_eq!(t.target_language, Language::Ha);
    Ok(())
}

#[tokio::test]
async fn settled_purchase_is_stored_and_pushed() -> Result<(), Error> {
    let s = seed().await?;
    with_device(&s).await?;
    let mut push = MockPush::new();
    push.expect_send()
        .withf(|device, title, _, _| device.to_string() == "device-abc" && title.to_string() == "Payment Successful")
        .times(1)
        .returning(|_, _, _, _| Ok(()));

    let dispatcher = NotificationDispatcher::new(s.repos.users.clone(), s.repos.notifications.clone(), Arc::new(push));
    dispatcher.handle(&LedgerEvent::PurchaseSettled(settled_purchase(&s))).await?;

    let stored = s.repos.notifications.list_for_user(s.customer.id, false, 10).await?;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].kind, NotificationType::PaymentSuccess);
    assert_eq!(stored[0].body, "Your purchase of 2 kWh was successful.");
    Ok(())
}

#[tokio::test]
async fn no_device_means_no_push() -> Result<(), Error> {
    let s = seed().await?;
    let mut push = MockPush::new();
    push.expect_send().times(0);

    let dispatcher = NotificationDispatcher::new(s.repos.users.clone(), s.repos.notifications.clone(), Arc::new(push));
    let credit = CarbonCredit::new(s.customer.id, dec!(5), "Sunrise Power", dec!(50));
    dispatcher.handle(&LedgerEvent::CreditsAccrued(credit)).await?;

    let stored = s.repos.notifications.list_for_user(s.customer.id, false, 10).await?;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].kind, NotificationType::CarbonCreditEarned);
    Ok(())
}

#[tokio::test]
async fn dispatcher_drains_queue_on_shutdown() -> Result<(), Error> {
    let s = seed().await?;
    with_device(&s).await?;
    let mut push = MockPush::new();
    push.expect_send().times(1).returning(|_, _, _, _| Ok(()));

    let bus = EventBus::new();
    let dispatcher = NotificationDispatcher::new(s.repos.users.clone(), s.repos.notifications.clone(), Arc::new(push));
    let handle = spawn_notification_dispatcher(&bus, dispatcher, 8).await;

    bus.publish(LedgerEvent::PurchaseSettled(settled_purchase(&s))).await;
    bus.shutdown();

    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("dispatcher should exit after shutdown")
        .expect("dispatcher task should not panic");

    let stored = s.repos.notifications.list_for_user(s.customer.id, false, 10).await?;
    assert_eq!(stored.len(), 1);
    Ok(())
}
