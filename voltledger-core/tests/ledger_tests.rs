// tests/ledger_tests.rs
//
// Service-level behavior over the in-memory store.

use std::sync::Arc;

use async_trait::async_trait;
use mockall::mock;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use voltledger_common::models::{
    BalanceOp, CarbonCredit, MonetizeAction, NotificationType, TransactionType, UsageLimit,
    UsagePeriod, UsageLimitUpdate,
};
use voltledger_common::traits::{
    CarbonCreditRepository, TransactionRepository, UsageLimitRepository, WalletRepository,
};
use voltledger_core::eventbus::{EventBus, LedgerEvent};
use voltledger_core::services::{CarbonService, NotificationService, UsageService, WalletService};
use voltledger_core::test_utils::fixtures::{seed, test_config, Seeded};
use voltledger_core::Error;

fn usage_service(s: &Seeded, events: Arc<EventBus>) -> UsageService {
    let config = test_config();
    let notifications = Arc::new(NotificationService::new(s.repos.notifications.clone(), events.clone()));
    UsageService::new(
        s.repos.usage.clone(),
        s.repos.usage_limits.clone(),
        s.repos.catalog.clone(),
        s.repos.credits.clone(),
        notifications,
        events,
        config.carbon,
        config.usage_defaults,
        config.timezone,
    )
}

mock! {
    pub Limits {}

    #[async_trait]
    impl UsageLimitRepository for Limits {
        async fn get(&self, user_id: Uuid) -> Result<Option<UsageLimit>, Error>;
        async fn get_or_create(&self, limit: &UsageLimit) -> Result<UsageLimit, Error>;
        async fn upsert(&self, limit: &UsageLimit) -> Result<UsageLimit, Error>;
    }
}

fn carbon_service(s: &Seeded) -> CarbonService {
    CarbonService::new(s.repos.credits.clone(), test_config().carbon)
}

async fn give_credits(s: &Seeded, amounts: &[Decimal]) -> Result<Vec<Uuid>, Error> {
    let mut ids = Vec::new();
    for amount in amounts {
        let credit = CarbonCredit::new(s.customer.id, *amount, "Sunrise Power", *amount * dec!(10));
        s.repos.credits.insert(&credit).await?;
        ids.push(credit.id);
    }
    Ok(ids)
}

#[tokio::test]
async fn renewable_usage_accrues_floor_of_ratio() -> Result<(), Error> {
    let s = seed().await?;
    let bus = Arc::new(EventBus::new());
    let mut rx = bus.subscribe(Some(16)).await;
    let usage = usage_service(&s, bus.clone());

    usage.record(s.customer.id, s.renewable.id, dec!(50), None).await?;

    let credits = s.repos.credits.list_for_user(s.customer.id, true).await?;
    assert_eq!(credits.len(), 1);
    assert_eq!(credits[0].amount, dec!(5));
    assert_eq!(credits[0].renewable_kwh, dec!(50));
    assert_eq!(credits[0].source, "Sunrise Power");
    assert!(!credits[0].is_sold);

    let accrued = std::iter::from_fn(|| rx.try_recv().ok())
        .any(|e| matches!(e, LedgerEvent::CreditsAccrued(c) if c.amount == dec!(5)));
    assert!(accrued, "a CreditsAccrued event should be published");
    Ok(())
}

#[tokio::test]
async fn small_or_grid_usage_earns_nothing() -> Result<(), Error> {
    let s = seed().await?;
    let usage = usage_service(&s, Arc::new(EventBus::new()));

    usage.record(s.customer.id, s.renewable.id, dec!(9.5), None).await?;
    usage.record(s.customer.id, s.grid.id, dec!(10), None).await?;

    assert!(s.repos.credits.list_for_user(s.customer.id, true).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn non_positive_usage_is_a_validation_error() -> Result<(), Error> {
    let s = seed().await?;
    let usage = usage_service(&s, Arc::new(EventBus::new()));

    let err = usage.record(s.customer.id, s.grid.id, Decimal::ZERO, None).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let err = usage.record(s.customer.id, Uuid::new_v4(), dec!(1), None).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn usage_finer_than_stored_precision_is_rejected() -> Result<(), Error> {
    let s = seed().await?;
    let usage = usage_service(&s, Arc::new(EventBus::new()));

    let err = usage.record(s.customer.id, s.grid.id, dec!(0.00001), None).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(s.repos.usage.list_for_user(s.customer.id, None).await?.is_empty());

    // Trailing zeros past the fourth place are fine.
    usage.record(s.customer.id, s.grid.id, dec!(1.25000), None).await?;
    usage.record(s.customer.id, s.grid.id, dec!(0.0001), None).await?;
    assert_eq!(s.repos.usage.list_for_user(s.customer.id, None).await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn crossing_daily_threshold_raises_usage_alert() -> Result<(), Error> {
    let s = seed().await?;
    let usage = usage_service(&s, Arc::new(EventBus::new()));

    // 10 kWh against a 20 kWh daily limit stays under 80%.
    usage.record(s.customer.id, s.grid.id, dec!(10), None).await?;
    assert!(s.repos.notifications.list_for_user(s.customer.id, false, 50).await?.is_empty());

    usage.record(s.customer.id, s.grid.id, dec!(15), None).await?;
    let alerts = s.repos.notifications.list_for_user(s.customer.id, false, 50).await?;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].kind, NotificationType::UsageAlert);
    assert_eq!(alerts[0].title, "Daily Usage Alert");
    assert!(alerts[0].body.contains("25 kWh this day"));
    assert_eq!(alerts[0].data["period"], "daily");
    Ok(())
}

#[tokio::test]
async fn raised_limits_silence_alerts() -> Result<(), Error> {
    let s = seed().await?;
    let usage = usage_service(&s, Arc::new(EventBus::new()));

    let updated = usage
        .update_limits(
            s.customer.id,
            &UsageLimitUpdate { daily_limit: Some(dec!(100)), ..Default::default() },
        )
        .await?;
    assert_eq!(updated.daily_limit, dec!(100));
    assert_eq!(updated.weekly_limit, dec!(120));

    usage.record(s.customer.id, s.grid.id, dec!(25), None).await?;
    assert!(s.repos.notifications.list_for_user(s.customer.id, false, 50).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn stats_split_renewable_and_grid() -> Result<(), Error> {
    let s = seed().await?;
    let usage = usage_service(&s, Arc::new(EventBus::new()));

    usage.record(s.customer.id, s.renewable.id, dec!(4), None).await?;
    usage.record(s.customer.id, s.grid.id, dec!(6), None).await?;

    let stats = usage.stats(s.customer.id, UsagePeriod::All).await?;
    assert_eq!(stats.total_usage, dec!(10));
    assert_eq!(stats.renewable_usage, dec!(4));
    assert_eq!(stats.non_renewable_usage, dec!(6));
    assert_eq!(stats.carbon_saved, dec!(2));
    assert_eq!(stats.logs.len(), 2);
    Ok(())
}

#[tokio::test]
async fn selling_credits_pays_cash_and_journals_sale() -> Result<(), Error> {
    let s = seed().await?;
    let carbon = carbon_service(&s);
    let ids = give_credits(&s, &[dec!(3), dec!(7)]).await?;

    let result = carbon.monetize(s.customer.id, ids, MonetizeAction::SellToCash).await?;
    assert_eq!(result.credits_monetized, dec!(10));
    assert_eq!(result.amount, dec!(7500));
    assert_eq!(result.tokens_received, None);
    assert_eq!(result.action, "sold_to_cash");
    assert!(result.reference.starts_with("CARBON"));

    let wallet = s.repos.wallets.get_by_user(s.customer.id).await?.unwrap();
    assert_eq!(wallet.cash_balance, dec!(7500));
    assert_eq!(wallet.balance, Decimal::ZERO);

    let tx = s.repos.transactions.get_by_reference(&result.reference).await?.unwrap();
    assert_eq!(tx.tx_type, TransactionType::CarbonCreditSale);
    assert_eq!(tx.amount, dec!(7500));

    let portfolio = carbon.portfolio(s.customer.id, false).await?;
    assert!(portfolio.credits.is_empty());
    assert_eq!(portfolio.stats.credits_sold, dec!(10));
    assert_eq!(portfolio.stats.total_earnings, dec!(7500));
    Ok(())
}

#[tokio::test]
async fn converting_credits_grants_energy() -> Result<(), Error> {
    let s = seed().await?;
    let carbon = carbon_service(&s);
    let ids = give_credits(&s, &[dec!(3), dec!(7)]).await?;

    let result = carbon.monetize(s.customer.id, ids, MonetizeAction::ConvertToTokens).await?;
    assert_eq!(result.tokens_received, Some(dec!(100)));
    assert_eq!(result.action, "converted_to_tokens");

    let wallet = s.repos.wallets.get_by_user(s.customer.id).await?.unwrap();
    assert_eq!(wallet.balance, dec!(100));
    assert_eq!(wallet.total_earned, dec!(100));
    assert_eq!(wallet.cash_balance, Decimal::ZERO);
    Ok(())
}

#[tokio::test]
async fn batch_with_sold_credit_changes_nothing() -> Result<(), Error> {
    let s = seed().await?;
    let carbon = carbon_service(&s);
    let ids = give_credits(&s, &[dec!(2), dec!(4)]).await?;

    carbon.monetize(s.customer.id, vec![ids[0]], MonetizeAction::SellToCash).await?;
    let wallet_before = s.repos.wallets.get_by_user(s.customer.id).await?.unwrap();

    let err = carbon
        .monetize(s.customer.id, ids.clone(), MonetizeAction::SellToCash)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));

    let wallet_after = s.repos.wallets.get_by_user(s.customer.id).await?.unwrap();
    assert_eq!(wallet_before.cash_balance, wallet_after.cash_balance);
    let open = carbon.portfolio(s.customer.id, false).await?;
    assert_eq!(open.credits.len(), 1);
    assert_eq!(open.credits[0].id, ids[1]);
    Ok(())
}

#[tokio::test]
async fn cannot_monetize_someone_elses_credits() -> Result<(), Error> {
    let s = seed().await?;
    let carbon = carbon_service(&s);
    let ids = give_credits(&s, &[dec!(5)]).await?;

    let err = carbon.monetize(s.admin.id, ids, MonetizeAction::SellToCash).await.unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));

    let err = carbon.monetize(s.customer.id, vec![], MonetizeAction::SellToCash).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    Ok(())
}

#[tokio::test]
async fn wallet_never_goes_negative() -> Result<(), Error> {
    let s = seed().await?;
    let wallets = WalletService::new(s.repos.wallets.clone());

    wallets.update_balance(s.customer.id, dec!(10), BalanceOp::Add).await?;
    let err = wallets
        .update_balance(s.customer.id, dec!(10.5), BalanceOp::Subtract)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));

    let wallet = wallets.update_balance(s.customer.id, dec!(4), BalanceOp::Subtract).await?;
    assert_eq!(wallet.balance, dec!(6));
    assert_eq!(wallet.total_earned, dec!(10));
    assert_eq!(wallet.total_spent, dec!(4));

    let err = wallets.get(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn failing_limit_check_does_not_fail_the_record() -> Result<(), Error> {
    let s = seed().await?;
    let mut limits = MockLimits::new();
    limits
        .expect_get()
        .returning(|_| Err(Error::Internal("limits table unavailable".into())));
    limits.expect_get_or_create().never();

    let config = test_config();
    let events = Arc::new(EventBus::new());
    let usage = UsageService::new(
        s.repos.usage.clone(),
        Arc::new(limits),
        s.repos.catalog.clone(),
        s.repos.credits.clone(),
        Arc::new(NotificationService::new(s.repos.notifications.clone(), events.clone())),
        events,
        config.carbon,
        config.usage_defaults,
        config.timezone,
    );

    let log = usage.record(s.customer.id, s.grid.id, dec!(25), None).await?;

    let stored = s.repos.usage.list_for_user(s.customer.id, None).await?;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, log.id);
    assert_eq!(stored[0].amount, dec!(25));
    let alerts = s.repos.notifications.list_for_user(s.customer.id, false, 50).await?;
    assert!(alerts.is_empty());
    Ok(())
}
