// tests/repository_tests.rs
//
// Postgres repositories. Needs a live server:
//   TEST_DATABASE_URL=postgres://... cargo test -- --ignored

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

use voltledger_common::models::{
    CarbonCredit, CarbonPolicy, CompanyDraft, CreditSettlement, MonetizeAction, PageRequest,
    SettlementOutcome, TokenDraft, TokenType, Transaction, TransactionStatus, TransactionType,
    UsageLimit, UsageLimitDefaults, UsageLog, User, WalletAdjustment,
};
use voltledger_core::repositories::Repositories;
use voltledger_core::test_utils::helpers::setup_test_database;
use voltledger_core::Error;

async fn repos() -> Result<Repositories, Error> {
    let db = setup_test_database().await?;
    Ok(Repositories::postgres(&db))
}

#[tokio::test]
#[ignore = "requires a Postgres test database"]
async fn user_is_created_with_empty_wallet() -> Result<(), Error> {
    let repos = repos().await?;
    let user = User::new("Ngozi@Example.com", "Ngozi", "Obi");

    let wallet = repos.users.create_with_wallet(&user).await?;
    assert_eq!(wallet.balance, Decimal::ZERO);

    let found = repos.users.get_by_email("ngozi@example.com").await?.unwrap();
    assert_eq!(found.id, user.id);

    let err = repos.users.create_with_wallet(&User::new("ngozi@example.com", "N", "O")).await.unwrap_err();
    assert!(matches!(err, Error::Conflict(_) | Error::Database(_)));
    Ok(())
}

#[tokio::test]
#[ignore = "requires a Postgres test database"]
async fn wallet_adjustment_never_overdraws() -> Result<(), Error> {
    let repos = repos().await?;
    let user = User::new("bola@example.com", "Bola", "Ade");
    repos.users.create_with_wallet(&user).await?;

    repos.wallets.adjust(user.id, WalletAdjustment::credit_energy(dec!(3))).await?;
    let err = repos.wallets.adjust(user.id, WalletAdjustment::debit_energy(dec!(4))).await.unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));

    let wallet = repos.wallets.get_by_user(user.id).await?.unwrap();
    assert_eq!(wallet.balance, dec!(3));
    Ok(())
}

#[tokio::test]
#[ignore = "requires a Postgres test database"]
async fn usage_breakdown_splits_by_token_type() -> Result<(), Error> {
    let repos = repos().await?;
    let user = User::new("emeka@example.com", "Emeka", "Nwosu");
    repos.users.create_with_wallet(&user).await?;

    let company = CompanyDraft { name: "Delta Grid".into(), slug: "delta-grid".into(), ..Default::default() }
        .into_company();
    repos.catalog.create_company(&company).await?;
    let solar = repos
        .catalog
        .create_token(&TokenDraft {
            company_id: company.id,
            token_type: TokenType::Renewable,
            price_per_unit: dec!(80),
            is_available: None,
            description: None,
        })
        .await?;
    assert_eq!(solar.company_name, "Delta Grid");

    for amount in [dec!(2.5), dec!(4)] {
        repos
            .usage
            .insert(&UsageLog {
                id: Uuid::new_v4(),
                user_id: user.id,
                token_id: solar.id,
                amount,
                timestamp: chrono::Utc::now(),
                metadata: json!({}),
            })
            .await?;
    }
    let breakdown = repos.usage.breakdown_since(user.id, None).await?;
    assert_eq!(breakdown.total, dec!(6.5));
    assert_eq!(breakdown.renewable, dec!(6.5));
    assert_eq!(breakdown.non_renewable, Decimal::ZERO);

    let limit = repos
        .usage_limits
        .get_or_create(&UsageLimit::with_defaults(user.id, &UsageLimitDefaults::default()))
        .await?;
    let again = repos
        .usage_limits
        .get_or_create(&UsageLimit::with_defaults(user.id, &UsageLimitDefaults::default()))
        .await?;
    assert_eq!(limit.id, again.id);
    Ok(())
}

#[tokio::test]
#[ignore = "requires a Postgres test database"]
async fn credit_settlement_is_all_or_nothing() -> Result<(), Error> {
    let repos = repos().await?;
    let user = User::new("tunde@example.com", "Tunde", "Bello");
    repos.users.create_with_wallet(&user).await?;

    let a = CarbonCredit::new(user.id, dec!(3), "Delta Grid", dec!(30));
    let b = CarbonCredit::new(user.id, dec!(7), "Delta Grid", dec!(70));
    repos.credits.insert(&a).await?;
    repos.credits.insert(&b).await?;

    let settlement = |ids: Vec<Uuid>, reference: &str| CreditSettlement {
        user_id: user.id,
        credit_ids: ids,
        action: MonetizeAction::SellToCash,
        reference: reference.to_string(),
        policy: CarbonPolicy::default(),
    };

    let (quote, tx) = repos.credits.settle(&settlement(vec![a.id], "CARBON_A")).await?;
    assert_eq!(quote.total_amount, dec!(2250));
    assert_eq!(tx.tx_type, TransactionType::CarbonCreditSale);

    let err = repos.credits.settle(&settlement(vec![a.id, b.id], "CARBON_B")).await.unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));

    let open = repos.credits.list_for_user(user.id, false).await?;
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].id, b.id);
    let wallet = repos.wallets.get_by_user(user.id).await?.unwrap();
    assert_eq!(wallet.cash_balance, dec!(2250));
    assert!(repos.transactions.get_by_reference("CARBON_B").await?.is_none());
    Ok(())
}

#[tokio::test]
#[ignore = "requires a Postgres test database"]
async fn purchase_settles_exactly_once() -> Result<(), Error> {
    let repos = repos().await?;
    let user = User::new("amaka@example.com", "Amaka", "Uche");
    repos.users.create_with_wallet(&user).await?;

    let mut tx = Transaction::new(
        user.id,
        TransactionType::Purchase,
        TransactionStatus::Pending,
        dec!(150),
        "TXN_once".into(),
    );
    tx.quantity = Some(dec!(2));
    repos.transactions.insert(&tx).await?;

    let settled = repos
        .transactions
        .settle_purchase("TXN_once", SettlementOutcome::Success, json!({ "gateway": { "status": "success" } }))
        .await?;
    assert_eq!(settled.status, TransactionStatus::Success);

    let err = repos
        .transactions
        .settle_purchase("TXN_once", SettlementOutcome::Success, json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));

    let wallet = repos.wallets.get_by_user(user.id).await?.unwrap();
    assert_eq!(wallet.balance, dec!(2));

    let (history, total) = repos.transactions.list_for_user(user.id, PageRequest::new(None, None)).await?;
    assert_eq!(total, 1);
    assert_eq!(history[0].metadata["gateway"]["status"], "success");
    Ok(())
}
