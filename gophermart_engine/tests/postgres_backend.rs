//! Runs the ledger scenarios against a real Postgres server. Skipped unless `GM_TEST_DATABASE_URL` names a server on
//! which the tests may create databases.
#![cfg(feature = "postgres")]

use std::time::Duration;

use gophermart_engine::{
    db_types::{OrderNumber, OrderStatusType},
    ledger_objects::TickOutcome,
    test_utils::{
        prepare_env::{create_postgres_database, drop_postgres_database, test_database_url},
        scripted_oracle::ScriptedOracle,
    },
    AccountApi,
    AccrualVerdict,
    LedgerStore,
    LedgerStoreError,
    LedgerTransaction,
    Money,
    OrderIngestionApi,
    ReconciliationApi,
    WithdrawalApi,
    WithdrawalError,
};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn postgres_ledger_end_to_end() {
    let Some(server) = test_database_url() else {
        return;
    };
    let db = create_postgres_database(&server).await;
    let accounts = AccountApi::new(db.clone());
    accounts.register("alice", "hash-a").await.unwrap();
    accounts.register("bob", "hash-b").await.unwrap();
    assert!(matches!(
        db.store_account("alice", "again").await,
        Err(LedgerStoreError::AccountAlreadyExists(_))
    ));

    let number = OrderNumber::from("12345678");
    db.store_order(&number, "alice").await.unwrap();
    assert!(matches!(db.store_order(&number, "bob").await, Err(LedgerStoreError::OrderAlreadyExists(_))));
    assert!(matches!(
        db.store_order(&"4561261212345467".into(), "nobody").await,
        Err(LedgerStoreError::AccountNotFound(_))
    ));
    OrderIngestionApi::new(db.clone()).submit_order("bob", "79927398713").await.unwrap();
    assert_eq!(db.count_pending_orders().await.unwrap(), 2);

    // Two racing workers: each order is processed exactly once
    let oracle = ScriptedOracle::new().with_latency(Duration::from_millis(50));
    oracle.set_verdict("12345678", AccrualVerdict::Processed(Money::from(500)));
    oracle.set_verdict("79927398713", AccrualVerdict::Invalid);
    let worker_a = ReconciliationApi::new(db.clone(), oracle.clone());
    let worker_b = ReconciliationApi::new(db.clone(), oracle.clone());
    let (a, b) = tokio::join!(worker_a.run_tick(), worker_b.run_tick());
    let outcomes = [a.unwrap(), b.unwrap()];
    assert!(outcomes.iter().any(|o| matches!(o, TickOutcome::Processed { .. })));
    assert!(outcomes.contains(&TickOutcome::Invalidated("79927398713".into())));
    assert_eq!(worker_a.run_tick().await.unwrap(), TickOutcome::Idle);
    assert_eq!(oracle.total_calls(), 2);

    let order = db.get_order(&number).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Processed);
    assert_eq!(order.accrual, Money::from(500));
    assert_eq!(accounts.balance("alice").await.unwrap().current, Money::from(500));

    let withdrawals = WithdrawalApi::new(db.clone());
    let err = withdrawals.withdraw("alice", &number, Money::from(600)).await.unwrap_err();
    assert!(matches!(err, WithdrawalError::InsufficientFunds { .. }));
    let err = withdrawals.withdraw("alice", &"79927398713".into(), Money::from(100)).await.unwrap_err();
    assert!(matches!(err, WithdrawalError::OrderNotOwned(_)));
    withdrawals.withdraw("alice", &number, Money::from(200)).await.unwrap();

    let balance = accounts.balance("alice").await.unwrap();
    assert_eq!(balance.current, Money::from(300));
    assert_eq!(balance.withdrawn, Money::from(200));
    let history = accounts.withdrawals("alice").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].sum, Money::from(200));

    // The check constraints back up the application checks
    let mut tx = db.begin_transaction().await.unwrap();
    assert!(tx.debit_account("alice", Money::from(1_000)).await.is_err());
    drop(tx);
    let mut tx = db.begin_transaction().await.unwrap();
    assert!(tx.debit_order_credit(&number, Money::from(301)).await.is_err());
    drop(tx);
    assert_eq!(accounts.balance("alice").await.unwrap().current, Money::from(300));

    drop((worker_a, worker_b, withdrawals, accounts));
    drop_postgres_database(db).await;
}

#[tokio::test]
async fn postgres_claims_skip_locked_rows() {
    let Some(server) = test_database_url() else {
        return;
    };
    let db = create_postgres_database(&server).await;
    db.store_account("alice", "hash").await.unwrap();
    db.store_order(&"12345674".into(), "alice").await.unwrap();
    let mut first = db.begin_transaction().await.unwrap();
    let mut second = db.begin_transaction().await.unwrap();
    assert!(first.claim_next_pending_order().await.unwrap().is_some());
    assert!(second.claim_next_pending_order().await.unwrap().is_none());
    first.rollback().await.unwrap();
    assert!(second.claim_next_pending_order().await.unwrap().is_some());
    second.rollback().await.unwrap();
    drop_postgres_database(db).await;
}
