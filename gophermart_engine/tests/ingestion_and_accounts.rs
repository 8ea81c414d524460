use gophermart_engine::{
    db_types::{OrderNumber, OrderStatusType},
    ledger_objects::SubmitOrderResult,
    test_utils::prepare_env::prepare_test_env,
    AccountApi,
    AccountApiError,
    IngestionError,
    LedgerStore,
    LedgerStoreError,
    MemoryDatabase,
    Money,
    OrderIngestionApi,
};

async fn setup() -> (MemoryDatabase, OrderIngestionApi<MemoryDatabase>, AccountApi<MemoryDatabase>) {
    prepare_test_env();
    let db = MemoryDatabase::new();
    let accounts = AccountApi::new(db.clone());
    accounts.register("alice", "hash-a").await.unwrap();
    accounts.register("bob", "hash-b").await.unwrap();
    (db.clone(), OrderIngestionApi::new(db), accounts)
}

#[tokio::test]
async fn registration_is_unique() {
    let (_, _, accounts) = setup().await;
    let err = accounts.register("alice", "another-hash").await.unwrap_err();
    assert!(matches!(err, AccountApiError::AlreadyExists(login) if login == "alice"));
    let alice = accounts.account("alice").await.unwrap();
    assert_eq!(alice.password_hash, "hash-a");
    assert_eq!(alice.balance, Money::ZERO);
    assert!(matches!(accounts.account("carol").await, Err(AccountApiError::NotFound(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registrations_have_one_winner() {
    prepare_test_env();
    let db = MemoryDatabase::new();
    let mut handles = Vec::new();
    for i in 0..8 {
        let db = db.clone();
        handles.push(tokio::spawn(async move {
            let hash = format!("hash-{i}");
            let result = db.store_account("carol", &hash).await;
            result
        }));
    }
    let mut winners = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => winners += 1,
            Err(LedgerStoreError::AccountAlreadyExists(_)) => {},
            Err(e) => panic!("Unexpected error: {e}"),
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn new_orders_are_accepted() {
    let (db, ingestion, _) = setup().await;
    let result = ingestion.submit_order("alice", " 12345674 ").await.unwrap();
    let SubmitOrderResult::Accepted(order) = result else { panic!("Expected a new order") };
    assert_eq!(order.number, OrderNumber::from("12345674"));
    assert_eq!(order.status, OrderStatusType::New);
    assert_eq!(order.accrual, Money::ZERO);
    assert_eq!(db.count_pending_orders().await.unwrap(), 1);
}

#[tokio::test]
async fn resubmissions_are_classified_by_owner() {
    let (_, ingestion, _) = setup().await;
    ingestion.submit_order("alice", "12345674").await.unwrap();
    let again = ingestion.submit_order("alice", "12345674").await.unwrap();
    assert!(matches!(again, SubmitOrderResult::AlreadyUploaded(_)));
    assert_eq!(again.order().login, "alice");
    let err = ingestion.submit_order("bob", "12345674").await.unwrap_err();
    assert!(matches!(err, IngestionError::OwnedByAnotherAccount(_)));
}

#[tokio::test]
async fn malformed_numbers_are_rejected() {
    let (db, ingestion, _) = setup().await;
    assert!(matches!(ingestion.submit_order("alice", "   ").await, Err(IngestionError::EmptyNumber)));
    for bad in ["12345678", "1234-5674", "abc", "79927398710"] {
        let err = ingestion.submit_order("alice", bad).await.unwrap_err();
        assert!(matches!(err, IngestionError::InvalidNumber(_)), "{bad} should be rejected");
    }
    assert_eq!(db.count_pending_orders().await.unwrap(), 0);
}

#[tokio::test]
async fn orders_need_an_account() {
    let (_, ingestion, _) = setup().await;
    let err = ingestion.submit_order("mallory", "12345674").await.unwrap_err();
    assert!(matches!(err, IngestionError::Storage(LedgerStoreError::AccountNotFound(_))));
}

#[tokio::test]
async fn reports_list_orders_oldest_first() {
    let (_, ingestion, accounts) = setup().await;
    for number in ["9278923470", "12345674", "79927398713"] {
        ingestion.submit_order("alice", number).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }
    ingestion.submit_order("bob", "4561261212345467").await.unwrap();

    let orders = accounts.orders("alice").await.unwrap();
    let numbers = orders.iter().map(|o| o.number.as_str()).collect::<Vec<_>>();
    assert_eq!(numbers, vec!["9278923470", "12345674", "79927398713"]);
    assert!(orders.windows(2).all(|w| w[0].uploaded_at <= w[1].uploaded_at));
    assert!(accounts.withdrawals("alice").await.unwrap().is_empty());
    let balance = accounts.balance("alice").await.unwrap();
    assert_eq!(balance.current, Money::ZERO);
    assert_eq!(balance.withdrawn, Money::ZERO);
}
