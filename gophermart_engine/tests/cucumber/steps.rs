use cucumber::{given, then, when};
use gophermart_engine::{
    db_types::{OrderNumber, OrderStatusType},
    ledger_objects::{SubmitOrderResult, TickOutcome},
    AccrualVerdict,
    IngestionError,
    LedgerStore,
    LedgerTransaction,
    Money,
    OracleError,
    WithdrawalError,
};

use crate::cucumber::{ledger_world::LedgerSystem, LedgerWorld};

#[given("a fresh ledger")]
async fn fresh_ledger(world: &mut LedgerWorld) {
    world.system = Some(LedgerSystem::new());
}

#[given(expr = "an account {string}")]
async fn an_account(world: &mut LedgerWorld, login: String) {
    world.system().accounts.register(&login, "secret-hash").await.expect("Error registering account");
}

#[given(expr = "order {word} uploaded by {string}")]
async fn order_uploaded(world: &mut LedgerWorld, number: String, login: String) {
    world.system().db.store_order(&OrderNumber::from(number), &login).await.expect("Error storing order");
}

#[when(expr = "{string} uploads order {string}")]
async fn upload_order(world: &mut LedgerWorld, login: String, number: String) {
    let system = world.system();
    system.last_upload = Some(system.ingestion.submit_order(&login, &number).await);
}

#[then(expr = "the upload is {word}")]
async fn check_upload(world: &mut LedgerWorld, expected: String) {
    let result = world.system().last_upload.take().expect("No upload was made");
    match (expected.as_str(), result) {
        ("accepted", Ok(SubmitOrderResult::Accepted(_))) => {},
        ("already-uploaded", Ok(SubmitOrderResult::AlreadyUploaded(_))) => {},
        ("rejected-as-invalid", Err(IngestionError::InvalidNumber(_))) => {},
        ("rejected-as-empty", Err(IngestionError::EmptyNumber)) => {},
        ("a-conflict", Err(IngestionError::OwnedByAnotherAccount(_))) => {},
        (expected, result) => panic!("Expected the upload to be {expected}, but got {result:?}"),
    }
}

#[given(expr = "the accrual system reports order {word} as {word}")]
async fn oracle_reports(world: &mut LedgerWorld, number: String, status: String) {
    let verdict = match status.as_str() {
        "UNKNOWN" => AccrualVerdict::Unregistered,
        "REGISTERED" => AccrualVerdict::Registered,
        "PROCESSING" => AccrualVerdict::Processing,
        "INVALID" => AccrualVerdict::Invalid,
        s => panic!("Unsupported accrual status {s}"),
    };
    world.system().oracle.set_verdict(&number, verdict);
}

#[given(expr = "the accrual system reports order {word} as PROCESSED with {int}")]
async fn oracle_reports_processed(world: &mut LedgerWorld, number: String, accrual: i64) {
    world.system().oracle.set_verdict(&number, AccrualVerdict::Processed(Money::from(accrual)));
}

#[given(expr = "the accrual system fails once for order {word}, then reports it as PROCESSED with {int}")]
async fn oracle_fails_once(world: &mut LedgerWorld, number: String, accrual: i64) {
    let oracle = &world.system().oracle;
    oracle
        .respond(&number, Err(OracleError::Transient("connection refused".into())))
        .respond_with(&number, AccrualVerdict::Processed(Money::from(accrual)));
}

#[when("a reconciliation tick runs")]
async fn run_tick(world: &mut LedgerWorld) {
    let system = world.system();
    system.last_tick = Some(system.reconciliation.run_tick().await);
}

#[when(expr = "{int} reconciliation ticks run")]
async fn run_ticks(world: &mut LedgerWorld, count: usize) {
    for _ in 0..count {
        run_tick(world).await;
    }
}

#[when(expr = "a tick crediting {int} for order {word} crashes before it commits")]
async fn crashed_tick(world: &mut LedgerWorld, accrual: i64, number: String) {
    let system = world.system();
    let mut tx = system.db.begin_transaction().await.expect("Error opening transaction");
    let claimed = tx.claim_next_pending_order().await.expect("Error claiming").expect("Nothing to claim");
    assert_eq!(claimed.number.as_str(), number);
    tx.update_order_status(&claimed.number, OrderStatusType::Processed, Money::from(accrual), None)
        .await
        .expect("Error updating order");
    tx.credit_account(&claimed.login, Money::from(accrual)).await.expect("Error crediting account");
    // Dropped without committing
}

#[then(expr = "the tick outcome is {word}")]
async fn check_tick(world: &mut LedgerWorld, expected: String) {
    let result = world.system().last_tick.take().expect("No tick has run");
    match (expected.as_str(), result) {
        ("idle", Ok(TickOutcome::Idle)) => {},
        ("nothing-claimed", Ok(TickOutcome::NothingClaimed)) => {},
        ("still-pending", Ok(TickOutcome::StillPending(_))) => {},
        ("invalidated", Ok(TickOutcome::Invalidated(_))) => {},
        ("processed", Ok(TickOutcome::Processed { .. })) => {},
        ("a-failure", Err(_)) => {},
        (expected, result) => panic!("Expected the tick to be {expected}, but got {result:?}"),
    }
}

#[then(expr = "order {word} has status {word} and accrual {int}")]
async fn check_order(world: &mut LedgerWorld, number: String, status: String, accrual: i64) {
    let order = world.system().db.get_order(&OrderNumber::from(number)).await.unwrap().expect("Order does not exist");
    let status = status.parse::<OrderStatusType>().expect("Not a valid status");
    assert_eq!(order.status, status, "Order status is incorrect");
    assert_eq!(order.accrual, Money::from(accrual), "Order accrual is incorrect");
}

#[then(expr = "order {word} has {int} withdrawn")]
async fn check_order_withdrawn(world: &mut LedgerWorld, number: String, withdrawn: i64) {
    let order = world.system().db.get_order(&OrderNumber::from(number)).await.unwrap().expect("Order does not exist");
    assert_eq!(order.withdrawn, Money::from(withdrawn), "Order withdrawn credit is incorrect");
}

#[then(expr = "{string} has a balance of {int} and has withdrawn {int}")]
async fn check_balance(world: &mut LedgerWorld, login: String, current: i64, withdrawn: i64) {
    let balance = world.system().accounts.balance(&login).await.expect("Error fetching balance");
    assert_eq!(balance.current, Money::from(current), "Balance is incorrect");
    assert_eq!(balance.withdrawn, Money::from(withdrawn), "Withdrawn total is incorrect");
}

#[then(expr = "{string} has {int} withdrawal(s) in their history")]
async fn check_history(world: &mut LedgerWorld, login: String, count: usize) {
    let history = world.system().accounts.withdrawals(&login).await.expect("Error fetching withdrawals");
    assert_eq!(history.len(), count);
}

#[when(expr = "{string} withdraws {int} against order {word}")]
async fn withdraw(world: &mut LedgerWorld, login: String, amount: i64, number: String) {
    let system = world.system();
    let result = system.withdrawals.withdraw(&login, &OrderNumber::from(number), Money::from(amount)).await;
    system.last_withdrawal = Some(result.map(|_| ()));
}

#[then("the withdrawal succeeds")]
async fn withdrawal_succeeds(world: &mut LedgerWorld) {
    let result = world.system().last_withdrawal.take().expect("No withdrawal was made");
    assert!(result.is_ok(), "Withdrawal failed: {result:?}");
}

#[then(expr = "the withdrawal fails with {word}")]
async fn withdrawal_fails(world: &mut LedgerWorld, expected: String) {
    let result = world.system().last_withdrawal.take().expect("No withdrawal was made");
    let matched = match (expected.as_str(), &result) {
        ("insufficient-funds", Err(WithdrawalError::InsufficientFunds { .. })) => true,
        ("order-not-owned", Err(WithdrawalError::OrderNotOwned(_))) => true,
        ("order-not-found", Err(WithdrawalError::OrderNotFound(_))) => true,
        ("unauthorized", Err(WithdrawalError::Unauthorized(_))) => true,
        ("invalid-amount", Err(WithdrawalError::InvalidAmount(_))) => true,
        ("insufficient-order-credit", Err(WithdrawalError::InsufficientOrderCredit { .. })) => true,
        _ => false,
    };
    assert!(matched, "Expected the withdrawal to fail with {expected}, but got {result:?}");
}
