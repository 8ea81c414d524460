//! Property tests: random interleavings of reconciliation credits and withdrawals never break the ledger invariants.

use std::time::Duration;

use futures_util::future::join_all;
use gophermart_engine::{
    db_types::OrderNumber,
    helpers::luhn,
    test_utils::scripted_oracle::ScriptedOracle,
    AccrualVerdict,
    LedgerStore,
    LedgerStoreError,
    MemoryDatabase,
    Money,
    ReconciliationApi,
    ReconciliationError,
    WithdrawalApi,
};
use proptest::prelude::*;
use tokio::runtime::Runtime;

const LOGINS: [&str; 2] = ["alice", "bob"];

#[derive(Debug, Clone)]
enum Op {
    Reconcile,
    Withdraw { login: usize, order: usize, amount: i64 },
}

fn op_strategy(num_orders: usize) -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Reconcile),
        (0..LOGINS.len(), 0..num_orders, -10i64..400).prop_map(|(login, order, amount)| Op::Withdraw {
            login,
            order,
            amount
        }),
    ]
}

fn order_number(i: usize) -> OrderNumber {
    let payload = format!("{}", 4000 + i);
    let digit = luhn::check_digit(&payload).expect("digits only");
    OrderNumber::from(format!("{payload}{digit}"))
}

/// Sets up two accounts owning `accruals.len()` orders between them (alternating owners), with the oracle primed to
/// award the given accruals.
async fn setup(db: &MemoryDatabase, accruals: &[i64]) -> ScriptedOracle {
    for login in LOGINS {
        db.store_account(login, "hash").await.unwrap();
    }
    let oracle = ScriptedOracle::new();
    for (i, accrual) in accruals.iter().enumerate() {
        let number = order_number(i);
        db.store_order(&number, LOGINS[i % LOGINS.len()]).await.unwrap();
        oracle.set_verdict(number.as_str(), AccrualVerdict::Processed(Money::from(*accrual)));
    }
    oracle
}

async fn apply(db: MemoryDatabase, oracle: ScriptedOracle, op: Op) {
    match op {
        Op::Reconcile => match ReconciliationApi::new(db, oracle).run_tick().await {
            // Opposing lock orders between a withdrawal and a reconciliation fail one of them
            Ok(_) | Err(ReconciliationError::Storage(LedgerStoreError::LockTimeout(_))) => {},
            Err(e) => panic!("Unexpected reconciliation error: {e}"),
        },
        Op::Withdraw { login, order, amount } => {
            // Business rule failures are expected here; only the invariants matter.
            let number = order_number(order);
            let _ = WithdrawalApi::new(db).withdraw(LOGINS[login], &number, Money::from(amount)).await;
        },
    }
}

fn clamp(op: Op, num_orders: usize) -> Op {
    match op {
        Op::Withdraw { login, order, amount } => Op::Withdraw { login, order: order % num_orders, amount },
        op => op,
    }
}

fn check_invariants(db: &MemoryDatabase) {
    let orders = db.orders();
    for order in &orders {
        assert!(!order.withdrawn.is_negative(), "order {} has negative withdrawn credit", order.number);
        assert!(order.withdrawn <= order.accrual, "order {} is overdrawn", order.number);
    }
    for account in db.accounts() {
        assert!(!account.balance.is_negative(), "{} has a negative balance", account.login);
        let owned = orders.iter().filter(|o| o.login == account.login);
        let withdrawn: Money = owned.clone().map(|o| o.withdrawn).sum();
        let accrued: Money = owned.map(|o| o.accrual).sum();
        assert_eq!(account.withdrawn, withdrawn, "withdrawn total of {} drifted", account.login);
        assert_eq!(account.balance + account.withdrawn, accrued, "balance of {} drifted", account.login);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn sequential_operations_preserve_invariants(
        accruals in prop::collection::vec(0i64..1_000, 1..6),
        ops in prop::collection::vec(op_strategy(6), 1..40),
    ) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let db = MemoryDatabase::new();
            let oracle = setup(&db, &accruals).await;
            for op in ops {
                apply(db.clone(), oracle.clone(), clamp(op, accruals.len())).await;
                check_invariants(&db);
            }
        });
    }

    #[test]
    fn concurrent_operations_preserve_invariants(
        accruals in prop::collection::vec(0i64..1_000, 1..6),
        ops in prop::collection::vec(op_strategy(6), 1..40),
    ) {
        let rt = tokio::runtime::Builder::new_multi_thread().worker_threads(4).enable_all().build().unwrap();
        rt.block_on(async {
            let db = MemoryDatabase::with_lock_timeout(Duration::from_millis(50));
            let oracle = setup(&db, &accruals).await;
            let handles = ops
                .into_iter()
                .map(|op| tokio::spawn(apply(db.clone(), oracle.clone(), clamp(op, accruals.len()))))
                .collect::<Vec<_>>();
            for result in join_all(handles).await {
                result.unwrap();
            }
            check_invariants(&db);
        });
    }
}
