//! An in-memory ledger store.
//!
//! Committed state lives behind a single mutex. Row locks are emulated with one async mutex per account and per order,
//! which a [`MemoryTransaction`] acquires and holds until it ends. Writes are buffered inside the transaction as
//! modified copies of the locked rows and are applied in one step on commit, so other transactions never observe a
//! partially applied transaction, and dropping a transaction discards its writes.
//!
//! Blocking lock waits give up after a configurable timeout with [`LedgerStoreError::LockTimeout`]. This stands in
//! for the deadlock detection a database server would perform.
mod locks;

use std::{
    collections::HashMap,
    fmt::Debug,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use chrono::{DateTime, Utc};
use gm_common::Money;
use locks::RowLocks;
use log::*;
use tokio::sync::OwnedMutexGuard;

use crate::{
    db::traits::{LedgerStore, LedgerStoreError, LedgerTransaction},
    db_types::{Account, Order, OrderNumber, OrderRef, OrderStatusType},
};

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct State {
    accounts: HashMap<String, Account>,
    orders: HashMap<OrderNumber, Order>,
}

struct Shared {
    state: Mutex<State>,
    account_locks: RowLocks<String>,
    order_locks: RowLocks<OrderNumber>,
    lock_timeout: Duration,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Clone)]
pub struct MemoryDatabase {
    shared: Arc<Shared>,
}

impl Debug for MemoryDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state();
        write!(f, "MemoryDatabase ({} accounts, {} orders)", state.accounts.len(), state.orders.len())
    }
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        let shared = Shared {
            state: Mutex::new(State::default()),
            account_locks: RowLocks::default(),
            order_locks: RowLocks::default(),
            lock_timeout,
        };
        Self { shared: Arc::new(shared) }
    }

    /// The committed state of every account, in login order.
    pub fn accounts(&self) -> Vec<Account> {
        let mut accounts = self.shared.state().accounts.values().cloned().collect::<Vec<_>>();
        accounts.sort_by(|a, b| a.login.cmp(&b.login));
        accounts
    }

    /// The committed state of every order, in order number order.
    pub fn orders(&self) -> Vec<Order> {
        let mut orders = self.shared.state().orders.values().cloned().collect::<Vec<_>>();
        orders.sort_by(|a, b| a.number.cmp(&b.number));
        orders
    }
}

impl LedgerStore for MemoryDatabase {
    type Tx = MemoryTransaction;

    async fn get_account(&self, login: &str) -> Result<Option<Account>, LedgerStoreError> {
        Ok(self.shared.state().accounts.get(login).cloned())
    }

    async fn store_account(&self, login: &str, credential_hash: &str) -> Result<Account, LedgerStoreError> {
        let mut state = self.shared.state();
        if state.accounts.contains_key(login) {
            return Err(LedgerStoreError::AccountAlreadyExists(login.to_string()));
        }
        let account = Account {
            login: login.to_string(),
            password_hash: credential_hash.to_string(),
            balance: Money::ZERO,
            withdrawn: Money::ZERO,
            created_at: Utc::now(),
        };
        state.accounts.insert(login.to_string(), account.clone());
        debug!("🗃️ Account '{login}' created");
        Ok(account)
    }

    async fn get_order(&self, number: &OrderNumber) -> Result<Option<Order>, LedgerStoreError> {
        Ok(self.shared.state().orders.get(number).cloned())
    }

    async fn store_order(&self, number: &OrderNumber, login: &str) -> Result<Order, LedgerStoreError> {
        let mut state = self.shared.state();
        if state.orders.contains_key(number) {
            return Err(LedgerStoreError::OrderAlreadyExists(number.clone()));
        }
        if !state.accounts.contains_key(login) {
            return Err(LedgerStoreError::AccountNotFound(login.to_string()));
        }
        let order = Order::new(number.clone(), login.to_string(), Utc::now());
        state.orders.insert(number.clone(), order.clone());
        debug!("🗃️ Order {number} saved for '{login}'");
        Ok(order)
    }

    async fn list_orders(&self, login: &str, only_with_credit: bool) -> Result<Vec<Order>, LedgerStoreError> {
        let state = self.shared.state();
        let mut orders = state
            .orders
            .values()
            .filter(|o| o.login == login && (!only_with_credit || o.withdrawn.is_positive()))
            .cloned()
            .collect::<Vec<_>>();
        orders.sort_by(|a, b| (a.uploaded_at, &a.number).cmp(&(b.uploaded_at, &b.number)));
        Ok(orders)
    }

    async fn count_pending_orders(&self) -> Result<i64, LedgerStoreError> {
        let count = self.shared.state().orders.values().filter(|o| o.status.is_pending()).count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn begin_transaction(&self) -> Result<MemoryTransaction, LedgerStoreError> {
        Ok(MemoryTransaction::new(Arc::clone(&self.shared)))
    }
}

pub struct MemoryTransaction {
    shared: Arc<Shared>,
    account_guards: HashMap<String, OwnedMutexGuard<()>>,
    order_guards: HashMap<OrderNumber, OwnedMutexGuard<()>>,
    accounts: HashMap<String, Account>,
    orders: HashMap<OrderNumber, Order>,
}

impl MemoryTransaction {
    fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            account_guards: HashMap::new(),
            order_guards: HashMap::new(),
            accounts: HashMap::new(),
            orders: HashMap::new(),
        }
    }

    /// The transaction's view of an account: its own uncommitted copy if it has one, otherwise the committed row.
    fn account(&self, login: &str) -> Option<Account> {
        self.accounts.get(login).cloned().or_else(|| self.shared.state().accounts.get(login).cloned())
    }

    fn order(&self, number: &OrderNumber) -> Option<Order> {
        self.orders.get(number).cloned().or_else(|| self.shared.state().orders.get(number).cloned())
    }

    async fn lock_account(&mut self, login: &str) -> Result<(), LedgerStoreError> {
        if self.account_guards.contains_key(login) {
            return Ok(());
        }
        let key = login.to_string();
        let guard = self
            .shared
            .account_locks
            .lock(&key, self.shared.lock_timeout)
            .await
            .ok_or_else(|| LedgerStoreError::LockTimeout(format!("account '{login}'")))?;
        self.account_guards.insert(key, guard);
        Ok(())
    }

    async fn lock_order(&mut self, number: &OrderNumber) -> Result<(), LedgerStoreError> {
        if self.order_guards.contains_key(number) {
            return Ok(());
        }
        let guard = self
            .shared
            .order_locks
            .lock(number, self.shared.lock_timeout)
            .await
            .ok_or_else(|| LedgerStoreError::LockTimeout(format!("order {number}")))?;
        self.order_guards.insert(number.clone(), guard);
        Ok(())
    }

    /// Locks an existing account and returns the transaction's copy of it for modification.
    async fn account_for_write(&mut self, login: &str) -> Result<Account, LedgerStoreError> {
        if self.account(login).is_none() {
            return Err(LedgerStoreError::AccountNotFound(login.to_string()));
        }
        self.lock_account(login).await?;
        self.account(login).ok_or_else(|| LedgerStoreError::AccountNotFound(login.to_string()))
    }

    async fn order_for_write(&mut self, number: &OrderNumber) -> Result<Order, LedgerStoreError> {
        if self.order(number).is_none() {
            return Err(LedgerStoreError::OrderNotFound(number.clone()));
        }
        self.lock_order(number).await?;
        self.order(number).ok_or_else(|| LedgerStoreError::OrderNotFound(number.clone()))
    }
}

impl LedgerTransaction for MemoryTransaction {
    async fn claim_next_pending_order(&mut self) -> Result<Option<OrderRef>, LedgerStoreError> {
        let candidates = {
            let state = self.shared.state();
            let mut pending = state.orders.values().filter(|o| o.status.is_pending()).collect::<Vec<_>>();
            // `None` sorts before `Some`, so orders that were never polled come first.
            pending.sort_by(|a, b| {
                (a.polled_at, a.uploaded_at, &a.number).cmp(&(b.polled_at, b.uploaded_at, &b.number))
            });
            pending.into_iter().map(|o| o.number.clone()).collect::<Vec<_>>()
        };
        for number in candidates {
            let newly_locked = !self.order_guards.contains_key(&number);
            if newly_locked {
                let Some(guard) = self.shared.order_locks.try_lock(&number) else {
                    trace!("🗃️ Order {number} is locked by another transaction. Skipping it.");
                    continue;
                };
                self.order_guards.insert(number.clone(), guard);
            }
            // The row may have been resolved and committed between the scan and the lock.
            match self.order(&number) {
                Some(order) if order.status.is_pending() => {
                    return Ok(Some(OrderRef { number: order.number, login: order.login }));
                },
                _ if newly_locked => {
                    self.order_guards.remove(&number);
                },
                _ => {},
            }
        }
        Ok(None)
    }

    async fn update_order_status(
        &mut self,
        number: &OrderNumber,
        status: OrderStatusType,
        accrual: Money,
        processed_at: Option<DateTime<Utc>>,
    ) -> Result<(), LedgerStoreError> {
        if accrual.is_negative() {
            return Err(LedgerStoreError::NegativeAmount(accrual));
        }
        let mut order = self.order_for_write(number).await?;
        if order.withdrawn > accrual {
            return Err(LedgerStoreError::DatabaseError(format!(
                "Order {number} would have more credit withdrawn than accrued"
            )));
        }
        order.status = status;
        order.accrual = accrual;
        order.processed_at = processed_at;
        self.orders.insert(number.clone(), order);
        trace!("🗃️ Order {number} is now {status} with accrual {accrual}");
        Ok(())
    }

    async fn record_poll(
        &mut self,
        number: &OrderNumber,
        status: Option<OrderStatusType>,
        polled_at: DateTime<Utc>,
    ) -> Result<(), LedgerStoreError> {
        let mut order = self.order_for_write(number).await?;
        if let Some(status) = status {
            order.status = status;
        }
        order.polled_at = Some(polled_at);
        self.orders.insert(number.clone(), order);
        Ok(())
    }

    async fn credit_account(&mut self, login: &str, amount: Money) -> Result<(), LedgerStoreError> {
        if amount.is_negative() {
            return Err(LedgerStoreError::NegativeAmount(amount));
        }
        let mut account = self.account_for_write(login).await?;
        account.balance = account
            .balance
            .checked_add(amount)
            .ok_or_else(|| LedgerStoreError::DatabaseError(format!("Balance overflow for '{login}'")))?;
        self.accounts.insert(login.to_string(), account);
        trace!("🗃️ Credited {amount} to '{login}'");
        Ok(())
    }

    async fn get_account_for_update(&mut self, login: &str) -> Result<Option<Account>, LedgerStoreError> {
        if self.account(login).is_none() {
            return Ok(None);
        }
        self.lock_account(login).await?;
        Ok(self.account(login))
    }

    async fn get_order_for_update(&mut self, number: &OrderNumber) -> Result<Option<Order>, LedgerStoreError> {
        if self.order(number).is_none() {
            return Ok(None);
        }
        self.lock_order(number).await?;
        Ok(self.order(number))
    }

    async fn debit_account(&mut self, login: &str, amount: Money) -> Result<(), LedgerStoreError> {
        if amount.is_negative() {
            return Err(LedgerStoreError::NegativeAmount(amount));
        }
        let mut account = self.account_for_write(login).await?;
        if account.balance < amount {
            return Err(LedgerStoreError::DatabaseError(format!(
                "Debiting {amount} would make the balance of '{login}' negative"
            )));
        }
        account.balance -= amount;
        account.withdrawn += amount;
        self.accounts.insert(login.to_string(), account);
        trace!("🗃️ Debited {amount} from '{login}'");
        Ok(())
    }

    async fn debit_order_credit(&mut self, number: &OrderNumber, amount: Money) -> Result<(), LedgerStoreError> {
        if amount.is_negative() {
            return Err(LedgerStoreError::NegativeAmount(amount));
        }
        let mut order = self.order_for_write(number).await?;
        if order.withdrawn + amount > order.accrual {
            return Err(LedgerStoreError::DatabaseError(format!(
                "Withdrawing {amount} would exceed the accrual of order {number}"
            )));
        }
        order.withdrawn += amount;
        order.withdrawn_at = Some(Utc::now());
        self.orders.insert(number.clone(), order);
        trace!("🗃️ {amount} withdrawn against order {number}");
        Ok(())
    }

    async fn commit(mut self) -> Result<(), LedgerStoreError> {
        let accounts = std::mem::take(&mut self.accounts);
        let orders = std::mem::take(&mut self.orders);
        {
            let mut state = self.shared.state();
            state.accounts.extend(accounts);
            state.orders.extend(orders);
        }
        // Row locks are released only once the writes are visible.
        drop(self);
        Ok(())
    }

    async fn rollback(self) -> Result<(), LedgerStoreError> {
        trace!(
            "🗃️ Rolling back transaction with {} account and {} order changes",
            self.accounts.len(),
            self.orders.len()
        );
        Ok(())
    }
}
