use std::future::Future;

use crate::{
    db::traits::{LedgerStoreError, LedgerTransaction},
    db_types::{Account, Order, OrderNumber},
};

/// The durable state of the loyalty ledger: accounts and the orders they have uploaded.
///
/// Implementations are cheap handles (a connection pool, or a shared in-memory state), so they are `Clone` and can be
/// moved into as many background tasks as needed.
pub trait LedgerStore: Clone + Send + Sync + 'static {
    type Tx: LedgerTransaction;

    /// Fetches the account for the given login, if it exists.
    fn get_account(&self, login: &str) -> impl Future<Output = Result<Option<Account>, LedgerStoreError>> + Send;

    /// Creates a new account with a zero balance.
    ///
    /// Returns [`LedgerStoreError::AccountAlreadyExists`] if the login is taken, including when a concurrent insert
    /// for the same login wins the race. An existing account is never overwritten.
    fn store_account(
        &self,
        login: &str,
        credential_hash: &str,
    ) -> impl Future<Output = Result<Account, LedgerStoreError>> + Send;

    /// Fetches an order by its number, if it exists.
    fn get_order(&self, number: &OrderNumber) -> impl Future<Output = Result<Option<Order>, LedgerStoreError>> + Send;

    /// Records a newly uploaded order in the `NEW` state with a zero accrual.
    ///
    /// Fails with [`LedgerStoreError::OrderAlreadyExists`] if the number is already known, and with
    /// [`LedgerStoreError::AccountNotFound`] if the login has no account.
    fn store_order(
        &self,
        number: &OrderNumber,
        login: &str,
    ) -> impl Future<Output = Result<Order, LedgerStoreError>> + Send;

    /// Lists the orders uploaded by `login`, oldest first. With `only_with_credit`, only orders that have had credit
    /// withdrawn against them are returned.
    fn list_orders(
        &self,
        login: &str,
        only_with_credit: bool,
    ) -> impl Future<Output = Result<Vec<Order>, LedgerStoreError>> + Send;

    /// The number of orders that are not yet in a terminal state.
    fn count_pending_orders(&self) -> impl Future<Output = Result<i64, LedgerStoreError>> + Send;

    /// Opens a new transaction.
    fn begin_transaction(&self) -> impl Future<Output = Result<Self::Tx, LedgerStoreError>> + Send;
}
