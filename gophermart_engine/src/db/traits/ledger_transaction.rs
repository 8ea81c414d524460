use std::future::Future;

use chrono::{DateTime, Utc};
use gm_common::Money;

use crate::{
    db::traits::LedgerStoreError,
    db_types::{Account, Order, OrderNumber, OrderRef, OrderStatusType},
};

/// A scoped ledger transaction.
///
/// Writes are only visible to other transactions after [`commit`](LedgerTransaction::commit). Row locks are held until
/// the transaction ends. A transaction that is dropped without being committed is rolled back, so every early return
/// (`?`) in calling code leaves the stored state exactly as it was.
pub trait LedgerTransaction: Send + Sized {
    /// Claims one pending order (`NEW`, `REGISTERED` or `PROCESSING`) with a row lock.
    ///
    /// Orders that are already locked by another transaction are skipped, not waited for. The order that was polled
    /// least recently is preferred (orders that were never polled come first), then the oldest upload.
    /// Returns `None` if there is nothing to claim.
    fn claim_next_pending_order(&mut self) -> impl Future<Output = Result<Option<OrderRef>, LedgerStoreError>> + Send;

    /// Sets the status, accrual and processing timestamp of an order.
    fn update_order_status(
        &mut self,
        number: &OrderNumber,
        status: OrderStatusType,
        accrual: Money,
        processed_at: Option<DateTime<Utc>>,
    ) -> impl Future<Output = Result<(), LedgerStoreError>> + Send;

    /// Records that the accrual system was asked about an order and had no final answer yet. If it reported an
    /// intermediate status, that status is stored too.
    fn record_poll(
        &mut self,
        number: &OrderNumber,
        status: Option<OrderStatusType>,
        polled_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), LedgerStoreError>> + Send;

    /// Adds `amount` to the account's balance. `amount` must not be negative.
    fn credit_account(
        &mut self,
        login: &str,
        amount: Money,
    ) -> impl Future<Output = Result<(), LedgerStoreError>> + Send;

    /// Reads an account, holding a write lock on its row until the transaction ends.
    fn get_account_for_update(
        &mut self,
        login: &str,
    ) -> impl Future<Output = Result<Option<Account>, LedgerStoreError>> + Send;

    /// Reads an order, holding a write lock on its row until the transaction ends.
    fn get_order_for_update(
        &mut self,
        number: &OrderNumber,
    ) -> impl Future<Output = Result<Option<Order>, LedgerStoreError>> + Send;

    /// Subtracts `amount` from the balance and adds it to the account's withdrawn total. The caller must have checked
    /// that the balance covers it; the store rejects a debit that would make the balance negative.
    fn debit_account(
        &mut self,
        login: &str,
        amount: Money,
    ) -> impl Future<Output = Result<(), LedgerStoreError>> + Send;

    /// Adds `amount` to the order's withdrawn credit and stamps the withdrawal time.
    fn debit_order_credit(
        &mut self,
        number: &OrderNumber,
        amount: Money,
    ) -> impl Future<Output = Result<(), LedgerStoreError>> + Send;

    fn commit(self) -> impl Future<Output = Result<(), LedgerStoreError>> + Send;

    fn rollback(self) -> impl Future<Output = Result<(), LedgerStoreError>> + Send;
}
