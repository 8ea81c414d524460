//! Account registration and the per-account reports (balance, orders, withdrawals).

use std::fmt::Debug;

use log::*;

use crate::{
    db::traits::LedgerStore,
    db_types::Account,
    gm_api::{
        errors::AccountApiError,
        ledger_objects::{BalanceSnapshot, OrderEntry, WithdrawalEntry},
    },
};

pub struct AccountApi<B> {
    db: B,
}

impl<B: Debug> Debug for AccountApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountApi ({:?})", self.db)
    }
}

impl<B> AccountApi<B>
where B: LedgerStore
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Creates an account with a zero balance. The credential hash is stored as given; hashing is the caller's job.
    pub async fn register(&self, login: &str, credential_hash: &str) -> Result<Account, AccountApiError> {
        let account = self.db.store_account(login, credential_hash).await?;
        info!("🗃️ New account registered for '{login}'");
        Ok(account)
    }

    pub async fn account(&self, login: &str) -> Result<Account, AccountApiError> {
        self.db.get_account(login).await?.ok_or_else(|| AccountApiError::NotFound(login.to_string()))
    }

    pub async fn balance(&self, login: &str) -> Result<BalanceSnapshot, AccountApiError> {
        let account = self.account(login).await?;
        Ok(BalanceSnapshot::from(&account))
    }

    /// All orders uploaded by the account, oldest first.
    pub async fn orders(&self, login: &str) -> Result<Vec<OrderEntry>, AccountApiError> {
        let orders = self.db.list_orders(login, false).await?;
        trace!("🗃️ '{login}' has {} orders", orders.len());
        Ok(orders.into_iter().map(OrderEntry::from).collect())
    }

    /// Orders that the account has withdrawn credit against, oldest upload first.
    pub async fn withdrawals(&self, login: &str) -> Result<Vec<WithdrawalEntry>, AccountApiError> {
        let orders = self.db.list_orders(login, true).await?;
        Ok(orders.into_iter().map(WithdrawalEntry::from).collect())
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
