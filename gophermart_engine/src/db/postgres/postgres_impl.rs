use std::fmt::Debug;

use chrono::{DateTime, Utc};
use gm_common::Money;
use log::*;
use sqlx::{PgPool, Postgres, Transaction};

use super::{accounts, db_url, new_pool, orders};
use crate::{
    db::traits::{LedgerStore, LedgerStoreError, LedgerTransaction},
    db_types::{Account, Order, OrderNumber, OrderRef, OrderStatusType},
};

/// The production ledger store, backed by a Postgres connection pool.
#[derive(Clone)]
pub struct PostgresDatabase {
    url: String,
    pool: PgPool,
}

impl Debug for PostgresDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "PostgresDatabase ({:?})", self.pool)
    }
}

impl PostgresDatabase {
    /// Connects to the database named in `GM_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, LedgerStoreError> {
        let url = db_url();
        Self::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, LedgerStoreError> {
        trace!("🗃️ Creating new database connection pool");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<(), LedgerStoreError> {
        super::run_migrations(&self.pool).await
    }

    pub async fn close(&self) {
        self.pool.close().await;
        debug!("🗃️ Database connection pool closed");
    }
}

impl LedgerStore for PostgresDatabase {
    type Tx = PostgresTransaction;

    async fn get_account(&self, login: &str) -> Result<Option<Account>, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        accounts::fetch_account(login, false, &mut conn).await
    }

    async fn store_account(&self, login: &str, credential_hash: &str) -> Result<Account, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        accounts::insert_account(login, credential_hash, &mut conn).await
    }

    async fn get_order(&self, number: &OrderNumber) -> Result<Option<Order>, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order(number, false, &mut conn).await
    }

    async fn store_order(&self, number: &OrderNumber, login: &str) -> Result<Order, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::insert_order(number, login, &mut conn).await
    }

    async fn list_orders(&self, login: &str, only_with_credit: bool) -> Result<Vec<Order>, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_orders_for_login(login, only_with_credit, &mut conn).await
    }

    async fn count_pending_orders(&self) -> Result<i64, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::count_pending(&mut conn).await
    }

    async fn begin_transaction(&self) -> Result<PostgresTransaction, LedgerStoreError> {
        let tx = self.pool.begin().await?;
        Ok(PostgresTransaction { tx })
    }
}

/// A Postgres transaction. sqlx rolls the transaction back if it is dropped before [`LedgerTransaction::commit`] is
/// called.
pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

impl LedgerTransaction for PostgresTransaction {
    async fn claim_next_pending_order(&mut self) -> Result<Option<OrderRef>, LedgerStoreError> {
        orders::claim_next_pending(&mut self.tx).await
    }

    async fn update_order_status(
        &mut self,
        number: &OrderNumber,
        status: OrderStatusType,
        accrual: Money,
        processed_at: Option<DateTime<Utc>>,
    ) -> Result<(), LedgerStoreError> {
        orders::update_status(number, status, accrual, processed_at, &mut self.tx).await
    }

    async fn record_poll(
        &mut self,
        number: &OrderNumber,
        status: Option<OrderStatusType>,
        polled_at: DateTime<Utc>,
    ) -> Result<(), LedgerStoreError> {
        orders::record_poll(number, status, polled_at, &mut self.tx).await
    }

    async fn credit_account(&mut self, login: &str, amount: Money) -> Result<(), LedgerStoreError> {
        accounts::credit(login, amount, &mut self.tx).await
    }

    async fn get_account_for_update(&mut self, login: &str) -> Result<Option<Account>, LedgerStoreError> {
        accounts::fetch_account(login, true, &mut self.tx).await
    }

    async fn get_order_for_update(&mut self, number: &OrderNumber) -> Result<Option<Order>, LedgerStoreError> {
        orders::fetch_order(number, true, &mut self.tx).await
    }

    async fn debit_account(&mut self, login: &str, amount: Money) -> Result<(), LedgerStoreError> {
        accounts::debit(login, amount, &mut self.tx).await
    }

    async fn debit_order_credit(&mut self, number: &OrderNumber, amount: Money) -> Result<(), LedgerStoreError> {
        orders::debit_credit(number, amount, &mut self.tx).await
    }

    async fn commit(self) -> Result<(), LedgerStoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), LedgerStoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
