use gm_common::Money;
use thiserror::Error;

use crate::db_types::OrderNumber;

#[derive(Debug, Clone, Error)]
pub enum LedgerStoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    #[error("Order not found: {0}")]
    OrderNotFound(OrderNumber),
    #[error("An account with login '{0}' already exists")]
    AccountAlreadyExists(String),
    #[error("Order {0} already exists")]
    OrderAlreadyExists(OrderNumber),
    #[error("Amounts credited or debited must not be negative. Got {0}")]
    NegativeAmount(Money),
    #[error("Could not acquire a row lock: {0}")]
    LockTimeout(String),
}

/// SQLSTATE codes that Postgres uses when it aborts a transaction to break a deadlock, or when a lock wait times out.
const DEADLOCK_DETECTED: &str = "40P01";
const LOCK_NOT_AVAILABLE: &str = "55P03";

impl From<sqlx::Error> for LedgerStoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if let Some(code) = db_err.code() {
                if code == DEADLOCK_DETECTED || code == LOCK_NOT_AVAILABLE {
                    return Self::LockTimeout(db_err.message().to_string());
                }
            }
        }
        Self::DatabaseError(e.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for LedgerStoreError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        Self::DatabaseError(format!("Migration failed: {e}"))
    }
}
