use gm_common::Money;
use thiserror::Error;

use crate::{accrual_oracle::OracleError, db::traits::LedgerStoreError, db_types::OrderNumber};

#[derive(Debug, Clone, Error)]
pub enum AccountApiError {
    #[error("An account with login '{0}' already exists")]
    AlreadyExists(String),
    #[error("Account not found: {0}")]
    NotFound(String),
    #[error("Storage error: {0}")]
    Storage(LedgerStoreError),
}

impl From<LedgerStoreError> for AccountApiError {
    fn from(e: LedgerStoreError) -> Self {
        match e {
            LedgerStoreError::AccountAlreadyExists(login) => Self::AlreadyExists(login),
            LedgerStoreError::AccountNotFound(login) => Self::NotFound(login),
            e => Self::Storage(e),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum IngestionError {
    #[error("No order number was given")]
    EmptyNumber,
    #[error("'{0}' is not a valid order number")]
    InvalidNumber(String),
    #[error("Order {0} was uploaded by another account")]
    OwnedByAnotherAccount(OrderNumber),
    #[error("Storage error: {0}")]
    Storage(#[from] LedgerStoreError),
}

#[derive(Debug, Clone, Error)]
pub enum WithdrawalError {
    #[error("Withdrawal amounts must be positive. Got {0}")]
    InvalidAmount(Money),
    #[error("Account {0} does not exist")]
    Unauthorized(String),
    #[error("Insufficient funds. Balance is {balance}, but {requested} was requested")]
    InsufficientFunds { balance: Money, requested: Money },
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderNumber),
    #[error("Order {0} belongs to another account")]
    OrderNotOwned(OrderNumber),
    #[error("Order {number} has {available} of credit left, but {requested} was requested")]
    InsufficientOrderCredit { number: OrderNumber, available: Money, requested: Money },
    #[error("Storage error: {0}")]
    Storage(#[from] LedgerStoreError),
}

#[derive(Debug, Clone, Error)]
pub enum ReconciliationError {
    #[error("Accrual system error: {0}")]
    Oracle(#[from] OracleError),
    #[error("Storage error: {0}")]
    Storage(#[from] LedgerStoreError),
}
