//! Gophermart Engine
//!
//! The engine is the loyalty ledger of the Gophermart system. Customers upload the numbers of orders they placed; an
//! external accrual system decides whether each order earns a reward; rewards are credited to the customer's balance,
//! which the customer can later withdraw against specific orders.
//!
//! The library is divided into these sections:
//! 1. Storage ([`mod@db`]). The [`LedgerStore`] and [`LedgerTransaction`] traits define everything the engine needs
//!    from a backend. Postgres is the production backend; [`MemoryDatabase`] satisfies the same contract in memory,
//!    including row locking, and is used by tests.
//! 2. The accrual system contract ([`accrual_oracle`]). The HTTP client lives in its own crate.
//! 3. The public API ([`mod@gm_api`]): account reports, order ingestion, withdrawals and reconciliation.
//!
//! Balances and rewards are exact integer amounts of minor currency units ([`Money`]).
pub mod accrual_oracle;
pub mod db;
pub mod db_types;
pub mod gm_api;
pub mod helpers;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use accrual_oracle::{AccrualOracle, AccrualVerdict, OracleError};
pub use db::{
    memory::{MemoryDatabase, MemoryTransaction},
    traits::{LedgerStore, LedgerStoreError, LedgerTransaction},
};
#[cfg(feature = "postgres")]
pub use db::postgres::{PostgresDatabase, PostgresTransaction};
pub use gm_api::{
    accounts_api::AccountApi,
    errors::{AccountApiError, IngestionError, ReconciliationError, WithdrawalError},
    ledger_objects,
    order_ingestion_api::OrderIngestionApi,
    reconciliation_api::ReconciliationApi,
    shutdown::ShutdownSignal,
    withdrawal_api::WithdrawalApi,
};
pub use gm_common::Money;
