//! # Gophermart engine public API
//!
//! Each API wraps a [`LedgerStore`](crate::LedgerStore) backend and exposes one slice of the ledger's behaviour:
//!
//! * [`accounts_api`] registers accounts and produces balance, order and withdrawal reports.
//! * [`order_ingestion_api`] validates and records newly uploaded order numbers.
//! * [`withdrawal_api`] debits a balance against an order's credit.
//! * [`reconciliation_api`] resolves pending orders against the accrual system and credits rewards.
//!
//! ```rust,ignore
//! use gophermart_engine::{MemoryDatabase, WithdrawalApi};
//! let db = MemoryDatabase::new();
//! let api = WithdrawalApi::new(db);
//! api.withdraw("alice", &"12345674".into(), Money::from(200)).await?;
//! ```

pub mod accounts_api;
pub mod errors;
pub mod ledger_objects;
pub mod order_ingestion_api;
pub mod reconciliation_api;
pub mod shutdown;
pub mod withdrawal_api;
