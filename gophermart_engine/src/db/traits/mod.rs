//! # Ledger store contracts
//!
//! The engine never talks to a database directly. Everything it needs from storage is expressed by two traits, which
//! each backend (Postgres, in-memory) implements:
//!
//! * [`LedgerStore`] provides the non-transactional reads and inserts (accounts, order ingestion, listings) and opens
//!   transactions.
//! * [`LedgerTransaction`] is a scoped transaction. All balance and order mutations happen through it. Row locks taken
//!   by a transaction are held until it is committed, rolled back or dropped. Dropping a transaction without calling
//!   [`LedgerTransaction::commit`] discards every write made through it.
//!
//! Both backends must uphold the same invariants: balances never go negative, an order's withdrawn credit never
//! exceeds its accrual, and a claimed order is invisible to concurrent claims until the claiming transaction ends.
mod errors;
mod ledger_store;
mod ledger_transaction;

pub use errors::LedgerStoreError;
pub use ledger_store::LedgerStore;
pub use ledger_transaction::LedgerTransaction;
