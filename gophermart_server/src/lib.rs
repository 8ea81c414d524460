//! # Gophermart reconciliation daemon
//! This crate hosts the long-running process that keeps the loyalty ledger in step with the accrual system. It is
//! responsible for:
//! * Connecting to the ledger database and applying schema migrations.
//! * Running one or more reconciliation workers, each of which resolves at most one pending order per tick and
//!   credits the owning account when a reward is calculated.
//! * Shutting the workers down cleanly on Ctrl-C, without interrupting a tick that is in progress.
//!
//! ## Configuration
//! The daemon is configured via environment variables. See [config](config/index.html) for more information.
pub mod cli;
pub mod config;
pub mod errors;
pub mod reconciliation_worker;
pub mod server;
