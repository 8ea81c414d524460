//! Client for the external accrual system, which decides whether an order earns a reward and how much.
//!
//! [`AccrualApi`] implements the engine's [`AccrualOracle`](gophermart_engine::AccrualOracle) contract over HTTP.
mod api;
mod config;
mod data_objects;
mod error;

pub use api::AccrualApi;
pub use config::AccrualConfig;
pub use data_objects::{AccrualResponse, AccrualStatus};
pub use error::AccrualApiError;
