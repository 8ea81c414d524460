use std::time::Duration;

use gophermart_engine::OracleError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AccrualApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Could not reach the accrual system: {0}")]
    Network(String),
    #[error("The accrual system failed. Error {status}. {message}")]
    ServerError { status: u16, message: String },
    #[error("Too many requests. Retry after {}s", .retry_after.as_secs())]
    RateLimited { retry_after: Duration },
    #[error("Unexpected response. Error {status}. {message}")]
    UnexpectedStatus { status: u16, message: String },
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Asked about order {requested}, but the response is for order {received}")]
    OrderMismatch { requested: String, received: String },
    #[error("Invalid accrual amount: {0}")]
    InvalidAccrual(String),
}

impl From<AccrualApiError> for OracleError {
    fn from(e: AccrualApiError) -> Self {
        match e {
            AccrualApiError::Network(_) | AccrualApiError::ServerError { .. } => Self::Transient(e.to_string()),
            AccrualApiError::RateLimited { retry_after } => Self::RateLimited { retry_after },
            e => Self::Protocol(e.to_string()),
        }
    }
}
