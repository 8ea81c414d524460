//! The contract the engine needs from the external accrual system.
use std::{future::Future, time::Duration};

use gm_common::Money;
use thiserror::Error;

use crate::db_types::{OrderNumber, OrderStatusType};

/// What the accrual system currently knows about an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccrualVerdict {
    /// The accrual system has not heard of the order yet.
    Unregistered,
    Registered,
    Processing,
    /// The order does not qualify for a reward.
    Invalid,
    /// The reward has been calculated.
    Processed(Money),
}

impl AccrualVerdict {
    /// True if the order is not resolved yet, and has to be asked about again later.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Unregistered | Self::Registered | Self::Processing)
    }

    /// The order status that the verdict maps to, if the accrual system named one.
    pub fn status(&self) -> Option<OrderStatusType> {
        match self {
            Self::Unregistered => None,
            Self::Registered => Some(OrderStatusType::Registered),
            Self::Processing => Some(OrderStatusType::Processing),
            Self::Invalid => Some(OrderStatusType::Invalid),
            Self::Processed(_) => Some(OrderStatusType::Processed),
        }
    }
}

/// Failures talking to the accrual system. None of these are ledger faults: the order stays pending and is retried
/// on a later reconciliation tick.
#[derive(Debug, Clone, Error)]
pub enum OracleError {
    #[error("The accrual system is unavailable: {0}")]
    Transient(String),
    #[error("The accrual system is rate limiting requests. Retry after {}s", .retry_after.as_secs())]
    RateLimited { retry_after: Duration },
    #[error("Unexpected response from the accrual system: {0}")]
    Protocol(String),
}

pub trait AccrualOracle: Clone + Send + Sync + 'static {
    /// Asks the accrual system for the current state of an order.
    fn query(&self, number: &OrderNumber) -> impl Future<Output = Result<AccrualVerdict, OracleError>> + Send;
}
