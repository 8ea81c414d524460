use gm_common::Money;
use gophermart_engine::AccrualVerdict;
use log::*;
use serde::{Deserialize, Serialize};

use crate::AccrualApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccrualStatus {
    Registered,
    Invalid,
    Processing,
    Processed,
}

/// The body of `GET /api/orders/{number}`. `accrual` is a decimal amount in major currency units, and is only present
/// for processed orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccrualResponse {
    pub order: String,
    pub status: AccrualStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accrual: Option<f64>,
}

impl AccrualResponse {
    /// Checks the response against the order that was asked about, and converts it into a verdict.
    pub fn into_verdict(self, requested: &str) -> Result<AccrualVerdict, AccrualApiError> {
        if self.order != requested {
            return Err(AccrualApiError::OrderMismatch { requested: requested.to_string(), received: self.order });
        }
        let verdict = match self.status {
            AccrualStatus::Registered => AccrualVerdict::Registered,
            AccrualStatus::Processing => AccrualVerdict::Processing,
            AccrualStatus::Invalid => AccrualVerdict::Invalid,
            AccrualStatus::Processed => {
                let accrual = match self.accrual {
                    Some(value) => {
                        Money::try_from_major_f64(value).map_err(|e| AccrualApiError::InvalidAccrual(e.to_string()))?
                    },
                    None => {
                        warn!("🔮️ Order {requested} is processed, but no accrual was given. Treating it as zero.");
                        Money::ZERO
                    },
                };
                AccrualVerdict::Processed(accrual)
            },
        };
        Ok(verdict)
    }
}
