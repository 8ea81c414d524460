use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use gm_common::Money;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------     OrderNumber       ---------------------------------------------------------
/// The number a customer quotes when uploading an order. Numbers are kept as digit strings (they can be longer than
/// any integer type), and are validated with the Luhn checksum before they reach the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    pub fn new<S: Into<String>>(number: S) -> Self {
        Self(number.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderNumber {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatusType {
    /// The order has been uploaded, but the accrual system has not been asked about it yet.
    New,
    /// The accrual system knows about the order, but has not started calculating the reward.
    Registered,
    /// The accrual system is calculating the reward.
    Processing,
    /// The accrual system refused the order. No reward will be paid. Terminal.
    Invalid,
    /// The reward has been calculated and credited to the owner's balance. Terminal.
    Processed,
}

impl OrderStatusType {
    pub const PENDING: [OrderStatusType; 3] = [Self::New, Self::Registered, Self::Processing];

    pub fn is_pending(&self) -> bool {
        !self.is_terminal()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Invalid | Self::Processed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Registered => "REGISTERED",
            Self::Processing => "PROCESSING",
            Self::Invalid => "INVALID",
            Self::Processed => "PROCESSED",
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "REGISTERED" => Ok(Self::Registered),
            "PROCESSING" => Ok(Self::Processing),
            "INVALID" => Ok(Self::Invalid),
            "PROCESSED" => Ok(Self::Processed),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

impl TryFrom<String> for OrderStatusType {
    type Error = ConversionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

//--------------------------------------        Account        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Account {
    pub login: String,
    pub password_hash: String,
    /// Credited funds that can still be withdrawn. Never negative.
    pub balance: Money,
    /// Running total of everything ever withdrawn from this account.
    pub withdrawn: Money,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------         Order         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Order {
    pub number: OrderNumber,
    pub login: String,
    #[sqlx(try_from = "String")]
    pub status: OrderStatusType,
    pub accrual: Money,
    /// The part of `accrual` the owner has already withdrawn against this order.
    pub withdrawn: Money,
    pub uploaded_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub withdrawn_at: Option<DateTime<Utc>>,
    pub polled_at: Option<DateTime<Utc>>,
}

impl Order {
    /// A freshly uploaded order, as it is stored by order ingestion.
    pub fn new(number: OrderNumber, login: String, uploaded_at: DateTime<Utc>) -> Self {
        Self {
            number,
            login,
            status: OrderStatusType::New,
            accrual: Money::ZERO,
            withdrawn: Money::ZERO,
            uploaded_at,
            processed_at: None,
            withdrawn_at: None,
            polled_at: None,
        }
    }

    /// The part of the accrual that has not been withdrawn yet.
    pub fn available_credit(&self) -> Money {
        self.accrual - self.withdrawn
    }
}

//--------------------------------------        OrderRef        --------------------------------------------------------
/// The result of claiming a pending order: enough to query the accrual system and credit the owner.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct OrderRef {
    pub number: OrderNumber,
    pub login: String,
}
