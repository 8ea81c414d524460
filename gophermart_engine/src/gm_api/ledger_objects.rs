//! Report types produced for the API layer, plus the result types of the engine's operations.
use chrono::{DateTime, Utc};
use gm_common::Money;
use serde::{Deserialize, Serialize};

use crate::db_types::{Account, Order, OrderNumber, OrderStatusType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub current: Money,
    pub withdrawn: Money,
}

impl From<&Account> for BalanceSnapshot {
    fn from(account: &Account) -> Self {
        Self { current: account.balance, withdrawn: account.withdrawn }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEntry {
    pub number: OrderNumber,
    pub status: OrderStatusType,
    pub accrual: Money,
    pub uploaded_at: DateTime<Utc>,
}

impl From<Order> for OrderEntry {
    fn from(order: Order) -> Self {
        Self { number: order.number, status: order.status, accrual: order.accrual, uploaded_at: order.uploaded_at }
    }
}

/// One line of a withdrawal history: the total withdrawn against an order, and when the last withdrawal happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalEntry {
    pub order: OrderNumber,
    pub sum: Money,
    pub processed_at: Option<DateTime<Utc>>,
}

impl From<Order> for WithdrawalEntry {
    fn from(order: Order) -> Self {
        Self { order: order.number, sum: order.withdrawn, processed_at: order.withdrawn_at }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOrderResult {
    /// The order is new and has been recorded.
    Accepted(Order),
    /// The same account uploaded this order before.
    AlreadyUploaded(Order),
}

impl SubmitOrderResult {
    pub fn order(&self) -> &Order {
        match self {
            Self::Accepted(o) | Self::AlreadyUploaded(o) => o,
        }
    }
}

/// What a single reconciliation tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// There were no pending orders, so no transaction was opened.
    Idle,
    /// Pending orders exist, but all of them are claimed by other workers.
    NothingClaimed,
    StillPending(OrderNumber),
    Invalidated(OrderNumber),
    Processed { number: OrderNumber, login: String, accrual: Money },
}
