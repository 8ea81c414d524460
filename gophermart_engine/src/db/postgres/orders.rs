use chrono::{DateTime, Utc};
use gm_common::Money;
use log::*;
use sqlx::{PgConnection, Postgres, QueryBuilder};

use crate::{
    db::traits::LedgerStoreError,
    db_types::{Order, OrderNumber, OrderRef, OrderStatusType},
};

const ORDER_COLUMNS: &str =
    "number, login, status, accrual, withdrawn, uploaded_at, processed_at, withdrawn_at, polled_at";

const PENDING_STATUSES: &str = "('NEW', 'REGISTERED', 'PROCESSING')";

pub async fn insert_order(
    number: &OrderNumber,
    login: &str,
    conn: &mut PgConnection,
) -> Result<Order, LedgerStoreError> {
    let result = sqlx::query_as::<_, Order>(&format!(
        "INSERT INTO orders (number, login) VALUES ($1, $2) RETURNING {ORDER_COLUMNS}"
    ))
    .bind(number)
    .bind(login)
    .fetch_one(conn)
    .await;
    match result {
        Ok(order) => {
            debug!("🗃️ Order {number} saved for '{login}'");
            Ok(order)
        },
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Err(LedgerStoreError::OrderAlreadyExists(number.clone()))
        },
        Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
            Err(LedgerStoreError::AccountNotFound(login.to_string()))
        },
        Err(e) => Err(e.into()),
    }
}

/// Fetches an order. With `for_update`, the row stays locked until the enclosing transaction ends.
pub async fn fetch_order(
    number: &OrderNumber,
    for_update: bool,
    conn: &mut PgConnection,
) -> Result<Option<Order>, LedgerStoreError> {
    let lock = if for_update { " FOR UPDATE" } else { "" };
    let order = sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE number = $1{lock}"))
        .bind(number)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_orders_for_login(
    login: &str,
    only_with_credit: bool,
    conn: &mut PgConnection,
) -> Result<Vec<Order>, LedgerStoreError> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {ORDER_COLUMNS} FROM orders WHERE login = "));
    builder.push_bind(login);
    if only_with_credit {
        builder.push(" AND withdrawn > 0");
    }
    builder.push(" ORDER BY uploaded_at ASC, number ASC");
    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    Ok(orders)
}

pub async fn count_pending(conn: &mut PgConnection) -> Result<i64, LedgerStoreError> {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM orders WHERE status IN {PENDING_STATUSES}"))
        .fetch_one(conn)
        .await?;
    Ok(count)
}

/// Locks one pending order, skipping rows that other transactions have already locked.
pub async fn claim_next_pending(conn: &mut PgConnection) -> Result<Option<OrderRef>, LedgerStoreError> {
    let order = sqlx::query_as::<_, OrderRef>(&format!(
        "SELECT number, login FROM orders WHERE status IN {PENDING_STATUSES} ORDER BY polled_at ASC NULLS FIRST, \
         uploaded_at ASC LIMIT 1 FOR UPDATE SKIP LOCKED"
    ))
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

pub async fn update_status(
    number: &OrderNumber,
    status: OrderStatusType,
    accrual: Money,
    processed_at: Option<DateTime<Utc>>,
    conn: &mut PgConnection,
) -> Result<(), LedgerStoreError> {
    if accrual.is_negative() {
        return Err(LedgerStoreError::NegativeAmount(accrual));
    }
    let result = sqlx::query("UPDATE orders SET status = $1, accrual = $2, processed_at = $3 WHERE number = $4")
        .bind(status.as_str())
        .bind(accrual)
        .bind(processed_at)
        .bind(number)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(LedgerStoreError::OrderNotFound(number.clone()));
    }
    trace!("🗃️ Order {number} is now {status} with accrual {accrual}");
    Ok(())
}

pub async fn record_poll(
    number: &OrderNumber,
    status: Option<OrderStatusType>,
    polled_at: DateTime<Utc>,
    conn: &mut PgConnection,
) -> Result<(), LedgerStoreError> {
    let result = sqlx::query("UPDATE orders SET status = COALESCE($1, status), polled_at = $2 WHERE number = $3")
        .bind(status.map(|s| s.as_str()))
        .bind(polled_at)
        .bind(number)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(LedgerStoreError::OrderNotFound(number.clone()));
    }
    Ok(())
}

/// Adds `amount` to the order's withdrawn credit. The `order_credit_within_accrual` constraint rejects any debit that
/// would exceed the order's accrual.
pub async fn debit_credit(
    number: &OrderNumber,
    amount: Money,
    conn: &mut PgConnection,
) -> Result<(), LedgerStoreError> {
    if amount.is_negative() {
        return Err(LedgerStoreError::NegativeAmount(amount));
    }
    let result = sqlx::query("UPDATE orders SET withdrawn = withdrawn + $1, withdrawn_at = now() WHERE number = $2")
        .bind(amount)
        .bind(number)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(LedgerStoreError::OrderNotFound(number.clone()));
    }
    trace!("🗃️ {amount} withdrawn against order {number}");
    Ok(())
}
