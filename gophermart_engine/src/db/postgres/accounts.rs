use gm_common::Money;
use log::*;
use sqlx::PgConnection;

use crate::{db::traits::LedgerStoreError, db_types::Account};

const ACCOUNT_COLUMNS: &str = "login, password_hash, balance, withdrawn, created_at";

pub async fn insert_account(
    login: &str,
    credential_hash: &str,
    conn: &mut PgConnection,
) -> Result<Account, LedgerStoreError> {
    let result = sqlx::query_as::<_, Account>(&format!(
        "INSERT INTO accounts (login, password_hash) VALUES ($1, $2) RETURNING {ACCOUNT_COLUMNS}"
    ))
    .bind(login)
    .bind(credential_hash)
    .fetch_one(conn)
    .await;
    match result {
        Ok(account) => {
            debug!("🗃️ Account '{login}' created");
            Ok(account)
        },
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Err(LedgerStoreError::AccountAlreadyExists(login.to_string()))
        },
        Err(e) => Err(e.into()),
    }
}

/// Fetches an account. With `for_update`, the row stays locked until the enclosing transaction ends.
pub async fn fetch_account(
    login: &str,
    for_update: bool,
    conn: &mut PgConnection,
) -> Result<Option<Account>, LedgerStoreError> {
    let lock = if for_update { " FOR UPDATE" } else { "" };
    let account =
        sqlx::query_as::<_, Account>(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE login = $1{lock}"))
        .bind(login)
        .fetch_optional(conn)
        .await?;
    Ok(account)
}

pub async fn credit(login: &str, amount: Money, conn: &mut PgConnection) -> Result<(), LedgerStoreError> {
    if amount.is_negative() {
        return Err(LedgerStoreError::NegativeAmount(amount));
    }
    let result = sqlx::query("UPDATE accounts SET balance = balance + $1 WHERE login = $2")
        .bind(amount)
        .bind(login)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(LedgerStoreError::AccountNotFound(login.to_string()));
    }
    trace!("🗃️ Credited {amount} to '{login}'");
    Ok(())
}

/// Moves `amount` from the balance to the withdrawn total. The `balance >= 0` check constraint rejects overdrafts.
pub async fn debit(login: &str, amount: Money, conn: &mut PgConnection) -> Result<(), LedgerStoreError> {
    if amount.is_negative() {
        return Err(LedgerStoreError::NegativeAmount(amount));
    }
    let result = sqlx::query("UPDATE accounts SET balance = balance - $1, withdrawn = withdrawn + $1 WHERE login = $2")
        .bind(amount)
        .bind(login)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(LedgerStoreError::AccountNotFound(login.to_string()));
    }
    trace!("🗃️ Debited {amount} from '{login}'");
    Ok(())
}
