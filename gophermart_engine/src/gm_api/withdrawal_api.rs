use std::fmt::Debug;

use gm_common::Money;
use log::*;

use crate::{
    db::traits::{LedgerStore, LedgerTransaction},
    db_types::{Account, OrderNumber},
    gm_api::errors::WithdrawalError,
};

/// Withdraws balance against the credit of a specific order.
///
/// A withdrawal is never retried automatically. If it fails for any reason the ledger is unchanged, and it is up to
/// the caller to resubmit.
pub struct WithdrawalApi<B> {
    db: B,
}

impl<B: Debug> Debug for WithdrawalApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WithdrawalApi ({:?})", self.db)
    }
}

impl<B> WithdrawalApi<B>
where B: LedgerStore
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Debits `amount` from the balance of `login` and records it against `number`, in a single transaction.
    ///
    /// The account row is locked before the balance is checked, so concurrent withdrawals from the same account are
    /// serialized and can never both pass the check against the same balance. The account is locked before the order.
    ///
    /// Returns the account as it stands after the withdrawal.
    pub async fn withdraw(
        &self,
        login: &str,
        number: &OrderNumber,
        amount: Money,
    ) -> Result<Account, WithdrawalError> {
        if !amount.is_positive() {
            return Err(WithdrawalError::InvalidAmount(amount));
        }
        let mut tx = self.db.begin_transaction().await?;
        let account = tx
            .get_account_for_update(login)
            .await?
            .ok_or_else(|| WithdrawalError::Unauthorized(login.to_string()))?;
        if account.balance < amount {
            debug!("💸️ '{login}' cannot withdraw {amount}. Balance is {}", account.balance);
            return Err(WithdrawalError::InsufficientFunds { balance: account.balance, requested: amount });
        }
        let order =
            tx.get_order_for_update(number).await?.ok_or_else(|| WithdrawalError::OrderNotFound(number.clone()))?;
        if order.login != login {
            warn!("💸️ '{login}' tried to withdraw against order {number}, which belongs to another account");
            return Err(WithdrawalError::OrderNotOwned(number.clone()));
        }
        let available = order.available_credit();
        if available < amount {
            return Err(WithdrawalError::InsufficientOrderCredit {
                number: number.clone(),
                available,
                requested: amount,
            });
        }
        tx.debit_account(login, amount).await?;
        tx.debit_order_credit(number, amount).await?;
        tx.commit().await?;
        info!("💸️ '{login}' withdrew {amount} against order {number}");
        let mut account = account;
        account.balance -= amount;
        account.withdrawn += amount;
        Ok(account)
    }
}
