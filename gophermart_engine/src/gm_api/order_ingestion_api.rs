use std::fmt::Debug;

use log::*;

use crate::{
    db::traits::{LedgerStore, LedgerStoreError},
    db_types::{Order, OrderNumber},
    gm_api::{errors::IngestionError, ledger_objects::SubmitOrderResult},
    helpers::luhn,
};

/// Accepts order numbers uploaded by customers and records them for reconciliation.
pub struct OrderIngestionApi<B> {
    db: B,
}

impl<B: Debug> Debug for OrderIngestionApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderIngestionApi ({:?})", self.db)
    }
}

impl<B> OrderIngestionApi<B>
where B: LedgerStore
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Validates `raw_number` and stores it as a `NEW` order for `login`.
    ///
    /// Uploading a number the same account already uploaded is not an error: the existing order is returned as
    /// [`SubmitOrderResult::AlreadyUploaded`]. A number that belongs to another account is rejected.
    pub async fn submit_order(&self, login: &str, raw_number: &str) -> Result<SubmitOrderResult, IngestionError> {
        let number = raw_number.trim();
        if number.is_empty() {
            return Err(IngestionError::EmptyNumber);
        }
        if !luhn::is_valid(number) {
            debug!("📥️ '{login}' uploaded an invalid order number: {number}");
            return Err(IngestionError::InvalidNumber(number.to_string()));
        }
        let number = OrderNumber::from(number);
        if let Some(existing) = self.db.get_order(&number).await? {
            return classify_existing(existing, login);
        }
        match self.db.store_order(&number, login).await {
            Ok(order) => {
                info!("📥️ Order {number} accepted for '{login}'");
                Ok(SubmitOrderResult::Accepted(order))
            },
            // Someone stored the same number between our read and our insert.
            Err(LedgerStoreError::OrderAlreadyExists(_)) => {
                let existing =
                    self.db.get_order(&number).await?.ok_or_else(|| LedgerStoreError::OrderNotFound(number.clone()))?;
                classify_existing(existing, login)
            },
            Err(e) => Err(e.into()),
        }
    }
}

fn classify_existing(existing: Order, login: &str) -> Result<SubmitOrderResult, IngestionError> {
    if existing.login == login {
        debug!("📥️ Order {} was already uploaded by '{login}'", existing.number);
        Ok(SubmitOrderResult::AlreadyUploaded(existing))
    } else {
        warn!("📥️ '{login}' tried to upload order {}, which belongs to another account", existing.number);
        Err(IngestionError::OwnedByAnotherAccount(existing.number))
    }
}
