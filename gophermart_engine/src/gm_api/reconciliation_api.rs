use std::fmt::Debug;

use chrono::Utc;
use gm_common::Money;
use log::*;

use crate::{
    accrual_oracle::{AccrualOracle, AccrualVerdict},
    db::traits::{LedgerStore, LedgerStoreError, LedgerTransaction},
    db_types::{OrderNumber, OrderRef, OrderStatusType},
    gm_api::{errors::ReconciliationError, ledger_objects::TickOutcome},
};

/// Drives pending orders to a terminal state by asking the accrual system about them, and credits rewards.
///
/// Each call to [`run_tick`](ReconciliationApi::run_tick) handles at most one order, inside one transaction. Any
/// failure rolls the tick back, leaving the order pending and uncredited, so a tick can always be retried. The failed
/// order is then stamped as polled, so that it does not hold up the orders queued behind it.
pub struct ReconciliationApi<B, O> {
    db: B,
    oracle: O,
}

impl<B: Debug, O> Debug for ReconciliationApi<B, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi ({:?})", self.db)
    }
}

impl<B, O> ReconciliationApi<B, O>
where
    B: LedgerStore,
    O: AccrualOracle,
{
    pub fn new(db: B, oracle: O) -> Self {
        Self { db, oracle }
    }

    pub async fn run_tick(&self) -> Result<TickOutcome, ReconciliationError> {
        if self.db.count_pending_orders().await? == 0 {
            trace!("🔄️ No pending orders");
            return Ok(TickOutcome::Idle);
        }
        let mut tx = self.db.begin_transaction().await?;
        let Some(claimed) = tx.claim_next_pending_order().await? else {
            trace!("🔄️ All pending orders are claimed by other workers");
            tx.rollback().await?;
            return Ok(TickOutcome::NothingClaimed);
        };
        let result = match self.resolve(&mut tx, &claimed).await {
            Ok(outcome) => tx.commit().await.map(|_| outcome).map_err(ReconciliationError::from),
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("🔄️ Could not roll back the tick for order {}. {rollback_err}", claimed.number);
                }
                Err(e)
            },
        };
        match result {
            Ok(outcome) => {
                match &outcome {
                    TickOutcome::Invalidated(number) => info!("🔄️ Order {number} is invalid. No reward is due."),
                    TickOutcome::Processed { number, login, accrual } => {
                        info!("🔄️ Order {number} processed. {accrual} credited to '{login}'")
                    },
                    _ => {},
                }
                Ok(outcome)
            },
            Err(e) => {
                self.defer(&claimed.number).await;
                Err(e)
            },
        }
    }

    /// Asks the accrual system about a claimed order and writes the verdict into `tx`. Nothing is committed here.
    async fn resolve(&self, tx: &mut B::Tx, claimed: &OrderRef) -> Result<TickOutcome, ReconciliationError> {
        let number = &claimed.number;
        trace!("🔄️ Claimed order {number}. Asking the accrual system about it.");
        let verdict = self.oracle.query(number).await?;
        let now = Utc::now();
        let outcome = match verdict {
            AccrualVerdict::Unregistered | AccrualVerdict::Registered | AccrualVerdict::Processing => {
                debug!("🔄️ Order {number} is still pending at the accrual system ({verdict:?})");
                tx.record_poll(number, verdict.status(), now).await?;
                TickOutcome::StillPending(number.clone())
            },
            AccrualVerdict::Invalid => {
                tx.update_order_status(number, OrderStatusType::Invalid, Money::ZERO, Some(now)).await?;
                TickOutcome::Invalidated(number.clone())
            },
            AccrualVerdict::Processed(accrual) => {
                tx.update_order_status(number, OrderStatusType::Processed, accrual, Some(now)).await?;
                tx.credit_account(&claimed.login, accrual).await?;
                TickOutcome::Processed { number: number.clone(), login: claimed.login.clone(), accrual }
            },
        };
        Ok(outcome)
    }

    /// Stamps `polled_at` on an order whose tick failed, in a transaction of its own, so that it moves to the back
    /// of the claim order. Status, accrual and balances are left alone.
    async fn defer(&self, number: &OrderNumber) {
        let result: Result<(), LedgerStoreError> = async {
            let mut tx = self.db.begin_transaction().await?;
            tx.record_poll(number, None, Utc::now()).await?;
            tx.commit().await
        }
        .await;
        match result {
            Ok(()) => debug!("🔄️ Order {number} moved to the back of the queue after a failed tick"),
            Err(e) => warn!("🔄️ Could not defer order {number} after a failed tick. {e}"),
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }
}
