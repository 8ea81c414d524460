use std::time::Duration;

use gophermart_engine::{
    ledger_objects::TickOutcome,
    AccrualOracle,
    LedgerStore,
    OracleError,
    ReconciliationApi,
    ReconciliationError,
    ShutdownSignal,
};
use log::*;
use tokio::{task::JoinHandle, time::MissedTickBehavior};

/// A background loop that runs one reconciliation tick per interval until it is told to shut down.
pub struct ReconciliationWorker<B, O> {
    id: usize,
    api: ReconciliationApi<B, O>,
    interval: Duration,
}

impl<B, O> ReconciliationWorker<B, O>
where
    B: LedgerStore,
    O: AccrualOracle,
{
    pub fn new(id: usize, db: B, oracle: O, interval: Duration) -> Self {
        Self { id, api: ReconciliationApi::new(db, oracle), interval }
    }

    /// Runs ticks until `shutdown` is triggered. A tick that has started always runs to completion (or rollback)
    /// before the signal is observed.
    pub async fn run(self, shutdown: ShutdownSignal) {
        let id = self.id;
        let mut timer = tokio::time::interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("🔄️ Reconciliation worker {id} started");
        loop {
            tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                _ = timer.tick() => {},
            }
            match self.api.run_tick().await {
                Ok(TickOutcome::Idle) | Ok(TickOutcome::NothingClaimed) => {},
                Ok(outcome) => debug!("🔄️ Worker {id}: {outcome:?}"),
                Err(ReconciliationError::Oracle(OracleError::RateLimited { retry_after })) => {
                    warn!(
                        "🔄️ Worker {id}: the accrual system is rate limiting us. Pausing for {}s",
                        retry_after.as_secs()
                    );
                    tokio::select! {
                        biased;
                        _ = shutdown.wait() => break,
                        _ = tokio::time::sleep(retry_after) => timer.reset(),
                    }
                },
                Err(ReconciliationError::Oracle(e)) => warn!("🔄️ Worker {id}: tick abandoned. {e}"),
                Err(e) => error!("🔄️ Worker {id}: tick failed. {e}"),
            }
        }
        info!("🔄️ Reconciliation worker {id} stopped");
    }
}

/// Spawns `count` reconciliation workers against the same store. Await the handles after triggering `shutdown`.
pub fn start_reconciliation_workers<B, O>(
    count: usize,
    db: B,
    oracle: O,
    interval: Duration,
    shutdown: &ShutdownSignal,
) -> Vec<JoinHandle<()>>
where
    B: LedgerStore,
    O: AccrualOracle,
{
    (0..count)
        .map(|id| {
            let worker = ReconciliationWorker::new(id, db.clone(), oracle.clone(), interval);
            let shutdown = shutdown.clone();
            tokio::spawn(worker.run(shutdown))
        })
        .collect()
}
