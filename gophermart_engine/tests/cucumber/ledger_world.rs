use std::fmt::Debug;

use cucumber::World;
use gophermart_engine::{
    ledger_objects::{SubmitOrderResult, TickOutcome},
    test_utils::scripted_oracle::ScriptedOracle,
    AccountApi,
    IngestionError,
    MemoryDatabase,
    OrderIngestionApi,
    ReconciliationApi,
    ReconciliationError,
    WithdrawalApi,
    WithdrawalError,
};

#[derive(Default, Debug, World)]
pub struct LedgerWorld {
    pub system: Option<LedgerSystem>,
}

impl LedgerWorld {
    pub fn system(&mut self) -> &mut LedgerSystem {
        self.system.get_or_insert_with(LedgerSystem::new)
    }
}

pub struct LedgerSystem {
    pub db: MemoryDatabase,
    pub oracle: ScriptedOracle,
    pub accounts: AccountApi<MemoryDatabase>,
    pub ingestion: OrderIngestionApi<MemoryDatabase>,
    pub withdrawals: WithdrawalApi<MemoryDatabase>,
    pub reconciliation: ReconciliationApi<MemoryDatabase, ScriptedOracle>,
    pub last_upload: Option<Result<SubmitOrderResult, IngestionError>>,
    pub last_tick: Option<Result<TickOutcome, ReconciliationError>>,
    pub last_withdrawal: Option<Result<(), WithdrawalError>>,
}

impl Debug for LedgerSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LedgerSystem ({:?})", self.db)
    }
}

impl LedgerSystem {
    pub fn new() -> Self {
        let db = MemoryDatabase::new();
        let oracle = ScriptedOracle::new();
        Self {
            accounts: AccountApi::new(db.clone()),
            ingestion: OrderIngestionApi::new(db.clone()),
            withdrawals: WithdrawalApi::new(db.clone()),
            reconciliation: ReconciliationApi::new(db.clone(), oracle.clone()),
            db,
            oracle,
            last_upload: None,
            last_tick: None,
            last_withdrawal: None,
        }
    }
}
