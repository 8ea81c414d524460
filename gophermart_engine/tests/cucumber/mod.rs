mod ledger_world;
mod steps;

pub use ledger_world::LedgerWorld;
