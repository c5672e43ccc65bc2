use std::sync::Arc;
use verdant_ledger::LedgerStore;
use verdant_order::SettlementEngine;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SettlementEngine>,
    pub ledger: Arc<dyn LedgerStore>,
}
