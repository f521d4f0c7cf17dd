use crate::error::Result;
use crate::schema::{Adjustment, CapitalCall, Distribution, FundId, TransactionRecord};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Storage collaborator seam. Reads return the full current collection for
/// one fund; the metrics engine treats each returned vector as an immutable
/// snapshot. Consistency under concurrent writes is the caller's concern.
pub trait TransactionStore {
    fn capital_calls(&self, fund: &FundId) -> Result<Vec<CapitalCall>>;
    fn distributions(&self, fund: &FundId) -> Result<Vec<Distribution>>;
    fn adjustments(&self, fund: &FundId) -> Result<Vec<Adjustment>>;

    /// Persists normalized records, returning how many were accepted.
    fn append(&mut self, records: Vec<TransactionRecord>) -> Result<usize>;
}

/// Valuation collaborator seam. `None` means the source has no NAV for the
/// fund, which is distinct from a NAV it reports as zero.
pub trait NavSource {
    fn nav(&self, fund: &FundId) -> Option<Decimal>;
}

/// Reference implementation backing tests and callers that already hold the
/// data in memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    calls: HashMap<FundId, Vec<CapitalCall>>,
    distributions: HashMap<FundId, Vec<Distribution>>,
    adjustments: HashMap<FundId, Vec<Adjustment>>,
    navs: HashMap<FundId, Decimal>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_nav(&mut self, fund: FundId, nav: Decimal) {
        self.navs.insert(fund, nav);
    }
}

impl TransactionStore for InMemoryStore {
    fn capital_calls(&self, fund: &FundId) -> Result<Vec<CapitalCall>> {
        Ok(self.calls.get(fund).cloned().unwrap_or_default())
    }

    fn distributions(&self, fund: &FundId) -> Result<Vec<Distribution>> {
        Ok(self.distributions.get(fund).cloned().unwrap_or_default())
    }

    fn adjustments(&self, fund: &FundId) -> Result<Vec<Adjustment>> {
        Ok(self.adjustments.get(fund).cloned().unwrap_or_default())
    }

    fn append(&mut self, records: Vec<TransactionRecord>) -> Result<usize> {
        let count = records.len();
        for record in records {
            match record {
                TransactionRecord::CapitalCall(call) => {
                    self.calls.entry(call.fund_id.clone()).or_default().push(call)
                }
                TransactionRecord::Distribution(dist) => self
                    .distributions
                    .entry(dist.fund_id.clone())
                    .or_default()
                    .push(dist),
                TransactionRecord::Adjustment(adj) => self
                    .adjustments
                    .entry(adj.fund_id.clone())
                    .or_default()
                    .push(adj),
            }
        }
        Ok(count)
    }
}

impl NavSource for InMemoryStore {
    fn nav(&self, fund: &FundId) -> Option<Decimal> {
        self.navs.get(fund).copied()
    }
}
