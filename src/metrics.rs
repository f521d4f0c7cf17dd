use crate::adjustments::{self, AdjustmentClass};
use crate::breakdown::{assemble_breakdown, Metric, MetricBreakdown};
use crate::error::Result;
use crate::irr::{build_cash_flows, internal_rate_of_return, CashFlow, IrrFailure};
use crate::schema::{Adjustment, CapitalCall, Distribution, FundId, FundMetrics};
use crate::store::{NavSource, TransactionStore};
use log::debug;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Immutable view of one fund's transactions plus its externally supplied
/// NAV, fetched once per computation and never written back. All metric
/// functions are deterministic given the same snapshot.
#[derive(Debug, Clone)]
pub struct FundSnapshot {
    pub fund_id: FundId,
    pub capital_calls: Vec<CapitalCall>,
    pub distributions: Vec<Distribution>,
    pub adjustments: Vec<Adjustment>,
    pub nav: Option<Decimal>,
}

impl FundSnapshot {
    pub fn load<S, N>(store: &S, navs: &N, fund_id: &FundId) -> Result<Self>
    where
        S: TransactionStore + ?Sized,
        N: NavSource + ?Sized,
    {
        Ok(FundSnapshot {
            fund_id: fund_id.clone(),
            capital_calls: store.capital_calls(fund_id)?,
            distributions: store.distributions(fund_id)?,
            adjustments: store.adjustments(fund_id)?,
            nav: navs.nav(fund_id),
        })
    }

    pub fn total_calls(&self) -> Decimal {
        self.capital_calls.iter().map(|call| call.amount).sum()
    }

    pub fn total_adjustments(&self) -> Decimal {
        self.adjustments.iter().map(|adj| adj.amount).sum()
    }

    /// PIC = total calls - total adjustments, floored at zero. The formula
    /// is applied literally: a negative adjustment total increases PIC.
    pub fn pic(&self) -> Decimal {
        (self.total_calls() - self.total_adjustments()).max(Decimal::ZERO)
    }

    /// Sum of all distributions. Recallable status is reporting metadata,
    /// not an exclusion filter; see `net_distributions` for the adjusted
    /// view.
    pub fn total_distributions(&self) -> Decimal {
        self.distributions.iter().map(|dist| dist.amount).sum()
    }

    /// Distributions net of clawback reversals, per the adjustment
    /// resolver. Reporting view only: headline DPI and TVPI always use the
    /// gross figure.
    pub fn net_distributions(&self) -> Decimal {
        let clawbacks: Decimal = self
            .adjustments
            .iter()
            .filter(|adj| adjustments::classify(adj) == AdjustmentClass::DistributionClawback)
            .map(|adj| adj.amount)
            .sum();
        self.total_distributions() + clawbacks
    }

    pub fn dpi(&self) -> f64 {
        self.ratio(self.total_distributions())
    }

    pub fn tvpi(&self) -> f64 {
        self.ratio(self.total_distributions() + self.nav.unwrap_or(Decimal::ZERO))
    }

    pub fn rvpi(&self) -> f64 {
        self.ratio(self.nav.unwrap_or(Decimal::ZERO))
    }

    fn ratio(&self, numerator: Decimal) -> f64 {
        let pic = self.pic();
        if pic <= Decimal::ZERO {
            return 0.0;
        }
        round_to((numerator / pic).to_f64().unwrap_or(0.0), 4)
    }

    pub fn cash_flows(&self) -> Vec<CashFlow> {
        build_cash_flows(&self.capital_calls, &self.distributions)
    }

    /// IRR as a percentage rounded to two decimals, or the reason none
    /// could be produced.
    pub fn irr(&self) -> std::result::Result<f64, IrrFailure> {
        let flows = self.cash_flows();
        let rate = internal_rate_of_return(&flows)?;
        if !rate.is_finite() {
            return Err(IrrFailure::NotConverged);
        }
        Ok(round_to(rate * 100.0, 2))
    }

    /// All standard metrics in one pass over this snapshot.
    pub fn metrics(&self) -> FundMetrics {
        FundMetrics {
            pic: self.pic(),
            total_distributions: self.total_distributions(),
            dpi: self.dpi(),
            irr: self.irr().ok(),
            tvpi: self.tvpi(),
            rvpi: self.rvpi(),
            nav: self.nav,
        }
    }
}

/// Facade over the storage and valuation collaborators. Each calculation
/// fetches a fresh snapshot, so batch computation across funds is safe to
/// run concurrently; one fund's degenerate data never affects another's.
pub struct MetricsEngine<'a, S: TransactionStore, N: NavSource> {
    store: &'a S,
    navs: &'a N,
}

impl<'a, S: TransactionStore, N: NavSource> MetricsEngine<'a, S, N> {
    pub fn new(store: &'a S, navs: &'a N) -> Self {
        Self { store, navs }
    }

    pub fn snapshot(&self, fund_id: &FundId) -> Result<FundSnapshot> {
        FundSnapshot::load(self.store, self.navs, fund_id)
    }

    pub fn calculate_pic(&self, fund_id: &FundId) -> Result<Decimal> {
        Ok(self.snapshot(fund_id)?.pic())
    }

    pub fn calculate_total_distributions(&self, fund_id: &FundId) -> Result<Decimal> {
        Ok(self.snapshot(fund_id)?.total_distributions())
    }

    pub fn calculate_dpi(&self, fund_id: &FundId) -> Result<f64> {
        Ok(self.snapshot(fund_id)?.dpi())
    }

    pub fn calculate_tvpi(&self, fund_id: &FundId) -> Result<f64> {
        Ok(self.snapshot(fund_id)?.tvpi())
    }

    pub fn calculate_rvpi(&self, fund_id: &FundId) -> Result<f64> {
        Ok(self.snapshot(fund_id)?.rvpi())
    }

    pub fn calculate_irr(&self, fund_id: &FundId) -> Result<Option<f64>> {
        let snapshot = self.snapshot(fund_id)?;
        Ok(match snapshot.irr() {
            Ok(percent) => Some(percent),
            Err(failure) => {
                debug!("IRR unavailable for fund {}: {}", fund_id, failure.reason());
                None
            }
        })
    }

    pub fn calculate_all_metrics(&self, fund_id: &FundId) -> Result<FundMetrics> {
        Ok(self.snapshot(fund_id)?.metrics())
    }

    pub fn calculation_breakdown(
        &self,
        fund_id: &FundId,
        metric: Metric,
    ) -> Result<MetricBreakdown> {
        Ok(assemble_breakdown(&self.snapshot(fund_id)?, metric))
    }
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
