//! # Fund Metrics
//!
//! A library for converting heterogeneous tabular data extracted from
//! private-equity fund report documents into canonical transaction records,
//! and for computing standardized fund-performance metrics (PIC, DPI, TVPI,
//! RVPI, IRR) with a reproducible, explainable calculation trace.
//!
//! ## Core Concepts
//!
//! - **Raw Table**: a header row plus data rows of strings, as produced by
//!   an external PDF/table extractor
//! - **Classification**: each table is labeled once as Capital Call,
//!   Distribution, Adjustment or Unknown, with a confidence score; nothing
//!   downstream re-infers the label
//! - **Normalization**: rows become typed transaction records per-row and
//!   best-effort; malformed rows are rejected with a machine-readable
//!   reason, never aborting the table
//! - **Snapshot Metrics**: every metric is a pure function over an
//!   immutable per-fund snapshot fetched once from the storage collaborator
//! - **Breakdown**: any metric can be explained as a deterministic value
//!   object interpolating the actual numbers used
//!
//! ## Example
//!
//! ```rust,ignore
//! use fund_metrics::*;
//!
//! let mut store = InMemoryStore::new();
//! let fund = FundId::from("growth-fund-iii");
//!
//! let table = RawTable::new(
//!     vec!["Call Date".into(), "Call Type".into(), "Amount".into()],
//!     vec![vec!["2023-01-15".into(), "Investment".into(), "$384,710".into()]],
//! );
//!
//! let report = ingest_table(&mut store, &fund, &table)?;
//! assert_eq!(report.label, TableLabel::CapitalCall);
//!
//! let engine = MetricsEngine::new(&store, &store);
//! let pic = engine.calculate_pic(&fund)?;
//! let breakdown = engine.calculation_breakdown(&fund, Metric::Pic)?;
//! ```

pub mod adjustments;
pub mod breakdown;
pub mod classifier;
pub mod error;
pub mod irr;
pub mod metrics;
pub mod normalizer;
pub mod schema;
pub mod store;
pub mod utils;

pub use adjustments::{
    classify as classify_adjustment, resolve as resolve_adjustment, AdjustmentClass,
    AdjustmentEffect,
};
pub use breakdown::{assemble_breakdown, Metric, MetricBreakdown};
pub use classifier::{classify_table, Classification, CONFIDENCE_THRESHOLD};
pub use error::{FundMetricsError, Result};
pub use irr::{build_cash_flows, internal_rate_of_return, CashFlow, IrrFailure};
pub use metrics::{FundSnapshot, MetricsEngine};
pub use normalizer::{normalize_rows, NormalizedTable, RejectReason, RejectedRow};
pub use schema::*;
pub use store::{InMemoryStore, NavSource, TransactionStore};
pub use utils::*;

use log::{debug, info};

/// Outcome of running one raw table through classification, normalization
/// and persistence. Rejected rows stay attributable to their fund and row
/// index for operator review.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    pub fund_id: FundId,
    pub label: TableLabel,
    pub confidence: f64,
    pub stored: usize,
    pub rejected: Vec<RejectedRow>,
}

pub struct TableIngestor;

impl TableIngestor {
    /// Classifies a raw table, normalizes its rows, and hands the valid
    /// records to the storage collaborator. A table classified `Unknown`
    /// stores nothing; its rows are all reported back for manual review.
    pub fn ingest<S: TransactionStore>(
        store: &mut S,
        fund_id: &FundId,
        table: &RawTable,
    ) -> Result<IngestReport> {
        let classification = classify_table(table);
        info!(
            "table for fund {} classified as {} (confidence {:.2})",
            fund_id,
            classification.label.name(),
            classification.confidence
        );

        let normalized = normalize_rows(fund_id, classification.label, table);
        if !normalized.rejected.is_empty() {
            debug!(
                "fund {}: {} of {} rows rejected during normalization",
                fund_id,
                normalized.rejected.len(),
                table.rows.len()
            );
        }

        let stored = if normalized.valid.is_empty() {
            0
        } else {
            store.append(normalized.valid)?
        };

        Ok(IngestReport {
            fund_id: fund_id.clone(),
            label: classification.label,
            confidence: classification.confidence,
            stored,
            rejected: normalized.rejected,
        })
    }
}

pub fn ingest_table<S: TransactionStore>(
    store: &mut S,
    fund_id: &FundId,
    table: &RawTable,
) -> Result<IngestReport> {
    TableIngestor::ingest(store, fund_id, table)
}
