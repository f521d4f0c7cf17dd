use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque fund identifier. Every query and computation in this crate is
/// scoped to exactly one fund; cross-fund aggregation never happens here.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub struct FundId(pub String);

impl FundId {
    pub fn new(id: impl Into<String>) -> Self {
        FundId(id.into())
    }
}

impl fmt::Display for FundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FundId {
    fn from(id: &str) -> Self {
        FundId(id.to_string())
    }
}

/// A table grid as handed over by the extraction collaborator: one header
/// row plus data rows, all cells raw strings. Consumed once by
/// classification and normalization, then discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        RawTable { headers, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum TableLabel {
    #[schemars(description = "Capital drawn down from limited partners")]
    CapitalCall,

    #[schemars(description = "Cash or stock returned to limited partners")]
    Distribution,

    #[schemars(description = "Corrective entry: rebalance, clawback, recall")]
    Adjustment,

    #[schemars(description = "No keyword evidence, or evidence too ambiguous; route to manual review")]
    Unknown,
}

impl TableLabel {
    pub fn name(&self) -> &'static str {
        match self {
            TableLabel::CapitalCall => "Capital Call",
            TableLabel::Distribution => "Distribution",
            TableLabel::Adjustment => "Adjustment",
            TableLabel::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CapitalCall {
    pub fund_id: FundId,
    pub call_date: NaiveDate,

    #[schemars(
        description = "Call category as reported, e.g. 'Investment', 'Management Fee'. 'Other' when the source left it blank."
    )]
    pub call_type: String,

    #[schemars(description = "Amount called. Always stored non-negative.")]
    pub amount: Decimal,

    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Distribution {
    pub fund_id: FundId,
    pub distribution_date: NaiveDate,

    #[schemars(
        description = "Distribution category as reported, e.g. 'Return of Capital', 'Dividend'. 'Other' when the source left it blank."
    )]
    pub distribution_type: String,

    #[schemars(description = "Amount distributed. Always stored non-negative.")]
    pub amount: Decimal,

    #[schemars(
        description = "True when the GP may contractually call this distribution back from LPs. Reporting metadata only; recallable distributions still count toward DPI."
    )]
    pub is_recallable: bool,

    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Adjustment {
    pub fund_id: FundId,
    pub adjustment_date: NaiveDate,

    #[schemars(
        description = "Adjustment category as reported, e.g. 'Rebalance of Capital Call', 'Distribution Recall'."
    )]
    pub adjustment_type: String,

    pub category: String,

    #[schemars(
        description = "Signed amount exactly as recorded; rebalances and clawbacks are typically negative. Sign semantics for calculation are applied by the resolver, not baked in here."
    )]
    pub amount: Decimal,

    #[schemars(
        description = "True when this adjustment rebalances a capital call, so it must not be double-counted as a distribution."
    )]
    pub is_contribution_adjustment: bool,

    pub description: String,
}

/// Canonical transaction record, tagged by kind. Created by the row
/// normalizer and owned thereafter by the storage collaborator; this crate
/// only reads snapshots back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransactionRecord {
    CapitalCall(CapitalCall),
    Distribution(Distribution),
    Adjustment(Adjustment),
}

impl TransactionRecord {
    pub fn fund_id(&self) -> &FundId {
        match self {
            TransactionRecord::CapitalCall(c) => &c.fund_id,
            TransactionRecord::Distribution(d) => &d.fund_id,
            TransactionRecord::Adjustment(a) => &a.fund_id,
        }
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            TransactionRecord::CapitalCall(c) => c.call_date,
            TransactionRecord::Distribution(d) => d.distribution_date,
            TransactionRecord::Adjustment(a) => a.adjustment_date,
        }
    }

    pub fn amount(&self) -> Decimal {
        match self {
            TransactionRecord::CapitalCall(c) => c.amount,
            TransactionRecord::Distribution(d) => d.amount,
            TransactionRecord::Adjustment(a) => a.amount,
        }
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(TransactionRecord)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

/// Full metric summary for one fund, computed in a single pass over a
/// single snapshot. `nav` is `None` when the valuation collaborator has no
/// value for the fund, which is distinct from a NAV reported as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundMetrics {
    pub pic: Decimal,
    pub total_distributions: Decimal,
    pub dpi: f64,
    pub irr: Option<f64>,
    pub tvpi: f64,
    pub rvpi: f64,
    pub nav: Option<Decimal>,
}
