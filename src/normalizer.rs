use crate::schema::{
    Adjustment, CapitalCall, Distribution, FundId, RawTable, TableLabel, TransactionRecord,
};
use crate::utils::{cell, cell_or, find_column, parse_amount, parse_date, parse_flag};
use log::debug;
use rust_decimal::Decimal;
use serde::Serialize;

/// Machine-readable reason a row was rejected. Rejection is per-row and
/// never aborts the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    InvalidDate,
    InvalidAmount,
    NegativeAmount,
    ZeroAmount,
    EmptyRow,
    Unclassified,
}

impl RejectReason {
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::InvalidDate => "invalid_date",
            RejectReason::InvalidAmount => "invalid_amount",
            RejectReason::NegativeAmount => "negative_amount",
            RejectReason::ZeroAmount => "zero_amount",
            RejectReason::EmptyRow => "empty_row",
            RejectReason::Unclassified => "unclassified",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedRow {
    pub row_index: usize,
    pub cells: Vec<String>,
    pub reason: RejectReason,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NormalizedTable {
    pub valid: Vec<TransactionRecord>,
    pub rejected: Vec<RejectedRow>,
}

// Header vocabularies vary across fund administrators; the synonym lists
// cover the common ones, most specific name first.
struct Columns {
    date: Option<usize>,
    amount: Option<usize>,
    kind: Option<usize>,
    category: Option<usize>,
    recallable: Option<usize>,
    description: Option<usize>,
}

fn locate_columns(label: TableLabel, headers: &[String]) -> Columns {
    let (date_names, amount_names, kind_names): (&[&str], &[&str], &[&str]) = match label {
        TableLabel::CapitalCall => (
            &["call date", "date", "transaction date"],
            &["amount", "capital call", "contribution"],
            &["call type", "type", "call number"],
        ),
        TableLabel::Distribution => (
            &["distribution date", "date", "transaction date"],
            &["amount", "distribution", "payment"],
            &["distribution type", "type"],
        ),
        _ => (
            &["adjustment date", "date", "transaction date"],
            &["amount", "adjustment"],
            &["adjustment type", "type"],
        ),
    };

    Columns {
        date: find_column(headers, date_names),
        amount: find_column(headers, amount_names),
        kind: find_column(headers, kind_names),
        category: find_column(headers, &["category"]),
        recallable: find_column(headers, &["recallable", "is recallable"]),
        description: find_column(headers, &["description", "details", "notes"]),
    }
}

/// Converts a classified table's rows into typed records. Each row is
/// handled independently: malformed rows land in `rejected` with a reason
/// and the table keeps going. Output order preserves input order.
pub fn normalize_rows(fund_id: &FundId, label: TableLabel, table: &RawTable) -> NormalizedTable {
    let columns = locate_columns(label, &table.headers);
    let mut result = NormalizedTable::default();

    for (row_index, row) in table.rows.iter().enumerate() {
        match normalize_row(fund_id, label, &columns, row) {
            Ok(record) => result.valid.push(record),
            Err(reason) => result.rejected.push(RejectedRow {
                row_index,
                cells: row.clone(),
                reason,
            }),
        }
    }

    debug!(
        "normalized {} table for fund {}: {} valid, {} rejected",
        label.name(),
        fund_id,
        result.valid.len(),
        result.rejected.len()
    );

    result
}

fn normalize_row(
    fund_id: &FundId,
    label: TableLabel,
    columns: &Columns,
    row: &[String],
) -> std::result::Result<TransactionRecord, RejectReason> {
    if label == TableLabel::Unknown {
        return Err(RejectReason::Unclassified);
    }

    if row.iter().all(|c| c.trim().is_empty()) {
        return Err(RejectReason::EmptyRow);
    }

    let date = cell(row, columns.date)
        .and_then(parse_date)
        .ok_or(RejectReason::InvalidDate)?;

    let amount = cell(row, columns.amount)
        .and_then(parse_amount)
        .ok_or(RejectReason::InvalidAmount)?;

    let description = cell_or(row, columns.description, "").to_string();

    match label {
        TableLabel::CapitalCall => {
            require_positive(amount)?;
            Ok(TransactionRecord::CapitalCall(CapitalCall {
                fund_id: fund_id.clone(),
                call_date: date,
                call_type: cell_or(row, columns.kind, "Other").to_string(),
                amount,
                description,
            }))
        }
        TableLabel::Distribution => {
            require_positive(amount)?;
            let distribution_type = cell_or(row, columns.kind, "Other").to_string();
            let explicit_flag = cell(row, columns.recallable)
                .map(parse_flag)
                .unwrap_or(false);
            let keyword_flag = distribution_type.to_lowercase().contains("recallable")
                || description.to_lowercase().contains("recallable");
            Ok(TransactionRecord::Distribution(Distribution {
                fund_id: fund_id.clone(),
                distribution_date: date,
                distribution_type,
                amount,
                is_recallable: explicit_flag || keyword_flag,
                description,
            }))
        }
        TableLabel::Adjustment => {
            let adjustment_type = cell_or(row, columns.kind, "Other").to_string();
            let category = cell_or(row, columns.category, "Other").to_string();
            let is_contribution_adjustment = adjustment_type.to_lowercase().contains("capital call")
                || category.to_lowercase().contains("capital call");
            Ok(TransactionRecord::Adjustment(Adjustment {
                fund_id: fund_id.clone(),
                adjustment_date: date,
                adjustment_type,
                category,
                amount,
                is_contribution_adjustment,
                description,
            }))
        }
        TableLabel::Unknown => Err(RejectReason::Unclassified),
    }
}

// Calls and distributions are stored non-negative.
fn require_positive(amount: Decimal) -> std::result::Result<(), RejectReason> {
    if amount < Decimal::ZERO {
        Err(RejectReason::NegativeAmount)
    } else if amount == Decimal::ZERO {
        Err(RejectReason::ZeroAmount)
    } else {
        Ok(())
    }
}
