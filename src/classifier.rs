use crate::schema::{RawTable, TableLabel};
use log::debug;
use serde::Serialize;

/// Classifications below this confidence are routed to manual review as
/// `Unknown`, whatever the raw top score was.
pub const CONFIDENCE_THRESHOLD: f64 = 0.2;

// Keyword weights favour multi-word phrases: "capital call adjustment" is
// far stronger evidence than "payment" appearing somewhere in a header.
const CAPITAL_CALL_KEYWORDS: &[(&str, f64)] = &[
    ("capital call", 3.0),
    ("capital contribution", 2.5),
    ("call date", 2.5),
    ("drawdown", 2.0),
    ("contribution", 1.5),
    ("commitment", 1.5),
    ("called", 1.0),
];

const DISTRIBUTION_KEYWORDS: &[(&str, f64)] = &[
    ("return of capital", 3.0),
    ("distribution date", 2.5),
    ("distribution", 2.5),
    ("recallable", 2.0),
    ("dividend", 1.5),
    ("proceeds", 1.5),
    ("payment", 1.0),
];

const ADJUSTMENT_KEYWORDS: &[(&str, f64)] = &[
    ("capital call adjustment", 3.5),
    ("distribution recall", 3.0),
    ("adjustment", 3.0),
    ("rebalance", 2.5),
    ("clawback", 2.5),
    ("correction", 1.5),
    ("recall", 1.0),
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
    pub label: TableLabel,
    pub confidence: f64,
}

impl Classification {
    fn unknown(confidence: f64) -> Self {
        Classification {
            label: TableLabel::Unknown,
            confidence,
        }
    }
}

/// Labels a raw table as one of the transaction classes. Total function: an
/// unrecognizable table yields `Unknown` with low confidence, never an
/// error. Confidence is the top score's margin over the runner-up,
/// normalized by the top score.
pub fn classify_table(table: &RawTable) -> Classification {
    if table.is_empty() {
        return Classification::unknown(0.0);
    }

    let header_text = table.headers.join(" ").to_lowercase();
    let mut scores = score_labels(&header_text);

    // Headers carry no signal: fall back to first-column content.
    if scores.iter().all(|(_, score)| *score == 0.0) {
        let first_column = table
            .rows
            .iter()
            .filter_map(|row| row.first())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        scores = score_labels(&first_column);
    }

    // The scan order doubles as the tie-break: rarer, more specific labels
    // come first and keep the win on equal scores.
    let mut best = scores[0];
    for candidate in &scores[1..] {
        if candidate.1 > best.1 {
            best = *candidate;
        }
    }

    let (label, top) = best;
    if top == 0.0 {
        return Classification::unknown(0.0);
    }

    let runner_up = scores
        .iter()
        .filter(|(candidate, _)| *candidate != label)
        .map(|(_, score)| *score)
        .fold(0.0, f64::max);

    let confidence = ((top - runner_up) / top).clamp(0.0, 1.0);
    debug!(
        "classified table as {} (score {:.1}, runner-up {:.1}, confidence {:.2})",
        label.name(),
        top,
        runner_up,
        confidence
    );

    if confidence < CONFIDENCE_THRESHOLD {
        return Classification::unknown(confidence);
    }

    Classification { label, confidence }
}

fn score_labels(text: &str) -> [(TableLabel, f64); 3] {
    [
        (TableLabel::Adjustment, score(text, ADJUSTMENT_KEYWORDS)),
        (TableLabel::Distribution, score(text, DISTRIBUTION_KEYWORDS)),
        (TableLabel::CapitalCall, score(text, CAPITAL_CALL_KEYWORDS)),
    ]
}

fn score(text: &str, keywords: &[(&str, f64)]) -> f64 {
    keywords
        .iter()
        .filter(|(keyword, _)| text.contains(keyword))
        .map(|(_, weight)| weight)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|row| row.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_capital_call_headers_accepted() {
        let t = table(
            &["Call Date", "Capital Call", "Description"],
            &[&["2023-01-15", "$384,710", "Call #1"]],
        );
        let result = classify_table(&t);
        assert_eq!(result.label, TableLabel::CapitalCall);
        assert!(result.confidence >= CONFIDENCE_THRESHOLD);
    }

    #[test]
    fn test_distribution_headers_accepted() {
        let t = table(
            &["Distribution Date", "Distribution Type", "Amount", "Recallable"],
            &[&["2023-06-30", "Return of Capital", "$700,000", "Yes"]],
        );
        let result = classify_table(&t);
        assert_eq!(result.label, TableLabel::Distribution);
        assert!(result.confidence >= CONFIDENCE_THRESHOLD);
    }

    #[test]
    fn test_adjustment_headers_accepted() {
        let t = table(
            &["Date", "Adjustment Type", "Category", "Amount"],
            &[&["2023-03-01", "Rebalance of Capital Call", "Rebalance", "(50,000)"]],
        );
        let result = classify_table(&t);
        assert_eq!(result.label, TableLabel::Adjustment);
        assert!(result.confidence >= CONFIDENCE_THRESHOLD);
    }

    #[test]
    fn test_no_keywords_is_unknown() {
        let t = table(
            &["Name", "Quantity", "Price"],
            &[&["Widget", "3", "9.99"]],
        );
        let result = classify_table(&t);
        assert_eq!(result.label, TableLabel::Unknown);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_empty_table_is_unknown() {
        let result = classify_table(&RawTable::new(vec![], vec![]));
        assert_eq!(result.label, TableLabel::Unknown);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_exact_tie_forced_unknown_by_threshold() {
        // distribution: 2.5 + 1.5 = 4.0; adjustment: 2.5 + 1.5 = 4.0
        let t = table(&["Distribution Proceeds", "Rebalance Correction"], &[]);
        let result = classify_table(&t);
        assert_eq!(result.label, TableLabel::Unknown);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_first_column_fallback() {
        let t = table(
            &["Item", "Value"],
            &[
                &["Capital call drawdown Q1", "100"],
                &["Capital call drawdown Q2", "200"],
            ],
        );
        let result = classify_table(&t);
        assert_eq!(result.label, TableLabel::CapitalCall);
        assert!(result.confidence >= CONFIDENCE_THRESHOLD);
    }
}
