use crate::adjustments;
use crate::error::FundMetricsError;
use crate::metrics::FundSnapshot;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Pic,
    Dpi,
    Irr,
    Tvpi,
    Rvpi,
}

impl Metric {
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Pic => "PIC",
            Metric::Dpi => "DPI",
            Metric::Irr => "IRR",
            Metric::Tvpi => "TVPI",
            Metric::Rvpi => "RVPI",
        }
    }

    pub fn formula(&self) -> &'static str {
        match self {
            Metric::Pic => "Total Capital Calls - Adjustments",
            Metric::Dpi => "Cumulative Distributions / Paid-In Capital",
            Metric::Irr => "Internal Rate of Return (NPV = 0)",
            Metric::Tvpi => "(Cumulative Distributions + NAV) / Paid-In Capital",
            Metric::Rvpi => "NAV / Paid-In Capital",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = FundMetricsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pic" => Ok(Metric::Pic),
            "dpi" => Ok(Metric::Dpi),
            "irr" => Ok(Metric::Irr),
            "tvpi" => Ok(Metric::Tvpi),
            "rvpi" => Ok(Metric::Rvpi),
            other => Err(FundMetricsError::UnknownMetric(other.to_string())),
        }
    }
}

/// Structured explanation of one computed metric. Side-effect free and
/// byte-identical for identical input data: inputs live in an ordered map,
/// transaction detail is sorted by date, and nothing here reads a clock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricBreakdown {
    pub metric: String,
    pub formula: String,
    pub inputs: BTreeMap<String, Value>,
    pub result: Value,
    pub explanation: String,
}

/// Assembles the calculation trace for one metric over one snapshot.
pub fn assemble_breakdown(snapshot: &FundSnapshot, metric: Metric) -> MetricBreakdown {
    match metric {
        Metric::Pic => pic_breakdown(snapshot),
        Metric::Dpi => dpi_breakdown(snapshot),
        Metric::Irr => irr_breakdown(snapshot),
        Metric::Tvpi => tvpi_breakdown(snapshot),
        Metric::Rvpi => rvpi_breakdown(snapshot),
    }
}

fn pic_breakdown(snapshot: &FundSnapshot) -> MetricBreakdown {
    let total_calls = snapshot.total_calls();
    let total_adjustments = snapshot.total_adjustments();
    let pic = snapshot.pic();

    let mut inputs = BTreeMap::new();
    inputs.insert("total_calls".to_string(), decimal_value(total_calls));
    inputs.insert(
        "total_adjustments".to_string(),
        decimal_value(total_adjustments),
    );
    inputs.insert("capital_calls".to_string(), call_entries(snapshot));
    inputs.insert("adjustments".to_string(), adjustment_entries(snapshot));

    MetricBreakdown {
        metric: Metric::Pic.name().to_string(),
        formula: Metric::Pic.formula().to_string(),
        inputs,
        result: decimal_value(pic),
        explanation: format!(
            "PIC = {} - {} = {}",
            total_calls.normalize(),
            total_adjustments.normalize(),
            pic.normalize()
        ),
    }
}

fn dpi_breakdown(snapshot: &FundSnapshot) -> MetricBreakdown {
    let pic = snapshot.pic();
    let total_distributions = snapshot.total_distributions();
    let dpi = snapshot.dpi();

    let mut inputs = BTreeMap::new();
    inputs.insert("pic".to_string(), decimal_value(pic));
    inputs.insert(
        "total_distributions".to_string(),
        decimal_value(total_distributions),
    );
    inputs.insert("capital_calls".to_string(), call_entries(snapshot));
    inputs.insert("distributions".to_string(), distribution_entries(snapshot));
    inputs.insert("adjustments".to_string(), adjustment_entries(snapshot));

    let explanation = if pic <= Decimal::ZERO {
        format!(
            "DPI = 0 because paid-in capital is not positive ({})",
            pic.normalize()
        )
    } else {
        format!(
            "DPI = {} / {} = {}",
            total_distributions.normalize(),
            pic.normalize(),
            dpi
        )
    };

    MetricBreakdown {
        metric: Metric::Dpi.name().to_string(),
        formula: Metric::Dpi.formula().to_string(),
        inputs,
        result: json!(dpi),
        explanation,
    }
}

fn irr_breakdown(snapshot: &FundSnapshot) -> MetricBreakdown {
    let flows = snapshot.cash_flows();
    let outcome = snapshot.irr();

    let total_outflows: f64 = flows.iter().map(|f| f.amount).filter(|a| *a < 0.0).sum();
    let total_inflows: f64 = flows.iter().map(|f| f.amount).filter(|a| *a > 0.0).sum();
    let net: f64 = flows.iter().map(|f| f.amount).sum();

    let mut inputs = BTreeMap::new();
    inputs.insert(
        "cash_flows".to_string(),
        Value::Array(
            flows
                .iter()
                .map(|f| {
                    json!({
                        "date": f.date.format("%Y-%m-%d").to_string(),
                        "amount": f.amount,
                    })
                })
                .collect(),
        ),
    );
    inputs.insert(
        "cash_flow_summary".to_string(),
        json!({
            "total_outflows": total_outflows,
            "total_inflows": total_inflows,
            "net_cash_flow": net,
        }),
    );

    let (result, explanation) = match outcome {
        Ok(percent) => (
            json!(percent),
            format!(
                "IRR calculated from {} cash flows = {}%",
                flows.len(),
                percent
            ),
        ),
        Err(failure) => {
            inputs.insert("failure_reason".to_string(), json!(failure.reason()));
            (
                Value::Null,
                format!("IRR unavailable: {}", failure.reason()),
            )
        }
    };

    MetricBreakdown {
        metric: Metric::Irr.name().to_string(),
        formula: Metric::Irr.formula().to_string(),
        inputs,
        result,
        explanation,
    }
}

fn tvpi_breakdown(snapshot: &FundSnapshot) -> MetricBreakdown {
    let pic = snapshot.pic();
    let total_distributions = snapshot.total_distributions();
    let tvpi = snapshot.tvpi();
    let nav = snapshot.nav.unwrap_or(Decimal::ZERO);

    let mut inputs = BTreeMap::new();
    inputs.insert("pic".to_string(), decimal_value(pic));
    inputs.insert(
        "total_distributions".to_string(),
        decimal_value(total_distributions),
    );
    inputs.insert("nav".to_string(), nav_value(snapshot));

    let explanation = if pic <= Decimal::ZERO {
        format!(
            "TVPI = 0 because paid-in capital is not positive ({})",
            pic.normalize()
        )
    } else {
        let mut text = format!(
            "TVPI = ({} + {}) / {} = {}",
            total_distributions.normalize(),
            nav.normalize(),
            pic.normalize(),
            tvpi
        );
        if snapshot.nav.is_none() {
            text.push_str(" (NAV unavailable, treated as 0)");
        }
        text
    };

    MetricBreakdown {
        metric: Metric::Tvpi.name().to_string(),
        formula: Metric::Tvpi.formula().to_string(),
        inputs,
        result: json!(tvpi),
        explanation,
    }
}

fn rvpi_breakdown(snapshot: &FundSnapshot) -> MetricBreakdown {
    let pic = snapshot.pic();
    let rvpi = snapshot.rvpi();
    let nav = snapshot.nav.unwrap_or(Decimal::ZERO);

    let mut inputs = BTreeMap::new();
    inputs.insert("pic".to_string(), decimal_value(pic));
    inputs.insert("nav".to_string(), nav_value(snapshot));

    let explanation = if pic <= Decimal::ZERO {
        format!(
            "RVPI = 0 because paid-in capital is not positive ({})",
            pic.normalize()
        )
    } else {
        let mut text = format!(
            "RVPI = {} / {} = {}",
            nav.normalize(),
            pic.normalize(),
            rvpi
        );
        if snapshot.nav.is_none() {
            text.push_str(" (NAV unavailable, treated as 0)");
        }
        text
    };

    MetricBreakdown {
        metric: Metric::Rvpi.name().to_string(),
        formula: Metric::Rvpi.formula().to_string(),
        inputs,
        result: json!(rvpi),
        explanation,
    }
}

fn decimal_value(value: Decimal) -> Value {
    json!(value.to_f64().unwrap_or(0.0))
}

// NAV carries the null-vs-zero distinction through to the caller: null when
// the valuation source has nothing, a number (possibly 0) when it reported.
fn nav_value(snapshot: &FundSnapshot) -> Value {
    match snapshot.nav {
        Some(nav) => decimal_value(nav),
        None => Value::Null,
    }
}

fn call_entries(snapshot: &FundSnapshot) -> Value {
    let mut calls = snapshot.capital_calls.clone();
    calls.sort_by_key(|c| c.call_date);
    Value::Array(
        calls
            .iter()
            .map(|c| {
                json!({
                    "date": c.call_date.format("%Y-%m-%d").to_string(),
                    "amount": c.amount.to_f64().unwrap_or(0.0),
                    "call_type": c.call_type,
                    "description": c.description,
                })
            })
            .collect(),
    )
}

fn distribution_entries(snapshot: &FundSnapshot) -> Value {
    let mut distributions = snapshot.distributions.clone();
    distributions.sort_by_key(|d| d.distribution_date);
    Value::Array(
        distributions
            .iter()
            .map(|d| {
                json!({
                    "date": d.distribution_date.format("%Y-%m-%d").to_string(),
                    "amount": d.amount.to_f64().unwrap_or(0.0),
                    "distribution_type": d.distribution_type,
                    "is_recallable": d.is_recallable,
                    "description": d.description,
                })
            })
            .collect(),
    )
}

fn adjustment_entries(snapshot: &FundSnapshot) -> Value {
    let mut records = snapshot.adjustments.clone();
    records.sort_by_key(|a| a.adjustment_date);
    Value::Array(
        records
            .iter()
            .map(|a| {
                let effect = adjustments::resolve(a);
                json!({
                    "date": a.adjustment_date.format("%Y-%m-%d").to_string(),
                    "amount": a.amount.to_f64().unwrap_or(0.0),
                    "adjustment_type": a.adjustment_type,
                    "category": effect.class.name(),
                    "pic_term": effect.pic_term.to_f64().unwrap_or(0.0),
                    "effect": effect.narrative,
                })
            })
            .collect(),
    )
}
