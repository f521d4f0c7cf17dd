use crate::schema::{CapitalCall, Distribution};
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

/// Convergence tolerance on the rate iterate.
pub const IRR_TOLERANCE: f64 = 1e-7;
pub const IRR_MAX_ITERATIONS: usize = 100;

const BISECTION_MAX_ITERATIONS: usize = 200;
const DAYS_PER_YEAR: f64 = 365.0;

/// One dated cash flow: capital calls negative, distributions positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CashFlow {
    pub date: NaiveDate,
    pub amount: f64,
}

/// Why no IRR could be produced. The first two are undefined by
/// construction; `NotConverged` is a numerical outcome on input that looked
/// solvable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IrrFailure {
    InsufficientCashFlows,
    NoSignChange,
    NotConverged,
}

impl IrrFailure {
    pub fn reason(&self) -> &'static str {
        match self {
            IrrFailure::InsufficientCashFlows => "fewer than two cash flows",
            IrrFailure::NoSignChange => "cash flows never change sign",
            IrrFailure::NotConverged => "root finding did not converge",
        }
    }

    pub fn is_undefined_by_construction(&self) -> bool {
        !matches!(self, IrrFailure::NotConverged)
    }
}

/// Builds the chronologically sorted cash-flow timeline for a fund: every
/// capital call contributes its amount as an outflow at the call date, every
/// distribution as an inflow at the distribution date.
pub fn build_cash_flows(calls: &[CapitalCall], distributions: &[Distribution]) -> Vec<CashFlow> {
    let mut flows: Vec<CashFlow> = calls
        .iter()
        .map(|call| CashFlow {
            date: call.call_date,
            amount: -call.amount.to_f64().unwrap_or(0.0),
        })
        .chain(distributions.iter().map(|dist| CashFlow {
            date: dist.distribution_date,
            amount: dist.amount.to_f64().unwrap_or(0.0),
        }))
        .collect();

    flows.sort_by_key(|flow| flow.date);
    flows
}

/// Solves for the rate `r` with `sum(amount / (1+r)^(days/365)) = 0` over
/// actual day-count differences from the earliest flow date. Newton-Raphson
/// from a 10% seed, falling back to bisection when the derivative is
/// ill-conditioned or the iterate leaves the sane domain (r <= -1). Returns
/// the decimal rate, not a percentage.
pub fn internal_rate_of_return(flows: &[CashFlow]) -> std::result::Result<f64, IrrFailure> {
    if flows.len() < 2 {
        return Err(IrrFailure::InsufficientCashFlows);
    }

    let has_inflow = flows.iter().any(|flow| flow.amount > 0.0);
    let has_outflow = flows.iter().any(|flow| flow.amount < 0.0);
    if !has_inflow || !has_outflow {
        return Err(IrrFailure::NoSignChange);
    }

    let origin = flows
        .iter()
        .map(|flow| flow.date)
        .min()
        .ok_or(IrrFailure::InsufficientCashFlows)?;

    let mut rate = 0.1;
    for _ in 0..IRR_MAX_ITERATIONS {
        let value = net_present_value(rate, flows, origin);
        let derivative = npv_derivative(rate, flows, origin);

        if !value.is_finite() || !derivative.is_finite() || derivative.abs() < f64::EPSILON {
            return bisect(flows, origin);
        }

        let next = rate - value / derivative;
        if !next.is_finite() || next <= -1.0 {
            return bisect(flows, origin);
        }

        if (next - rate).abs() < IRR_TOLERANCE {
            return Ok(next);
        }
        rate = next;
    }

    // Newton ran out of iterations; bisection gets one last word.
    bisect(flows, origin)
}

fn year_fraction(origin: NaiveDate, date: NaiveDate) -> f64 {
    (date - origin).num_days() as f64 / DAYS_PER_YEAR
}

fn net_present_value(rate: f64, flows: &[CashFlow], origin: NaiveDate) -> f64 {
    flows
        .iter()
        .map(|flow| flow.amount * (1.0 + rate).powf(-year_fraction(origin, flow.date)))
        .sum()
}

fn npv_derivative(rate: f64, flows: &[CashFlow], origin: NaiveDate) -> f64 {
    flows
        .iter()
        .map(|flow| {
            let t = year_fraction(origin, flow.date);
            flow.amount * -t * (1.0 + rate).powf(-t - 1.0)
        })
        .sum()
}

fn bisect(flows: &[CashFlow], origin: NaiveDate) -> std::result::Result<f64, IrrFailure> {
    let mut lo = -0.999_999;
    let mut hi = 10.0;
    let mut npv_lo = net_present_value(lo, flows, origin);
    let mut npv_hi = net_present_value(hi, flows, origin);

    while npv_lo * npv_hi > 0.0 {
        hi *= 2.0;
        if hi > 1e6 {
            return Err(IrrFailure::NotConverged);
        }
        npv_hi = net_present_value(hi, flows, origin);
    }

    if !npv_lo.is_finite() || !npv_hi.is_finite() {
        return Err(IrrFailure::NotConverged);
    }

    for _ in 0..BISECTION_MAX_ITERATIONS {
        let mid = (lo + hi) / 2.0;
        let npv_mid = net_present_value(mid, flows, origin);

        if !npv_mid.is_finite() {
            return Err(IrrFailure::NotConverged);
        }

        if (hi - lo) / 2.0 < IRR_TOLERANCE {
            return Ok(mid);
        }

        if npv_lo * npv_mid <= 0.0 {
            hi = mid;
        } else {
            lo = mid;
            npv_lo = npv_mid;
        }
    }

    Err(IrrFailure::NotConverged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FundId;
    use rust_decimal_macros::dec;

    fn flow(date: (i32, u32, u32), amount: f64) -> CashFlow {
        CashFlow {
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            amount,
        }
    }

    #[test]
    fn test_one_year_round_trip_is_twenty_percent() {
        // -1,000,000 at t0, +1,200,000 exactly 365 days later
        let flows = vec![
            flow((2021, 1, 1), -1_000_000.0),
            flow((2022, 1, 1), 1_200_000.0),
        ];
        let rate = internal_rate_of_return(&flows).unwrap();
        assert!((rate - 0.20).abs() < 1e-6, "got {}", rate);
    }

    #[test]
    fn test_negative_rate_converges() {
        let flows = vec![flow((2021, 1, 1), -1000.0), flow((2022, 1, 1), 900.0)];
        let rate = internal_rate_of_return(&flows).unwrap();
        assert!((rate - (-0.10)).abs() < 1e-6, "got {}", rate);
    }

    #[test]
    fn test_multi_flow_solution() {
        // -1000, +600 after one year, +600 after two: r ~ 13.066%
        let flows = vec![
            flow((2021, 1, 1), -1000.0),
            flow((2022, 1, 1), 600.0),
            flow((2023, 1, 1), 600.0),
        ];
        let rate = internal_rate_of_return(&flows).unwrap();
        assert!((rate - 0.13066).abs() < 1e-3, "got {}", rate);
    }

    #[test]
    fn test_single_flow_is_insufficient() {
        let flows = vec![flow((2021, 1, 1), -1000.0)];
        assert_eq!(
            internal_rate_of_return(&flows),
            Err(IrrFailure::InsufficientCashFlows)
        );
    }

    #[test]
    fn test_same_sign_flows_undefined() {
        let flows = vec![flow((2021, 1, 1), -1000.0), flow((2022, 1, 1), -500.0)];
        let failure = internal_rate_of_return(&flows).unwrap_err();
        assert_eq!(failure, IrrFailure::NoSignChange);
        assert!(failure.is_undefined_by_construction());

        let flows = vec![flow((2021, 1, 1), 1000.0), flow((2022, 1, 1), 500.0)];
        assert_eq!(
            internal_rate_of_return(&flows),
            Err(IrrFailure::NoSignChange)
        );
    }

    #[test]
    fn test_build_cash_flows_signs_and_order() {
        let fund = FundId::from("fund-1");
        let calls = vec![CapitalCall {
            fund_id: fund.clone(),
            call_date: NaiveDate::from_ymd_opt(2021, 6, 1).unwrap(),
            call_type: "Investment".to_string(),
            amount: dec!(1000),
            description: String::new(),
        }];
        let distributions = vec![Distribution {
            fund_id: fund,
            distribution_date: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
            distribution_type: "Dividend".to_string(),
            amount: dec!(250),
            is_recallable: false,
            description: String::new(),
        }];

        let flows = build_cash_flows(&calls, &distributions);
        assert_eq!(flows.len(), 2);
        // Chronological, despite distributions being appended second.
        assert_eq!(flows[0].amount, 250.0);
        assert_eq!(flows[1].amount, -1000.0);
    }
}
