use crate::schema::Adjustment;
use rust_decimal::Decimal;
use serde::Serialize;

/// The two documented adjustment categories, plus a bucket for anything a
/// report labels that matches neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentClass {
    /// Reversal of a prior over-distribution. Recorded negative; reduces
    /// effective distributions and raises PIC through the subtraction
    /// formula.
    DistributionClawback,

    /// Refund of a prior over-call. Recorded negative; flagged as a
    /// contribution adjustment so it is never double-counted as a
    /// distribution.
    CapitalCallRebalance,

    Other,
}

impl AdjustmentClass {
    pub fn name(&self) -> &'static str {
        match self {
            AdjustmentClass::DistributionClawback => "Rebalance of Distribution",
            AdjustmentClass::CapitalCallRebalance => "Rebalance of Capital Call",
            AdjustmentClass::Other => "Other Adjustment",
        }
    }
}

/// What one adjustment record contributes to the metrics. `pic_term` is the
/// term added into the PIC formula (PIC = calls - adjustments), which is
/// always the negated recorded amount. This never alters the engine's
/// top-level formula; it exists for the breakdown narrative and for
/// category-specific reporting views.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdjustmentEffect {
    pub class: AdjustmentClass,
    pub pic_term: Decimal,
    pub narrative: String,
}

pub fn classify(adjustment: &Adjustment) -> AdjustmentClass {
    if adjustment.is_contribution_adjustment {
        return AdjustmentClass::CapitalCallRebalance;
    }

    let text = format!(
        "{} {}",
        adjustment.adjustment_type, adjustment.category
    )
    .to_lowercase();

    if text.contains("capital call") {
        AdjustmentClass::CapitalCallRebalance
    } else if text.contains("distribution") || text.contains("clawback") {
        AdjustmentClass::DistributionClawback
    } else {
        AdjustmentClass::Other
    }
}

pub fn resolve(adjustment: &Adjustment) -> AdjustmentEffect {
    let class = classify(adjustment);
    let pic_term = -adjustment.amount;

    // Fund report prose describes a capital-call rebalance as both reducing
    // PIC and being recorded as a positive distribution, which contradicts
    // the worked formula. The formula wins here; the narrative keeps the
    // per-category effect visible so the convention can be confirmed
    // against real fund data.
    let narrative = match class {
        AdjustmentClass::DistributionClawback => format!(
            "{}: claws back {} of prior distributions; enters paid-in capital as {}",
            class.name(),
            adjustment.amount.abs().normalize(),
            pic_term.normalize()
        ),
        AdjustmentClass::CapitalCallRebalance => format!(
            "{}: refunds {} of called capital; enters paid-in capital as {} and is excluded from distributions",
            class.name(),
            adjustment.amount.abs().normalize(),
            pic_term.normalize()
        ),
        AdjustmentClass::Other => format!(
            "{}: enters paid-in capital as {}",
            class.name(),
            pic_term.normalize()
        ),
    };

    AdjustmentEffect {
        class,
        pic_term,
        narrative,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FundId;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn adjustment(
        adjustment_type: &str,
        category: &str,
        amount: Decimal,
        is_contribution_adjustment: bool,
    ) -> Adjustment {
        Adjustment {
            fund_id: FundId::from("fund-1"),
            adjustment_date: NaiveDate::from_ymd_opt(2023, 3, 1).unwrap(),
            adjustment_type: adjustment_type.to_string(),
            category: category.to_string(),
            amount,
            is_contribution_adjustment,
            description: String::new(),
        }
    }

    #[test]
    fn test_contribution_flag_wins() {
        let adj = adjustment("Correction", "Other", dec!(-50000), true);
        assert_eq!(classify(&adj), AdjustmentClass::CapitalCallRebalance);
    }

    #[test]
    fn test_capital_call_keyword() {
        let adj = adjustment("Rebalance of Capital Call", "Other", dec!(-50000), false);
        assert_eq!(classify(&adj), AdjustmentClass::CapitalCallRebalance);
    }

    #[test]
    fn test_clawback_keyword() {
        let adj = adjustment("Distribution Recall", "Clawback", dec!(-25000), false);
        assert_eq!(classify(&adj), AdjustmentClass::DistributionClawback);
    }

    #[test]
    fn test_unrecognized_is_other() {
        let adj = adjustment("Fee Correction", "Misc", dec!(1200), false);
        assert_eq!(classify(&adj), AdjustmentClass::Other);
    }

    #[test]
    fn test_pic_term_negates_recorded_amount() {
        let effect = resolve(&adjustment(
            "Rebalance of Capital Call",
            "Rebalance",
            dec!(-50000),
            true,
        ));
        assert_eq!(effect.pic_term, dec!(50000));
        assert!(effect.narrative.contains("50000"));
    }
}
