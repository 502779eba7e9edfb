pub mod catalog;
pub mod normalize;

pub use normalize::{normalize, CanonicalInputs};

use crate::domain::plan::{InvestmentOption, InvestmentPlan, RiskBreakdown, RiskWeights};
use catalog::InstrumentSpec;
use chrono::{DateTime, Utc};

/// Below this low-bucket amount a second low-risk line item would be too
/// small to be practically useful, so the bucket stays a single FD.
const LOW_SPLIT_THRESHOLD: i64 = 1000;

const FEEDBACK_SHIFT: f64 = 0.20;
const HIGH_FLOOR: f64 = 0.05;
const HIGH_CAP: f64 = 0.70;
const LOW_FLOOR: f64 = 0.10;
const LOW_CAP: f64 = 0.80;

/// Build a plan from canonical inputs. Total over its input domain: there is
/// no failure mode, every missing signal already degraded to a default in
/// the normalizer.
pub fn build_plan(inputs: &CanonicalInputs) -> InvestmentPlan {
    build_plan_at(inputs, Utc::now())
}

/// Same as `build_plan` with the creation time injected, which keeps the
/// computation deterministic for callers and tests.
pub fn build_plan_at(inputs: &CanonicalInputs, now: DateTime<Utc>) -> InvestmentPlan {
    let mut weights = inputs.risk_tier.base_weights();
    if let Some(feedback) = inputs.feedback.as_deref() {
        apply_feedback(&mut weights, feedback);
    }
    weights.renormalize();

    let mut options = Vec::with_capacity(5);
    expand_low(&mut options, inputs, weights.low);
    expand_medium(&mut options, inputs, weights.medium);
    expand_high(&mut options, inputs, weights.high);
    reconcile_percentages(&mut options);

    InvestmentPlan {
        total_amount: inputs.monthly_amount,
        options,
        risk_breakdown: RiskBreakdown {
            high: (weights.high * 100.0).round() as i32,
            medium: (weights.medium * 100.0).round() as i32,
            low: (weights.low * 100.0).round() as i32,
        },
        created_at: now,
    }
}

/// First match wins; contradictory feedback in one message is not supported.
/// Medium is never shifted, only high and low trade against each other.
fn apply_feedback(weights: &mut RiskWeights, feedback: &str) {
    if feedback.contains("safer") || feedback.contains("less risk") {
        weights.high = (weights.high - FEEDBACK_SHIFT).max(HIGH_FLOOR);
        weights.low = (weights.low + FEEDBACK_SHIFT).min(LOW_CAP);
    } else if feedback.contains("growth") || feedback.contains("more risk") {
        weights.high = (weights.high + FEEDBACK_SHIFT).min(HIGH_CAP);
        weights.low = (weights.low - FEEDBACK_SHIFT).max(LOW_FLOOR);
    }
}

fn tier_amount(monthly_amount: i64, weight: f64) -> i64 {
    (monthly_amount as f64 * weight).round() as i64
}

fn make_option(spec: InstrumentSpec, amount: i64, percentage: i32) -> InvestmentOption {
    InvestmentOption {
        kind: spec.kind.to_string(),
        name: spec.name.to_string(),
        amount,
        percentage,
        reason: spec.reason.to_string(),
        holding_period: spec.holding_period.to_string(),
        risk: spec.risk,
        color: spec.color.to_string(),
    }
}

fn split_option(spec: InstrumentSpec, amount: i64, weight: f64, sub_ratio: f64) -> InvestmentOption {
    make_option(
        spec,
        (amount as f64 * sub_ratio).round() as i64,
        (weight * sub_ratio * 100.0).round() as i32,
    )
}

fn expand_low(options: &mut Vec<InvestmentOption>, inputs: &CanonicalInputs, weight: f64) {
    if weight <= 0.0 {
        return;
    }
    let amount = tier_amount(inputs.monthly_amount, weight);

    if amount > LOW_SPLIT_THRESHOLD {
        options.push(split_option(catalog::GOVERNMENT_BONDS, amount, weight, 0.6));
        options.push(split_option(catalog::BANK_FD_PAIRED, amount, weight, 0.4));
    } else {
        options.push(make_option(
            catalog::BANK_FD_SOLO,
            amount,
            (weight * 100.0).round() as i32,
        ));
    }
}

fn expand_medium(options: &mut Vec<InvestmentOption>, inputs: &CanonicalInputs, weight: f64) {
    if weight <= 0.0 {
        return;
    }
    let amount = tier_amount(inputs.monthly_amount, weight);

    options.push(split_option(catalog::INDEX_FUND, amount, weight, 0.7));

    let secondary = if inputs.preference.contains("stock") {
        catalog::BLUE_CHIP_STOCKS
    } else {
        catalog::LARGE_CAP_MUTUAL_FUND
    };
    options.push(split_option(secondary, amount, weight, 0.3));
}

fn expand_high(options: &mut Vec<InvestmentOption>, inputs: &CanonicalInputs, weight: f64) {
    if weight <= 0.0 {
        return;
    }
    let amount = tier_amount(inputs.monthly_amount, weight);

    let wants_crypto = inputs.preference.contains("crypto")
        || inputs
            .feedback
            .as_deref()
            .is_some_and(|f| f.contains("crypto"));

    if wants_crypto {
        options.push(split_option(catalog::CRYPTO, amount, weight, 0.5));
        options.push(split_option(
            catalog::SMALL_CAP_ALONGSIDE_CRYPTO,
            amount,
            weight,
            0.5,
        ));
    } else {
        options.push(split_option(catalog::SMALL_CAP_STOCKS, amount, weight, 0.7));
        options.push(split_option(catalog::SECTOR_ETF, amount, weight, 0.3));
    }
}

/// Force the displayed percentages to sum to exactly 100: rescale, round,
/// and credit whatever residual remains to the first line item. The residual
/// is at most a few points, so the simple correction is acceptable.
fn reconcile_percentages(options: &mut [InvestmentOption]) {
    let total: i32 = options.iter().map(|o| o.percentage).sum();
    if total == 100 || total == 0 {
        return;
    }

    let factor = 100.0 / total as f64;
    for option in options.iter_mut() {
        option.percentage = (option.percentage as f64 * factor).round() as i32;
    }

    let adjusted: i32 = options.iter().map(|o| o.percentage).sum();
    if adjusted != 100 {
        options[0].percentage += 100 - adjusted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::plan::{Risk, RiskTier};
    use chrono::TimeZone;

    fn inputs(
        monthly_amount: i64,
        risk_tier: RiskTier,
        preference: &str,
        feedback: Option<&str>,
    ) -> CanonicalInputs {
        CanonicalInputs {
            monthly_amount,
            risk_tier,
            preference: preference.to_string(),
            feedback: feedback.map(str::to_string),
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 28, 12, 0, 0).unwrap()
    }

    #[test]
    fn moderate_1000_end_to_end() {
        let plan = build_plan_at(
            &inputs(1000, RiskTier::Moderate, "index funds", None),
            fixed_now(),
        );

        assert_eq!(plan.total_amount, 1000);
        assert_eq!(plan.options.len(), 5);

        // Low bucket is 300 (<= 1000), so a single FD.
        assert_eq!(plan.options[0].kind, "Fixed Deposits");
        assert_eq!(plan.options[0].amount, 300);
        assert_eq!(plan.options[0].percentage, 30);

        // Medium: 500 split 70/30.
        assert_eq!(plan.options[1].kind, "Index Funds");
        assert_eq!(plan.options[1].amount, 350);
        assert_eq!(plan.options[1].percentage, 35);
        assert_eq!(plan.options[2].kind, "Mutual Funds");
        assert_eq!(plan.options[2].amount, 150);
        assert_eq!(plan.options[2].percentage, 15);

        // High: 200 split 70/30.
        assert_eq!(plan.options[3].kind, "Small Cap Stocks");
        assert_eq!(plan.options[3].amount, 140);
        assert_eq!(plan.options[3].percentage, 14);
        assert_eq!(plan.options[4].kind, "Sector-specific ETFs");
        assert_eq!(plan.options[4].amount, 60);
        assert_eq!(plan.options[4].percentage, 6);

        let amount_sum: i64 = plan.options.iter().map(|o| o.amount).sum();
        assert!((amount_sum - 1000).abs() <= 1);

        assert_eq!(plan.risk_breakdown.high, 20);
        assert_eq!(plan.risk_breakdown.medium, 50);
        assert_eq!(plan.risk_breakdown.low, 30);
    }

    #[test]
    fn percentages_always_sum_to_exactly_100() {
        let tiers = [
            RiskTier::Aggressive,
            RiskTier::Conservative,
            RiskTier::Moderate,
        ];
        let feedbacks = [
            None,
            Some("make it safer"),
            Some("less risk please"),
            Some("more growth"),
            Some("i want crypto and more risk"),
        ];
        let amounts = [0, 1, 137, 999, 1000, 1001, 5000, 123_456];

        for tier in tiers {
            for feedback in feedbacks {
                for amount in amounts {
                    let plan = build_plan_at(
                        &inputs(amount, tier, "stocks and crypto", feedback),
                        fixed_now(),
                    );
                    let pct_sum: i32 = plan.options.iter().map(|o| o.percentage).sum();
                    assert_eq!(pct_sum, 100, "tier={tier:?} feedback={feedback:?} amount={amount}");

                    let breakdown_sum = plan.risk_breakdown.high
                        + plan.risk_breakdown.medium
                        + plan.risk_breakdown.low;
                    assert!((breakdown_sum - 100).abs() <= 1);
                }
            }
        }
    }

    #[test]
    fn identical_inputs_yield_identical_options() {
        let i = inputs(3456, RiskTier::Aggressive, "crypto", Some("more growth"));
        let a = build_plan_at(&i, fixed_now());
        let b = build_plan_at(&i, fixed_now());
        assert_eq!(a.options, b.options);
        assert_eq!(a.risk_breakdown, b.risk_breakdown);
    }

    #[test]
    fn low_bucket_splits_only_above_threshold() {
        // Conservative low weight is 0.6: 1666 -> 1000 exactly, 1700 -> 1020.
        let single = build_plan_at(&inputs(1666, RiskTier::Conservative, "", None), fixed_now());
        let low_count = single
            .options
            .iter()
            .filter(|o| o.risk == Risk::Low)
            .count();
        assert_eq!(low_count, 1);

        let split = build_plan_at(&inputs(1700, RiskTier::Conservative, "", None), fixed_now());
        let lows: Vec<_> = split
            .options
            .iter()
            .filter(|o| o.risk == Risk::Low)
            .collect();
        assert_eq!(lows.len(), 2);
        assert_eq!(lows[0].kind, "Government Bonds");
        assert_eq!(lows[1].kind, "Fixed Deposits");
    }

    #[test]
    fn safer_feedback_is_clamped_even_from_a_conservative_base() {
        // Conservative base is already high=0.10/low=0.60; the shift clamps
        // at the floor/cap instead of going negative or past 0.80, and the
        // clamp holds no matter how many regenerations chain the feedback.
        for _ in 0..3 {
            let mut weights = RiskTier::Conservative.base_weights();
            apply_feedback(&mut weights, "safer please");
            assert!(weights.high >= 0.05);
            assert!(weights.low <= 0.80);
            assert!((weights.high - 0.05).abs() < 1e-9);
            assert!((weights.low - 0.80).abs() < 1e-9);
        }
    }

    #[test]
    fn growth_feedback_is_clamped_at_the_cap() {
        let mut weights = RiskTier::Aggressive.base_weights();
        apply_feedback(&mut weights, "more risk");
        assert!((weights.high - 0.70).abs() < 1e-9);
        assert!((weights.low - 0.10).abs() < 1e-9);
    }

    #[test]
    fn first_feedback_match_wins() {
        // "safer" appears before the growth branch is even considered.
        let mut weights = RiskTier::Moderate.base_weights();
        apply_feedback(&mut weights, "safer but with growth");
        assert!(weights.high < RiskTier::Moderate.base_weights().high);
    }

    #[test]
    fn crypto_hint_switches_the_high_bucket_split() {
        let plan = build_plan_at(&inputs(10_000, RiskTier::Aggressive, "crypto", None), fixed_now());
        let highs: Vec<_> = plan
            .options
            .iter()
            .filter(|o| o.risk == Risk::High)
            .collect();
        assert_eq!(highs.len(), 2);
        assert_eq!(highs[0].kind, "Cryptocurrency");
        assert_eq!(highs[1].kind, "Small Cap Stocks");
        assert_eq!(highs[0].amount, highs[1].amount);

        // The hint also works through feedback text.
        let plan = build_plan_at(
            &inputs(10_000, RiskTier::Aggressive, "", Some("add crypto")),
            fixed_now(),
        );
        assert!(plan.options.iter().any(|o| o.kind == "Cryptocurrency"));
    }

    #[test]
    fn stock_preference_switches_the_medium_secondary() {
        let plan = build_plan_at(&inputs(5000, RiskTier::Moderate, "stocks", None), fixed_now());
        assert!(plan.options.iter().any(|o| o.kind == "Blue-chip Stocks"));
        assert!(!plan.options.iter().any(|o| o.kind == "Mutual Funds"));
    }

    #[test]
    fn residual_lands_on_the_first_option() {
        // Moderate + safer clamps high at 0.05 before renormalizing, which
        // leaves the rounded percentages at 99. The missing point is
        // credited to the first option (government bonds at 29 -> 30).
        let plan = build_plan_at(
            &inputs(5000, RiskTier::Moderate, "crypto", Some("safer")),
            fixed_now(),
        );
        assert_eq!(plan.options[0].kind, "Government Bonds");
        assert_eq!(plan.options[0].percentage, 30);
        let pct_sum: i32 = plan.options.iter().map(|o| o.percentage).sum();
        assert_eq!(pct_sum, 100);
    }
}
