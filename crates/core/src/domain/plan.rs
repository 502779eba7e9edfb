use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse risk bucket attached to a single line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Risk {
    High,
    Medium,
    Low,
}

/// Risk profile derived from the user's stated tolerance. The weight table
/// lives on the variant so tier classification and allocation stay separate
/// concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskTier {
    Aggressive,
    Conservative,
    Moderate,
}

impl RiskTier {
    pub fn base_weights(self) -> RiskWeights {
        match self {
            RiskTier::Aggressive => RiskWeights {
                high: 0.50,
                medium: 0.30,
                low: 0.20,
            },
            RiskTier::Conservative => RiskWeights {
                high: 0.10,
                medium: 0.30,
                low: 0.60,
            },
            RiskTier::Moderate => RiskWeights {
                high: 0.20,
                medium: 0.50,
                low: 0.30,
            },
        }
    }
}

/// Fractional split of the monthly amount across risk buckets.
/// Sums to 1 after `renormalize`; never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskWeights {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl RiskWeights {
    pub fn renormalize(&mut self) {
        let total = self.high + self.medium + self.low;
        self.high /= total;
        self.medium /= total;
        self.low /= total;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentOption {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub amount: i64,
    pub percentage: i32,
    pub reason: String,
    pub holding_period: String,
    pub risk: Risk,
    pub color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskBreakdown {
    pub high: i32,
    pub medium: i32,
    pub low: i32,
}

/// Final allocation artifact. Immutable once built; regeneration always
/// produces a fresh plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentPlan {
    pub total_amount: i64,
    pub options: Vec<InvestmentOption>,
    pub risk_breakdown: RiskBreakdown,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_weights_sum_to_one() {
        for tier in [
            RiskTier::Aggressive,
            RiskTier::Conservative,
            RiskTier::Moderate,
        ] {
            let w = tier.base_weights();
            assert!((w.high + w.medium + w.low - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn renormalize_restores_unit_sum() {
        let mut w = RiskWeights {
            high: 0.3,
            medium: 0.5,
            low: 0.5,
        };
        w.renormalize();
        assert!((w.high + w.medium + w.low - 1.0).abs() < 1e-9);
    }

    #[test]
    fn option_serializes_with_wire_names() {
        let option = InvestmentOption {
            kind: "Index Funds".to_string(),
            name: "Nifty 50 Index Fund".to_string(),
            amount: 350,
            percentage: 35,
            reason: "r".to_string(),
            holding_period: "3-5 years".to_string(),
            risk: Risk::Medium,
            color: "#336699".to_string(),
        };
        let v = serde_json::to_value(&option).unwrap();
        assert_eq!(v["type"], "Index Funds");
        assert_eq!(v["holdingPeriod"], "3-5 years");
        assert_eq!(v["risk"], "Medium");
    }
}
