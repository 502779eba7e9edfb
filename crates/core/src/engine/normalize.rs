use crate::domain::plan::RiskTier;
use crate::domain::profile::UserAnswers;

/// Used whenever the stated monthly amount carries no digits at all.
/// Malformed input degrades to a sane default instead of failing the flow.
const DEFAULT_MONTHLY_AMOUNT: i64 = 5000;

/// Parsed, normalized form of the raw profile text. Produced fresh per plan
/// request and handed to the allocation engine.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalInputs {
    pub monthly_amount: i64,
    pub risk_tier: RiskTier,
    pub preference: String,
    pub feedback: Option<String>,
}

pub fn normalize(answers: &UserAnswers, feedback: Option<&str>) -> CanonicalInputs {
    CanonicalInputs {
        monthly_amount: parse_monthly_amount(answers.monthly_investment.as_deref().unwrap_or("")),
        risk_tier: classify_risk_tier(answers.risk_tolerance.as_deref().unwrap_or("")),
        preference: answers
            .preference
            .as_deref()
            .unwrap_or("")
            .to_lowercase(),
        feedback: feedback
            .map(|s| s.to_lowercase())
            .filter(|s| !s.trim().is_empty()),
    }
}

/// Strip everything that is not a digit and parse the rest. "$1,000/mo"
/// parses as 1000; digit-free input falls back to the default.
pub fn parse_monthly_amount(raw: &str) -> i64 {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(DEFAULT_MONTHLY_AMOUNT)
}

/// Keyword classification over free text. Unrecognized or empty input is
/// moderate; this never signals an error.
pub fn classify_risk_tier(raw: &str) -> RiskTier {
    let lower = raw.to_lowercase();
    if lower.contains("aggressive") || lower.contains("high") {
        RiskTier::Aggressive
    } else if lower.contains("conservative") || lower.contains("low") {
        RiskTier::Conservative
    } else {
        RiskTier::Moderate
    }
}
