//! Deterministic keyword extraction over a single user message, plus the
//! scripted interview questions. This is the offline path: it runs before
//! the remote oracle on every turn and stands in for it entirely when the
//! oracle is unreachable.

use crate::domain::profile::UserAnswers;

pub const INITIAL_QUESTION: &str = "Welcome! I'll help you create your investment profile. To get started, what specific amount can you invest monthly? (e.g., $500, $1000, $2000)";

pub const COMPLETION_MESSAGE: &str = "Perfect! I have all the information needed. Your investment profile is complete and ready for plan generation.";

const AGE_RANGES: &[(&str, &[&str])] = &[
    ("20s", &["20s", "twenties"]),
    ("30s", &["30s", "thirties"]),
    ("40s", &["40s", "forties"]),
    ("50s", &["50s", "fifties"]),
    ("60+", &["60s", "sixties", "retirement age", "senior"]),
];

const INCOME_LEVELS: &[(&str, &[&str])] = &[
    ("low income", &["low income", "below 50k", "limited income", "tight budget"]),
    ("medium income", &["middle income", "average income", "decent salary"]),
    ("high income", &["high income", "above 100k", "well paid", "good salary"]),
    ("very high income", &["very high income", "above 200k", "wealthy"]),
];

const EXPERIENCE_LEVELS: &[(&str, &[&str])] = &[
    ("beginner investor", &["beginner", "new to investing", "never invested", "starting out", "novice"]),
    ("intermediate investor", &["intermediate", "some experience", "few years", "moderate experience"]),
    ("advanced investor", &["advanced", "experienced", "expert", "many years", "professional"]),
];

const TIME_HORIZONS: &[(&str, &[&str])] = &[
    ("short term", &["short term", "1-3 years", "immediate", "soon"]),
    ("medium term", &["medium term", "3-10 years", "several years", "mid term"]),
    ("long term", &["long term", "10+ years", "retirement", "decades"]),
];

const RISK_LEVELS: &[(&str, &[&str])] = &[
    ("low risk", &["low risk", "safe", "conservative", "stable", "secure", "cautious"]),
    ("medium risk", &["medium risk", "moderate", "balanced", "medium", "average"]),
    ("high risk", &["high risk", "aggressive", "risky", "growth", "volatile"]),
];

const PREFERENCES: &[(&str, &[&str])] = &[
    ("conservative investments", &["conservative", "bonds", "cds", "safe investments", "fixed deposits"]),
    ("moderate investments", &["moderate", "balanced", "mixed", "diversified", "mutual funds"]),
    ("aggressive investments", &["aggressive", "stocks", "equity", "growth stocks", "high growth", "crypto"]),
];

const GOALS: &[(&str, &[&str])] = &[
    ("retirement planning", &["retirement", "retire", "pension", "old age"]),
    ("house planning", &["house", "home", "property", "down payment", "mortgage"]),
    ("education planning", &["education", "school", "college", "university", "study"]),
    ("emergency planning", &["emergency", "backup", "contingency"]),
];

/// Fold whatever the message reveals into the current answers. Fields
/// already collected are never overwritten.
pub fn extract_answers(message: &str, current: &UserAnswers) -> UserAnswers {
    let lower = message.to_lowercase();
    let mut updated = current.clone();

    if updated.monthly_investment.is_none() {
        if let Some(amount) = first_number(&lower) {
            updated.monthly_investment = Some(format!("${amount} per month"));
        }
    }

    if updated.age.is_none() {
        updated.age = match_keyword(&lower, AGE_RANGES);
    }
    if updated.income.is_none() {
        updated.income = match_keyword(&lower, INCOME_LEVELS);
    }
    if updated.experience.is_none() {
        updated.experience = match_keyword(&lower, EXPERIENCE_LEVELS);
    }
    if updated.time_horizon.is_none() {
        updated.time_horizon = match_keyword(&lower, TIME_HORIZONS);
    }
    if updated.risk_tolerance.is_none() {
        updated.risk_tolerance = match_keyword(&lower, RISK_LEVELS);
    }
    if updated.preference.is_none() {
        updated.preference = match_keyword(&lower, PREFERENCES);
    }
    if updated.goal.is_none() {
        updated.goal = match_keyword(&lower, GOALS);
    }

    updated
}

/// Next question to ask when the remote oracle is unavailable: core fields
/// first, then the optional ones that sharpen the profile.
pub fn fallback_question(answers: &UserAnswers) -> &'static str {
    if answers.monthly_investment.is_none() {
        "What amount can you invest monthly? (e.g., $500, $1000, $2000)"
    } else if answers.risk_tolerance.is_none() {
        "What's your risk tolerance: low (safe), medium (balanced), or high (aggressive)?"
    } else if answers.goal.is_none() {
        "What's your primary financial goal: retirement, house down payment, education, or emergency fund?"
    } else if answers.preference.is_none() {
        "Investment preference: conservative (bonds/CDs), moderate (balanced funds), or aggressive (stocks)?"
    } else if answers.age.is_none() {
        "What's your age range? (20s, 30s, 40s, 50s+)"
    } else if answers.experience.is_none() {
        "Investment experience: beginner, intermediate, or advanced?"
    } else {
        "Great! I have enough information to create your investment profile."
    }
}

fn match_keyword(lower: &str, table: &[(&'static str, &[&str])]) -> Option<String> {
    for (value, keywords) in table {
        if keywords.iter().any(|k| lower.contains(k)) {
            return Some((*value).to_string());
        }
    }
    None
}

/// First run of digits in the text, tolerating thousands separators
/// ("1,000" reads as 1000). Returns the digits only.
fn first_number(text: &str) -> Option<String> {
    let mut digits = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else if c == ',' && !digits.is_empty() && chars.peek().is_some_and(|n| n.is_ascii_digit())
        {
            // Separator inside a number; skip it.
            continue;
        } else if !digits.is_empty() {
            break;
        }
    }

    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_monthly_amount_with_separators() {
        let updated = extract_answers("I can invest $1,000 per month", &UserAnswers::default());
        assert_eq!(
            updated.monthly_investment.as_deref(),
            Some("$1000 per month")
        );
    }

    #[test]
    fn extracts_several_fields_from_one_message() {
        let updated = extract_answers(
            "I'm in my 30s, beginner, saving for retirement, low risk please",
            &UserAnswers::default(),
        );
        assert_eq!(updated.age.as_deref(), Some("30s"));
        assert_eq!(updated.experience.as_deref(), Some("beginner investor"));
        assert_eq!(updated.goal.as_deref(), Some("retirement planning"));
        assert_eq!(updated.risk_tolerance.as_deref(), Some("low risk"));
    }

    #[test]
    fn never_overwrites_collected_answers() {
        let current = UserAnswers {
            monthly_investment: Some("$500 per month".to_string()),
            risk_tolerance: Some("high risk".to_string()),
            ..Default::default()
        };
        let updated = extract_answers("make it 2000 and keep it safe", &current);
        assert_eq!(
            updated.monthly_investment.as_deref(),
            Some("$500 per month")
        );
        assert_eq!(updated.risk_tolerance.as_deref(), Some("high risk"));
    }

    #[test]
    fn fallback_questions_follow_the_core_first_script() {
        let mut answers = UserAnswers::default();
        assert!(fallback_question(&answers).contains("monthly"));

        answers.monthly_investment = Some("$500 per month".to_string());
        assert!(fallback_question(&answers).contains("risk tolerance"));

        answers.risk_tolerance = Some("medium risk".to_string());
        assert!(fallback_question(&answers).contains("financial goal"));

        answers.goal = Some("retirement planning".to_string());
        assert!(fallback_question(&answers).contains("preference"));
    }

    #[test]
    fn first_number_ignores_trailing_commas() {
        assert_eq!(first_number("1,000 dollars"), Some("1000".to_string()));
        assert_eq!(first_number("maybe 500, or so"), Some("500".to_string()));
        assert_eq!(first_number("no digits here"), None);
    }
}
