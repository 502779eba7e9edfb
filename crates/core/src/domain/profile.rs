use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    Ai,
    User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub message: String,
}

/// Partially collected onboarding answers. Everything is free text until the
/// normalizer turns it into canonical inputs; `goal` and the optional fields
/// are persisted but never consumed by the allocation engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAnswers {
    pub monthly_investment: Option<String>,
    pub preference: Option<String>,
    pub risk_tolerance: Option<String>,
    pub goal: Option<String>,
    pub age: Option<String>,
    pub income: Option<String>,
    pub experience: Option<String>,
    pub time_horizon: Option<String>,
}

impl UserAnswers {
    /// Profile completion rule: the four core fields must carry meaningful
    /// text. Short answers like "ok" and the literal "undefined" sent by
    /// some clients do not count.
    pub fn is_complete(&self) -> bool {
        [
            &self.monthly_investment,
            &self.preference,
            &self.risk_tolerance,
            &self.goal,
        ]
        .iter()
        .all(|field| Self::is_meaningful(field.as_deref()))
    }

    fn is_meaningful(value: Option<&str>) -> bool {
        match value {
            Some(s) => {
                let s = s.trim();
                s.len() > 2 && s != "undefined"
            }
            None => false,
        }
    }

    /// Fill any answer still missing from `other`. Used when merging the
    /// oracle's extraction over locally extracted answers.
    pub fn merge_missing_from(&mut self, other: &UserAnswers) {
        fn fill(dst: &mut Option<String>, src: &Option<String>) {
            if dst.is_none() {
                if let Some(s) = src {
                    let s = s.trim();
                    if !s.is_empty() {
                        *dst = Some(s.to_string());
                    }
                }
            }
        }

        fill(&mut self.monthly_investment, &other.monthly_investment);
        fill(&mut self.preference, &other.preference);
        fill(&mut self.risk_tolerance, &other.risk_tolerance);
        fill(&mut self.goal, &other.goal);
        fill(&mut self.age, &other.age);
        fill(&mut self.income, &other.income);
        fill(&mut self.experience, &other.experience);
        fill(&mut self.time_horizon, &other.time_horizon);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn core_answers() -> UserAnswers {
        UserAnswers {
            monthly_investment: Some("$1000 per month".to_string()),
            preference: Some("index funds".to_string()),
            risk_tolerance: Some("medium risk".to_string()),
            goal: Some("retirement planning".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn complete_when_core_fields_present() {
        assert!(core_answers().is_complete());
    }

    #[test]
    fn incomplete_when_core_field_missing() {
        let mut answers = core_answers();
        answers.goal = None;
        assert!(!answers.is_complete());
    }

    #[test]
    fn short_or_undefined_values_do_not_count() {
        let mut answers = core_answers();
        answers.risk_tolerance = Some("ok".to_string());
        assert!(!answers.is_complete());

        answers.risk_tolerance = Some("undefined".to_string());
        assert!(!answers.is_complete());
    }

    #[test]
    fn merge_fills_only_missing_fields() {
        let mut answers = UserAnswers {
            monthly_investment: Some("$500".to_string()),
            ..Default::default()
        };
        let oracle = UserAnswers {
            monthly_investment: Some("$900".to_string()),
            goal: Some("house planning".to_string()),
            ..Default::default()
        };
        answers.merge_missing_from(&oracle);
        assert_eq!(answers.monthly_investment.as_deref(), Some("$500"));
        assert_eq!(answers.goal.as_deref(), Some("house planning"));
    }
}
