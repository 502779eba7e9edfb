use crate::domain::profile::UserAnswers;
use crate::llm::OracleReply;
use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};

/// Shape the oracle is asked to emit: the next advisor message plus any
/// answers it extracted from the conversation. Both the tool-use path and
/// the plain-text fallback decode into this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewTurnContract {
    pub message: String,
    #[serde(default)]
    pub answers: Option<UserAnswers>,
}

impl InterviewTurnContract {
    pub fn validate_and_into_reply(self, current: &UserAnswers) -> anyhow::Result<OracleReply> {
        let message = self.message.trim().to_string();
        ensure!(!message.is_empty(), "oracle message must be non-empty");

        // Answers already collected win over the oracle's re-extraction; the
        // oracle only fills gaps.
        let mut updated = current.clone();
        if let Some(extracted) = self.answers {
            updated.merge_missing_from(&extracted);
        }

        Ok(OracleReply {
            message,
            updated_answers: updated,
        })
    }
}

pub fn extract_json(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.starts_with("```") {
        // Remove Markdown fences (```json ... ``` or ``` ... ```).
        let mut inner = trimmed;
        if let Some(after_first) = inner.splitn(2, '\n').nth(1) {
            inner = after_first;
        }
        if let Some(end) = inner.rfind("```") {
            inner = &inner[..end];
        }
        return Some(inner.trim().to_string());
    }

    // Best-effort extraction: first '{' to last '}'.
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(trimmed[start..=end].trim().to_string())
}

pub fn parse_reply(text: &str, current: &UserAnswers) -> anyhow::Result<OracleReply> {
    let json_str = extract_json(text).unwrap_or_else(|| text.trim().to_string());
    let parsed = serde_json::from_str::<InterviewTurnContract>(&json_str)
        .with_context(|| format!("LLM output is not valid JSON for interview schema: {json_str}"))?;
    parsed.validate_and_into_reply(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extract_json_handles_fenced_blocks() {
        let body = "{\"a\":1}";
        let fenced = format!("```json\n{body}\n```\n");
        assert_eq!(extract_json(&fenced), Some(body.to_string()));
    }

    #[test]
    fn extract_json_falls_back_to_braces() {
        let s = "prefix {\"a\":1} suffix";
        assert_eq!(extract_json(s), Some("{\"a\":1}".to_string()));
    }

    #[test]
    fn parse_reply_accepts_valid_json() {
        let text = json!({
            "message": "What's your risk tolerance: low, medium, or high?",
            "answers": {
                "monthly_investment": "$1000 per month",
            },
        })
        .to_string();

        let reply = parse_reply(&text, &UserAnswers::default()).unwrap();
        assert!(reply.message.contains("risk tolerance"));
        assert_eq!(
            reply.updated_answers.monthly_investment.as_deref(),
            Some("$1000 per month")
        );
    }

    #[test]
    fn parse_reply_rejects_empty_message() {
        let text = json!({"message": "   "}).to_string();
        assert!(parse_reply(&text, &UserAnswers::default()).is_err());
    }

    #[test]
    fn oracle_extraction_never_overwrites_collected_answers() {
        let current = UserAnswers {
            monthly_investment: Some("$500".to_string()),
            ..Default::default()
        };
        let text = json!({
            "message": "Noted.",
            "answers": {"monthly_investment": "$9999"},
        })
        .to_string();

        let reply = parse_reply(&text, &current).unwrap();
        assert_eq!(
            reply.updated_answers.monthly_investment.as_deref(),
            Some("$500")
        );
    }

    #[test]
    fn parse_reply_accepts_missing_answers_key() {
        let text = json!({"message": "And your goal?"}).to_string();
        let reply = parse_reply(&text, &UserAnswers::default()).unwrap();
        assert_eq!(reply.updated_answers, UserAnswers::default());
    }
}
