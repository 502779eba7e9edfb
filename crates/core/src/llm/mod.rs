pub mod anthropic;
pub mod error;
pub mod json;
pub mod keyword;

use crate::domain::profile::{ChatMessage, MessageRole, UserAnswers};

/// One conversation turn handed to the answer-extraction oracle: the chat so
/// far plus the answers already collected.
#[derive(Debug, Clone)]
pub struct OracleInput {
    pub chat_history: Vec<ChatMessage>,
    pub answers: UserAnswers,
}

impl OracleInput {
    /// Compact textual view of the last few messages. Older turns add tokens
    /// without adding signal; the collected answers carry that state.
    pub fn recent_transcript(&self) -> String {
        let recent = if self.chat_history.len() > 2 {
            &self.chat_history[self.chat_history.len() - 2..]
        } else {
            &self.chat_history[..]
        };

        let mut out = String::new();
        for msg in recent {
            let role = match msg.role {
                MessageRole::User => "User",
                MessageRole::Ai => "Advisor",
            };
            out.push_str(role);
            out.push_str(": ");
            out.push_str(&msg.message);
            out.push('\n');
        }
        out
    }
}

/// The oracle's answer: the next advisor message and the answer set after
/// folding in whatever the latest user message revealed.
#[derive(Debug, Clone)]
pub struct OracleReply {
    pub message: String,
    pub updated_answers: UserAnswers,
}

#[derive(Debug, Clone, Copy)]
pub enum Provider {
    Anthropic,
}

#[async_trait::async_trait]
pub trait ExtractorClient: Send + Sync {
    fn provider(&self) -> Provider;

    async fn next_turn(&self, input: OracleInput) -> anyhow::Result<OracleReply>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_transcript_keeps_only_the_last_two_messages() {
        let input = OracleInput {
            chat_history: vec![
                ChatMessage {
                    role: MessageRole::Ai,
                    message: "first".to_string(),
                },
                ChatMessage {
                    role: MessageRole::User,
                    message: "second".to_string(),
                },
                ChatMessage {
                    role: MessageRole::Ai,
                    message: "third".to_string(),
                },
            ],
            answers: UserAnswers::default(),
        };

        let transcript = input.recent_transcript();
        assert!(!transcript.contains("first"));
        assert!(transcript.contains("User: second"));
        assert!(transcript.contains("Advisor: third"));
    }
}
