use crate::config::Settings;
use crate::domain::profile::UserAnswers;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::json::{self, InterviewTurnContract};
use crate::llm::{ExtractorClient, OracleInput, OracleReply, Provider};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
const DEFAULT_MAX_TOKENS: u32 = 1024;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

const TOOL_NAME_EMIT_TURN: &str = "emit_interview_turn";

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_anthropic_api_key()?.to_string();
        let base_url =
            std::env::var("ANTHROPIC_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let max_tokens = std::env::var("ANTHROPIC_MAX_TOKENS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_TOKENS);

        let timeout_secs = std::env::var("ANTHROPIC_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
            max_tokens,
        })
    }

    async fn create_message(
        &self,
        req: CreateMessageRequest,
    ) -> anyhow::Result<CreateMessageResponse> {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_str(&self.api_key)?);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .headers(headers)
            .json(&req)
            .send()
            .await
            .context("Anthropic request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Anthropic response body")?;
        if !status.is_success() {
            let raw_response_json = serde_json::from_str::<serde_json::Value>(&text).ok();
            return Err(LlmDiagnosticsError {
                provider: Provider::Anthropic,
                stage: "http",
                detail: format!("status={status}"),
                raw_output: Some(text),
                raw_response_json,
            }
            .into());
        }

        serde_json::from_str::<CreateMessageResponse>(&text)
            .with_context(|| format!("failed to decode Anthropic response: {text}"))
    }

    fn tools() -> Vec<Tool> {
        // Minimal JSON schema for the interview-turn contract. Keep it
        // strict and explicit to maximize compliance.
        let answer_fields = [
            "monthly_investment",
            "preference",
            "risk_tolerance",
            "goal",
            "age",
            "income",
            "experience",
            "time_horizon",
        ];
        let mut answer_props = serde_json::Map::new();
        for field in answer_fields {
            answer_props.insert(
                field.to_string(),
                serde_json::json!({"type": ["string", "null"]}),
            );
        }

        let schema = serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "required": ["message"],
            "properties": {
                "message": {"type": "string"},
                "answers": {
                    "type": ["object", "null"],
                    "additionalProperties": false,
                    "properties": serde_json::Value::Object(answer_props),
                }
            }
        });

        vec![Tool {
            name: TOOL_NAME_EMIT_TURN,
            description: "Emit the next advisor question and any profile answers extracted from the conversation",
            input_schema: schema,
        }]
    }

    fn tool_choice() -> ToolChoice {
        ToolChoice::Tool {
            name: TOOL_NAME_EMIT_TURN,
        }
    }

    fn system_prompt() -> String {
        [
            "You are a financial advisor collecting an investment profile through a short chat.",
            "Core fields (priority order): monthly investment amount, risk tolerance, financial goal, investment preference.",
            "Optional fields: age, income level, investment experience, time horizon.",
            "Each turn: extract any answers from the user's latest message, then ask ONE concise question (1-2 sentences) for the first missing core field, then optional fields.",
            "If every core field is collected, acknowledge completion instead of asking.",
            "Return ONLY valid JSON. Do not wrap in markdown. Do not include any extra keys.",
            "Output schema:",
            "{",
            "  \"message\": \"next advisor question or acknowledgement\",",
            "  \"answers\": {",
            "    \"monthly_investment\": \"$1000 per month\",",
            "    \"preference\": null,",
            "    \"risk_tolerance\": null,",
            "    \"goal\": null,",
            "    \"age\": null,",
            "    \"income\": null,",
            "    \"experience\": null,",
            "    \"time_horizon\": null",
            "  }",
            "}",
            "Rules:",
            "- message must be non-empty",
            "- answers keys are optional; include only fields the conversation supports",
            "- never invent answers the user did not give",
        ]
        .join("\n")
    }

    fn user_prompt(input: &OracleInput) -> String {
        format!(
            "Profile status:\n{}\nRecent chat:\n{}\nTask: Ask for the first missing core field, then optional fields. If all core fields are complete, acknowledge.",
            profile_status(&input.answers),
            {
                let transcript = input.recent_transcript();
                if transcript.is_empty() {
                    "Starting\n".to_string()
                } else {
                    transcript
                }
            }
        )
    }

    fn repair_prompt(previous_output: &str) -> String {
        format!(
            "Your previous message was NOT valid JSON.\n\n\
TASK: Output ONLY a single JSON object with a non-empty \"message\" string and an optional \"answers\" object.\n\
- Do NOT include any markdown, prose, or code fences.\n\
- Do NOT include trailing commas, comments, or semicolons.\n\
- Use double quotes for all JSON strings.\n\n\
INVALID OUTPUT (for reference only; DO NOT copy verbatim):\n{previous_output}"
        )
    }

    fn response_text(res: &CreateMessageResponse) -> String {
        let mut out = String::new();
        for block in &res.content {
            match block {
                ContentBlock::Text { text } => {
                    if !out.is_empty() {
                        out.push('\n');
                    }
                    out.push_str(text);
                }
                ContentBlock::ToolUse { .. } => {
                    // Prefer tool output parsing when tools are enabled.
                    // Callers should use `response_tool_turn`.
                    continue;
                }
                ContentBlock::Thinking { .. } | ContentBlock::RedactedThinking { .. } => {
                    // Ignore.
                }
                ContentBlock::Unknown => {
                    // Ignore unknown blocks.
                }
            }
        }
        out
    }

    fn response_tool_turn(
        res: &CreateMessageResponse,
    ) -> anyhow::Result<Option<InterviewTurnContract>> {
        for block in &res.content {
            if let ContentBlock::ToolUse { name, input, .. } = block {
                if name == TOOL_NAME_EMIT_TURN {
                    let parsed = serde_json::from_value::<InterviewTurnContract>(input.clone())
                        .context("failed to decode tool_use.input into InterviewTurnContract")?;
                    return Ok(Some(parsed));
                }
            }
        }
        Ok(None)
    }

    async fn try_parse_with_repairs(
        &self,
        input: &OracleInput,
        initial_text: String,
    ) -> anyhow::Result<OracleReply> {
        match json::parse_reply(&initial_text, &input.answers) {
            Ok(reply) => Ok(reply),
            Err(first_err) => {
                let mut last_err = first_err;
                let mut last_text = initial_text;

                // Repair attempts: 2
                for attempt in 1..=2u32 {
                    let repair_req = CreateMessageRequest {
                        model: self.model.clone(),
                        max_tokens: self.max_tokens,
                        system: Some(Self::system_prompt()),
                        messages: vec![Message {
                            role: "user",
                            content: Self::repair_prompt(&last_text),
                        }],
                        tools: Some(Self::tools()),
                        tool_choice: Some(Self::tool_choice()),
                    };

                    let repair_res = self.create_message(repair_req).await?;
                    if let Some(turn) = Self::response_tool_turn(&repair_res)? {
                        return turn.validate_and_into_reply(&input.answers);
                    }
                    let repair_text = Self::response_text(&repair_res);
                    match json::parse_reply(&repair_text, &input.answers) {
                        Ok(reply) => return Ok(reply),
                        Err(err) => {
                            last_err = err;
                            last_text = repair_text;
                            tracing::warn!(
                                attempt,
                                error = %last_err,
                                "LLM output still invalid after repair attempt"
                            );
                        }
                    }
                }

                Err(LlmDiagnosticsError {
                    provider: Provider::Anthropic,
                    stage: "parse_after_repair",
                    detail: format!("final_error={last_err}"),
                    raw_output: Some(last_text),
                    raw_response_json: None,
                }
                .into())
            }
        }
    }
}

#[async_trait::async_trait]
impl ExtractorClient for AnthropicClient {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn next_turn(&self, input: OracleInput) -> anyhow::Result<OracleReply> {
        let make_req = |max_tokens: u32| CreateMessageRequest {
            model: self.model.clone(),
            max_tokens,
            system: Some(Self::system_prompt()),
            messages: vec![Message {
                role: "user",
                content: Self::user_prompt(&input),
            }],
            tools: Some(Self::tools()),
            tool_choice: Some(Self::tool_choice()),
        };

        let mut res = self.create_message(make_req(self.max_tokens)).await?;

        // If the model hit max_tokens, retry once with a higher ceiling.
        if matches!(res.stop_reason.as_deref(), Some("max_tokens")) {
            let bumped = self.max_tokens.saturating_mul(2).max(2048);
            tracing::warn!(
                from = self.max_tokens,
                to = bumped,
                "Anthropic stop_reason=max_tokens; retrying once with higher max_tokens"
            );
            res = self.create_message(make_req(bumped)).await?;
        }

        // Tool output path.
        if let Some(turn) = Self::response_tool_turn(&res)? {
            return turn.validate_and_into_reply(&input.answers);
        }

        // Fallback to text (should be rare).
        let text = Self::response_text(&res);
        self.try_parse_with_repairs(&input, text).await
    }
}

fn profile_status(answers: &UserAnswers) -> String {
    let mut collected = Vec::new();
    let mut core_missing = Vec::new();
    let mut optional_missing = Vec::new();

    let core = [
        ("Monthly amount", &answers.monthly_investment),
        ("Investment preference", &answers.preference),
        ("Risk tolerance", &answers.risk_tolerance),
        ("Financial goal", &answers.goal),
    ];
    for (label, value) in core {
        match value {
            Some(v) => collected.push(format!("{label}: {v}")),
            None => core_missing.push(label),
        }
    }

    let optional = [
        ("Age", &answers.age),
        ("Income level", &answers.income),
        ("Investment experience", &answers.experience),
        ("Time horizon", &answers.time_horizon),
    ];
    for (label, value) in optional {
        match value {
            Some(v) => collected.push(format!("{label}: {v}")),
            None => optional_missing.push(label),
        }
    }

    let join = |items: Vec<String>| {
        if items.is_empty() {
            "None".to_string()
        } else {
            items.join(", ")
        }
    };

    format!(
        "Collected: {}\nCore missing: {}\nOptional missing: {}\n",
        join(collected),
        join(core_missing.iter().map(|s| s.to_string()).collect()),
        join(optional_missing.iter().map(|s| s.to_string()).collect()),
    )
}

#[derive(Debug, Clone, Serialize)]
struct CreateMessageRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,

    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlock>,

    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct Tool {
    name: &'static str,
    description: &'static str,
    input_schema: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
enum ToolChoice {
    #[serde(rename = "tool")]
    Tool { name: &'static str },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "tool_use")]
    ToolUse {
        #[serde(default)]
        id: String,
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },

    #[serde(rename = "thinking")]
    Thinking {
        #[serde(default)]
        thinking: String,
        #[serde(default)]
        signature: String,
    },

    #[serde(rename = "redacted_thinking")]
    RedactedThinking {
        #[serde(default)]
        data: String,
    },

    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_tool_use_turn_input() {
        let tool_input = json!({
            "message": "What's your primary financial goal?",
            "answers": {"risk_tolerance": "medium risk"},
        });

        let res = CreateMessageResponse {
            content: vec![ContentBlock::ToolUse {
                id: "toolu_1".to_string(),
                name: TOOL_NAME_EMIT_TURN.to_string(),
                input: tool_input,
            }],
            stop_reason: None,
        };

        let turn = AnthropicClient::response_tool_turn(&res).unwrap().unwrap();
        let reply = turn
            .validate_and_into_reply(&UserAnswers::default())
            .unwrap();
        assert!(reply.message.contains("financial goal"));
        assert_eq!(
            reply.updated_answers.risk_tolerance.as_deref(),
            Some("medium risk")
        );
    }

    #[test]
    fn profile_status_lists_missing_core_fields() {
        let answers = UserAnswers {
            monthly_investment: Some("$500 per month".to_string()),
            ..Default::default()
        };
        let status = profile_status(&answers);
        assert!(status.contains("Collected: Monthly amount: $500 per month"));
        assert!(status.contains("Core missing: Investment preference, Risk tolerance, Financial goal"));
    }
}
