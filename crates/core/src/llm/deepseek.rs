use crate::config::Settings;
use crate::error::GenerationError;
use crate::llm::{LlmClient, ModelChoice};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.deepseek.com";
const DEFAULT_MODEL: ModelChoice = ModelChoice::R1;
const DEFAULT_MAX_TOKENS: u32 = 2048;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const TIMEOUT_RETRY_BACKOFF: Duration = Duration::from_secs(1);

const SYSTEM_PROMPT: &str = "You are a revenue-management assistant for a hotel chain. \
Follow the output schema in the user message exactly.";

#[derive(Debug, Clone)]
pub struct DeepSeekClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: ModelChoice,
    max_tokens: u32,
}

impl DeepSeekClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_deepseek_api_key()?.to_string();
        let base_url = settings
            .deepseek_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model = match settings.deepseek_model.as_deref() {
            Some(s) => ModelChoice::parse(s)?,
            None => DEFAULT_MODEL,
        };
        let max_tokens = std::env::var("DEEPSEEK_MAX_TOKENS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_TOKENS);
        let timeout_secs = std::env::var("DEEPSEEK_TIMEOUT_SECS")
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

    async fn chat_once(&self, prompt: &str) -> anyhow::Result<(String, serde_json::Value)> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))?,
        );

        let req = ChatCompletionRequest {
            model: self.model.model_id(),
            max_tokens: self.max_tokens,
            messages: vec![
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                Message {
                    role: "user",
                    content: prompt.to_string(),
                },
            ],
        };

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let res = self.http.post(url).headers(headers).json(&req).send().await;

        let res = match res {
            Ok(res) => res,
            Err(err) if err.is_timeout() => {
                return Err(GenerationError::Timeout {
                    detail: err.to_string(),
                }
                .into());
            }
            Err(err) => {
                return Err(GenerationError::Upstream {
                    status: None,
                    detail: format!("request failed: {err}"),
                    raw_output: None,
                }
                .into());
            }
        };

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read model response body")?;

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(GenerationError::Authentication {
                detail: format!("model service rejected credential (status={status})"),
            }
            .into());
        }
        if !status.is_success() {
            return Err(GenerationError::Upstream {
                status: Some(status.as_u16()),
                detail: format!("non-success status {status}"),
                raw_output: Some(text),
            }
            .into());
        }

        let raw_json = serde_json::from_str::<serde_json::Value>(&text).map_err(|err| {
            GenerationError::Upstream {
                status: Some(status.as_u16()),
                detail: format!("response is not valid JSON: {err}"),
                raw_output: Some(text.clone()),
            }
        })?;
        let parsed =
            serde_json::from_value::<ChatCompletionResponse>(raw_json.clone()).map_err(|err| {
                GenerationError::Upstream {
                    status: Some(status.as_u16()),
                    detail: format!("unexpected response envelope: {err}"),
                    raw_output: Some(text.clone()),
                }
            })?;

        let content = assistant_text(&parsed).ok_or_else(|| GenerationError::Upstream {
            status: Some(status.as_u16()),
            detail: "response contains no assistant message".to_string(),
            raw_output: Some(text),
        })?;

        Ok((content, raw_json))
    }
}

fn assistant_text(res: &ChatCompletionResponse) -> Option<String> {
    let content = res.choices.first()?.message.content.trim();
    if content.is_empty() {
        return None;
    }
    Some(content.to_string())
}

#[async_trait::async_trait]
impl LlmClient for DeepSeekClient {
    fn model(&self) -> ModelChoice {
        self.model
    }

    /// Timeouts are retried exactly once after a short backoff.
    /// Authentication and upstream failures are surfaced immediately:
    /// a bad credential or a malformed envelope will not get better on
    /// a second attempt.
    async fn complete(&self, prompt: &str) -> anyhow::Result<(String, serde_json::Value)> {
        match self.chat_once(prompt).await {
            Ok(out) => Ok(out),
            Err(err) => {
                let timed_out = matches!(
                    err.downcast_ref::<GenerationError>(),
                    Some(GenerationError::Timeout { .. })
                );
                if !timed_out {
                    return Err(err);
                }
                tracing::warn!(
                    model = self.model.model_id(),
                    error = %err,
                    "model request timed out; retrying once"
                );
                tokio::time::sleep(TIMEOUT_RETRY_BACKOFF).await;
                self.chat_once(prompt).await
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest {
    model: &'static str,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ChoiceMessage,

    #[serde(default)]
    #[allow(dead_code)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_chat_completion_envelope() {
        let raw = json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [
                {
                    "index": 0,
                    "message": {"role": "assistant", "content": "[{\"name\":\"x\"}]"},
                    "finish_reason": "stop"
                }
            ],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5}
        });

        let res: ChatCompletionResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(assistant_text(&res).unwrap(), "[{\"name\":\"x\"}]");
    }

    #[test]
    fn empty_or_blank_content_yields_none() {
        let res: ChatCompletionResponse =
            serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(assistant_text(&res).is_none());

        let res: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{"message": {"content": "   "}}]
        }))
        .unwrap();
        assert!(assistant_text(&res).is_none());
    }

    #[test]
    fn missing_api_key_maps_to_authentication_error() {
        let settings = Settings {
            database_url: None,
            deepseek_api_key: Some("   ".to_string()),
            deepseek_base_url: None,
            deepseek_model: None,
            sentry_dsn: None,
        };
        let err = DeepSeekClient::from_settings(&settings).unwrap_err();
        let gen = err.downcast_ref::<GenerationError>().unwrap();
        assert!(matches!(gen, GenerationError::Authentication { .. }));
    }
}
