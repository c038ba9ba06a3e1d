use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::prompt;

/// A chat message for the completion request.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Client for an OpenAI-compatible chat-completions endpoint.
#[derive(Clone)]
pub struct ChatClient {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ChatClient {
    pub fn new(base_url: String, api_key: String, model: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn generate(&self, messages: &[Message]) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: 0.0,
            response_format: ResponseFormat {
                kind: "json_object", // Force JSON output
            },
        };

        let response = self.client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to chat completions endpoint")?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => LlmError::Authentication,
                429 => LlmError::RateLimit,
                code => LlmError::Api { status: code, message },
            }
            .into());
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("Failed to parse chat completions response")?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)?;

        debug!(model = %self.model, chars = content.len(), "Received completion");
        Ok(content)
    }

    /// Generate with retry for invalid JSON
    pub async fn generate_json_with_retry(
        &self,
        messages: &[Message],
        max_attempts: usize,
    ) -> Result<String> {
        let max_attempts = max_attempts.max(1);

        for attempt in 0..max_attempts {
            let response = strip_code_fence(&self.generate(messages).await?).to_string();

            if serde_json::from_str::<serde_json::Value>(&response).is_ok() {
                return Ok(response);
            }

            warn!(attempt = attempt + 1, max_attempts, "Model returned invalid JSON");

            // If invalid, retry with correction prompt
            if attempt < max_attempts - 1 {
                let retry_messages = [
                    Message::system(prompt::SYSTEM_PROMPT),
                    Message::user(prompt::build_retry_prompt(&response)),
                ];

                let corrected = self.generate(&retry_messages).await?;
                let corrected = strip_code_fence(&corrected);
                if serde_json::from_str::<serde_json::Value>(corrected).is_ok() {
                    return Ok(corrected.to_string());
                }
            }
        }

        Err(LlmError::InvalidJson { attempts: max_attempts }.into())
    }
}

/// Remove a surrounding markdown code fence, if the model added one.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
