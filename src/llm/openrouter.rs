//! OpenRouter-compatible chat completions client over reqwest.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use crate::error::LlmError;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(25);

/// Chat completions client for any OpenRouter-compatible endpoint.
pub struct OpenRouterClient {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    model: String,
}

#[derive(serde::Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionEnvelope {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: String,
}

impl OpenRouterClient {
    pub fn new(api_key: SecretString, model: String, base_url: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            model,
        }
    }
}

#[async_trait::async_trait]
impl LlmProvider for OpenRouterClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = CompletionBody {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature,
        };

        debug!(model = %self.model, temperature = request.temperature, "LLM request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(REQUEST_TIMEOUT)
                } else {
                    LlmError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: CompletionEnvelope = response
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        let content = envelope
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(LlmError::MalformedResponse(
                "completion had no assistant content".to_string(),
            ));
        }
        Ok(content)
    }
}
