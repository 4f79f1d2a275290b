use common::EndpointConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{LlmProvider, LlmRequest, LlmResponse, UsageMetadata};
use crate::fallback::FallbackReason;

/// Headers set by the provider itself; static params cannot replace them.
pub const RESERVED_HEADERS: [&str; 2] = ["Authorization", "Content-Type"];

/// Remote LLM provider using an OpenAI-compatible chat completions API
pub struct RemoteLlmProvider {
    endpoint: EndpointConfig,
    model: String,
    timeout: Option<Duration>,
    default_max_tokens: usize,
    default_temperature: f32,
    client: reqwest::Client,
}

impl RemoteLlmProvider {
    pub fn new(endpoint: EndpointConfig, model: impl Into<String>) -> Self {
        Self {
            endpoint,
            model: model.into(),
            timeout: None,
            default_max_tokens: common::DEFAULT_SENTIMENT_MAX_TOKENS,
            default_temperature: common::DEFAULT_SENTIMENT_TEMPERATURE,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_defaults(mut self, max_tokens: usize, temperature: f32) -> Self {
        self.default_max_tokens = max_tokens;
        self.default_temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_config(config: &common::SentimentConfig, endpoint: EndpointConfig) -> Self {
        Self::new(endpoint, config.model())
            .with_defaults(config.max_tokens(), config.temperature())
            .with_timeout(config.timeout_seconds.map(Duration::from_secs))
    }

    pub fn has_credential(&self) -> bool {
        self.endpoint.credential().is_some()
    }

    async fn exchange(&self, api_key: &str, body: &OpenAiRequest) -> Result<String, FallbackReason> {
        let url = self.endpoint.url("chat/completions");
        debug!(url = %url, model = %body.model, "sending chat completion request");

        let mut builder = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json");
        for (name, value) in self.endpoint.params_except(&RESERVED_HEADERS) {
            builder = builder.header(name, value);
        }

        let response = builder.json(body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FallbackReason::ServiceReported(format!("LLM API error {}: {}", status, body)));
        }

        Ok(response.text().await?)
    }
}

#[async_trait::async_trait]
impl LlmProvider for RemoteLlmProvider {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, FallbackReason> {
        let api_key = self
            .endpoint
            .credential()
            .ok_or(FallbackReason::MissingCredential)?;

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system {
            messages.push(Message {
                role: "system".to_string(),
                content: system,
            });
        }
        messages.push(Message {
            role: "user".to_string(),
            content: request.prompt,
        });

        let req_body = OpenAiRequest {
            model: self.model.clone(),
            messages,
            max_tokens: Some(request.max_tokens.unwrap_or(self.default_max_tokens)),
            temperature: Some(request.temperature.unwrap_or(self.default_temperature)),
        };

        let body_text = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.exchange(api_key, &req_body))
                .await
                .map_err(|_| FallbackReason::Transport(format!("LLM request timed out after {:?}", limit)))??,
            None => self.exchange(api_key, &req_body).await?,
        };

        let resp_body: OpenAiResponse = serde_json::from_str(&body_text)
            .map_err(|e| FallbackReason::MalformedResponse(format!("failed to parse LLM response: {}", e)))?;

        let content = resp_body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or_else(|| FallbackReason::MalformedResponse("LLM response has no choices".to_string()))?;

        let usage = resp_body
            .usage
            .map(|u| UsageMetadata {
                prompt_tokens: u.prompt_tokens.unwrap_or(0),
                completion_tokens: u.completion_tokens.unwrap_or(0),
                total_tokens: u.total_tokens.unwrap_or(0),
            })
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            usage,
            model: resp_body.model.unwrap_or_else(|| self.model.clone()),
        })
    }
}

// OpenAI API request/response structures
#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: Option<usize>,
    #[serde(default)]
    completion_tokens: Option<usize>,
    #[serde(default)]
    total_tokens: Option<usize>,
}
