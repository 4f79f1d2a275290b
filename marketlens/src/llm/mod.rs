use serde::{Deserialize, Serialize};
use std::fmt;

use crate::fallback::FallbackReason;

/// Core trait for chat-completion providers
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send one chat request and return the first completion
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, FallbackReason>;
}

/// Request structure for LLM generation
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
}

/// Response from LLM generation
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub usage: UsageMetadata,
    pub model: String,
}

/// Token usage metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageMetadata {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

/// Market sentiment label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }

    /// Map a uniform draw in [0, 1) to a label: above 0.6 positive, above 0.3 neutral.
    pub fn from_draw(draw: f64) -> Self {
        if draw > 0.6 {
            Sentiment::Positive
        } else if draw > 0.3 {
            Sentiment::Neutral
        } else {
            Sentiment::Negative
        }
    }

    /// Pick the label mentioned first in free-form model output.
    /// Text mentioning none of them reads as neutral.
    pub fn infer(text: &str) -> Self {
        let lower = text.to_lowercase();
        Self::ALL
            .iter()
            .filter_map(|label| lower.find(label.as_str()).map(|pos| (pos, *label)))
            .min_by_key(|(pos, _)| *pos)
            .map(|(_, label)| label)
            .unwrap_or(Sentiment::Neutral)
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a sentiment analysis, live or synthetic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentResult {
    pub label: Sentiment,
    pub narrative_text: String,
}

pub mod remote;
pub mod sentiment;
