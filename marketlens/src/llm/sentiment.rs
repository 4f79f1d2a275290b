// Sentiment analysis with mock fallback
use std::sync::Arc;
use tracing::info;

use super::{LlmProvider, LlmRequest, Sentiment, SentimentResult};
use crate::fallback::{with_fallback, DiagnosticSink, FallbackReason, TracingSink};
use crate::mock;

pub const SENTIMENT_SYSTEM_PROMPT: &str =
    "Analyze the sentiment of the following text and provide insights relevant to financial markets.";

pub const OPERATION: &str = "analyze_sentiment";

/// Financial sentiment analysis backed by a chat-completion provider.
///
/// `analyze_sentiment` never fails: when the provider is unusable the result
/// comes from [`mock::mock_sentiment`] and the reason goes to the sink.
pub struct SentimentAnalyzer {
    provider: Arc<dyn LlmProvider>,
    sink: Arc<dyn DiagnosticSink>,
}

impl SentimentAnalyzer {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub async fn analyze_sentiment(&self, text: &str) -> SentimentResult {
        with_fallback(
            OPERATION,
            self.sink.as_ref(),
            self.try_analyze_sentiment(text),
            mock::mock_sentiment,
        )
        .await
    }

    /// Same request as [`analyze_sentiment`](Self::analyze_sentiment), without the fallback.
    pub async fn try_analyze_sentiment(&self, text: &str) -> Result<SentimentResult, FallbackReason> {
        let request = LlmRequest {
            system: Some(SENTIMENT_SYSTEM_PROMPT.to_string()),
            prompt: text.to_string(),
            max_tokens: None,
            temperature: None,
        };

        let response = self.provider.generate(request).await?;
        let label = Sentiment::infer(&response.content);
        info!(
            label = %label,
            model = %response.model,
            tokens = response.usage.total_tokens,
            "sentiment analysis successful"
        );

        Ok(SentimentResult {
            label,
            narrative_text: response.content,
        })
    }
}
