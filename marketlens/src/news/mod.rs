use serde::{Deserialize, Serialize};

use crate::fallback::FallbackReason;
use crate::llm::Sentiment;

/// Core trait for market news sources
#[async_trait::async_trait]
pub trait NewsProvider: Send + Sync {
    /// Fetch the latest headlines for `category`
    async fn fetch_news(&self, category: &str) -> Result<Vec<NewsItem>, FallbackReason>;
}

/// One market headline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    /// Unique within one batch
    pub id: String,
    pub headline: String,
    pub source: String,
    /// Publication time, Unix milliseconds, never in the future
    pub timestamp_millis: i64,
    pub url: String,
    pub sentiment: Sentiment,
    /// 0..=100
    pub relevance_score: u8,
}

pub mod finnhub;
pub mod market;
