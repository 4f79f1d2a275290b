use std::sync::Arc;
use tracing::info;

use super::{NewsItem, NewsProvider};
use crate::fallback::{with_fallback, DiagnosticSink, FallbackReason, TracingSink};
use crate::mock;

pub const OPERATION: &str = "get_market_news";

/// General market headlines with a synthetic fallback batch
pub struct MarketNewsService {
    provider: Arc<dyn NewsProvider>,
    sink: Arc<dyn DiagnosticSink>,
    category: String,
    fallback_count: usize,
}

impl MarketNewsService {
    pub fn new(provider: Arc<dyn NewsProvider>) -> Self {
        Self {
            provider,
            sink: Arc::new(TracingSink),
            category: common::DEFAULT_NEWS_CATEGORY.to_string(),
            fallback_count: common::DEFAULT_NEWS_FALLBACK_COUNT,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_fallback_count(mut self, count: usize) -> Self {
        self.fallback_count = count;
        self
    }

    /// Latest headlines, or `fallback_count` mock items when the provider fails.
    pub async fn get_market_news(&self) -> Vec<NewsItem> {
        let count = self.fallback_count;
        with_fallback(
            OPERATION,
            self.sink.as_ref(),
            self.try_get_market_news(),
            || mock::generate_mock_news(count),
        )
        .await
    }

    pub async fn try_get_market_news(&self) -> Result<Vec<NewsItem>, FallbackReason> {
        let items = self.provider.fetch_news(&self.category).await?;
        info!(category = %self.category, count = items.len(), "market news fetched");
        Ok(items)
    }
}
