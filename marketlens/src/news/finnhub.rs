use chrono::Utc;
use common::EndpointConfig;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

use super::{NewsItem, NewsProvider};
use crate::fallback::FallbackReason;
use crate::llm::Sentiment;

/// Upstream items carry no relevance score; they all get this midpoint.
pub const UNSCORED_RELEVANCE: u8 = 50;

/// Query keys set by the provider itself; static params cannot replace them.
pub const RESERVED_QUERY_KEYS: [&str; 2] = ["token", "category"];

/// Finnhub `/news` client
pub struct FinnhubProvider {
    endpoint: EndpointConfig,
    timeout: Option<Duration>,
    client: reqwest::Client,
}

impl FinnhubProvider {
    pub fn new(endpoint: EndpointConfig) -> Self {
        Self {
            endpoint,
            timeout: None,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_config(config: &common::NewsConfig, endpoint: EndpointConfig) -> Self {
        Self::new(endpoint).with_timeout(config.timeout_seconds.map(Duration::from_secs))
    }

    pub fn has_credential(&self) -> bool {
        self.endpoint.credential().is_some()
    }

    async fn exchange(&self, token: &str, category: &str) -> Result<String, FallbackReason> {
        let url = self.endpoint.url("news");
        debug!(url = %url, category, "requesting market news");

        let mut query: Vec<(&str, &str)> = vec![("token", token), ("category", category)];
        query.extend(self.endpoint.params_except(&RESERVED_QUERY_KEYS));

        let response = self.client.get(&url).query(&query).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FallbackReason::ServiceReported(format!("news API error {}: {}", status, body)));
        }

        Ok(response.text().await?)
    }
}

#[async_trait::async_trait]
impl NewsProvider for FinnhubProvider {
    async fn fetch_news(&self, category: &str) -> Result<Vec<NewsItem>, FallbackReason> {
        let token = self
            .endpoint
            .credential()
            .ok_or(FallbackReason::MissingCredential)?;

        let body = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.exchange(token, category))
                .await
                .map_err(|_| FallbackReason::Transport(format!("news request timed out after {:?}", limit)))??,
            None => self.exchange(token, category).await?,
        };

        let articles = parse_news_body(&body)?;
        Ok(to_news_items(articles, Utc::now().timestamp_millis()))
    }
}

#[derive(Debug, Deserialize)]
struct FinnhubArticle {
    id: serde_json::Value,
    #[serde(default)]
    headline: String,
    #[serde(default)]
    source: String,
    /// Unix seconds
    #[serde(default)]
    datetime: i64,
    #[serde(default)]
    url: String,
}

/// Accept a JSON array of articles. An object carrying `error` is the service
/// reporting a problem; anything else is malformed. Individual entries that do
/// not look like an article (no `id`, wrong field types) are skipped.
fn parse_news_body(body: &str) -> Result<Vec<FinnhubArticle>, FallbackReason> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| FallbackReason::MalformedResponse(format!("news body is not JSON: {}", e)))?;

    if let Some(error) = value.get("error") {
        let message = error
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(FallbackReason::ServiceReported(message));
    }

    let serde_json::Value::Array(entries) = value else {
        return Err(FallbackReason::MalformedResponse("expected a JSON array of articles".to_string()));
    };

    Ok(entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value::<FinnhubArticle>(entry) {
            Ok(article) if !article.id.is_null() => Some(article),
            Ok(_) => {
                debug!(index, "skipping news article with null id");
                None
            }
            Err(e) => {
                debug!(index, error = %e, "skipping unreadable news article");
                None
            }
        })
        .collect())
}

fn to_news_items(articles: Vec<FinnhubArticle>, now_millis: i64) -> Vec<NewsItem> {
    let mut seen = HashSet::new();
    articles
        .into_iter()
        .filter_map(|article| {
            let id = match article.id {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            if !seen.insert(id.clone()) {
                return None;
            }
            Some(NewsItem {
                id,
                headline: article.headline,
                source: article.source,
                timestamp_millis: article.datetime.saturating_mul(1000).clamp(0, now_millis.max(0)),
                url: article.url,
                sentiment: Sentiment::Neutral,
                relevance_score: UNSCORED_RELEVANCE,
            })
        })
        .collect()
}
