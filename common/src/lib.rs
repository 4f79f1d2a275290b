/*!
common/src/lib.rs

Shared configuration types for MarketLens.

This file provides:
- Config data structures (deserialized from TOML)
- An async loader that merges a default file with an optional override
- `EndpointConfig`, the resolved, immutable view of one remote endpoint
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

pub const DEFAULT_SENTIMENT_BASE_URL: &str = "https://api.perplexity.ai";
pub const DEFAULT_SENTIMENT_KEY_ENV: &str = "PERPLEXITY_API_KEY";
pub const DEFAULT_SENTIMENT_MODEL: &str = "mixtral-8x7b-instruct";
pub const DEFAULT_SENTIMENT_MAX_TOKENS: usize = 150;
pub const DEFAULT_SENTIMENT_TEMPERATURE: f32 = 0.7;

pub const DEFAULT_NEWS_BASE_URL: &str = "https://finnhub.io/api/v1";
pub const DEFAULT_NEWS_KEY_ENV: &str = "FINNHUB_API_KEY";
pub const DEFAULT_NEWS_CATEGORY: &str = "general";
pub const DEFAULT_NEWS_FALLBACK_COUNT: usize = 30;

/// Sentiment (chat completion) endpoint section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SentimentConfig {
    pub base_url: Option<String>,
    /// Name of the environment variable holding the bearer token
    pub api_key_env: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
    /// Upper bound for one request. Unset means no timeout.
    pub timeout_seconds: Option<u64>,
    /// Extra headers sent with every request
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl SentimentConfig {
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_SENTIMENT_MODEL)
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens.unwrap_or(DEFAULT_SENTIMENT_MAX_TOKENS)
    }

    pub fn temperature(&self) -> f32 {
        self.temperature.unwrap_or(DEFAULT_SENTIMENT_TEMPERATURE)
    }

    /// Resolve the endpoint, reading the credential from the process environment.
    pub fn endpoint(&self) -> Result<EndpointConfig> {
        self.endpoint_with(|name| std::env::var(name).ok())
    }

    /// Resolve the endpoint with an explicit credential lookup.
    pub fn endpoint_with<F>(&self, lookup: F) -> Result<EndpointConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        EndpointConfig::resolve(
            self.base_url.as_deref().unwrap_or(DEFAULT_SENTIMENT_BASE_URL),
            self.api_key_env.as_deref().unwrap_or(DEFAULT_SENTIMENT_KEY_ENV),
            &self.params,
            lookup,
        )
        .context("invalid [sentiment] endpoint configuration")
    }
}

/// Market news endpoint section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewsConfig {
    pub base_url: Option<String>,
    pub api_key_env: Option<String>,
    pub category: Option<String>,
    /// Number of synthetic items returned on the fallback path
    pub fallback_count: Option<usize>,
    pub timeout_seconds: Option<u64>,
    /// Extra query parameters sent with every request
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl NewsConfig {
    pub fn category(&self) -> &str {
        self.category.as_deref().unwrap_or(DEFAULT_NEWS_CATEGORY)
    }

    pub fn fallback_count(&self) -> usize {
        self.fallback_count.unwrap_or(DEFAULT_NEWS_FALLBACK_COUNT)
    }

    pub fn endpoint(&self) -> Result<EndpointConfig> {
        self.endpoint_with(|name| std::env::var(name).ok())
    }

    pub fn endpoint_with<F>(&self, lookup: F) -> Result<EndpointConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        EndpointConfig::resolve(
            self.base_url.as_deref().unwrap_or(DEFAULT_NEWS_BASE_URL),
            self.api_key_env.as_deref().unwrap_or(DEFAULT_NEWS_KEY_ENV),
            &self.params,
            lookup,
        )
        .context("invalid [news] endpoint configuration")
    }
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub sentiment: Option<SentimentConfig>,
    pub news: Option<NewsConfig>,
}

impl Config {
    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    /// Missing files are skipped, so with neither present every section falls back to defaults.
    pub async fn load_with_defaults(default_path: Option<&Path>, override_path: Option<&Path>) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        for path in [default_path, override_path].into_iter().flatten() {
            if !path.exists() {
                continue;
            }
            let data = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let val: toml::Value = toml::from_str(&data)
                .with_context(|| format!("Failed to parse configuration: {}", path.display()))?;
            merge_toml(&mut config_value, val);
        }

        let cfg: Config = config_value.try_into().context("Failed to parse merged configuration")?;
        Ok(cfg)
    }

    pub fn sentiment(&self) -> SentimentConfig {
        self.sentiment.clone().unwrap_or_default()
    }

    pub fn news(&self) -> NewsConfig {
        self.news.clone().unwrap_or_default()
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

/// A resolved remote endpoint: where to send requests and with which credential.
///
/// Built once at startup and never mutated. A missing or empty credential is
/// stored as `None`; callers take the fallback path without touching the network.
#[derive(Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    pub base_address: String,
    pub credential: Option<String>,
    pub static_params: BTreeMap<String, String>,
}

impl EndpointConfig {
    pub fn new(base_address: impl Into<String>) -> Self {
        Self {
            base_address: base_address.into().trim_end_matches('/').to_string(),
            credential: None,
            static_params: BTreeMap::new(),
        }
    }

    pub fn with_credential(mut self, credential: Option<String>) -> Self {
        self.credential = credential.filter(|c| !c.trim().is_empty());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.static_params.insert(key.into(), value.into());
        self
    }

    /// Validate `base_address` and read the credential named `key_env` through `lookup`.
    pub fn resolve<F>(
        base_address: &str,
        key_env: &str,
        params: &BTreeMap<String, String>,
        lookup: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        url::Url::parse(base_address)
            .with_context(|| format!("base_url is not a valid URL: {}", base_address))?;

        let mut endpoint = Self::new(base_address).with_credential(lookup(key_env));
        endpoint.static_params = params.clone();
        Ok(endpoint)
    }

    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }

    /// Static params whose key is not in `reserved` (compared case-insensitively).
    /// Adapters pass the keys they set themselves so configuration cannot override them.
    pub fn params_except<'a>(&'a self, reserved: &'a [&'a str]) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.static_params
            .iter()
            .filter(move |(key, _)| !reserved.iter().any(|r| r.eq_ignore_ascii_case(key)))
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Join a path onto the base address.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_address, path.trim_start_matches('/'))
    }
}

impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("base_address", &self.base_address)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .field("static_params", &self.static_params)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn config_from_string() {
        let toml = r#"
            [sentiment]
            model = "sonar"
            max_tokens = 64

            [news]
            category = "forex"
            fallback_count = 10

            [news.params]
            minId = "0"
        "#;

        let cfg: Config = toml::from_str(toml).expect("parse config");
        let sentiment = cfg.sentiment();
        assert_eq!(sentiment.model(), "sonar");
        assert_eq!(sentiment.max_tokens(), 64);
        assert_eq!(sentiment.temperature(), DEFAULT_SENTIMENT_TEMPERATURE);

        let news = cfg.news();
        assert_eq!(news.category(), "forex");
        assert_eq!(news.fallback_count(), 10);
        assert_eq!(news.params.get("minId").map(String::as_str), Some("0"));
    }

    #[test]
    fn empty_config_uses_defaults() {
        let cfg: Config = toml::from_str("").expect("parse empty config");
        assert_eq!(cfg.sentiment().model(), DEFAULT_SENTIMENT_MODEL);
        assert_eq!(cfg.news().category(), DEFAULT_NEWS_CATEGORY);
        assert_eq!(cfg.news().fallback_count(), DEFAULT_NEWS_FALLBACK_COUNT);
    }

    #[test]
    fn endpoint_reads_named_credential() {
        let news = NewsConfig {
            api_key_env: Some("MY_NEWS_KEY".to_string()),
            ..Default::default()
        };

        let endpoint = news
            .endpoint_with(|name| (name == "MY_NEWS_KEY").then(|| "secret".to_string()))
            .expect("resolve endpoint");
        assert_eq!(endpoint.base_address, DEFAULT_NEWS_BASE_URL);
        assert_eq!(endpoint.credential(), Some("secret"));
    }

    #[test]
    fn missing_or_blank_credential_is_none() {
        let sentiment = SentimentConfig::default();

        let missing = sentiment.endpoint_with(|_| None).expect("resolve");
        assert_eq!(missing.credential(), None);

        let blank = sentiment.endpoint_with(|_| Some("  ".to_string())).expect("resolve");
        assert_eq!(blank.credential(), None);
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let sentiment = SentimentConfig {
            base_url: Some("not a url".to_string()),
            ..Default::default()
        };
        assert!(sentiment.endpoint_with(|_| None).is_err());
    }

    #[test]
    fn url_joins_without_double_slash() {
        let endpoint = EndpointConfig::new("http://localhost:1234/");
        assert_eq!(endpoint.url("/news"), "http://localhost:1234/news");
        assert_eq!(endpoint.url("chat/completions"), "http://localhost:1234/chat/completions");
    }

    #[test]
    fn params_except_skips_reserved_keys() {
        let endpoint = EndpointConfig::new("https://example.com")
            .with_param("Category", "forex")
            .with_param("token", "other")
            .with_param("minId", "10");

        let kept: Vec<(&str, &str)> = endpoint.params_except(&["token", "category"]).collect();
        assert_eq!(kept, vec![("minId", "10")]);
    }

    #[test]
    fn debug_redacts_credential() {
        let endpoint = EndpointConfig::new("https://example.com").with_credential(Some("abc123".into()));
        let printed = format!("{:?}", endpoint);
        assert!(!printed.contains("abc123"));
        assert!(printed.contains("<redacted>"));
    }

    #[tokio::test]
    async fn override_file_takes_precedence() {
        let dir = tempfile::tempdir().expect("tempdir");
        let default_path = dir.path().join("config.default.toml");
        let override_path = dir.path().join("config.toml");

        fs::write(
            &default_path,
            "[sentiment]\nmodel = \"base-model\"\nmax_tokens = 150\n",
        )
        .expect("write default");
        fs::write(&override_path, "[sentiment]\nmodel = \"override-model\"\n").expect("write override");

        let cfg = Config::load_with_defaults(Some(default_path.as_path()), Some(override_path.as_path()))
            .await
            .expect("load config");
        let sentiment = cfg.sentiment();
        assert_eq!(sentiment.model(), "override-model");
        assert_eq!(sentiment.max_tokens(), 150);
    }

    #[tokio::test]
    async fn missing_files_yield_default_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = Config::load_with_defaults(Some(dir.path().join("absent.toml").as_path()), None)
            .await
            .expect("load config");
        assert!(cfg.sentiment.is_none());
        assert!(cfg.news.is_none());
    }
}
