//! Synthetic sentiment and news used on the fallback path.
//!
//! Nothing here does I/O. The `_with` variants take the RNG (and clock) explicitly;
//! the plain variants use the thread RNG and the wall clock.

use chrono::Utc;
use rand::Rng;

use crate::llm::{Sentiment, SentimentResult};
use crate::news::NewsItem;

pub const MOCK_SOURCES: [&str; 5] = [
    "Bloomberg",
    "Reuters",
    "Financial Times",
    "Wall Street Journal",
    "CNBC",
];

pub const MOCK_HEADLINES: [&str; 10] = [
    "Wayne Enterprises Announces Revolutionary Clean Energy Initiative",
    "Global Markets Rally on Tech Sector Gains",
    "Federal Reserve Signals Potential Rate Changes",
    "Emerging Markets Show Strong Growth Potential",
    "Cybersecurity Concerns Rise in Financial Sector",
    "New Regulations Impact Banking Industry",
    "AI Adoption Accelerates in Financial Services",
    "Market Volatility Increases Amid Global Tensions",
    "Sustainable Investing Trends Gain Momentum",
    "Digital Currency Developments Shape Financial Landscape",
];

const WEEK_MILLIS: i64 = 7 * 24 * 60 * 60 * 1000;

pub fn sentiment_narrative(label: Sentiment) -> String {
    format!("The sentiment of this text appears to be {}.", label)
}

pub fn mock_sentiment() -> SentimentResult {
    mock_sentiment_with(&mut rand::thread_rng())
}

pub fn mock_sentiment_with<R: Rng + ?Sized>(rng: &mut R) -> SentimentResult {
    let label = Sentiment::from_draw(rng.gen::<f64>());
    SentimentResult {
        label,
        narrative_text: sentiment_narrative(label),
    }
}

pub fn generate_mock_news(count: usize) -> Vec<NewsItem> {
    generate_mock_news_with(count, Utc::now().timestamp_millis(), &mut rand::thread_rng())
}

/// Build `count` items stamped within the week before `now_millis`.
pub fn generate_mock_news_with<R: Rng + ?Sized>(count: usize, now_millis: i64, rng: &mut R) -> Vec<NewsItem> {
    (0..count)
        .map(|i| NewsItem {
            id: format!("news-{}", i),
            headline: MOCK_HEADLINES[i % MOCK_HEADLINES.len()].to_string(),
            source: MOCK_SOURCES[rng.gen_range(0..MOCK_SOURCES.len())].to_string(),
            timestamp_millis: now_millis.saturating_sub(rng.gen_range(0..WEEK_MILLIS)).max(0),
            url: "#".to_string(),
            sentiment: Sentiment::ALL[rng.gen_range(0..Sentiment::ALL.len())],
            relevance_score: rng.gen_range(70..=99),
        })
        .collect()
}
