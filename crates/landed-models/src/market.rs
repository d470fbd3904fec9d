use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One stored exchange rate: 1 unit of `from_currency` in `to_currency`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExchangeRate {
    pub from_currency: String,
    pub to_currency: String,
    pub rate: Decimal,
    pub rate_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewsArticle {
    /// Natural key.
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    /// Publisher name.
    pub source: Option<String>,
    pub published_at: DateTime<Utc>,
    /// Lexical sentiment in [-1, 1]. `None` until scored.
    pub sentiment_score: Option<f64>,
    /// Trade keywords found in the title/description.
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl NewsArticle {
    /// Text that sentiment scoring runs over.
    pub fn scoring_text(&self) -> String {
        format!(
            "{} {}",
            self.title,
            self.description.as_deref().unwrap_or_default()
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SentimentTrend {
    Improving,
    Declining,
    Stable,
}

impl SentimentTrend {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentTrend::Improving => "improving",
            SentimentTrend::Declining => "declining",
            SentimentTrend::Stable => "stable",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "improving" => SentimentTrend::Improving,
            "declining" => SentimentTrend::Declining,
            _ => SentimentTrend::Stable,
        }
    }
}

impl fmt::Display for SentimentTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate news sentiment for one calendar week (Monday to Sunday).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SentimentAnalysis {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    /// Mean article sentiment in [-1, 1].
    pub average_sentiment: f64,
    pub article_count: u32,
    pub positive_count: u32,
    pub negative_count: u32,
    pub neutral_count: u32,
    pub trend: SentimentTrend,
}
