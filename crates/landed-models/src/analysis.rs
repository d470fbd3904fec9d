use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::market::SentimentTrend;

/// Where the data behind an analysis came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    LiveApi,
    FallbackDatabase,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::LiveApi => "live_api",
            DataSource::FallbackDatabase => "fallback_database",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RateTrend {
    Increasing,
    Decreasing,
    Stable,
}

impl RateTrend {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateTrend::Increasing => "increasing",
            RateTrend::Decreasing => "decreasing",
            RateTrend::Stable => "stable",
        }
    }
}

impl fmt::Display for RateTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RatePoint {
    pub date: NaiveDate,
    pub rate: Decimal,
}

/// Purchase-timing analysis for a currency corridor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExchangeRateAnalysis {
    pub importing_country: String,
    pub exporting_country: String,
    pub importing_currency: String,
    pub exporting_currency: String,
    pub current_rate: Decimal,
    pub current_rate_date: NaiveDate,
    pub average_rate: Decimal,
    pub min_rate: Decimal,
    pub min_rate_date: NaiveDate,
    pub max_rate: Decimal,
    pub max_rate_date: NaiveDate,
    pub trend: RateTrend,
    /// Date of the historical minimum in the trend window.
    pub recommended_purchase_date: NaiveDate,
    pub recommendation: String,
    /// The trend window, oldest first.
    pub historical_rates: Vec<RatePoint>,
    pub live_data_available: bool,
    pub data_source: DataSource,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Buy,
    Wait,
    Hold,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Recommendation::Buy => "BUY",
            Recommendation::Wait => "WAIT",
            Recommendation::Hold => "HOLD",
        })
    }
}

/// A supporting news headline shown alongside a prediction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Headline {
    pub title: String,
    pub source: Option<String>,
    pub published_at: DateTime<Utc>,
    pub sentiment_score: f64,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SentimentPoint {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub average_sentiment: f64,
    pub article_count: u32,
}

/// Sentiment-driven BUY/WAIT/HOLD recommendation for a corridor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionResult {
    pub id: Uuid,
    pub importing_country: String,
    pub exporting_country: String,
    pub importing_currency: String,
    pub exporting_currency: String,
    pub recommendation: Recommendation,
    /// Normalized score of the winning recommendation, 0.0 to 1.0.
    pub confidence: f64,
    pub rationale: String,
    pub current_sentiment: f64,
    pub sentiment_trend: SentimentTrend,
    /// Population standard deviation of the trailing weekly averages.
    pub volatility: f64,
    /// Direction of the pair's rate over the last two weeks.
    pub exchange_rate_trend: RateTrend,
    pub current_exchange_rate: Decimal,
    pub articles_analyzed: u32,
    pub headlines: Vec<Headline>,
    pub sentiment_history: Vec<SentimentPoint>,
    pub live_news_available: bool,
    pub data_source: DataSource,
    pub message: String,
    pub generated_at: DateTime<Utc>,
}
