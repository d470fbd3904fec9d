use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use landed_models::{NewsArticle, NewsConfig};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use super::NewsProvider;
use crate::error::ProviderError;

/// Phrases matched against article text and recorded on each article.
pub const TRADE_KEYWORDS: &[&str] = &[
    "tariff",
    "imports",
    "exports",
    "currency",
    "trade policy",
    "trade war",
    "customs",
    "international trade",
];

const GENERAL_QUERY_TERMS: &[&str] = &[
    "trade policy",
    "trade tariff",
    "customs duty",
    "import export",
    "supply chain",
];

const COUNTRY_TRADE_TERMS: &str = "trade OR tariff OR import OR export OR customs OR economy \
     OR \"trade war\" OR \"trade deal\" OR \"trade relations\" OR \"trade policy\"";

const PAGE_SIZE: &str = "100";

/// NewsAPI `everything` endpoint client.
pub struct NewsApi {
    client: Client,
    api_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsBody {
    status: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<NewsItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsItem {
    #[serde(default)]
    source: Option<NewsSource>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsSource {
    #[serde(default)]
    name: Option<String>,
}

impl NewsApi {
    pub fn new(config: &NewsConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.resolved_api_key(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Name variants searched for a country code. Unknown codes search as-is.
pub fn expand_country(code: &str) -> String {
    let variants: &[&str] = match code.to_uppercase().as_str() {
        "US" => &["\"United States\"", "USA", "America"],
        "CN" => &["China", "Chinese", "Beijing"],
        "GB" | "UK" => &["\"United Kingdom\"", "Britain", "UK"],
        "EU" => &["\"European Union\"", "EU", "Europe"],
        "JP" => &["Japan", "Japanese", "Tokyo"],
        "KR" => &["\"South Korea\"", "Korea", "Seoul"],
        "IN" => &["India", "Indian", "\"New Delhi\""],
        "MX" => &["Mexico", "Mexican"],
        "CA" => &["Canada", "Canadian", "Ottawa"],
        "BR" => &["Brazil", "Brazilian"],
        "DE" => &["Germany", "German", "Berlin"],
        "FR" => &["France", "French", "Paris"],
        _ => return code.to_string(),
    };
    format!("({})", variants.join(" OR "))
}

/// Search expression for trade news, optionally scoped to two countries.
pub fn build_query(countries: Option<(&str, &str)>) -> String {
    match countries {
        Some((a, b)) => format!(
            "({} OR {}) AND ({COUNTRY_TRADE_TERMS})",
            expand_country(a),
            expand_country(b)
        ),
        None => GENERAL_QUERY_TERMS.join(" OR "),
    }
}

/// Trade keywords found in the text, lowercase.
pub fn matched_keywords(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    TRADE_KEYWORDS
        .iter()
        .filter(|keyword| lower.contains(*keyword))
        .map(|keyword| keyword.to_string())
        .collect()
}

fn to_articles(items: Vec<NewsItem>) -> Vec<NewsArticle> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter_map(|item| {
            let url = item.url.filter(|u| !u.trim().is_empty())?;
            if !seen.insert(url.clone()) {
                return None;
            }
            let published_at = item
                .published_at
                .as_deref()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(Utc::now);
            let mut article = NewsArticle {
                url,
                title: item.title.unwrap_or_default(),
                description: item.description,
                source: item.source.and_then(|s| s.name),
                published_at,
                sentiment_score: None,
                keywords: Vec::new(),
            };
            article.keywords = matched_keywords(&article.scoring_text());
            Some(article)
        })
        .collect()
}

#[async_trait]
impl NewsProvider for NewsApi {
    async fn fetch_trade_news(
        &self,
        days_back: u32,
        countries: Option<(&str, &str)>,
    ) -> Result<Vec<NewsArticle>, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("NewsAPI".to_string()))?;

        let query = build_query(countries);
        let from = (Utc::now() - chrono::Duration::days(i64::from(days_back)))
            .format("%Y-%m-%d")
            .to_string();
        debug!(query = %query, from = %from, "Fetching trade news");

        let response = self
            .client
            .get(format!("{}/everything", self.api_url))
            .query(&[
                ("q", query.as_str()),
                ("from", from.as_str()),
                ("sortBy", "publishedAt"),
                ("pageSize", PAGE_SIZE),
                ("language", "en"),
                ("apiKey", api_key),
            ])
            .send()
            .await?;
        let body: NewsBody = response.json().await?;

        if body.status != "ok" {
            return Err(ProviderError::Api(format!(
                "News API error [{}]: {}",
                body.code.as_deref().unwrap_or("unknown"),
                body.message.as_deref().unwrap_or("no message")
            )));
        }

        let articles = to_articles(body.articles);
        info!(count = articles.len(), "Fetched trade news articles");
        Ok(articles)
    }
}
