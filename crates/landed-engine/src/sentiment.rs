//! Lexical sentiment scoring of trade news and the weekly aggregate.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use landed_models::{NewsArticle, SentimentAnalysis, SentimentTrend};
use landed_store::Store;
use tracing::{info, warn};

use crate::error::EngineError;
use crate::providers::NewsProvider;

const POSITIVE_KEYWORDS: &[(&str, f64)] = &[
    ("agreement", 0.5),
    ("boost", 0.6),
    ("growth", 0.7),
    ("increase", 0.4),
    ("expansion", 0.6),
    ("strengthen", 0.5),
    ("improve", 0.6),
    ("positive", 0.5),
    ("cooperation", 0.5),
    ("partnership", 0.5),
    ("deal", 0.4),
    ("opportunity", 0.6),
    ("recovery", 0.7),
];

const NEGATIVE_KEYWORDS: &[(&str, f64)] = &[
    ("tariff", -0.4),
    ("war", -0.8),
    ("dispute", -0.6),
    ("conflict", -0.7),
    ("decline", -0.6),
    ("fall", -0.5),
    ("drop", -0.5),
    ("threat", -0.7),
    ("tension", -0.6),
    ("sanction", -0.7),
    ("crisis", -0.8),
    ("uncertainty", -0.5),
    ("risk", -0.4),
];

/// Article scores above this count as positive, below its negation as negative.
pub const POLARITY_THRESHOLD: f64 = 0.2;
/// Week-over-week change in average sentiment that counts as a trend.
pub const TREND_THRESHOLD: f64 = 0.1;

/// Mean weight of the keywords found in `text`, clamped to [-1, 1].
pub fn score_text(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let (sum, count) = POSITIVE_KEYWORDS
        .iter()
        .chain(NEGATIVE_KEYWORDS)
        .filter(|(keyword, _)| lower.contains(keyword))
        .fold((0.0, 0u32), |(sum, count), (_, weight)| (sum + weight, count + 1));
    if count == 0 {
        return 0.0;
    }
    (sum / f64::from(count)).clamp(-1.0, 1.0)
}

pub fn score_article(article: &NewsArticle) -> f64 {
    score_text(&article.scoring_text())
}

/// Monday and Sunday of the calendar week containing `day`.
pub fn week_bounds(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = day - Duration::days(i64::from(day.weekday().num_days_from_monday()));
    (start, start + Duration::days(6))
}

/// Whole-day UTC range covering `start..=end`.
pub fn day_range(start: NaiveDate, end: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let from = Utc.from_utc_datetime(&start.and_time(NaiveTime::MIN));
    let until = Utc.from_utc_datetime(&(end + Duration::days(1)).and_time(NaiveTime::MIN))
        - Duration::seconds(1);
    (from, until)
}

pub fn classify_sentiment_trend(current: f64, previous: Option<f64>) -> SentimentTrend {
    match previous {
        Some(previous) if current - previous > TREND_THRESHOLD => SentimentTrend::Improving,
        Some(previous) if current - previous < -TREND_THRESHOLD => SentimentTrend::Declining,
        _ => SentimentTrend::Stable,
    }
}

/// Aggregate the articles of one week. `None` when there are no articles.
pub fn aggregate_week(
    articles: &[NewsArticle],
    week_start: NaiveDate,
    week_end: NaiveDate,
    previous_average: Option<f64>,
) -> Option<SentimentAnalysis> {
    if articles.is_empty() {
        return None;
    }
    let scores: Vec<f64> = articles
        .iter()
        .map(|a| a.sentiment_score.unwrap_or_else(|| score_article(a)))
        .collect();
    let average = scores.iter().sum::<f64>() / scores.len() as f64;
    let positive_count = scores.iter().filter(|s| **s > POLARITY_THRESHOLD).count() as u32;
    let negative_count = scores.iter().filter(|s| **s < -POLARITY_THRESHOLD).count() as u32;

    Some(SentimentAnalysis {
        week_start,
        week_end,
        average_sentiment: average,
        article_count: scores.len() as u32,
        positive_count,
        negative_count,
        neutral_count: scores.len() as u32 - positive_count - negative_count,
        trend: classify_sentiment_trend(average, previous_average),
    })
}

/// Outcome of one news refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshOutcome {
    pub articles_fetched: usize,
    pub articles_stored: usize,
    pub week: Option<SentimentAnalysis>,
}

/// Pulls news, scores it, and keeps the weekly aggregates current.
pub struct SentimentService {
    store: Arc<Store>,
    news: Arc<dyn NewsProvider>,
}

impl SentimentService {
    pub fn new(store: Arc<Store>, news: Arc<dyn NewsProvider>) -> Self {
        Self { store, news }
    }

    /// Fetch trailing news, store each scored article, then recompute the
    /// aggregate for the week containing `today`.
    pub async fn refresh(
        &self,
        days_back: u32,
        countries: Option<(&str, &str)>,
        today: NaiveDate,
    ) -> Result<RefreshOutcome, EngineError> {
        let articles = self.news.fetch_trade_news(days_back, countries).await?;
        let articles_fetched = articles.len();

        let mut articles_stored = 0;
        for mut article in articles {
            article.sentiment_score = Some(score_article(&article));
            match self.store.upsert_article(&article) {
                Ok(()) => articles_stored += 1,
                Err(e) => warn!(url = %article.url, error = %e, "Failed to store article"),
            }
        }

        let week = self.recompute_week(today)?;
        info!(
            fetched = articles_fetched,
            stored = articles_stored,
            week_average = ?week.as_ref().map(|w| w.average_sentiment),
            "News sentiment refreshed"
        );
        Ok(RefreshOutcome {
            articles_fetched,
            articles_stored,
            week,
        })
    }

    /// Rebuild and store the aggregate for the week containing `day`.
    pub fn recompute_week(&self, day: NaiveDate) -> Result<Option<SentimentAnalysis>, EngineError> {
        let (week_start, week_end) = week_bounds(day);
        let (from, until) = day_range(week_start, week_end);
        let articles = self.store.articles_published_between(from, until)?;
        let previous = self
            .store
            .sentiment_for_week(week_start - Duration::weeks(1))?
            .map(|p| p.average_sentiment);

        let Some(analysis) = aggregate_week(&articles, week_start, week_end, previous) else {
            return Ok(None);
        };
        self.store.upsert_sentiment(&analysis)?;
        Ok(Some(analysis))
    }

    /// Aggregates for the trailing four calendar weeks, oldest first.
    pub fn history(&self, today: NaiveDate) -> Result<Vec<SentimentAnalysis>, EngineError> {
        let (current_start, _) = week_bounds(today);
        Ok(self
            .store
            .sentiment_since(current_start - Duration::weeks(3))?)
    }
}
