use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use landed_models::{
    DataSource, Headline, NewsConfig, PredictionResult, RateTrend, Recommendation,
    SentimentPoint, SentimentTrend,
};
use landed_store::{CountryDirectory, Store};
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::corridor::{resolve_corridor, Corridor};
use crate::error::EngineError;
use crate::fx_trend::{mean, percent_change};
use crate::sentiment::SentimentService;

/// Threshold on the current average for a positive or negative reading.
pub const SENTIMENT_LEVEL: f64 = 0.3;
/// Standard deviation below which the market counts as calm.
pub const LOW_VOLATILITY: f64 = 0.2;
/// Standard deviation above which the WAIT rationale calls volatility high.
pub const HIGH_VOLATILITY: f64 = 0.3;
/// Every historical week must clear this for the consistency bonus. An empty
/// history clears it vacuously.
pub const CONSISTENCY_LEVEL: f64 = 0.1;
/// Percent change over the short FX window that counts as a move.
pub const SHORT_FX_THRESHOLD_PERCENT: Decimal = Decimal::ONE;

const HEADLINE_DAYS: i64 = 7;
const HEADLINE_LIMIT: usize = 2;
const SHORT_FX_DAYS: i64 = 14;

/// Weighted votes for each recommendation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FactorScores {
    pub buy: f64,
    pub wait: f64,
    pub hold: f64,
}

impl FactorScores {
    /// Scale so the three votes sum to one. All-zero scores stay as they are.
    pub fn normalized(self) -> Self {
        let total = self.buy + self.wait + self.hold;
        if total <= 0.0 {
            return self;
        }
        Self {
            buy: self.buy / total,
            wait: self.wait / total,
            hold: self.hold / total,
        }
    }

    /// The strict winner, or HOLD when no vote is strictly highest.
    pub fn decide(&self) -> (Recommendation, f64) {
        if self.buy > self.wait && self.buy > self.hold {
            (Recommendation::Buy, self.buy)
        } else if self.wait > self.buy && self.wait > self.hold {
            (Recommendation::Wait, self.wait)
        } else {
            (Recommendation::Hold, self.hold)
        }
    }
}

/// Population standard deviation. Zero for an empty series.
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

/// Score the four factors and normalize.
pub fn score_factors(
    sentiment: f64,
    trend: SentimentTrend,
    volatility: f64,
    history: &[f64],
) -> FactorScores {
    let mut scores = FactorScores::default();

    if sentiment > SENTIMENT_LEVEL {
        scores.buy += 0.4;
    } else if sentiment < -SENTIMENT_LEVEL {
        scores.wait += 0.4;
    } else {
        scores.hold += 0.3;
    }

    match trend {
        SentimentTrend::Improving => scores.buy += 0.3,
        SentimentTrend::Declining => scores.wait += 0.3,
        SentimentTrend::Stable => scores.hold += 0.2,
    }

    if volatility < LOW_VOLATILITY {
        scores.buy += 0.2;
        scores.hold += 0.2;
    } else {
        scores.wait += 0.3;
    }

    if history.iter().all(|s| *s > CONSISTENCY_LEVEL) {
        scores.buy += 0.1;
    } else if history.iter().all(|s| *s < -CONSISTENCY_LEVEL) {
        scores.wait += 0.1;
    }

    scores.normalized()
}

pub fn rationale(
    recommendation: Recommendation,
    sentiment: f64,
    trend: SentimentTrend,
    volatility: f64,
) -> String {
    match recommendation {
        Recommendation::Buy => {
            let level = if volatility < LOW_VOLATILITY { "low" } else { "moderate" };
            format!(
                "Market sentiment is positive ({sentiment:.2}) and {trend}. Trade news \
                 indicates favorable conditions with {level} volatility. This is a good \
                 time to proceed with purchases."
            )
        }
        Recommendation::Wait => {
            let mood = if sentiment < 0.0 { "negative" } else { "uncertain" };
            let level = if volatility > HIGH_VOLATILITY { "High" } else { "Moderate" };
            format!(
                "Market sentiment is {mood} ({sentiment:.2}) and {trend}. {level} market \
                 volatility suggests waiting for more favorable conditions before \
                 committing to purchases."
            )
        }
        Recommendation::Hold => {
            let level = if volatility < LOW_VOLATILITY { "low" } else { "moderate" };
            format!(
                "Market sentiment is neutral ({sentiment:.2}) with a {trend} trend and \
                 {level} volatility. Consider maintaining current positions and monitoring \
                 for clearer signals."
            )
        }
    }
}

/// Direction of a short rate series: mean of the first half against the mean
/// of the second, split at `len / 2`.
pub fn short_rate_trend(rates: &[Decimal]) -> RateTrend {
    if rates.len() < 2 {
        return RateTrend::Stable;
    }
    let (first, second) = rates.split_at(rates.len() / 2);
    let change = mean(first)
        .zip(mean(second))
        .and_then(|(first_mean, second_mean)| percent_change(first_mean, second_mean));
    match change {
        Some(change) if change > SHORT_FX_THRESHOLD_PERCENT => RateTrend::Increasing,
        Some(change) if change < -SHORT_FX_THRESHOLD_PERCENT => RateTrend::Decreasing,
        _ => RateTrend::Stable,
    }
}

/// BUY/WAIT/HOLD recommendation from news sentiment and its stability.
pub struct PredictiveScorer {
    directory: Arc<dyn CountryDirectory>,
    store: Arc<Store>,
    sentiment: SentimentService,
    news: NewsConfig,
}

impl PredictiveScorer {
    pub fn new(
        directory: Arc<dyn CountryDirectory>,
        store: Arc<Store>,
        sentiment: SentimentService,
        news: NewsConfig,
    ) -> Self {
        Self {
            directory,
            store,
            sentiment,
            news,
        }
    }

    pub async fn predict(
        &self,
        importing: &str,
        exporting: &str,
        enable_news_refresh: bool,
    ) -> Result<PredictionResult, EngineError> {
        self.predict_at(importing, exporting, enable_news_refresh, Utc::now())
            .await
    }

    /// Same as [`PredictiveScorer::predict`] with an explicit clock.
    pub async fn predict_at(
        &self,
        importing: &str,
        exporting: &str,
        enable_news_refresh: bool,
        now: DateTime<Utc>,
    ) -> Result<PredictionResult, EngineError> {
        let corridor = resolve_corridor(self.directory.as_ref(), importing, exporting)?;
        let today = now.date_naive();

        let (live, data_source, message) = if enable_news_refresh {
            self.refresh_news(&corridor, today).await
        } else {
            (
                false,
                DataSource::FallbackDatabase,
                "Using stored sentiment data.".to_string(),
            )
        };

        let current = self.store.latest_sentiment()?.ok_or_else(|| {
            EngineError::NoData(
                "No sentiment data available. Please enable news analysis first.".to_string(),
            )
        })?;
        let from = corridor.exporting_currency.as_str();
        let to = corridor.importing_currency.as_str();
        let latest_rate = self.store.latest_exchange_rate(from, to)?.ok_or_else(|| {
            EngineError::NoData(format!("No exchange rate data available for {from} -> {to}"))
        })?;

        let history = self.sentiment.history(today)?;
        let history_values: Vec<f64> = history.iter().map(|h| h.average_sentiment).collect();
        let volatility = population_std_dev(&history_values);

        let scores = score_factors(
            current.average_sentiment,
            current.trend,
            volatility,
            &history_values,
        );
        let (recommendation, confidence) = scores.decide();
        let rationale = rationale(
            recommendation,
            current.average_sentiment,
            current.trend,
            volatility,
        );

        let headlines = self.recent_headlines(now)?;
        let short_window = self.store.exchange_rates_between(
            from,
            to,
            today - Duration::days(SHORT_FX_DAYS),
            today,
        )?;
        let short_rates: Vec<Decimal> = short_window.iter().map(|r| r.rate).collect();
        let exchange_rate_trend = short_rate_trend(&short_rates);

        info!(
            importing = %corridor.importing_country,
            exporting = %corridor.exporting_country,
            recommendation = %recommendation,
            confidence,
            volatility,
            "Trade recommendation generated"
        );

        Ok(PredictionResult {
            id: Uuid::new_v4(),
            importing_country: corridor.importing_country,
            exporting_country: corridor.exporting_country,
            importing_currency: corridor.importing_currency,
            exporting_currency: corridor.exporting_currency,
            recommendation,
            confidence,
            rationale,
            current_sentiment: current.average_sentiment,
            sentiment_trend: current.trend,
            volatility,
            exchange_rate_trend,
            current_exchange_rate: latest_rate.rate,
            articles_analyzed: current.article_count,
            headlines,
            sentiment_history: history
                .iter()
                .map(|h| SentimentPoint {
                    week_start: h.week_start,
                    week_end: h.week_end,
                    average_sentiment: h.average_sentiment,
                    article_count: h.article_count,
                })
                .collect(),
            live_news_available: live,
            data_source,
            message,
            generated_at: now,
        })
    }

    async fn refresh_news(&self, corridor: &Corridor, today: NaiveDate) -> (bool, DataSource, String) {
        let countries = self.news.country_filter.then_some((
            corridor.importing_country.as_str(),
            corridor.exporting_country.as_str(),
        ));
        match self
            .sentiment
            .refresh(self.news.days_back, countries, today)
            .await
        {
            Ok(outcome) => (
                true,
                DataSource::LiveApi,
                format!(
                    "News sentiment refreshed from live API ({} articles).",
                    outcome.articles_fetched
                ),
            ),
            Err(e) => {
                warn!(error = %e, "News refresh failed, using stored sentiment");
                (
                    false,
                    DataSource::FallbackDatabase,
                    "Live news unavailable. Using last stored sentiment data.".to_string(),
                )
            }
        }
    }

    fn recent_headlines(&self, now: DateTime<Utc>) -> Result<Vec<Headline>, EngineError> {
        let articles = self
            .store
            .articles_published_between(now - Duration::days(HEADLINE_DAYS), now)?;
        Ok(articles
            .into_iter()
            .take(HEADLINE_LIMIT)
            .map(|a| Headline {
                sentiment_score: a.sentiment_score.unwrap_or(0.0),
                title: a.title,
                source: a.source,
                published_at: a.published_at,
                url: a.url,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        article, seed_country, seed_daily_rates, test_store, MockNewsProvider,
    };
    use chrono::TimeZone;
    use landed_models::SentimentAnalysis;
    use rust_decimal_macros::dec;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn noon(m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, m, d, 12, 0, 0).unwrap()
    }

    fn week(start: NaiveDate, average: f64, trend: SentimentTrend) -> SentimentAnalysis {
        SentimentAnalysis {
            week_start: start,
            week_end: start + Duration::days(6),
            average_sentiment: average,
            article_count: 12,
            positive_count: 8,
            negative_count: 2,
            neutral_count: 2,
            trend,
        }
    }

    fn seeded() -> Arc<Store> {
        let store = test_store();
        seed_country(&store, "SG", "SGP", "Singapore", Some(dec!(9)), Some("SGD"));
        seed_country(&store, "US", "USA", "United States", None, Some("USD"));
        seed_daily_rates(&store, "USD", "SGD", date(5, 27), &[dec!(1.35), dec!(1.36)]);
        store
    }

    fn scorer(store: &Arc<Store>, news: MockNewsProvider, country_filter: bool) -> PredictiveScorer {
        PredictiveScorer::new(
            store.clone(),
            store.clone(),
            SentimentService::new(store.clone(), Arc::new(news)),
            NewsConfig {
                country_filter,
                ..Default::default()
            },
        )
    }

    #[test]
    fn strong_positive_signal_is_buy() {
        let scores = score_factors(0.7, SentimentTrend::Improving, 0.05, &[0.6, 0.7]);
        let (recommendation, confidence) = scores.decide();
        assert_eq!(recommendation, Recommendation::Buy);
        assert!(confidence > 0.5);
        assert!((scores.buy + scores.wait + scores.hold - 1.0).abs() < 1e-9);
    }

    #[test]
    fn negative_volatile_signal_is_wait() {
        let scores = score_factors(-0.5, SentimentTrend::Declining, 0.35, &[-0.2, -0.6]);
        assert_eq!(scores.decide().0, Recommendation::Wait);
        assert_eq!(scores.buy, 0.0);
    }

    #[test]
    fn neutral_signal_is_hold() {
        let scores = score_factors(0.0, SentimentTrend::Stable, 0.1, &[0.0]);
        assert_eq!(scores.decide().0, Recommendation::Hold);
    }

    #[test]
    fn tie_falls_back_to_hold() {
        let tied = FactorScores {
            buy: 0.4,
            wait: 0.4,
            hold: 0.2,
        };
        assert_eq!(tied.decide(), (Recommendation::Hold, 0.2));
    }

    #[test]
    fn empty_history_counts_as_consistently_positive() {
        let positive = score_factors(-0.5, SentimentTrend::Declining, 0.0, &[0.5]);
        let empty = score_factors(-0.5, SentimentTrend::Declining, 0.0, &[]);
        let mixed = score_factors(-0.5, SentimentTrend::Declining, 0.0, &[0.5, -0.5]);
        assert_eq!(empty, positive);
        assert!(empty.buy > mixed.buy);
        assert!(empty.wait < mixed.wait);
    }

    #[test]
    fn std_dev_is_population() {
        assert_eq!(population_std_dev(&[]), 0.0);
        assert!((population_std_dev(&[0.2, 0.4]) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn rationale_qualifiers() {
        let text = rationale(Recommendation::Buy, 0.7, SentimentTrend::Improving, 0.25);
        assert!(text.starts_with("Market sentiment is positive (0.70) and improving."));
        assert!(text.contains("moderate volatility"));

        let text = rationale(Recommendation::Wait, -0.4, SentimentTrend::Declining, 0.31);
        assert!(text.contains("negative (-0.40)"));
        assert!(text.contains("High market volatility"));

        let text = rationale(Recommendation::Hold, 0.05, SentimentTrend::Stable, 0.1);
        assert!(text.contains("neutral (0.05) with a stable trend and low volatility"));
    }

    #[test]
    fn short_trend_uses_one_percent() {
        // A single spike at the end moves the endpoints by 5% but the half means by under 1%.
        let spiked = [dec!(1.00), dec!(1.00), dec!(1.00), dec!(0.98), dec!(0.99), dec!(1.05)];
        assert_eq!(short_rate_trend(&spiked), RateTrend::Stable);
        let dipped = [dec!(1.00), dec!(1.00), dec!(1.00), dec!(1.03), dec!(1.03), dec!(1.005)];
        assert_eq!(short_rate_trend(&dipped), RateTrend::Increasing);
        assert_eq!(short_rate_trend(&[dec!(1.00), dec!(1.02)]), RateTrend::Increasing);
        assert_eq!(short_rate_trend(&[dec!(1.00), dec!(0.98)]), RateTrend::Decreasing);
        assert_eq!(short_rate_trend(&[dec!(1.00), dec!(1.005)]), RateTrend::Stable);
        assert_eq!(short_rate_trend(&[dec!(1.00)]), RateTrend::Stable);
        assert_eq!(short_rate_trend(&[]), RateTrend::Stable);
    }

    #[tokio::test]
    async fn predicts_from_stored_sentiment() {
        let store = seeded();
        store.upsert_sentiment(&week(date(5, 20), 0.6, SentimentTrend::Stable)).unwrap();
        store.upsert_sentiment(&week(date(5, 27), 0.7, SentimentTrend::Improving)).unwrap();
        for (i, url) in ["https://h/1", "https://h/2", "https://h/3"].iter().enumerate() {
            let mut a = article(url, &format!("Headline {i}"), "", noon(5, 28 + i as u32));
            a.sentiment_score = Some(0.5);
            store.upsert_article(&a).unwrap();
        }
        let news = MockNewsProvider::failing();

        let result = scorer(&store, news, false)
            .predict_at("Singapore", "US", false, noon(5, 31))
            .await
            .unwrap();

        assert_eq!(result.recommendation, Recommendation::Buy);
        assert!(result.confidence > 0.5);
        assert_eq!(result.current_sentiment, 0.7);
        assert_eq!(result.sentiment_trend, SentimentTrend::Improving);
        assert_eq!(result.current_exchange_rate, dec!(1.36));
        assert_eq!(result.sentiment_history.len(), 2);
        assert_eq!(result.headlines.len(), 2);
        assert_eq!(result.headlines[0].url, "https://h/3");
        assert_eq!(result.articles_analyzed, 12);
        assert!(!result.live_news_available);
        assert_eq!(result.data_source, DataSource::FallbackDatabase);
        assert_eq!(result.exchange_rate_trend, RateTrend::Stable);
        assert_eq!(result.importing_currency, "SGD");
    }

    #[tokio::test]
    async fn refresh_failure_falls_back_to_stored_data() {
        let store = seeded();
        store.upsert_sentiment(&week(date(5, 27), -0.5, SentimentTrend::Declining)).unwrap();

        let result = scorer(&store, MockNewsProvider::failing(), false)
            .predict_at("SG", "US", true, noon(5, 31))
            .await
            .unwrap();
        assert!(!result.live_news_available);
        assert_eq!(result.data_source, DataSource::FallbackDatabase);
        assert_eq!(
            result.message,
            "Live news unavailable. Using last stored sentiment data."
        );
        assert_eq!(result.recommendation, Recommendation::Wait);
    }

    #[tokio::test]
    async fn live_refresh_builds_current_week() {
        let store = seeded();
        let articles = vec![
            article("https://n/1", "Trade agreement sparks growth", "", noon(5, 28)),
            article("https://n/2", "Recovery and expansion", "", noon(5, 29)),
        ];
        let news = MockNewsProvider::returning(articles);
        let scorer = scorer(&store, news, true);

        let result = scorer.predict_at("SG", "US", true, noon(5, 31)).await.unwrap();
        assert!(result.live_news_available);
        assert_eq!(result.data_source, DataSource::LiveApi);
        assert_eq!(result.sentiment_history.len(), 1);
        assert_eq!(result.sentiment_history[0].week_start, date(5, 27));
        assert_eq!(result.sentiment_history[0].article_count, 2);
        assert!(result.current_sentiment > SENTIMENT_LEVEL);
    }

    #[tokio::test]
    async fn country_filter_passes_corridor_to_news() {
        let store = seeded();
        let news = Arc::new(MockNewsProvider::returning(vec![article(
            "https://n/1",
            "Growth",
            "",
            noon(5, 28),
        )]));
        let scorer = PredictiveScorer::new(
            store.clone(),
            store.clone(),
            SentimentService::new(store.clone(), news.clone()),
            NewsConfig {
                country_filter: true,
                ..Default::default()
            },
        );

        scorer.predict_at("SG", "US", true, noon(5, 31)).await.unwrap();
        assert_eq!(news.last_countries(), Some(("SG".to_string(), "US".to_string())));
    }

    #[tokio::test]
    async fn missing_inputs_are_fatal() {
        let store = seeded();
        let err = scorer(&store, MockNewsProvider::failing(), false)
            .predict_at("SG", "US", false, noon(5, 31))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "No sentiment data available. Please enable news analysis first."
        );

        store.upsert_sentiment(&week(date(5, 27), 0.1, SentimentTrend::Stable)).unwrap();
        let err = scorer(&store, MockNewsProvider::failing(), false)
            .predict_at("US", "SG", false, noon(5, 31))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No exchange rate data available for SGD -> USD");
    }
}
