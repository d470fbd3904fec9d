use std::sync::Arc;

use chrono::{Months, NaiveDate, Utc};
use landed_models::money::ratio;
use landed_models::{DataSource, ExchangeRate, ExchangeRateAnalysis, RatePoint, RateTrend};
use landed_store::{CountryDirectory, Store};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{info, warn};

use crate::corridor::resolve_corridor;
use crate::error::EngineError;
use crate::providers::FxRateProvider;

/// Months of history the trend window covers.
pub const WINDOW_MONTHS: u32 = 6;
/// Below this many points a series is always stable.
pub const MIN_TREND_POINTS: usize = 10;
/// Percent change between half-window means that counts as a trend.
pub const TREND_THRESHOLD_PERCENT: Decimal = Decimal::TWO;

pub const LIVE_MESSAGE: &str = "Exchange rates updated from live API";
pub const FALLBACK_MESSAGE: &str =
    "Live API unavailable. Using last known stored data from database.";

/// Summary statistics over the trend window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowStats {
    pub min: RatePoint,
    pub max: RatePoint,
    pub average: Decimal,
}

/// Min and max (first occurrence wins on ties) and the mean at ratio precision.
pub fn window_stats(window: &[ExchangeRate]) -> Option<WindowStats> {
    let first = window.first()?;
    let mut min = first;
    let mut max = first;
    let mut sum = Decimal::ZERO;
    for rate in window {
        if rate.rate < min.rate {
            min = rate;
        }
        if rate.rate > max.rate {
            max = rate;
        }
        sum += rate.rate;
    }
    let average = ratio(sum, Decimal::from(window.len()))?;
    Some(WindowStats {
        min: RatePoint {
            date: min.rate_date,
            rate: min.rate,
        },
        max: RatePoint {
            date: max.rate_date,
            rate: max.rate,
        },
        average,
    })
}

pub(crate) fn mean(values: &[Decimal]) -> Option<Decimal> {
    ratio(values.iter().copied().sum(), Decimal::from(values.len()))
}

/// `(to - from) / from × 100`. `None` when `from` is zero.
pub fn percent_change(from: Decimal, to: Decimal) -> Option<Decimal> {
    ratio(to - from, from).map(|r| r * Decimal::ONE_HUNDRED)
}

/// Compare the mean of the first half of the series with the mean of the second.
pub fn classify_trend(rates: &[Decimal]) -> RateTrend {
    if rates.len() < MIN_TREND_POINTS {
        return RateTrend::Stable;
    }
    let (first, second) = rates.split_at(rates.len() / 2);
    let (Some(first_mean), Some(second_mean)) = (mean(first), mean(second)) else {
        return RateTrend::Stable;
    };
    match percent_change(first_mean, second_mean) {
        Some(change) if change > TREND_THRESHOLD_PERCENT => RateTrend::Increasing,
        Some(change) if change < -TREND_THRESHOLD_PERCENT => RateTrend::Decreasing,
        _ => RateTrend::Stable,
    }
}

fn fixed(value: Decimal, dp: u32) -> String {
    let mut rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(dp);
    rounded.to_string()
}

/// Rationale text for the purchase-timing recommendation.
pub fn recommendation_text(trend: RateTrend, stats: &WindowStats, current: Decimal) -> String {
    let best = format!(
        "{} on {}",
        fixed(stats.min.rate, 4),
        stats.min.date.format("%Y-%m-%d")
    );
    let current = fixed(current, 4);
    match trend {
        RateTrend::Decreasing => {
            let pct = percent_change(stats.max.rate, stats.average).unwrap_or_default();
            format!(
                "Exchange rate is trending downward ({}% below the {WINDOW_MONTHS}-month high). \
                 Consider waiting for further decline; the best rate in the window was {best}. \
                 Current rate: {current}.",
                fixed(pct.abs(), 2)
            )
        }
        RateTrend::Increasing => {
            let pct = percent_change(stats.min.rate, stats.average).unwrap_or_default();
            format!(
                "Exchange rate is trending upward ({}% above the {WINDOW_MONTHS}-month low). \
                 Consider purchasing soon; the best historical rate was {best}. \
                 Current rate: {current}.",
                fixed(pct.abs(), 2)
            )
        }
        RateTrend::Stable => {
            let spread = percent_change(stats.min.rate, stats.max.rate).unwrap_or_default();
            format!(
                "Exchange rate is relatively stable ({}% range over {WINDOW_MONTHS} months). \
                 Purchase timing is flexible; the best historical rate was {best}. \
                 Current rate: {current}.",
                fixed(spread.abs(), 2)
            )
        }
    }
}

/// Purchase-timing analysis over stored exchange-rate history.
pub struct FxTrendAnalyzer {
    directory: Arc<dyn CountryDirectory>,
    store: Arc<Store>,
    provider: Arc<dyn FxRateProvider>,
}

impl FxTrendAnalyzer {
    pub fn new(
        directory: Arc<dyn CountryDirectory>,
        store: Arc<Store>,
        provider: Arc<dyn FxRateProvider>,
    ) -> Self {
        Self {
            directory,
            store,
            provider,
        }
    }

    pub async fn analyze(
        &self,
        importing: &str,
        exporting: &str,
    ) -> Result<ExchangeRateAnalysis, EngineError> {
        self.analyze_as_of(importing, exporting, Utc::now().date_naive())
            .await
    }

    /// Same as [`FxTrendAnalyzer::analyze`] with an explicit "today".
    pub async fn analyze_as_of(
        &self,
        importing: &str,
        exporting: &str,
        today: NaiveDate,
    ) -> Result<ExchangeRateAnalysis, EngineError> {
        let corridor = resolve_corridor(self.directory.as_ref(), importing, exporting)?;
        let from = corridor.exporting_currency.as_str();
        let to = corridor.importing_currency.as_str();

        let live = self.refresh_live_rate(from, to).await;
        let (data_source, message) = if live {
            (DataSource::LiveApi, LIVE_MESSAGE)
        } else {
            (DataSource::FallbackDatabase, FALLBACK_MESSAGE)
        };

        let current = self.store.latest_exchange_rate(from, to)?.ok_or_else(|| {
            EngineError::NoData(format!("No exchange rate data available for {from} -> {to}"))
        })?;

        let window_start = today
            .checked_sub_months(Months::new(WINDOW_MONTHS))
            .unwrap_or(today);
        let window = self
            .store
            .exchange_rates_between(from, to, window_start, today)?;
        let stats = window_stats(&window).ok_or_else(|| {
            EngineError::NoData("No historical data available for trend analysis".to_string())
        })?;

        let rates: Vec<Decimal> = window.iter().map(|r| r.rate).collect();
        let trend = classify_trend(&rates);
        let recommendation = recommendation_text(trend, &stats, current.rate);

        info!(
            from,
            to,
            points = window.len(),
            trend = %trend,
            live,
            "Exchange-rate trend analyzed"
        );

        Ok(ExchangeRateAnalysis {
            importing_country: corridor.importing_country.clone(),
            exporting_country: corridor.exporting_country.clone(),
            importing_currency: corridor.importing_currency.clone(),
            exporting_currency: corridor.exporting_currency.clone(),
            current_rate: current.rate,
            current_rate_date: current.rate_date,
            average_rate: stats.average,
            min_rate: stats.min.rate,
            min_rate_date: stats.min.date,
            max_rate: stats.max.rate,
            max_rate_date: stats.max.date,
            trend,
            recommended_purchase_date: stats.min.date,
            recommendation,
            historical_rates: window
                .iter()
                .map(|r| RatePoint {
                    date: r.rate_date,
                    rate: r.rate,
                })
                .collect(),
            live_data_available: live,
            data_source,
            message: message.to_string(),
        })
    }

    /// Fetch and store the latest quote. `false` on any failure.
    async fn refresh_live_rate(&self, from: &str, to: &str) -> bool {
        let quote = match self.provider.latest_rate(from, to).await {
            Ok(quote) => quote,
            Err(e) => {
                warn!(from, to, error = %e, "Live exchange rate unavailable");
                return false;
            }
        };
        let row = ExchangeRate {
            from_currency: from.to_string(),
            to_currency: to.to_string(),
            rate: quote.rate,
            rate_date: quote.as_of,
        };
        match self.store.upsert_exchange_rate(&row) {
            Ok(()) => true,
            Err(e) => {
                warn!(from, to, error = %e, "Failed to store live exchange rate");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_country, seed_daily_rates, test_store, MockFxProvider};
    use rust_decimal_macros::dec;

    fn series(start: Decimal, step: Decimal, n: usize) -> Vec<Decimal> {
        (0..n).map(|i| start + step * Decimal::from(i)).collect()
    }

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn seeded() -> Arc<Store> {
        let store = test_store();
        seed_country(&store, "SG", "SGP", "Singapore", Some(dec!(9)), Some("SGD"));
        seed_country(&store, "US", "USA", "United States", None, Some("USD"));
        store
    }

    fn analyzer(store: &Arc<Store>, provider: MockFxProvider) -> FxTrendAnalyzer {
        FxTrendAnalyzer::new(store.clone(), store.clone(), Arc::new(provider))
    }

    #[test]
    fn trend_thresholds() {
        assert_eq!(classify_trend(&series(dec!(1.00), dec!(0.01), 20)), RateTrend::Increasing);
        assert_eq!(classify_trend(&series(dec!(1.20), dec!(-0.01), 20)), RateTrend::Decreasing);
        assert_eq!(classify_trend(&series(dec!(1.00), dec!(0.0001), 20)), RateTrend::Stable);
        assert_eq!(classify_trend(&series(dec!(1.00), dec!(0.05), 9)), RateTrend::Stable);
    }

    #[test]
    fn trend_reverses_with_time() {
        let rising = series(dec!(1.00), dec!(0.01), 20);
        let mut falling = rising.clone();
        falling.reverse();
        assert_eq!(classify_trend(&rising), RateTrend::Increasing);
        assert_eq!(classify_trend(&falling), RateTrend::Decreasing);
    }

    #[test]
    fn zero_first_half_is_stable() {
        let mut rates = vec![Decimal::ZERO; 5];
        rates.extend(vec![dec!(1); 5]);
        assert_eq!(classify_trend(&rates), RateTrend::Stable);
    }

    #[test]
    fn stats_keep_first_extreme() {
        let window: Vec<ExchangeRate> = [(1, dec!(1.3)), (2, dec!(1.1)), (3, dec!(1.1)), (4, dec!(1.5))]
            .into_iter()
            .map(|(d, rate)| ExchangeRate {
                from_currency: "USD".to_string(),
                to_currency: "SGD".to_string(),
                rate,
                rate_date: day(6, d),
            })
            .collect();
        let stats = window_stats(&window).unwrap();
        assert_eq!(stats.min.date, day(6, 2));
        assert_eq!(stats.max.date, day(6, 4));
        assert_eq!(stats.average, dec!(1.25));
        assert!(window_stats(&[]).is_none());
    }

    #[tokio::test]
    async fn live_quote_is_stored_and_reported() {
        let store = seeded();
        seed_daily_rates(&store, "USD", "SGD", day(5, 1), &series(dec!(1.30), dec!(0.002), 30));
        let analysis = analyzer(&store, MockFxProvider::quoting(dec!(1.40), day(6, 3)))
            .analyze_as_of("SG", "US", day(6, 3))
            .await
            .unwrap();

        assert!(analysis.live_data_available);
        assert_eq!(analysis.data_source, DataSource::LiveApi);
        assert_eq!(analysis.message, LIVE_MESSAGE);
        assert_eq!(analysis.current_rate, dec!(1.40));
        assert_eq!(analysis.current_rate_date, day(6, 3));
        assert_eq!(analysis.importing_currency, "SGD");
        assert_eq!(analysis.exporting_currency, "USD");
        assert_eq!(analysis.historical_rates.len(), 31);
        assert_eq!(analysis.trend, RateTrend::Increasing);
        assert_eq!(analysis.min_rate, dec!(1.30));
        assert_eq!(analysis.recommended_purchase_date, day(5, 1));
        assert!(analysis.recommendation.contains("trending upward"));
        assert!(analysis.recommendation.contains("1.3000 on 2024-05-01"));
    }

    #[tokio::test]
    async fn falls_back_to_stored_rates() {
        let store = seeded();
        seed_daily_rates(&store, "USD", "SGD", day(5, 20), &series(dec!(1.50), dec!(-0.01), 12));
        let analysis = analyzer(&store, MockFxProvider::failing())
            .analyze_as_of("Singapore", "USA", day(6, 3))
            .await
            .unwrap();

        assert!(!analysis.live_data_available);
        assert_eq!(analysis.data_source, DataSource::FallbackDatabase);
        assert_eq!(analysis.message, FALLBACK_MESSAGE);
        assert_eq!(analysis.current_rate, dec!(1.39));
        assert_eq!(analysis.trend, RateTrend::Decreasing);
        assert_eq!(analysis.recommended_purchase_date, day(5, 31));
        assert!(analysis.recommendation.contains("trending downward"));
    }

    #[tokio::test]
    async fn window_excludes_rates_older_than_six_months() {
        let store = seeded();
        seed_daily_rates(&store, "USD", "SGD", day(1, 1), &[dec!(0.5)]);
        seed_daily_rates(&store, "USD", "SGD", day(6, 1), &[dec!(1.35), dec!(1.36)]);

        let analysis = analyzer(&store, MockFxProvider::failing())
            .analyze_as_of("SG", "US", day(8, 1))
            .await
            .unwrap();
        assert_eq!(analysis.historical_rates.len(), 2);
        assert_eq!(analysis.min_rate, dec!(1.35));
        assert_eq!(analysis.trend, RateTrend::Stable);
        assert!(analysis.recommendation.contains("relatively stable"));
    }

    #[tokio::test]
    async fn missing_data_errors() {
        let store = seeded();
        let err = analyzer(&store, MockFxProvider::failing())
            .analyze_as_of("SG", "US", day(6, 3))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No exchange rate data available for USD -> SGD");

        seed_daily_rates(&store, "USD", "SGD", day(1, 1), &[dec!(1.3)]);
        let err = analyzer(&store, MockFxProvider::failing())
            .analyze_as_of("SG", "US", day(9, 1))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No historical data available for trend analysis");

        let err = analyzer(&store, MockFxProvider::failing())
            .analyze_as_of("XX", "US", day(9, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidCountry { .. }));
    }
}
