use std::sync::Arc;

use chrono::{Duration, Months, NaiveDate};
use landed_engine::{resolve_corridor, FxRateProvider};
use landed_models::ExchangeRate;
use landed_store::{CountryDirectory, Store};

use crate::config::{CorridorConfig, FxBackfillConfig};
use crate::error::LoaderError;

/// Counts from one corridor backfill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillOutcome {
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BackfillOutcome {
    fn absorb(&mut self, other: BackfillOutcome) {
        self.written += other.written;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// Dates to backfill, oldest first: `today`, then every `step_days` back
/// until `months` calendar months before it.
pub fn backfill_dates(today: NaiveDate, months: u32, step_days: u32) -> Vec<NaiveDate> {
    let start = today.checked_sub_months(Months::new(months)).unwrap_or(today);
    let step = Duration::days(i64::from(step_days.max(1)));
    let mut dates = Vec::new();
    let mut date = today;
    while date >= start {
        dates.push(date);
        date -= step;
    }
    dates.reverse();
    dates
}

/// Fill missing historical rates for one corridor. Each date is fetched on
/// its own, so one failed date does not stop the rest.
pub async fn backfill_corridor(
    store: &Store,
    directory: &dyn CountryDirectory,
    provider: &dyn FxRateProvider,
    corridor: &CorridorConfig,
    config: &FxBackfillConfig,
    today: NaiveDate,
) -> Result<BackfillOutcome, LoaderError> {
    let resolved = resolve_corridor(directory, &corridor.importing, &corridor.exporting)?;
    let from = resolved.exporting_currency.as_str();
    let to = resolved.importing_currency.as_str();

    let mut outcome = BackfillOutcome::default();
    if from == to {
        tracing::debug!(from, "Corridor shares a currency, nothing to backfill");
        return Ok(outcome);
    }

    for date in backfill_dates(today, config.months, config.step_days) {
        if store.exchange_rate_exists(from, to, date)? {
            outcome.skipped += 1;
            continue;
        }
        match provider.rate_on(from, to, date).await {
            Ok(quote) => {
                store.upsert_exchange_rate(&ExchangeRate {
                    from_currency: from.to_string(),
                    to_currency: to.to_string(),
                    rate: quote.rate,
                    rate_date: date,
                })?;
                outcome.written += 1;
            }
            Err(e) => {
                tracing::warn!(from, to, %date, error = %e, "Historical rate unavailable");
                outcome.failed += 1;
            }
        }
    }

    tracing::info!(
        from,
        to,
        written = outcome.written,
        skipped = outcome.skipped,
        failed = outcome.failed,
        "FX history backfilled"
    );
    Ok(outcome)
}

/// Backfill every corridor. A corridor that cannot be resolved is logged and
/// skipped.
pub async fn backfill_all(
    store: &Arc<Store>,
    provider: &dyn FxRateProvider,
    corridors: &[CorridorConfig],
    config: &FxBackfillConfig,
    today: NaiveDate,
) -> BackfillOutcome {
    let mut total = BackfillOutcome::default();
    for corridor in corridors {
        match backfill_corridor(store, store.as_ref(), provider, corridor, config, today).await {
            Ok(outcome) => total.absorb(outcome),
            Err(e) => {
                tracing::error!(
                    importing = %corridor.importing,
                    exporting = %corridor.exporting,
                    error = %e,
                    "FX backfill failed for corridor"
                );
            }
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use landed_engine::test_support::{seed_country, seed_daily_rates, test_store, MockFxProvider};
    use rust_decimal_macros::dec;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn corridor(importing: &str, exporting: &str) -> CorridorConfig {
        CorridorConfig {
            importing: importing.to_string(),
            exporting: exporting.to_string(),
        }
    }

    fn seeded() -> Arc<Store> {
        let store = test_store();
        seed_country(&store, "SG", "SGP", "Singapore", None, Some("SGD"));
        seed_country(&store, "US", "USA", "United States", None, Some("USD"));
        store
    }

    #[test]
    fn weekly_dates_cover_six_months() {
        let dates = backfill_dates(day(2024, 6, 30), 6, 7);
        assert_eq!(dates.first(), Some(&day(2023, 12, 31)));
        assert_eq!(dates.last(), Some(&day(2024, 6, 30)));
        assert_eq!(dates.len(), 27);
        assert!(dates.windows(2).all(|w| w[1] - w[0] == Duration::days(7)));
    }

    #[test]
    fn zero_step_is_treated_as_daily() {
        let dates = backfill_dates(day(2024, 3, 3), 0, 0);
        assert_eq!(dates, vec![day(2024, 3, 3)]);
    }

    #[tokio::test]
    async fn skips_dates_already_stored() {
        let store = seeded();
        let today = day(2024, 6, 30);
        seed_daily_rates(&store, "USD", "SGD", today, &[dec!(1.35)]);
        let provider = MockFxProvider::quoting(dec!(1.34), today);
        let config = FxBackfillConfig {
            months: 1,
            step_days: 7,
            ..Default::default()
        };

        let outcome = backfill_corridor(
            &store,
            store.as_ref(),
            &provider,
            &corridor("SG", "US"),
            &config,
            today,
        )
        .await
        .unwrap();

        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.written, 4);
        assert_eq!(outcome.failed, 0);
        assert!(!provider.requested_dates().contains(&today));
        assert_eq!(
            store
                .latest_exchange_rate("USD", "SGD")
                .unwrap()
                .unwrap()
                .rate,
            dec!(1.35)
        );

        let again = backfill_corridor(
            &store,
            store.as_ref(),
            &provider,
            &corridor("SG", "US"),
            &config,
            today,
        )
        .await
        .unwrap();
        assert_eq!(again.written, 0);
        assert_eq!(again.skipped, 5);
    }

    #[tokio::test]
    async fn provider_failures_are_counted_per_date() {
        let store = seeded();
        let config = FxBackfillConfig {
            months: 1,
            step_days: 14,
            ..Default::default()
        };
        let outcome = backfill_corridor(
            &store,
            store.as_ref(),
            &MockFxProvider::failing(),
            &corridor("Singapore", "USA"),
            &config,
            day(2024, 6, 30),
        )
        .await
        .unwrap();
        assert_eq!(outcome.failed, 3);
        assert_eq!(outcome.written, 0);
        assert_eq!(store.row_count("exchange_rates").unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_corridor_does_not_stop_the_rest() {
        let store = seeded();
        let provider = MockFxProvider::quoting(dec!(1.3), day(2024, 6, 30));
        let config = FxBackfillConfig {
            months: 1,
            step_days: 30,
            ..Default::default()
        };
        let total = backfill_all(
            &store,
            &provider,
            &[corridor("XX", "US"), corridor("SG", "US")],
            &config,
            day(2024, 6, 30),
        )
        .await;
        assert_eq!(total.written, 2);
    }
}
