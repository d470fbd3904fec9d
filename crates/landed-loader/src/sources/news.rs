use chrono::NaiveDate;
use landed_engine::{resolve_corridor, SentimentService};
use landed_models::NewsConfig;
use landed_store::CountryDirectory;

use crate::config::CorridorConfig;
use crate::error::LoaderError;

/// Refresh news sentiment once, or once per corridor when the news config
/// asks for country-filtered queries. Returns the number of articles stored.
pub async fn refresh_news(
    sentiment: &SentimentService,
    directory: &dyn CountryDirectory,
    news: &NewsConfig,
    corridors: &[CorridorConfig],
    today: NaiveDate,
) -> Result<usize, LoaderError> {
    if !news.country_filter || corridors.is_empty() {
        let outcome = sentiment.refresh(news.days_back, None, today).await?;
        return Ok(outcome.articles_stored);
    }

    let mut stored = 0;
    let mut last_error = None;
    for corridor in corridors {
        let resolved = match resolve_corridor(directory, &corridor.importing, &corridor.exporting) {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::warn!(
                    importing = %corridor.importing,
                    exporting = %corridor.exporting,
                    error = %e,
                    "Skipping news refresh for corridor"
                );
                continue;
            }
        };
        let countries = (
            resolved.importing_country.as_str(),
            resolved.exporting_country.as_str(),
        );
        match sentiment.refresh(news.days_back, Some(countries), today).await {
            Ok(outcome) => stored += outcome.articles_stored,
            Err(e) => {
                tracing::warn!(
                    importing = countries.0,
                    exporting = countries.1,
                    error = %e,
                    "News refresh failed for corridor"
                );
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) if stored == 0 => Err(e.into()),
        _ => Ok(stored),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use landed_engine::test_support::{article, seed_country, test_store, MockNewsProvider};
    use std::sync::Arc;

    fn corridors() -> Vec<CorridorConfig> {
        vec![
            CorridorConfig {
                importing: "Singapore".to_string(),
                exporting: "USA".to_string(),
            },
            CorridorConfig {
                importing: "XX".to_string(),
                exporting: "US".to_string(),
            },
        ]
    }

    #[tokio::test]
    async fn filtered_refresh_queries_each_resolvable_corridor() {
        let store = test_store();
        seed_country(&store, "SG", "SGP", "Singapore", None, Some("SGD"));
        seed_country(&store, "US", "USA", "United States", None, Some("USD"));
        let published = Utc.with_ymd_and_hms(2024, 6, 4, 8, 0, 0).unwrap();
        let provider = Arc::new(MockNewsProvider::returning(vec![article(
            "https://wire.test/1",
            "Trade deal",
            "",
            published,
        )]));
        let sentiment = SentimentService::new(store.clone(), provider.clone());
        let config = NewsConfig {
            country_filter: true,
            ..Default::default()
        };

        let today = NaiveDate::from_ymd_opt(2024, 6, 6).unwrap();
        let stored = refresh_news(&sentiment, store.as_ref(), &config, &corridors(), today)
            .await
            .unwrap();

        assert_eq!(stored, 1);
        assert_eq!(provider.calls(), 1);
        assert_eq!(provider.last_countries(), Some(("SG".to_string(), "US".to_string())));
        assert!(store.latest_sentiment().unwrap().is_some());
    }

    #[tokio::test]
    async fn unfiltered_refresh_propagates_failure() {
        let store = test_store();
        let sentiment = SentimentService::new(store.clone(), Arc::new(MockNewsProvider::failing()));
        let today = NaiveDate::from_ymd_opt(2024, 6, 6).unwrap();
        let err = refresh_news(&sentiment, store.as_ref(), &NewsConfig::default(), &[], today)
            .await
            .unwrap_err();
        assert!(matches!(err, LoaderError::Engine(_)));
    }
}
