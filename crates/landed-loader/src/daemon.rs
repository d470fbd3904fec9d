use std::sync::Arc;

use chrono::Utc;
use landed_engine::providers::{NewsApi, OpenExchangeRates};
use landed_engine::{FxRateProvider, NewsProvider, SentimentService};
use landed_store::Store;
use tokio_util::sync::CancellationToken;

use crate::config::LoaderConfig;
use crate::error::LoaderError;
use crate::sources::{fx_history, news};

/// The loader daemon. Keeps exchange-rate history and news sentiment current
/// in the shared SQLite store.
pub struct Daemon {
    config: Arc<LoaderConfig>,
    store: Arc<Store>,
    fx: Arc<dyn FxRateProvider>,
    news: Arc<dyn NewsProvider>,
    cancel: CancellationToken,
}

impl Daemon {
    pub fn new(
        config: LoaderConfig,
        store: Arc<Store>,
        fx: Arc<dyn FxRateProvider>,
        news: Arc<dyn NewsProvider>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            fx,
            news,
            cancel: CancellationToken::new(),
        }
    }

    /// Open the configured store and build the HTTP providers.
    pub fn from_config(config: LoaderConfig) -> Result<Self, LoaderError> {
        config.validate()?;
        if let Some(parent) = std::path::Path::new(&config.store.sqlite_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let store = Arc::new(Store::open(&config.store.sqlite_path)?);
        let fx = Arc::new(OpenExchangeRates::new(&config.fx)?);
        let news = Arc::new(NewsApi::new(&config.news)?);
        Ok(Self::new(config, store, fx, news))
    }

    /// Returns a CancellationToken that can be used to trigger shutdown.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the daemon until cancelled.
    pub async fn run(&self) -> Result<(), LoaderError> {
        tracing::info!(
            corridors = self.config.corridors.len(),
            "Landed loader daemon starting"
        );

        let mut join_set = tokio::task::JoinSet::new();

        // Task 1: FX history backfill
        if self.config.fx_backfill.enabled {
            let config = self.config.clone();
            let store = self.store.clone();
            let fx = self.fx.clone();
            let cancel = self.cancel.clone();
            join_set.spawn(async move {
                fx_backfill_loop(config, store, fx, cancel).await;
            });
        }

        // Task 2: News sentiment refresh
        if self.config.news_refresh.enabled {
            let config = self.config.clone();
            let store = self.store.clone();
            let sentiment = SentimentService::new(self.store.clone(), self.news.clone());
            let cancel = self.cancel.clone();
            join_set.spawn(async move {
                news_refresh_loop(config, store, sentiment, cancel).await;
            });
        }

        if join_set.is_empty() {
            tracing::warn!("No loader tasks enabled");
            return Ok(());
        }
        tracing::info!(tasks = join_set.len(), "All loader tasks started");

        // Wait for all tasks to complete (they run until cancelled)
        while let Some(result) = join_set.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Loader task panicked");
            }
        }

        tracing::info!("Landed loader daemon stopped");
        Ok(())
    }
}

async fn fx_backfill_loop(
    config: Arc<LoaderConfig>,
    store: Arc<Store>,
    fx: Arc<dyn FxRateProvider>,
    cancel: CancellationToken,
) {
    let interval = std::time::Duration::from_secs(config.fx_backfill.interval_seconds);

    loop {
        let today = Utc::now().date_naive();
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("FX backfill loop shutting down");
                break;
            }
            total = fx_history::backfill_all(
                &store,
                fx.as_ref(),
                &config.corridors,
                &config.fx_backfill,
                today,
            ) => {
                tracing::info!(
                    written = total.written,
                    skipped = total.skipped,
                    failed = total.failed,
                    "FX backfill cycle complete"
                );
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("FX backfill loop shutting down");
                break;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

async fn news_refresh_loop(
    config: Arc<LoaderConfig>,
    store: Arc<Store>,
    sentiment: SentimentService,
    cancel: CancellationToken,
) {
    let interval = std::time::Duration::from_secs(config.news_refresh.interval_seconds);

    loop {
        let today = Utc::now().date_naive();
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("News refresh loop shutting down");
                break;
            }
            result = news::refresh_news(
                &sentiment,
                store.as_ref(),
                &config.news,
                &config.corridors,
                today,
            ) => {
                match result {
                    Ok(stored) => tracing::info!(stored, "News refresh cycle complete"),
                    Err(e) => tracing::warn!(error = %e, "News refresh cycle failed"),
                }
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("News refresh loop shutting down");
                break;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
