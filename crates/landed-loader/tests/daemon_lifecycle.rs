//! Integration tests for the daemon lifecycle: both refresh loops run once on
//! startup against a file-backed store and stop on cancellation.
//!
//! Run with:
//! ```bash
//! cargo test -p landed-loader --test daemon_lifecycle
//! ```

use std::sync::Arc;
use std::time::Duration;

use landed_engine::test_support::{article, seed_country, MockFxProvider, MockNewsProvider};
use landed_loader::config::{CorridorConfig, LoaderConfig};
use landed_loader::daemon::Daemon;
use landed_store::Store;
use rust_decimal_macros::dec;

fn config(db_path: &str) -> LoaderConfig {
    let mut config = LoaderConfig::default();
    config.store.sqlite_path = db_path.to_string();
    config.fx_backfill.months = 1;
    config.fx_backfill.step_days = 7;
    config.corridors = vec![CorridorConfig {
        importing: "SG".to_string(),
        exporting: "US".to_string(),
    }];
    config
}

fn seeded_store(path: &str) -> Arc<Store> {
    let store = Arc::new(Store::open(path).unwrap());
    seed_country(&store, "SG", "SGP", "Singapore", Some(dec!(9)), Some("SGD"));
    seed_country(&store, "US", "USA", "United States", None, Some("USD"));
    store
}

async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..50 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not met in time");
}

/// Both loops write on startup, then the daemon stops when cancelled.
#[tokio::test]
async fn daemon_populates_store_and_shuts_down() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("loader.db");
    let db_path = db_path.to_str().unwrap();
    let store = seeded_store(db_path);

    let today = chrono::Utc::now().date_naive();
    let news = MockNewsProvider::returning(vec![article(
        "https://wire.test/1",
        "Trade agreement brings growth",
        "",
        chrono::Utc::now(),
    )]);
    let daemon = Daemon::new(
        config(db_path),
        store.clone(),
        Arc::new(MockFxProvider::quoting(dec!(1.34), today)),
        Arc::new(news),
    );
    let cancel = daemon.cancel_token();
    let handle = tokio::spawn(async move { daemon.run().await });

    wait_for(|| store.row_count("exchange_rates").unwrap_or(0) >= 5).await;
    wait_for(|| store.latest_sentiment().ok().flatten().is_some()).await;

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("daemon did not shut down in time")
        .expect("daemon panicked")
        .unwrap();

    assert_eq!(store.row_count("news_articles").unwrap(), 1);
    let latest = store.latest_exchange_rate("USD", "SGD").unwrap().unwrap();
    assert_eq!(latest.rate_date, today);
}

/// Provider outages are logged, not fatal; the daemon keeps running until cancelled.
#[tokio::test]
async fn daemon_survives_provider_failures() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("failing.db");
    let db_path = db_path.to_str().unwrap();
    let store = seeded_store(db_path);

    let fx = Arc::new(MockFxProvider::failing());
    let news = Arc::new(MockNewsProvider::failing());
    let daemon = Daemon::new(config(db_path), store.clone(), fx.clone(), news.clone());
    let cancel = daemon.cancel_token();
    let handle = tokio::spawn(async move { daemon.run().await });

    wait_for(|| fx.calls() >= 5 && news.calls() >= 1).await;
    assert!(!handle.is_finished());

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("daemon did not shut down in time")
        .expect("daemon panicked")
        .unwrap();
    assert_eq!(store.row_count("exchange_rates").unwrap(), 0);
}

/// With every task disabled the daemon returns immediately.
#[tokio::test]
async fn daemon_with_no_tasks_returns() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("idle.db");
    let db_path = db_path.to_str().unwrap();
    let mut config = config(db_path);
    config.fx_backfill.enabled = false;
    config.news_refresh.enabled = false;

    let daemon = Daemon::new(
        config,
        seeded_store(db_path),
        Arc::new(MockFxProvider::failing()),
        Arc::new(MockNewsProvider::failing()),
    );
    tokio::time::timeout(Duration::from_secs(1), daemon.run())
        .await
        .expect("idle daemon should return")
        .unwrap();
}

/// The file store is shared: a second handle sees what the daemon wrote.
#[tokio::test]
async fn from_config_opens_shared_store() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested/shared.db");
    let db_path = db_path.to_str().unwrap();
    let mut config = config(db_path);
    config.fx_backfill.enabled = false;
    config.news_refresh.enabled = false;

    let daemon = Daemon::from_config(config).unwrap();
    daemon.run().await.unwrap();

    let reader = Store::open(db_path).unwrap();
    assert_eq!(reader.row_count("countries").unwrap(), 0);
}
