//! In-process collaborators and seed helpers for tests.
//!
//! The mocks record how often they were called so tests can assert on the
//! fallback paths (e.g. that a stored rate never triggers a scrape).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use landed_models::money::round2;
use landed_models::{Country, ExchangeRate, NewsArticle, TariffRate};
use landed_store::Store;
use rust_decimal::Decimal;

use crate::error::ProviderError;
use crate::providers::{
    FxQuote, FxRateProvider, NewsProvider, ScrapeResponse, ScrapedRecord, ShippingCostSource,
    TariffScraper,
};

pub fn test_store() -> Arc<Store> {
    match Store::open_in_memory() {
        Ok(store) => Arc::new(store),
        Err(e) => panic!("in-memory store: {e}"),
    }
}

pub fn seed_country(
    store: &Store,
    alpha2: &str,
    alpha3: &str,
    name: &str,
    vat_rate: Option<Decimal>,
    currency_code: Option<&str>,
) {
    let country = Country {
        alpha2: alpha2.to_string(),
        alpha3: alpha3.to_string(),
        name: name.to_string(),
        vat_rate,
        currency_code: currency_code.map(str::to_string),
    };
    if let Err(e) = store.upsert_country(&country) {
        panic!("seed country {alpha2}: {e}");
    }
}

pub fn seed_tariff(
    store: &Store,
    code: &str,
    importer: &str,
    exporter: &str,
    year: Option<i32>,
    ad_valorem_rate: Decimal,
) {
    let rate = TariffRate {
        classification_code: code.to_string(),
        importing_country: importer.to_string(),
        exporting_country: exporter.to_string(),
        year,
        ad_valorem_rate,
        specific_rate: None,
        unit_basis: None,
    };
    if let Err(e) = store.upsert_tariff_rate(&rate) {
        panic!("seed tariff {code}: {e}");
    }
}

/// One rate per consecutive day starting at `start`.
pub fn seed_daily_rates(store: &Store, from: &str, to: &str, start: NaiveDate, rates: &[Decimal]) {
    for (offset, rate) in rates.iter().enumerate() {
        let row = ExchangeRate {
            from_currency: from.to_string(),
            to_currency: to.to_string(),
            rate: *rate,
            rate_date: start + Duration::days(offset as i64),
        };
        if let Err(e) = store.upsert_exchange_rate(&row) {
            panic!("seed exchange rate: {e}");
        }
    }
}

pub fn article(url: &str, title: &str, description: &str, published_at: DateTime<Utc>) -> NewsArticle {
    NewsArticle {
        url: url.to_string(),
        title: title.to_string(),
        description: Some(description.to_string()),
        source: Some("Test Wire".to_string()),
        published_at,
        sentiment_score: None,
        keywords: Vec::new(),
    }
}

pub fn scraped_record(code: &str, importer: &str, exporter: &str, rate: &str, date: Option<&str>) -> ScrapedRecord {
    ScrapedRecord {
        classification_code: code.to_string(),
        importing_country: importer.to_string(),
        exporting_country: exporter.to_string(),
        rate_text: rate.to_string(),
        date_text: date.map(str::to_string),
    }
}

/// Scraper returning a canned response, or failing when none is set.
pub struct MockScraper {
    response: Option<ScrapeResponse>,
    calls: AtomicUsize,
}

impl MockScraper {
    pub fn returning(status: &str, records: Vec<ScrapedRecord>) -> Self {
        Self {
            response: Some(ScrapeResponse {
                status: status.to_string(),
                source_url: Some("https://tariffs.test/lookup".to_string()),
                records,
            }),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            response: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TariffScraper for MockScraper {
    async fn scrape(&self, _importer: &str, _exporter: &str) -> Result<ScrapeResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response
            .clone()
            .ok_or_else(|| ProviderError::Api("scraper unavailable".to_string()))
    }
}

/// FX provider quoting a fixed latest rate and a fixed historical rate.
pub struct MockFxProvider {
    latest: Option<FxQuote>,
    historical: Option<Decimal>,
    calls: AtomicUsize,
    requested_dates: Mutex<Vec<NaiveDate>>,
}

impl MockFxProvider {
    pub fn quoting(rate: Decimal, as_of: NaiveDate) -> Self {
        Self {
            latest: Some(FxQuote { rate, as_of }),
            historical: Some(rate),
            calls: AtomicUsize::new(0),
            requested_dates: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            latest: None,
            historical: None,
            calls: AtomicUsize::new(0),
            requested_dates: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Dates passed to `rate_on`, in call order.
    pub fn requested_dates(&self) -> Vec<NaiveDate> {
        self.requested_dates
            .lock()
            .map(|dates| dates.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl FxRateProvider for MockFxProvider {
    async fn latest_rate(&self, _base: &str, _symbol: &str) -> Result<FxQuote, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.latest
            .clone()
            .ok_or_else(|| ProviderError::Api("fx provider unavailable".to_string()))
    }

    async fn rate_on(
        &self,
        _base: &str,
        _symbol: &str,
        date: NaiveDate,
    ) -> Result<FxQuote, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut dates) = self.requested_dates.lock() {
            dates.push(date);
        }
        self.historical
            .map(|rate| FxQuote { rate, as_of: date })
            .ok_or_else(|| ProviderError::Api("fx provider unavailable".to_string()))
    }
}

/// News provider returning a fixed article list, or failing when none is set.
pub struct MockNewsProvider {
    articles: Option<Vec<NewsArticle>>,
    calls: AtomicUsize,
    last_countries: Mutex<Option<(String, String)>>,
}

impl MockNewsProvider {
    pub fn returning(articles: Vec<NewsArticle>) -> Self {
        Self {
            articles: Some(articles),
            calls: AtomicUsize::new(0),
            last_countries: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            articles: None,
            calls: AtomicUsize::new(0),
            last_countries: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_countries(&self) -> Option<(String, String)> {
        self.last_countries.lock().ok().and_then(|c| c.clone())
    }
}

#[async_trait]
impl NewsProvider for MockNewsProvider {
    async fn fetch_trade_news(
        &self,
        _days_back: u32,
        countries: Option<(&str, &str)>,
    ) -> Result<Vec<NewsArticle>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_countries.lock() {
            *last = countries.map(|(a, b)| (a.to_string(), b.to_string()));
        }
        self.articles
            .clone()
            .ok_or_else(|| ProviderError::Api("news provider unavailable".to_string()))
    }
}

/// Flat per-kg shipping price regardless of lane or mode.
pub struct FlatShipping {
    pub per_kg: Decimal,
}

impl ShippingCostSource for FlatShipping {
    fn shipping_cost(
        &self,
        _mode: &str,
        _importer: &str,
        _exporter: &str,
        weight: Option<Decimal>,
    ) -> Decimal {
        round2(self.per_kg * weight.unwrap_or(Decimal::ZERO))
    }
}
