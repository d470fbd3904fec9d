//! Seams to the outside world. The engine only talks to collaborators
//! through these traits; `test_support` provides in-process doubles.

pub mod fx;
pub mod news;
pub mod scraper;

use async_trait::async_trait;
use chrono::NaiveDate;
use landed_models::NewsArticle;
use rust_decimal::Decimal;

use crate::error::ProviderError;

pub use fx::OpenExchangeRates;
pub use landed_store::CountryDirectory;
pub use news::NewsApi;
pub use scraper::HttpScraper;

/// One tariff line returned by the scraper, still in raw text form.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedRecord {
    pub classification_code: String,
    /// Alpha-2 code of the importing country.
    pub importing_country: String,
    pub exporting_country: String,
    pub rate_text: String,
    pub date_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeResponse {
    pub status: String,
    pub source_url: Option<String>,
    pub records: Vec<ScrapedRecord>,
}

impl ScrapeResponse {
    pub fn is_success(&self) -> bool {
        self.status.eq_ignore_ascii_case("success")
    }
}

/// Fetches tariff lines for a corridor from an external source.
#[async_trait]
pub trait TariffScraper: Send + Sync {
    /// `importer` and `exporter` are alpha-2 codes.
    async fn scrape(&self, importer: &str, exporter: &str)
        -> Result<ScrapeResponse, ProviderError>;
}

/// A single exchange-rate observation: units of `symbol` per one `base`.
#[derive(Debug, Clone, PartialEq)]
pub struct FxQuote {
    pub rate: Decimal,
    pub as_of: NaiveDate,
}

#[async_trait]
pub trait FxRateProvider: Send + Sync {
    async fn latest_rate(&self, base: &str, symbol: &str) -> Result<FxQuote, ProviderError>;

    async fn rate_on(
        &self,
        base: &str,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<FxQuote, ProviderError>;
}

#[async_trait]
pub trait NewsProvider: Send + Sync {
    /// Trade-related articles published in the trailing `days_back` days,
    /// optionally narrowed to a pair of alpha-2 country codes.
    async fn fetch_trade_news(
        &self,
        days_back: u32,
        countries: Option<(&str, &str)>,
    ) -> Result<Vec<NewsArticle>, ProviderError>;
}

/// Prices the shipping leg of a shipment. Implementations return a rounded
/// amount and zero when no rate is known.
pub trait ShippingCostSource: Send + Sync {
    fn shipping_cost(
        &self,
        mode: &str,
        importer: &str,
        exporter: &str,
        weight: Option<Decimal>,
    ) -> Decimal;
}
