use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use landed_models::ScraperConfig;
use landed_store::CountryDirectory;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use super::{ScrapeResponse, ScrapedRecord, TariffScraper};
use crate::error::ProviderError;

/// Client for the tariff scraper microservice.
///
/// The service expects alpha-3 codes and may answer with names or codes of
/// either length; both directions are translated through the directory.
pub struct HttpScraper {
    client: Client,
    base_url: String,
    directory: Arc<dyn CountryDirectory>,
}

#[derive(Debug, Deserialize)]
struct ScrapeBody {
    status: String,
    #[serde(default)]
    source_url: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Vec<ScrapeItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScrapeItem {
    #[serde(default)]
    hs_code: Option<String>,
    #[serde(default)]
    importing_country: Option<String>,
    #[serde(default)]
    exporting_country: Option<String>,
    #[serde(default)]
    tariff_rate: Option<serde_json::Value>,
    #[serde(default)]
    date: Option<String>,
}

impl HttpScraper {
    pub fn new(
        config: &ScraperConfig,
        directory: Arc<dyn CountryDirectory>,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            directory,
        })
    }

    /// True when the service answers its health endpoint with a 2xx.
    pub async fn health(&self) -> Result<bool, ProviderError> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Ok(response.status().is_success())
    }

    fn alpha3_for(&self, alpha2: &str) -> String {
        match self.directory.find_by_alpha2(alpha2) {
            Ok(Some(country)) => country.alpha3,
            _ => alpha2.to_uppercase(),
        }
    }

    fn alpha2_for(&self, identifier: Option<&str>, fallback: &str) -> String {
        identifier
            .filter(|s| !s.trim().is_empty())
            .and_then(|s| self.directory.resolve(s).ok().flatten())
            .map(|c| c.alpha2)
            .unwrap_or_else(|| fallback.to_uppercase())
    }

    fn records_from(
        &self,
        items: Vec<ScrapeItem>,
        importer: &str,
        exporter: &str,
    ) -> Vec<ScrapedRecord> {
        items
            .into_iter()
            .filter_map(|item| {
                let code = item.hs_code.filter(|c| !c.trim().is_empty())?;
                let rate_text = match item.tariff_rate? {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Null => return None,
                    other => other.to_string(),
                };
                Some(ScrapedRecord {
                    classification_code: code,
                    importing_country: self
                        .alpha2_for(item.importing_country.as_deref(), importer),
                    exporting_country: self
                        .alpha2_for(item.exporting_country.as_deref(), exporter),
                    rate_text,
                    date_text: item.date,
                })
            })
            .collect()
    }
}

#[async_trait]
impl TariffScraper for HttpScraper {
    async fn scrape(
        &self,
        importer: &str,
        exporter: &str,
    ) -> Result<ScrapeResponse, ProviderError> {
        let import_code = self.alpha3_for(importer);
        let export_code = self.alpha3_for(exporter);
        info!(import_code = %import_code, export_code = %export_code, "Requesting tariff scrape");

        let response = self
            .client
            .post(format!("{}/scrape", self.base_url))
            .form(&[
                ("import_code", import_code.as_str()),
                ("export_code", export_code.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;
        let body: ScrapeBody = response.json().await?;

        if let Some(message) = &body.message {
            debug!(status = %body.status, message = %message, "Scraper message");
        }
        let records = self.records_from(body.data, importer, exporter);
        Ok(ScrapeResponse {
            status: body.status,
            source_url: body.source_url,
            records,
        })
    }
}
