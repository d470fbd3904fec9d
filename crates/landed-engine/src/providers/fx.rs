use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use landed_models::money::ratio;
use landed_models::FxConfig;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use super::{FxQuote, FxRateProvider};
use crate::error::ProviderError;

const PROVIDER_BASE: &str = "USD";

/// Open Exchange Rates client. Every response is quoted against USD, so
/// other pairs are derived as a cross rate.
pub struct OpenExchangeRates {
    client: Client,
    api_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RatesBody {
    #[serde(default)]
    timestamp: Option<i64>,
    #[serde(default)]
    rates: HashMap<String, serde_json::Number>,
    #[serde(default)]
    error: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl OpenExchangeRates {
    pub fn new(config: &FxConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.resolved_api_key(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn fetch(&self, endpoint: &str, base: &str, symbol: &str) -> Result<RatesBody, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("Open Exchange Rates".to_string()))?;

        let symbols: Vec<&str> = [base, symbol]
            .into_iter()
            .filter(|c| *c != PROVIDER_BASE)
            .collect();

        let response = self
            .client
            .get(format!("{}/{endpoint}", self.api_url))
            .query(&[("app_id", api_key), ("symbols", symbols.join(",").as_str())])
            .send()
            .await?;
        let status = response.status();
        let body: RatesBody = response.json().await?;

        if body.error || !status.is_success() {
            let detail = body
                .description
                .or(body.message)
                .unwrap_or_else(|| status.to_string());
            return Err(ProviderError::Api(format!("Open Exchange Rates error: {detail}")));
        }
        Ok(body)
    }
}

/// Units of `symbol` per one `base`, derived from USD-quoted rates.
fn cross_rate(
    rates: &HashMap<String, serde_json::Number>,
    base: &str,
    symbol: &str,
) -> Result<Decimal, ProviderError> {
    let usd_to = |currency: &str| -> Result<Decimal, ProviderError> {
        if currency == PROVIDER_BASE {
            return Ok(Decimal::ONE);
        }
        let number = rates
            .get(currency)
            .ok_or_else(|| ProviderError::Parse(format!("No rate for {currency}")))?;
        number_to_decimal(number)
    };

    let base_rate = usd_to(base)?;
    let symbol_rate = usd_to(symbol)?;
    ratio(symbol_rate, base_rate)
        .ok_or_else(|| ProviderError::Parse(format!("Zero rate for {base}")))
}

fn number_to_decimal(number: &serde_json::Number) -> Result<Decimal, ProviderError> {
    let text = number.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| ProviderError::Parse(format!("Invalid rate {text}: {e}")))
}

fn timestamp_date(timestamp: Option<i64>) -> NaiveDate {
    timestamp
        .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
        .map(|dt| dt.date_naive())
        .unwrap_or_else(|| Utc::now().date_naive())
}

#[async_trait]
impl FxRateProvider for OpenExchangeRates {
    async fn latest_rate(&self, base: &str, symbol: &str) -> Result<FxQuote, ProviderError> {
        let body = self.fetch("latest.json", base, symbol).await?;
        let rate = cross_rate(&body.rates, base, symbol)?;
        let as_of = timestamp_date(body.timestamp);
        debug!(base, symbol, rate = %rate, as_of = %as_of, "Fetched latest exchange rate");
        Ok(FxQuote { rate, as_of })
    }

    async fn rate_on(
        &self,
        base: &str,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<FxQuote, ProviderError> {
        let endpoint = format!("historical/{}.json", date.format("%Y-%m-%d"));
        let body = self.fetch(&endpoint, base, symbol).await?;
        let rate = cross_rate(&body.rates, base, symbol)?;
        Ok(FxQuote { rate, as_of: date })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer, api_key: Option<&str>) -> OpenExchangeRates {
        let config = FxConfig {
            api_url: server.uri(),
            api_key: api_key.map(str::to_string),
            api_key_env: "LANDED_TEST_UNSET_FX_KEY".to_string(),
            timeout_seconds: 5,
        };
        OpenExchangeRates::new(&config).unwrap()
    }

    #[tokio::test]
    async fn latest_usd_base_reads_symbol_directly() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest.json"))
            .and(query_param("app_id", "test-key"))
            .and(query_param("symbols", "SGD"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "timestamp": 1717372800,
                "base": "USD",
                "rates": {"SGD": 1.3456}
            })))
            .mount(&server)
            .await;

        let quote = provider(&server, Some("test-key"))
            .latest_rate("USD", "SGD")
            .await
            .unwrap();
        assert_eq!(quote.rate, dec!(1.3456));
        assert_eq!(quote.as_of, NaiveDate::from_ymd_opt(2024, 6, 3).unwrap());
    }

    #[tokio::test]
    async fn cross_rate_between_two_non_usd_currencies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/historical/2024-05-01.json"))
            .and(query_param("symbols", "EUR,SGD"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "timestamp": 1714521600,
                "rates": {"EUR": 0.8, "SGD": 1.36}
            })))
            .mount(&server)
            .await;

        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let quote = provider(&server, Some("k"))
            .rate_on("EUR", "SGD", date)
            .await
            .unwrap();
        assert_eq!(quote.rate, dec!(1.7));
        assert_eq!(quote.as_of, date);
    }

    #[tokio::test]
    async fn api_error_body_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest.json"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": true,
                "status": 401,
                "message": "invalid_app_id",
                "description": "Invalid App ID provided."
            })))
            .mount(&server)
            .await;

        let err = provider(&server, Some("bad"))
            .latest_rate("USD", "SGD")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Api(ref m) if m.contains("Invalid App ID")));
    }

    #[tokio::test]
    async fn missing_key_is_not_configured() {
        let server = MockServer::start().await;
        let err = provider(&server, None)
            .latest_rate("USD", "SGD")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[test]
    fn inverse_of_usd_quote() {
        let mut rates = HashMap::new();
        rates.insert("SGD".to_string(), serde_json::Number::from(2));
        assert_eq!(cross_rate(&rates, "SGD", "USD").unwrap(), dec!(0.5));
        assert!(matches!(
            cross_rate(&rates, "JPY", "USD"),
            Err(ProviderError::Parse(_))
        ));
    }
}
