use std::cmp::Reverse;
use std::sync::Arc;

use landed_models::money::round2;
use landed_models::{CalculationRequest, TariffRate, UnitBasis};
use landed_store::{Store, StoreError};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::parser::{clean_classification_code, extract_year, parse_rate_text};
use crate::providers::{ScrapedRecord, TariffScraper};

/// Lookup key for a tariff line.
#[derive(Debug, Clone, PartialEq)]
pub struct RateKey {
    pub classification_code: String,
    pub importer: String,
    pub exporter: String,
    pub year: Option<i32>,
}

impl RateKey {
    pub fn new(code: &str, importer: &str, exporter: &str, year: Option<i32>) -> Self {
        Self {
            classification_code: code.to_string(),
            importer: importer.to_uppercase(),
            exporter: exporter.to_uppercase(),
            year,
        }
    }
}

/// Stored-data lookup strategies, tried in order until one yields a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupTier {
    ExactYear,
    ClosestYear,
    AnyYear,
}

pub const STORED_TIERS: [LookupTier; 3] = [
    LookupTier::ExactYear,
    LookupTier::ClosestYear,
    LookupTier::AnyYear,
];

impl LookupTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupTier::ExactYear => "exact_year",
            LookupTier::ClosestYear => "closest_year",
            LookupTier::AnyYear => "any_year",
        }
    }

    fn lookup(&self, store: &Store, key: &RateKey) -> Result<Option<TariffRate>, StoreError> {
        let code = key.classification_code.as_str();
        match (self, key.year) {
            (LookupTier::ExactYear, Some(year)) => {
                store.find_tariff_rate(code, &key.importer, &key.exporter, year)
            }
            (LookupTier::ClosestYear, Some(year)) => Ok(closest_year(
                store.tariff_rates_for_corridor(code, &key.importer, &key.exporter)?,
                year,
            )),
            (LookupTier::AnyYear, None) => Ok(store
                .tariff_rates_for_corridor(code, &key.importer, &key.exporter)?
                .into_iter()
                .next()),
            _ => Ok(None),
        }
    }
}

/// Row whose year is nearest to `requested`; ties go to the later year.
pub fn closest_year(rates: Vec<TariffRate>, requested: i32) -> Option<TariffRate> {
    rates
        .into_iter()
        .filter_map(|rate| rate.year.map(|year| (year, rate)))
        .min_by_key(|(year, _)| ((*year - requested).abs(), Reverse(*year)))
        .map(|(_, rate)| rate)
}

/// Duty owed on one shipment under a resolved rate.
#[derive(Debug, Clone, PartialEq)]
pub struct DutyAssessment {
    pub rate: Option<TariffRate>,
    /// round2(product value × ad-valorem rate / 100).
    pub ad_valorem_duty: Decimal,
    /// Per-unit component; zero without a specific rate.
    pub specific_duty: Decimal,
}

impl DutyAssessment {
    fn none() -> Self {
        Self {
            rate: None,
            ad_valorem_duty: round2(Decimal::ZERO),
            specific_duty: round2(Decimal::ZERO),
        }
    }
}

pub fn ad_valorem_duty(product_value: Decimal, rate_percent: Decimal) -> Decimal {
    round2(product_value * rate_percent / Decimal::ONE_HUNDRED)
}

pub fn specific_duty(rate: &TariffRate, heads: Option<i64>, weight: Option<Decimal>) -> Decimal {
    let units = match rate.unit_basis {
        Some(UnitBasis::Head) => heads.map(Decimal::from),
        Some(UnitBasis::Kg) => weight,
        None => None,
    };
    match (rate.specific_rate, units) {
        (Some(amount), Some(units)) => round2(amount * units),
        _ => round2(Decimal::ZERO),
    }
}

/// Resolves tariff rates from stored data, falling back to the scraper.
pub struct RateResolver {
    store: Arc<Store>,
    scraper: Arc<dyn TariffScraper>,
}

impl RateResolver {
    pub fn new(store: Arc<Store>, scraper: Arc<dyn TariffScraper>) -> Self {
        Self { store, scraper }
    }

    pub async fn resolve_rate(
        &self,
        code: &str,
        importer: &str,
        exporter: &str,
        year: Option<i32>,
    ) -> Option<TariffRate> {
        let key = RateKey::new(code, importer, exporter, year);
        if let Some(rate) = self.lookup_stored(&key) {
            return Some(rate);
        }

        if self.scrape_and_persist(&key).await == 0 {
            return None;
        }
        self.lookup_stored(&key)
    }

    /// Ad-valorem duty for a normalized request. Zero when no rate resolves.
    pub async fn calculate_duty_amount(&self, request: &CalculationRequest) -> Decimal {
        self.assess_duty(request).await.ad_valorem_duty
    }

    /// Resolve once and price both duty components.
    pub async fn assess_duty(&self, request: &CalculationRequest) -> DutyAssessment {
        let (Some(code), Some(importer), Some(exporter)) = (
            request.classification_code.as_deref(),
            request.importing_country.as_deref(),
            request.exporting_country.as_deref(),
        ) else {
            return DutyAssessment::none();
        };

        let Some(rate) = self.resolve_rate(code, importer, exporter, request.year).await else {
            info!(code, importer, exporter, "No tariff rate found, duty is zero");
            return DutyAssessment::none();
        };

        let product_value = request.product_value.unwrap_or(Decimal::ZERO);
        DutyAssessment {
            ad_valorem_duty: ad_valorem_duty(product_value, rate.ad_valorem_rate),
            specific_duty: specific_duty(&rate, request.heads, request.weight),
            rate: Some(rate),
        }
    }

    fn lookup_stored(&self, key: &RateKey) -> Option<TariffRate> {
        STORED_TIERS.iter().find_map(|tier| {
            match tier.lookup(&self.store, key) {
                Ok(Some(rate)) => {
                    debug!(
                        code = %key.classification_code,
                        importer = %key.importer,
                        exporter = %key.exporter,
                        tier = tier.as_str(),
                        year = ?rate.year,
                        "Tariff rate resolved"
                    );
                    Some(rate)
                }
                Ok(None) => None,
                Err(e) => {
                    warn!(tier = tier.as_str(), error = %e, "Tariff lookup failed, treating as miss");
                    None
                }
            }
        })
    }

    /// Ask the scraper for the corridor and store what it finds. Returns the
    /// number of new rows.
    async fn scrape_and_persist(&self, key: &RateKey) -> usize {
        let response = match self.scraper.scrape(&key.importer, &key.exporter).await {
            Ok(response) => response,
            Err(e) => {
                warn!(importer = %key.importer, exporter = %key.exporter, error = %e, "Tariff scrape failed");
                return 0;
            }
        };
        if !response.is_success() {
            warn!(status = %response.status, "Tariff scrape did not succeed");
            return 0;
        }
        if response.records.is_empty() {
            info!(importer = %key.importer, exporter = %key.exporter, "Tariff scrape returned no records");
            return 0;
        }

        let mut saved = 0;
        for record in &response.records {
            match self.persist_record(record, key) {
                Ok(true) => saved += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(code = %record.classification_code, error = %e, "Skipping scraped tariff record");
                }
            }
        }
        info!(
            importer = %key.importer,
            exporter = %key.exporter,
            records = response.records.len(),
            saved,
            "Scraped tariff rates stored"
        );
        saved
    }

    /// Insert one scraped line unless the corridor already has that code.
    fn persist_record(&self, record: &ScrapedRecord, key: &RateKey) -> Result<bool, EngineError> {
        let code = clean_classification_code(&record.classification_code);
        if code.is_empty() {
            return Err(EngineError::Parse(format!(
                "Classification code has no digits: {}",
                record.classification_code
            )));
        }
        let importer = non_blank_upper(&record.importing_country, &key.importer);
        let exporter = non_blank_upper(&record.exporting_country, &key.exporter);

        if self.store.tariff_rate_exists(&code, &importer, &exporter)? {
            return Ok(false);
        }

        let rate = TariffRate {
            classification_code: code,
            importing_country: importer,
            exporting_country: exporter,
            year: record
                .date_text
                .as_deref()
                .and_then(extract_year)
                .or(key.year),
            ad_valorem_rate: parse_rate_text(&record.rate_text)?,
            specific_rate: None,
            unit_basis: None,
        };
        self.store.insert_tariff_rate(&rate)?;
        Ok(true)
    }
}

fn non_blank_upper(value: &str, fallback: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_uppercase()
    }
}
