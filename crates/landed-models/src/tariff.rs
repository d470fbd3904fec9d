use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::market::ExchangeRate;

/// Basis a specific (per-unit) duty is charged on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnitBasis {
    Head,
    Kg,
}

impl UnitBasis {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitBasis::Head => "head",
            UnitBasis::Kg => "kg",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "head" | "heads" => Some(UnitBasis::Head),
            "kg" => Some(UnitBasis::Kg),
            _ => None,
        }
    }
}

/// A tariff schedule entry for one corridor and classification code.
///
/// Logically keyed by (code, importer, exporter, year). Several years may
/// coexist for the same corridor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TariffRate {
    pub classification_code: String,
    /// Alpha-2 code of the importing country.
    pub importing_country: String,
    /// Alpha-2 code of the exporting country.
    pub exporting_country: String,
    pub year: Option<i32>,
    /// Percentage of customs value (5 means 5%).
    pub ad_valorem_rate: Decimal,
    /// Amount charged per unit of `unit_basis`.
    #[serde(default)]
    pub specific_rate: Option<Decimal>,
    #[serde(default)]
    pub unit_basis: Option<UnitBasis>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Country {
    pub alpha2: String,
    pub alpha3: String,
    pub name: String,
    /// VAT/GST as a whole-number percentage (9 means 9%).
    #[serde(default)]
    pub vat_rate: Option<Decimal>,
    #[serde(default)]
    pub currency_code: Option<String>,
}

/// Per-kilogram freight rates for a corridor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShippingRate {
    pub importing_country: String,
    pub exporting_country: String,
    #[serde(default)]
    pub air_rate_per_kg: Option<Decimal>,
    #[serde(default)]
    pub sea_rate_per_kg: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ShippingMode {
    Air,
    Sea,
}

impl ShippingMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "AIR" => Some(ShippingMode::Air),
            "SEA" => Some(ShippingMode::Sea),
            _ => None,
        }
    }
}

impl ShippingRate {
    pub fn rate_for(&self, mode: ShippingMode) -> Option<Decimal> {
        match mode {
            ShippingMode::Air => self.air_rate_per_kg,
            ShippingMode::Sea => self.sea_rate_per_kg,
        }
    }
}

/// Bulk reference data loaded by `landed seed`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReferenceData {
    #[serde(default)]
    pub countries: Vec<Country>,
    #[serde(default)]
    pub tariff_rates: Vec<TariffRate>,
    #[serde(default)]
    pub shipping_rates: Vec<ShippingRate>,
    #[serde(default)]
    pub exchange_rates: Vec<ExchangeRate>,
}
