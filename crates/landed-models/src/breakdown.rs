use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Final landed-cost breakdown. Every monetary field carries two fractional digits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostBreakdown {
    pub id: Uuid,
    pub importing_country: String,
    pub exporting_country: String,
    pub classification_code: String,
    pub product_value: Decimal,
    pub freight: Decimal,
    pub insurance: Decimal,
    pub shipping_mode: String,
    pub heads: Option<i64>,
    pub weight: Option<Decimal>,
    /// CIF value: product value + freight + insurance.
    pub customs_value: Decimal,
    /// Ad-valorem duty on the raw product value.
    pub unscaled_duty: Decimal,
    /// Ad-valorem duty rescaled onto the CIF value.
    pub base_duty: Decimal,
    pub specific_duty: Decimal,
    /// `base_duty + specific_duty`.
    pub tariff_amount: Decimal,
    pub vat_amount: Decimal,
    pub shipping_cost: Decimal,
    pub total_cost: Decimal,
    /// Percentage used for the ad-valorem duty, if a rate was resolved.
    pub ad_valorem_rate: Option<Decimal>,
    /// VAT fraction applied, if any.
    pub vat_rate: Option<Decimal>,
    /// Schedule year of the resolved tariff rate.
    pub year: Option<i32>,
    pub missing_fields: Vec<String>,
    pub defaulted_fields: Vec<String>,
    pub calculated_at: DateTime<Utc>,
}
