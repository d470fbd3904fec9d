use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A landed-cost calculation request as submitted by a caller.
///
/// Every field is optional on the wire; the normalizer fills gaps and
/// records what it changed in a [`NormalizationResult`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CalculationRequest {
    /// Country name, alpha-2 or alpha-3 code.
    pub importing_country: Option<String>,
    pub exporting_country: Option<String>,
    /// HS classification code. Non-digits are stripped during normalization.
    pub classification_code: Option<String>,
    pub product_value: Option<Decimal>,
    pub freight: Option<Decimal>,
    pub insurance: Option<Decimal>,
    /// "AIR" or "SEA".
    pub shipping_mode: Option<String>,
    /// Number of units (heads) in the shipment.
    pub heads: Option<i64>,
    /// Shipment weight in kilograms.
    pub weight: Option<Decimal>,
    /// VAT/GST rate as a fraction (0.09 for 9%). Overrides the stored country rate.
    pub vat_override: Option<Decimal>,
    /// Tariff schedule year to resolve against.
    pub year: Option<i32>,
}

/// Outcome of normalizing a [`CalculationRequest`].
///
/// `missing_fields` lists fields that were absent; `defaulted_fields` lists
/// every default or correction applied, with its replacement value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NormalizationResult {
    pub request: CalculationRequest,
    pub errors: Vec<String>,
    pub missing_fields: Vec<String>,
    pub defaulted_fields: Vec<String>,
}

impl NormalizationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Human-readable summary of the errors and the defaulted fields.
    pub fn error_message(&self) -> String {
        let mut message = format!("Validation errors: {}", self.errors.join(", "));
        if !self.missing_fields.is_empty() {
            message.push_str(&format!(
                ". Missing fields (defaulted): {}",
                self.missing_fields.join(", ")
            ));
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn deserialize_sparse_request() {
        let json = r#"{
            "importing_country": "SG",
            "exporting_country": "United States",
            "classification_code": "0101.21",
            "product_value": "10000.00",
            "freight": 200
        }"#;

        let request: CalculationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.importing_country.as_deref(), Some("SG"));
        assert_eq!(request.product_value, Some(dec!(10000.00)));
        assert_eq!(request.freight, Some(dec!(200)));
        assert!(request.insurance.is_none());
        assert!(request.heads.is_none());
        assert!(request.year.is_none());
    }

    #[test]
    fn error_message_lists_errors_then_missing_fields() {
        let result = NormalizationResult {
            request: CalculationRequest::default(),
            errors: vec![
                "Unknown importing country: Atlantis".to_string(),
                "Unknown exporting country: Lemuria".to_string(),
            ],
            missing_fields: vec!["product_value".to_string()],
            defaulted_fields: vec![],
        };

        assert!(!result.is_valid());
        assert_eq!(
            result.error_message(),
            "Validation errors: Unknown importing country: Atlantis, Unknown exporting country: Lemuria. \
             Missing fields (defaulted): product_value"
        );
    }

    #[test]
    fn error_message_without_missing_fields() {
        let result = NormalizationResult {
            errors: vec!["Request cannot be null".to_string()],
            ..Default::default()
        };
        assert_eq!(result.error_message(), "Validation errors: Request cannot be null");
    }
}
