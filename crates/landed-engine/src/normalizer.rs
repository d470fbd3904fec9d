use std::sync::Arc;

use landed_models::money::round2;
use landed_models::{CalculationRequest, NormalizationResult};
use landed_store::CountryDirectory;
use rust_decimal::Decimal;
use tracing::debug;

use crate::corridor::resolve_to_alpha2;
use crate::parser::{clean_classification_code, is_valid_classification_length};

pub const DEFAULT_SHIPPING_MODE: &str = "SEA";

pub fn default_product_value() -> Decimal {
    round2(Decimal::ONE_HUNDRED)
}

/// Validates a calculation request and fills in defaults.
///
/// The input is never mutated; the normalized copy and the audit of every
/// default or correction come back in a [`NormalizationResult`].
pub struct RequestNormalizer {
    directory: Arc<dyn CountryDirectory>,
}

/// Accumulates the audit lists while a request is being normalized.
struct Audit {
    errors: Vec<String>,
    missing_fields: Vec<String>,
    defaulted_fields: Vec<String>,
}

impl Audit {
    fn new() -> Self {
        Self {
            errors: Vec::new(),
            missing_fields: Vec::new(),
            defaulted_fields: Vec::new(),
        }
    }

    fn missing(&mut self, field: &str, note: String) {
        self.missing_fields.push(field.to_string());
        self.defaulted_fields.push(note);
    }

    fn finish(self, request: CalculationRequest) -> NormalizationResult {
        NormalizationResult {
            request,
            errors: self.errors,
            missing_fields: self.missing_fields,
            defaulted_fields: self.defaulted_fields,
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

impl RequestNormalizer {
    pub fn new(directory: Arc<dyn CountryDirectory>) -> Self {
        Self { directory }
    }

    /// Normalize a request that may be absent altogether.
    pub fn normalize_input(&self, request: Option<&CalculationRequest>) -> NormalizationResult {
        match request {
            Some(request) => self.normalize(request),
            None => NormalizationResult {
                errors: vec!["Request cannot be null".to_string()],
                ..Default::default()
            },
        }
    }

    pub fn normalize(&self, input: &CalculationRequest) -> NormalizationResult {
        let mut request = input.clone();
        let mut audit = Audit::new();

        for (value, field, label) in [
            (&request.importing_country, "importing_country", "Importing country"),
            (&request.exporting_country, "exporting_country", "Exporting country"),
            (&request.classification_code, "classification_code", "Classification code"),
        ] {
            if is_blank(value) {
                audit.missing_fields.push(field.to_string());
                audit.errors.push(format!("{label} is required"));
            }
        }
        if !audit.errors.is_empty() {
            return audit.finish(request);
        }

        normalize_amounts(&mut request, &mut audit);
        normalize_quantities(&mut request, &mut audit);
        normalize_shipping_mode(&mut request, &mut audit);
        self.normalize_countries(&mut request, &mut audit);
        normalize_classification(&mut request, &mut audit);

        if !audit.defaulted_fields.is_empty() {
            debug!(defaulted = ?audit.defaulted_fields, "Request normalized with defaults");
        }
        audit.finish(request)
    }

    pub fn is_valid_request(&self, request: &CalculationRequest) -> bool {
        self.normalize(request).is_valid()
    }

    /// Look up a country identifier on demand. `None` for blank or unknown input.
    pub fn resolve_to_alpha2(&self, identifier: Option<&str>) -> Option<String> {
        identifier.and_then(|id| resolve_to_alpha2(self.directory.as_ref(), id))
    }

    fn normalize_countries(&self, request: &mut CalculationRequest, audit: &mut Audit) {
        let importing = request.importing_country.clone().unwrap_or_default();
        match resolve_to_alpha2(self.directory.as_ref(), &importing) {
            Some(alpha2) => request.importing_country = Some(alpha2),
            None => audit
                .errors
                .push(format!("Unknown importing country: {}", importing.trim())),
        }

        let exporting = request.exporting_country.clone().unwrap_or_default();
        match resolve_to_alpha2(self.directory.as_ref(), &exporting) {
            Some(alpha2) => request.exporting_country = Some(alpha2),
            None => audit
                .errors
                .push(format!("Unknown exporting country: {}", exporting.trim())),
        }
    }
}

fn normalize_amounts(request: &mut CalculationRequest, audit: &mut Audit) {
    let fallback = default_product_value();
    let product_value = request.product_value;
    match product_value {
        None => {
            audit.missing(
                "product_value",
                format!("product_value (defaulted to {fallback}, was missing)"),
            );
            request.product_value = Some(fallback);
        }
        Some(value) if value <= Decimal::ZERO => {
            audit.defaulted_fields.push(format!(
                "product_value (corrected from non-positive {value} to {fallback})"
            ));
            request.product_value = Some(fallback);
        }
        Some(_) => {}
    }

    let zero = round2(Decimal::ZERO);
    for (slot, field) in [
        (&mut request.freight, "freight"),
        (&mut request.insurance, "insurance"),
    ] {
        let current = *slot;
        match current {
            None => {
                audit.missing(field, format!("{field} (defaulted to {zero}, was missing)"));
                *slot = Some(zero);
            }
            Some(value) if value < Decimal::ZERO => {
                audit
                    .defaulted_fields
                    .push(format!("{field} (corrected from negative {value} to {zero})"));
                *slot = Some(zero);
            }
            Some(_) => {}
        }
    }
}

fn normalize_quantities(request: &mut CalculationRequest, audit: &mut Audit) {
    let heads_ok = request.heads.is_some_and(|h| h > 0);
    let weight_ok = request.weight.is_some_and(|w| w > Decimal::ZERO);

    if !heads_ok && !weight_ok {
        audit.missing_fields.push("heads/weight".to_string());
        audit
            .defaulted_fields
            .push("heads (defaulted to 1)".to_string());
        audit
            .defaulted_fields
            .push("weight (defaulted to 1.0 kg)".to_string());
        request.heads = Some(1);
        request.weight = Some(Decimal::ONE);
        return;
    }

    if let Some(heads) = request.heads.filter(|h| *h <= 0) {
        audit
            .defaulted_fields
            .push(format!("heads (corrected from non-positive {heads} to 1)"));
        request.heads = Some(1);
    }
    if let Some(weight) = request.weight.filter(|w| *w <= Decimal::ZERO) {
        audit
            .defaulted_fields
            .push(format!("weight (corrected from non-positive {weight} to 1.0 kg)"));
        request.weight = Some(Decimal::ONE);
    }
}

fn normalize_shipping_mode(request: &mut CalculationRequest, audit: &mut Audit) {
    if is_blank(&request.shipping_mode) {
        audit.missing(
            "shipping_mode",
            format!("shipping_mode (defaulted to {DEFAULT_SHIPPING_MODE}, was missing)"),
        );
        request.shipping_mode = Some(DEFAULT_SHIPPING_MODE.to_string());
    } else if let Some(mode) = request.shipping_mode.as_mut() {
        *mode = mode.trim().to_uppercase();
    }
}

fn normalize_classification(request: &mut CalculationRequest, audit: &mut Audit) {
    let raw = request.classification_code.clone().unwrap_or_default();
    let trimmed = raw.trim();
    let cleaned = clean_classification_code(trimmed);

    if cleaned.is_empty() {
        audit
            .errors
            .push(format!("Classification code must contain digits (got: {trimmed})"));
        return;
    }
    if !is_valid_classification_length(&cleaned) {
        audit.errors.push(format!(
            "Invalid classification code format: must be 6, 8, or 10 digits (got: {cleaned})"
        ));
        return;
    }
    if cleaned != trimmed {
        audit.defaulted_fields.push(format!(
            "classification_code (cleaned non-digit characters, was {trimmed})"
        ));
    }
    request.classification_code = Some(cleaned);
}
