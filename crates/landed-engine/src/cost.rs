use std::sync::Arc;

use chrono::Utc;
use landed_models::money::{ratio, round2};
use landed_models::{CalculationRequest, CostBreakdown, NormalizationResult};
use landed_store::CountryDirectory;
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::EngineError;
use crate::normalizer::{default_product_value, RequestNormalizer, DEFAULT_SHIPPING_MODE};
use crate::providers::ShippingCostSource;
use crate::resolver::RateResolver;

/// CIF value: round2(product value + freight + insurance).
pub fn customs_value(product_value: Decimal, freight: Decimal, insurance: Decimal) -> Decimal {
    round2(product_value + freight + insurance)
}

/// Rescale a duty computed on the product value onto the customs value.
///
/// The scaler `customs / product` is carried at ratio precision. A
/// non-positive product value leaves the duty as is.
pub fn scale_duty(duty: Decimal, customs_value: Decimal, product_value: Decimal) -> Decimal {
    if product_value <= Decimal::ZERO {
        return round2(duty);
    }
    match ratio(customs_value, product_value) {
        Some(scaler) => round2(duty * scaler),
        None => round2(duty),
    }
}

pub fn vat_amount(taxable_base: Decimal, vat_fraction: Decimal) -> Decimal {
    round2(taxable_base * vat_fraction)
}

/// Turns a calculation request into a full landed-cost breakdown.
pub struct CostAggregator {
    normalizer: RequestNormalizer,
    resolver: RateResolver,
    directory: Arc<dyn CountryDirectory>,
    shipping: Arc<dyn ShippingCostSource>,
}

impl CostAggregator {
    pub fn new(
        normalizer: RequestNormalizer,
        resolver: RateResolver,
        directory: Arc<dyn CountryDirectory>,
        shipping: Arc<dyn ShippingCostSource>,
    ) -> Self {
        Self {
            normalizer,
            resolver,
            directory,
            shipping,
        }
    }

    pub fn normalizer(&self) -> &RequestNormalizer {
        &self.normalizer
    }

    pub fn resolver(&self) -> &RateResolver {
        &self.resolver
    }

    pub async fn calculate(&self, request: &CalculationRequest) -> Result<CostBreakdown, EngineError> {
        self.calculate_input(Some(request)).await
    }

    /// Calculate from a request that may be absent (e.g. a JSON `null` body).
    pub async fn calculate_input(
        &self,
        request: Option<&CalculationRequest>,
    ) -> Result<CostBreakdown, EngineError> {
        let normalized = self.normalizer.normalize_input(request);
        if !normalized.is_valid() {
            warn!(errors = ?normalized.errors, "Calculation request rejected");
            return Err(EngineError::validation(&normalized));
        }

        let NormalizationResult {
            request,
            missing_fields,
            defaulted_fields,
            ..
        } = normalized;

        let importer = request.importing_country.clone().unwrap_or_default();
        let exporter = request.exporting_country.clone().unwrap_or_default();
        let classification_code = request.classification_code.clone().unwrap_or_default();
        let shipping_mode = request
            .shipping_mode
            .clone()
            .unwrap_or_else(|| DEFAULT_SHIPPING_MODE.to_string());
        let product_value = request.product_value.unwrap_or_else(default_product_value);
        let freight = request.freight.unwrap_or(Decimal::ZERO);
        let insurance = request.insurance.unwrap_or(Decimal::ZERO);

        let customs = customs_value(product_value, freight, insurance);
        let duty = self.resolver.assess_duty(&request).await;
        let base_duty = scale_duty(duty.ad_valorem_duty, customs, product_value);
        let specific_duty = duty.specific_duty;

        let vat_rate = self.vat_fraction(&request, &importer);
        let vat = match vat_rate {
            Some(fraction) => vat_amount(customs + base_duty + specific_duty, fraction),
            None => round2(Decimal::ZERO),
        };

        let shipping_cost =
            self.shipping
                .shipping_cost(&shipping_mode, &importer, &exporter, request.weight);

        let total_cost = round2(customs + base_duty + specific_duty + vat + shipping_cost);

        info!(
            importer = %importer,
            exporter = %exporter,
            code = %classification_code,
            customs_value = %customs,
            duty = %base_duty,
            vat = %vat,
            shipping = %shipping_cost,
            total = %total_cost,
            "Landed cost calculated"
        );

        Ok(CostBreakdown {
            id: Uuid::new_v4(),
            importing_country: importer,
            exporting_country: exporter,
            classification_code,
            product_value: round2(product_value),
            freight: round2(freight),
            insurance: round2(insurance),
            shipping_mode,
            heads: request.heads,
            weight: request.weight,
            customs_value: customs,
            unscaled_duty: duty.ad_valorem_duty,
            base_duty,
            specific_duty,
            tariff_amount: round2(base_duty + specific_duty),
            vat_amount: vat,
            shipping_cost,
            total_cost,
            ad_valorem_rate: duty.rate.as_ref().map(|r| r.ad_valorem_rate),
            vat_rate,
            year: duty.rate.as_ref().and_then(|r| r.year),
            missing_fields,
            defaulted_fields,
            calculated_at: Utc::now(),
        })
    }

    /// VAT fraction to apply: the override, else the importer's stored percentage.
    fn vat_fraction(&self, request: &CalculationRequest, importer: &str) -> Option<Decimal> {
        if let Some(fraction) = request.vat_override {
            return Some(fraction);
        }
        match self.directory.vat_rate(importer) {
            Ok(Some(percent)) => ratio(percent, Decimal::ONE_HUNDRED),
            Ok(None) => None,
            Err(e) => {
                warn!(importer, error = %e, "VAT lookup failed, applying none");
                None
            }
        }
    }
}
