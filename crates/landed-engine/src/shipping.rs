use std::sync::Arc;

use landed_models::money::round2;
use landed_models::ShippingMode;
use landed_store::Store;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::providers::ShippingCostSource;

/// Per-kg shipping prices from the `shipping_rates` table.
pub struct StoreShippingCost {
    store: Arc<Store>,
}

impl StoreShippingCost {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }
}

impl ShippingCostSource for StoreShippingCost {
    fn shipping_cost(
        &self,
        mode: &str,
        importer: &str,
        exporter: &str,
        weight: Option<Decimal>,
    ) -> Decimal {
        let zero = round2(Decimal::ZERO);
        let Some(mode) = ShippingMode::parse(mode) else {
            warn!(mode, "Unknown shipping mode, shipping cost is zero");
            return zero;
        };
        let Some(weight) = weight else {
            return zero;
        };

        match self.store.find_shipping_rate(importer, exporter) {
            Ok(Some(rate)) => rate
                .rate_for(mode)
                .map(|per_kg| round2(per_kg * weight))
                .unwrap_or(zero),
            Ok(None) => {
                debug!(importer, exporter, "No shipping rate for lane");
                zero
            }
            Err(e) => {
                warn!(importer, exporter, error = %e, "Shipping rate lookup failed");
                zero
            }
        }
    }
}
