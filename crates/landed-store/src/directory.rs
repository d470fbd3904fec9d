use std::sync::Arc;

use landed_models::Country;
use rust_decimal::Decimal;

use crate::error::StoreError;

/// Country and currency reference lookups.
///
/// Implementations perform a fresh lookup on every call unless wrapped in a
/// [`crate::CachedDirectory`].
pub trait CountryDirectory: Send + Sync {
    fn find_by_alpha2(&self, code: &str) -> Result<Option<Country>, StoreError>;

    fn find_by_alpha3(&self, code: &str) -> Result<Option<Country>, StoreError>;

    /// Case-insensitive exact name match.
    fn find_by_name(&self, name: &str) -> Result<Option<Country>, StoreError>;

    /// Resolve a name, alpha-2 or alpha-3 identifier.
    ///
    /// Tries the alpha-2 code first, then the alpha-3 code when the input is
    /// three characters long, then the country name.
    fn resolve(&self, identifier: &str) -> Result<Option<Country>, StoreError> {
        let trimmed = identifier.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        if let Some(country) = self.find_by_alpha2(trimmed)? {
            return Ok(Some(country));
        }
        if trimmed.chars().count() == 3 {
            if let Some(country) = self.find_by_alpha3(trimmed)? {
                return Ok(Some(country));
            }
        }
        self.find_by_name(trimmed)
    }

    /// ISO 4217 currency of an alpha-2 country.
    fn currency_code(&self, alpha2: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .find_by_alpha2(alpha2)?
            .and_then(|c| c.currency_code)
            .filter(|c| !c.trim().is_empty()))
    }

    /// Stored VAT/GST percentage of an alpha-2 country.
    fn vat_rate(&self, alpha2: &str) -> Result<Option<Decimal>, StoreError> {
        Ok(self.find_by_alpha2(alpha2)?.and_then(|c| c.vat_rate))
    }
}

impl<T: CountryDirectory + ?Sized> CountryDirectory for Arc<T> {
    fn find_by_alpha2(&self, code: &str) -> Result<Option<Country>, StoreError> {
        (**self).find_by_alpha2(code)
    }

    fn find_by_alpha3(&self, code: &str) -> Result<Option<Country>, StoreError> {
        (**self).find_by_alpha3(code)
    }

    fn find_by_name(&self, name: &str) -> Result<Option<Country>, StoreError> {
        (**self).find_by_name(name)
    }
}
