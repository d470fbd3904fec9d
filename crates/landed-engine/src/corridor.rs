use landed_store::CountryDirectory;
use tracing::warn;

use crate::error::EngineError;

/// A resolved trade lane: both countries as alpha-2 codes with their currencies.
#[derive(Debug, Clone, PartialEq)]
pub struct Corridor {
    pub importing_country: String,
    pub exporting_country: String,
    pub importing_currency: String,
    pub exporting_currency: String,
}

/// Resolve a name, alpha-2 or alpha-3 identifier to an alpha-2 code.
///
/// Blank input, unknown identifiers and lookup failures all yield `None`.
pub fn resolve_to_alpha2(directory: &dyn CountryDirectory, identifier: &str) -> Option<String> {
    if identifier.trim().is_empty() {
        return None;
    }
    match directory.resolve(identifier) {
        Ok(country) => country.map(|c| c.alpha2),
        Err(e) => {
            warn!(identifier, error = %e, "Country lookup failed");
            None
        }
    }
}

/// Resolve both sides of a lane and their currencies.
pub fn resolve_corridor(
    directory: &dyn CountryDirectory,
    importing: &str,
    exporting: &str,
) -> Result<Corridor, EngineError> {
    let (Some(importing_country), Some(exporting_country)) = (
        resolve_to_alpha2(directory, importing),
        resolve_to_alpha2(directory, exporting),
    ) else {
        return Err(EngineError::InvalidCountry {
            importing: importing.to_string(),
            exporting: exporting.to_string(),
        });
    };

    let importing_currency = directory
        .currency_code(&importing_country)?
        .ok_or_else(|| EngineError::CurrencyNotFound(importing_country.clone()))?;
    let exporting_currency = directory
        .currency_code(&exporting_country)?
        .ok_or_else(|| EngineError::CurrencyNotFound(exporting_country.clone()))?;

    Ok(Corridor {
        importing_country,
        exporting_country,
        importing_currency: importing_currency.to_uppercase(),
        exporting_currency: exporting_currency.to_uppercase(),
    })
}
