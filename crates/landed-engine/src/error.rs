use landed_models::NormalizationResult;
use landed_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{message}")]
    Validation {
        errors: Vec<String>,
        missing_fields: Vec<String>,
        message: String,
    },

    #[error("Invalid country codes. Importing: {importing}, Exporting: {exporting}")]
    InvalidCountry { importing: String, exporting: String },

    #[error("Currency mapping not found for country: {0}")]
    CurrencyNotFound(String),

    #[error("{0}")]
    NoData(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

impl EngineError {
    pub fn validation(result: &NormalizationResult) -> Self {
        EngineError::Validation {
            errors: result.errors.clone(),
            missing_fields: result.missing_fields.clone(),
            message: result.error_message(),
        }
    }
}

/// Failures talking to an external collaborator (scraper, FX or news API).
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{0} API key not configured")]
    NotConfigured(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Api(String),

    #[error("Response parse error: {0}")]
    Parse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
