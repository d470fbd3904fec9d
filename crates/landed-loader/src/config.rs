use landed_models::{FxConfig, NewsConfig, StoreConfig};
use serde::{Deserialize, Serialize};

use crate::error::LoaderError;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LoaderConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub fx: FxConfig,
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub fx_backfill: FxBackfillConfig,
    #[serde(default)]
    pub news_refresh: NewsRefreshConfig,
    /// Trade corridors kept warm by the loader.
    #[serde(default)]
    pub corridors: Vec<CorridorConfig>,
}

impl LoaderConfig {
    /// Reject settings the loops cannot run with.
    pub fn validate(&self) -> Result<(), LoaderError> {
        if self.fx_backfill.enabled {
            if self.fx_backfill.step_days == 0 {
                return Err(LoaderError::Config(
                    "fx_backfill.step_days must be at least 1".to_string(),
                ));
            }
            if self.fx_backfill.interval_seconds == 0 {
                return Err(LoaderError::Config(
                    "fx_backfill.interval_seconds must be at least 1".to_string(),
                ));
            }
        }
        if self.news_refresh.enabled && self.news_refresh.interval_seconds == 0 {
            return Err(LoaderError::Config(
                "news_refresh.interval_seconds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Historical exchange-rate backfill for every corridor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FxBackfillConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_fx_interval")]
    pub interval_seconds: u64,
    /// How many months of history to keep filled.
    #[serde(default = "default_months")]
    pub months: u32,
    /// Spacing between backfilled dates.
    #[serde(default = "default_step_days")]
    pub step_days: u32,
}

impl Default for FxBackfillConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: default_fx_interval(),
            months: default_months(),
            step_days: default_step_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewsRefreshConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_news_interval")]
    pub interval_seconds: u64,
}

impl Default for NewsRefreshConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: default_news_interval(),
        }
    }
}

/// Country identifiers as the engine accepts them: name, alpha-2 or alpha-3.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CorridorConfig {
    pub importing: String,
    pub exporting: String,
}

fn default_true() -> bool {
    true
}
fn default_fx_interval() -> u64 {
    86_400
}
fn default_months() -> u32 {
    6
}
fn default_step_days() -> u32 {
    7
}
fn default_news_interval() -> u64 {
    3_600
}
