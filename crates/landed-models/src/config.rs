use serde::{Deserialize, Serialize};

/// Top-level configuration for the engine and the `landed` CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub reference_cache: ReferenceCacheConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub fx: FxConfig,
    #[serde(default)]
    pub news: NewsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// Path to the SQLite database shared with `landed-loader`.
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sqlite_path: default_sqlite_path(),
        }
    }
}

/// In-memory cache in front of country/currency lookups.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferenceCacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_reference_capacity")]
    pub max_capacity: u64,
}

impl Default for ReferenceCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_capacity: default_reference_capacity(),
        }
    }
}

/// The tariff scraping microservice, called on a full rate-resolution miss.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScraperConfig {
    #[serde(default = "default_scraper_url")]
    pub base_url: String,
    /// Scrapes are slow; the default allows five minutes.
    #[serde(default = "default_scraper_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: default_scraper_url(),
            timeout_seconds: default_scraper_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FxConfig {
    #[serde(default = "default_fx_url")]
    pub api_url: String,
    /// Inline API key. Takes precedence over `api_key_env`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable consulted when `api_key` is unset.
    #[serde(default = "default_fx_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_http_timeout")]
    pub timeout_seconds: u64,
}

impl Default for FxConfig {
    fn default() -> Self {
        Self {
            api_url: default_fx_url(),
            api_key: None,
            api_key_env: default_fx_key_env(),
            timeout_seconds: default_http_timeout(),
        }
    }
}

impl FxConfig {
    pub fn resolved_api_key(&self) -> Option<String> {
        resolve_key(self.api_key.as_deref(), &self.api_key_env)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewsConfig {
    #[serde(default = "default_news_url")]
    pub api_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_news_key_env")]
    pub api_key_env: String,
    /// How far back a news refresh looks.
    #[serde(default = "default_days_back")]
    pub days_back: u32,
    /// Restrict refreshes to articles mentioning the corridor's countries.
    #[serde(default)]
    pub country_filter: bool,
    #[serde(default = "default_http_timeout")]
    pub timeout_seconds: u64,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            api_url: default_news_url(),
            api_key: None,
            api_key_env: default_news_key_env(),
            days_back: default_days_back(),
            country_filter: false,
            timeout_seconds: default_http_timeout(),
        }
    }
}

impl NewsConfig {
    pub fn resolved_api_key(&self) -> Option<String> {
        resolve_key(self.api_key.as_deref(), &self.api_key_env)
    }
}

fn resolve_key(inline: Option<&str>, env_var: &str) -> Option<String> {
    inline
        .map(str::to_string)
        .or_else(|| std::env::var(env_var).ok())
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}

fn default_sqlite_path() -> String {
    "data/landed.db".to_string()
}
fn default_true() -> bool {
    true
}
fn default_reference_capacity() -> u64 {
    1_000
}
fn default_scraper_url() -> String {
    "http://localhost:5001".to_string()
}
fn default_scraper_timeout() -> u64 {
    300
}
fn default_fx_url() -> String {
    "https://openexchangerates.org/api".to_string()
}
fn default_fx_key_env() -> String {
    "OPENEXCHANGERATES_APP_ID".to_string()
}
fn default_news_url() -> String {
    "https://newsapi.org/v2".to_string()
}
fn default_news_key_env() -> String {
    "NEWSAPI_API_KEY".to_string()
}
fn default_days_back() -> u32 {
    7
}
fn default_http_timeout() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_defaults() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.store.sqlite_path, "data/landed.db");
        assert_eq!(config.scraper.timeout_seconds, 300);
        assert_eq!(config.news.days_back, 7);
        assert!(config.reference_cache.enabled);
    }

    #[test]
    fn config_from_toml() {
        let toml_str = r#"
[store]
sqlite_path = "/tmp/landed_test.db"

[reference_cache]
enabled = false

[scraper]
base_url = "http://scraper.internal:5001"
timeout_seconds = 60

[fx]
api_key = "abc123"

[news]
api_url = "http://localhost:9999/v2"
days_back = 3
country_filter = true
"#;

        let config: EngineConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.store.sqlite_path, "/tmp/landed_test.db");
        assert!(!config.reference_cache.enabled);
        assert_eq!(config.reference_cache.max_capacity, 1_000);
        assert_eq!(config.scraper.base_url, "http://scraper.internal:5001");
        assert_eq!(config.fx.resolved_api_key().as_deref(), Some("abc123"));
        assert_eq!(config.fx.api_url, "https://openexchangerates.org/api");
        assert_eq!(config.news.days_back, 3);
        assert!(config.news.country_filter);
        assert_eq!(config.news.timeout_seconds, 30);
    }

    #[test]
    fn blank_inline_key_is_not_a_key() {
        let fx = FxConfig {
            api_key: Some("   ".to_string()),
            api_key_env: "LANDED_TEST_UNSET_FX_KEY".to_string(),
            ..FxConfig::default()
        };
        assert_eq!(fx.resolved_api_key(), None);
    }

    #[test]
    fn roundtrip_engine_config() {
        let config = EngineConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: EngineConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }
}
