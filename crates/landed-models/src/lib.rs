pub mod analysis;
pub mod breakdown;
pub mod config;
pub mod market;
pub mod money;
pub mod request;
pub mod schema;
pub mod tariff;

pub use analysis::{
    DataSource, ExchangeRateAnalysis, Headline, PredictionResult, RatePoint, RateTrend,
    Recommendation, SentimentPoint,
};
pub use breakdown::CostBreakdown;
pub use config::{
    EngineConfig, FxConfig, NewsConfig, ReferenceCacheConfig, ScraperConfig, StoreConfig,
};
pub use market::{ExchangeRate, NewsArticle, SentimentAnalysis, SentimentTrend};
pub use request::{CalculationRequest, NormalizationResult};
pub use tariff::{Country, ReferenceData, ShippingMode, ShippingRate, TariffRate, UnitBasis};
