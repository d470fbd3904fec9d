pub mod corridor;
pub mod cost;
pub mod error;
pub mod fx_trend;
pub mod normalizer;
pub mod parser;
pub mod predictor;
pub mod providers;
pub mod resolver;
pub mod sentiment;
pub mod shipping;

pub mod test_support;

pub use corridor::{resolve_corridor, resolve_to_alpha2, Corridor};
pub use cost::CostAggregator;
pub use error::{EngineError, ProviderError};
pub use fx_trend::FxTrendAnalyzer;
pub use normalizer::RequestNormalizer;
pub use predictor::PredictiveScorer;
pub use providers::{
    FxQuote, FxRateProvider, NewsProvider, ScrapeResponse, ScrapedRecord, ShippingCostSource,
    TariffScraper,
};
pub use resolver::{DutyAssessment, RateResolver};
pub use sentiment::SentimentService;
pub use shipping::StoreShippingCost;
