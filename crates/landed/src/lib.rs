//! Landed - tariff, landed-cost and trade-timing engine
//!
//! Computes the landed cost of an international shipment and produces two
//! advisory outputs: an exchange-rate purchase-timing analysis and a
//! news-sentiment BUY/WAIT/HOLD recommendation.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use landed::models::{CalculationRequest, EngineConfig};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let engine = landed::build_engine(&EngineConfig::default())?;
//! let breakdown = engine.calculate(&CalculationRequest::default()).await?;
//! # Ok(())
//! # }
//! ```

pub use landed_engine as engine;
pub use landed_models as models;
pub use landed_store as store;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use landed_engine::providers::{HttpScraper, NewsApi, OpenExchangeRates};
use landed_engine::{
    CostAggregator, EngineError, FxRateProvider, FxTrendAnalyzer, NewsProvider,
    PredictiveScorer, RateResolver, RequestNormalizer, SentimentService, StoreShippingCost,
    TariffScraper,
};
use landed_models::{
    CalculationRequest, CostBreakdown, EngineConfig, ExchangeRateAnalysis, PredictionResult,
    ReferenceData,
};
use landed_store::{CachedDirectory, CountryDirectory, SeedSummary, Store};

/// All engine operations wired against one store.
pub struct Engine {
    store: Arc<Store>,
    reference_cache: Option<Arc<CachedDirectory>>,
    scraper: Option<Arc<HttpScraper>>,
    cost: CostAggregator,
    fx: FxTrendAnalyzer,
    predictor: PredictiveScorer,
}

/// Collaborators the engine talks to over the network.
pub struct Collaborators {
    pub scraper: Arc<dyn TariffScraper>,
    pub fx: Arc<dyn FxRateProvider>,
    pub news: Arc<dyn NewsProvider>,
}

/// Load an [`EngineConfig`] from a TOML file.
pub fn load_config(path: impl AsRef<Path>) -> anyhow::Result<EngineConfig> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("Failed to parse config: {}", path.display()))
}

/// Build an [`Engine`] from configuration, with the HTTP collaborators.
pub fn build_engine(config: &EngineConfig) -> anyhow::Result<Engine> {
    if let Some(parent) = Path::new(&config.store.sqlite_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    let store = Arc::new(
        Store::open(&config.store.sqlite_path)
            .with_context(|| format!("Failed to open store: {}", config.store.sqlite_path))?,
    );

    let scraper = Arc::new(
        HttpScraper::new(&config.scraper, store.clone()).context("Failed to build scraper client")?,
    );
    let fx = OpenExchangeRates::new(&config.fx).context("Failed to build FX client")?;
    if !fx.is_configured() {
        tracing::warn!(env = %config.fx.api_key_env, "FX API key not configured, live rates disabled");
    }
    let news = NewsApi::new(&config.news).context("Failed to build news client")?;
    if !news.is_configured() {
        tracing::warn!(env = %config.news.api_key_env, "News API key not configured, live news disabled");
    }

    let collaborators = Collaborators {
        scraper: scraper.clone(),
        fx: Arc::new(fx),
        news: Arc::new(news),
    };
    let mut engine = Engine::from_parts(store, config, collaborators);
    engine.scraper = Some(scraper);
    Ok(engine)
}

impl Engine {
    /// Wire the engine over an open store with the given collaborators.
    pub fn from_parts(store: Arc<Store>, config: &EngineConfig, collaborators: Collaborators) -> Self {
        let reference_cache = config.reference_cache.enabled.then(|| {
            Arc::new(CachedDirectory::new(
                store.clone(),
                config.reference_cache.max_capacity,
            ))
        });
        let directory: Arc<dyn CountryDirectory> = match &reference_cache {
            Some(cache) => cache.clone() as Arc<dyn CountryDirectory>,
            None => store.clone(),
        };

        let cost = CostAggregator::new(
            RequestNormalizer::new(directory.clone()),
            RateResolver::new(store.clone(), collaborators.scraper),
            directory.clone(),
            Arc::new(StoreShippingCost::new(store.clone())),
        );
        let fx = FxTrendAnalyzer::new(directory.clone(), store.clone(), collaborators.fx);
        let predictor = PredictiveScorer::new(
            directory,
            store.clone(),
            SentimentService::new(store.clone(), collaborators.news),
            config.news.clone(),
        );

        Self {
            store,
            reference_cache,
            scraper: None,
            cost,
            fx,
            predictor,
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub async fn calculate(&self, request: &CalculationRequest) -> Result<CostBreakdown, EngineError> {
        self.cost.calculate(request).await
    }

    /// Calculate from a possibly-null request body.
    pub async fn calculate_input(
        &self,
        request: Option<&CalculationRequest>,
    ) -> Result<CostBreakdown, EngineError> {
        self.cost.calculate_input(request).await
    }

    pub async fn analyze_exchange_rates(
        &self,
        importing: &str,
        exporting: &str,
    ) -> Result<ExchangeRateAnalysis, EngineError> {
        self.fx.analyze(importing, exporting).await
    }

    pub async fn predict(
        &self,
        importing: &str,
        exporting: &str,
        refresh_news: bool,
    ) -> Result<PredictionResult, EngineError> {
        self.predictor
            .predict(importing, exporting, refresh_news)
            .await
    }

    /// Load reference data, then drop any cached country lookups.
    pub fn seed(&self, data: &ReferenceData) -> Result<SeedSummary, EngineError> {
        let summary = self.store.seed(data)?;
        self.refresh_reference_cache();
        Ok(summary)
    }

    pub fn refresh_reference_cache(&self) {
        if let Some(cache) = &self.reference_cache {
            cache.refresh();
        }
    }

    /// `None` when the engine was built without the HTTP scraper.
    pub async fn scraper_health(&self) -> Option<bool> {
        let scraper = self.scraper.as_ref()?;
        match scraper.health().await {
            Ok(healthy) => Some(healthy),
            Err(e) => {
                tracing::warn!(error = %e, "Scraper health check failed");
                Some(false)
            }
        }
    }
}
