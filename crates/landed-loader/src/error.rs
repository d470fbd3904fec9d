use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Store error: {0}")]
    Store(#[from] landed_store::StoreError),

    #[error("Engine error: {0}")]
    Engine(#[from] landed_engine::EngineError),

    #[error("Provider error: {0}")]
    Provider(#[from] landed_engine::ProviderError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
