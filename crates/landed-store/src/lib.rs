pub mod countries;
pub mod directory;
pub mod error;
pub mod news;
pub mod rates;
pub mod reference;
pub mod store;
pub mod tariffs;

pub use directory::CountryDirectory;
pub use error::StoreError;
pub use reference::CachedDirectory;
pub use store::{SeedSummary, Store};
