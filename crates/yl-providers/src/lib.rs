pub mod clients;
pub mod config;
pub mod error;
pub mod traits;

pub use clients::{DuneProvider, MockProvider, SeedPool, TheGraphProvider};
pub use config::{ProviderSettings, select_provider};
pub use error::{NormalizationError, ProviderError};
pub use traits::PoolDataProvider;
