pub mod envelope;
pub mod error;
pub mod pool;
pub mod provider;
pub mod target;
pub mod window;

pub use envelope::RawEnvelope;
pub use error::ConfigError;
pub use pool::{PoolDescriptor, PoolKey, SnapshotRecord};
pub use provider::ProviderKind;
pub use target::{IngestTarget, TargetSelector, parse_target_list};
pub use window::TimeWindow;
