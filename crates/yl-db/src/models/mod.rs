pub mod pool;
pub mod pool_snapshot;
pub mod raw_ingest;

pub use pool::{NewPool, Pool};
pub use pool_snapshot::{NewPoolSnapshot, PoolSnapshot};
pub use raw_ingest::{NewRawIngest, RawIngest};
