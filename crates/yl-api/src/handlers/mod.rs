pub mod admin;
pub mod live;
pub mod pools;
pub mod simulation;

pub use admin::{ingest_status, trigger_ingest};
pub use live::live_feed;
pub use pools::{get_pool, list_pools};
pub use simulation::simulate;
