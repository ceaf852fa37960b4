pub mod admin;
pub mod config;
pub mod error;
pub mod runner;
pub mod scheduler;
pub mod task;

pub use admin::AdminGate;
pub use config::SchedulerConfig;
pub use error::IngestError;
pub use runner::{IngestResult, IngestionRunner};
pub use scheduler::{Scheduler, TargetRun, TargetState, TargetStatus, TickReport};
pub use task::SchedulerTask;
