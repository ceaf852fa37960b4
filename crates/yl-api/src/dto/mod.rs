pub mod admin;
pub mod common;
pub mod pool;
pub mod query;
pub mod response;
pub mod simulation;

pub use admin::*;
pub use common::*;
pub use pool::*;
pub use query::*;
pub use response::*;
pub use simulation::*;
