pub mod get;
pub mod list;

pub use get::get_pool;
pub use list::list_pools;
