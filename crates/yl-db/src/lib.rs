pub mod errors;
pub mod memory;
pub mod models;
pub mod pool;
pub mod postgres;
pub mod schema;
pub mod store;

use deadpool_diesel::postgres::{Manager, Pool};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

pub use errors::{DatabaseError, ErrorKind};
pub use memory::MemoryStore;
pub use pool::LensPool;
pub use postgres::PgStore;
pub use store::{CanonicalStore, CycleBatch, CycleCommit, CycleEntry, StoreCounts};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

const MAX_POOL_SIZE: usize = 16;

/// Build the Postgres connection pool
pub fn init_pool(app_name: &str, database_url: &str) -> Result<Pool, ErrorKind> {
    let manager = Manager::new(database_url, deadpool_diesel::Runtime::Tokio1);
    let pool = Pool::builder(manager)
        .max_size(MAX_POOL_SIZE)
        .build()
        .map_err(|e| ErrorKind::Pool(e.to_string()))?;

    tracing::info!(app = app_name, max_size = MAX_POOL_SIZE, "Database pool initialized");
    Ok(pool)
}

/// Apply every pending embedded migration
pub async fn run_migrations(pool: &Pool) -> Result<(), ErrorKind> {
    let conn = pool.get().await.map_err(|e| ErrorKind::Pool(e.to_string()))?;

    let applied = conn
        .interact(|conn| {
            conn.run_pending_migrations(MIGRATIONS)
                .map(|versions| versions.len())
                .map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| ErrorKind::GenericInit(e.to_string()))?
        .map_err(ErrorKind::Migration)?;

    tracing::info!(applied, "Database migrations up to date");
    Ok(())
}
