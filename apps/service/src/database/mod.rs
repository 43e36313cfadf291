/// Persistence for batch results
///
/// Results land in a local libsql (SQLite) database through a pooled
/// connection; the schema is migrated at startup.

pub mod migrations;
pub mod models;
pub mod repository;

pub use repository::{Database, DatabaseImpl};

use anyhow::Result;

/// Initialize database with schema
pub async fn initialize_database(conn: &libsql::Connection) -> Result<()> {
    migrations::run_migrations(conn).await
}
