use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use deadpool::managed::{self, Pool, PoolConfig, RecycleResult};
use libsql::{Builder, Connection, Database, Error as LibsqlError};
use tracing::debug;

/// Hands out connections to one local libsql database
pub struct LibsqlManager {
    database: Database,
    recycle_count: AtomicUsize,
}

impl LibsqlManager {
    pub fn new(database: Database) -> Self {
        Self { database, recycle_count: AtomicUsize::new(0) }
    }
}

impl managed::Manager for LibsqlManager {
    type Type = Connection;
    type Error = LibsqlError;

    async fn create(&self) -> Result<Self::Type, Self::Error> {
        self.database.connect()
    }

    async fn recycle(
        &self,
        conn: &mut Self::Type,
        _: &managed::Metrics,
    ) -> RecycleResult<Self::Error> {
        let recycled = self.recycle_count.fetch_add(1, Ordering::Relaxed);
        conn.query("SELECT 1", ()).await?.next().await?.ok_or(LibsqlError::QueryReturnedNoRows)?;
        debug!(recycled, "Recycled database connection");
        Ok(())
    }
}

pub type LibsqlPool = Pool<LibsqlManager>;

/// Open (or create) the database file and wrap it in a pool
pub async fn open_pool(path: &str, max_size: usize) -> Result<LibsqlPool> {
    let database = Builder::new_local(path)
        .build()
        .await
        .with_context(|| format!("failed to open database {path}"))?;

    Pool::builder(LibsqlManager::new(database))
        .config(PoolConfig::new(max_size))
        .build()
        .context("failed to build database pool")
}
