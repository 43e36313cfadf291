use anyhow::{Context, Result};
use async_trait::async_trait;
use ledgerping::{BatchResult, Cluster, PingType};
use libsql::params;

use super::models::StoredResult;
use crate::pool::{LibsqlManager, LibsqlPool};

/// Database trait for abstracting database operations
#[async_trait]
pub trait Database: Send + Sync {
    /// Save a batch result, returning its row id
    async fn save_result(&self, result: &BatchResult) -> Result<i64>;

    /// Most recent results for a cluster, newest first
    async fn get_recent_results(&self, cluster: Cluster, limit: usize) -> Result<Vec<StoredResult>>;
}

/// LibSQL database implementation
pub struct DatabaseImpl {
    pool: LibsqlPool,
}

impl DatabaseImpl {
    /// Create a new database instance from a pool
    pub fn new_from_pool(pool: LibsqlPool) -> Self {
        Self { pool }
    }

    /// Get a connection from the pool
    async fn get_conn(&self) -> Result<deadpool::managed::Object<LibsqlManager>> {
        Ok(self.pool.get().await?)
    }
}

#[async_trait]
impl Database for DatabaseImpl {
    async fn save_result(&self, result: &BatchResult) -> Result<i64> {
        let conn = self.get_conn().await?;
        let errors = serde_json::to_string(&result.errors)?;
        let created_at = chrono::Utc::now().timestamp();

        conn.execute(
            "INSERT INTO ping_results (timestamp, cluster, hostname, ping_type, submitted, confirmed, loss, max, mean, min, stddev, take_time, errors, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                result.timestamp,
                result.cluster.as_str(),
                result.hostname.clone(),
                result.ping_type.to_string(),
                result.submitted as i64,
                result.confirmed as i64,
                result.loss,
                result.max,
                result.mean,
                result.min,
                result.stddev,
                result.take_time,
                errors,
                created_at
            ],
        )
        .await?;

        Ok(conn.last_insert_rowid())
    }

    async fn get_recent_results(&self, cluster: Cluster, limit: usize) -> Result<Vec<StoredResult>> {
        let conn = self.get_conn().await?;
        let mut stmt = conn
            .prepare("SELECT id, timestamp, cluster, hostname, ping_type, submitted, confirmed, loss, max, mean, min, stddev, take_time, errors, created_at FROM ping_results WHERE cluster = ? ORDER BY timestamp DESC, id DESC LIMIT ?")
            .await?;

        let mut rows = stmt.query(params![cluster.as_str(), limit as i64]).await?;
        let mut results = Vec::new();

        while let Some(row) = rows.next().await? {
            let cluster_str: String = row.get(2)?;
            let ping_type_str: String = row.get(4)?;
            let errors_json: String = row.get(13)?;

            results.push(StoredResult {
                id: row.get(0)?,
                created_at: row.get(14)?,
                result: BatchResult {
                    timestamp: row.get(1)?,
                    cluster: cluster_str.parse::<Cluster>()?,
                    hostname: row.get(3)?,
                    ping_type: ping_type_str.parse::<PingType>()?,
                    submitted: row.get::<i64>(5)? as usize,
                    confirmed: row.get::<i64>(6)? as usize,
                    loss: row.get(7)?,
                    max: row.get(8)?,
                    mean: row.get(9)?,
                    min: row.get(10)?,
                    stddev: row.get(11)?,
                    take_time: row.get(12)?,
                    errors: serde_json::from_str(&errors_json)
                        .with_context(|| format!("malformed errors column: {errors_json}"))?,
                },
            });
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::initialize_database;
    use crate::pool::open_pool;
    use tempfile::tempdir;

    async fn create_test_database() -> Result<(DatabaseImpl, tempfile::TempDir)> {
        let temp_dir = tempdir()?;
        let db_path = temp_dir.path().join("test.db");
        let pool = open_pool(&db_path.to_string_lossy(), 4).await?;

        let conn = pool.get().await?;
        initialize_database(&conn).await?;
        drop(conn);

        Ok((DatabaseImpl::new_from_pool(pool), temp_dir))
    }

    fn sample(cluster: Cluster, timestamp: i64, errors: Vec<String>) -> BatchResult {
        let mut result = BatchResult::new(cluster, "probe-host", PingType::DataPoint1Min);
        result.timestamp = timestamp;
        result.submitted = 5;
        result.confirmed = 5 - errors.len();
        result.loss = errors.len() as f64 * 20.0;
        result.max = 900;
        result.mean = 600;
        result.min = 400;
        result.stddev = 120;
        result.take_time = 3_000;
        result.errors = errors;
        result
    }

    #[tokio::test]
    async fn test_save_and_read_back() -> Result<()> {
        let (database, _dir) = create_test_database().await?;
        let saved = sample(Cluster::Devnet, 1_700_000_000, vec!["rpc transport error: 503".into()]);

        let id = database.save_result(&saved).await?;
        let recent = database.get_recent_results(Cluster::Devnet, 10).await?;

        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, id);
        assert_eq!(recent[0].result, saved);
        Ok(())
    }

    #[tokio::test]
    async fn test_recent_results_filtered_and_ordered() -> Result<()> {
        let (database, _dir) = create_test_database().await?;
        for ts in [100, 300, 200] {
            database.save_result(&sample(Cluster::Testnet, ts, Vec::new())).await?;
        }
        database.save_result(&sample(Cluster::Mainnet, 400, Vec::new())).await?;

        let recent = database.get_recent_results(Cluster::Testnet, 2).await?;
        let timestamps: Vec<i64> = recent.iter().map(|r| r.result.timestamp).collect();

        assert_eq!(timestamps, vec![300, 200]);
        assert!(recent.iter().all(|r| r.result.cluster == Cluster::Testnet));
        Ok(())
    }
}
