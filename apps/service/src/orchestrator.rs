/// Orchestrator - wires configuration, probe workers and persistence
///
/// Workers publish every batch into a channel; the orchestrator drains it,
/// logs each result and stores it when the database is enabled.
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::join_all;
use ledgerping::{
    BatchResult, ChannelSink, Connector, CredentialResolver, HttpConnector, LedgerProber, LogSink,
    ResultSink, RunMode, WorkerPool,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::database::{Database, DatabaseImpl, initialize_database};
use crate::pool::LibsqlPool;

/// Capacity of the worker -> orchestrator result channel
const RESULT_CHANNEL_CAPACITY: usize = 100;

pub struct Orchestrator {
    workers: WorkerPool,
    database: Option<Arc<dyn Database>>,
    result_rx: mpsc::Receiver<BatchResult>,
}

impl Orchestrator {
    /// Create and run an orchestrator until `cancel` fires
    pub async fn start(
        config: Config,
        pool: Option<LibsqlPool>,
        mode: RunMode,
        cancel: CancellationToken,
    ) -> Result<()> {
        let database = match pool {
            Some(pool) => {
                let conn = pool.get().await?;
                info!("Initializing database schema...");
                initialize_database(&conn).await?;
                drop(conn);
                let database: Arc<dyn Database> = Arc::new(DatabaseImpl::new_from_pool(pool));
                log_last_results(database.as_ref(), &mode).await;
                Some(database)
            }
            None => {
                info!("Database disabled - results are only logged");
                None
            }
        };

        let credentials = Arc::new(config.credentials()?);
        let connector = Arc::new(HttpConnector::default());
        let mut orchestrator = Self::new(&config, connector, credentials, database)?;
        orchestrator.run(&mode, &cancel).await
    }

    /// Build an orchestrator from explicit collaborators
    pub fn new(
        config: &Config,
        connector: Arc<dyn Connector>,
        credentials: Arc<dyn CredentialResolver>,
        database: Option<Arc<dyn Database>>,
    ) -> Result<Self> {
        let (sink, result_rx) = ChannelSink::channel(RESULT_CHANNEL_CAPACITY);
        let mut workers = WorkerPool::new(
            config.resolved_hostname(),
            connector,
            Arc::new(LedgerProber::new()),
            credentials,
            Arc::new(sink),
        );
        for settings in config.cluster_settings()? {
            workers = workers.with_cluster(settings);
        }

        Ok(Self { workers, database, result_rx })
    }

    /// Replace the pool, used to shorten the launch stagger
    #[cfg(test)]
    fn map_workers(mut self, f: impl FnOnce(WorkerPool) -> WorkerPool) -> Self {
        self.workers = f(self.workers);
        self
    }

    /// Launch workers and process results until cancelled
    pub async fn run(&mut self, mode: &RunMode, cancel: &CancellationToken) -> Result<()> {
        let handles = self.workers.launch(mode, cancel).context("failed to launch ping workers")?;
        info!(workers = handles.len(), mode = %mode, "Ping service started");

        loop {
            tokio::select! {
                Some(result) = self.result_rx.recv() => self.handle_result(result).await,
                _ = cancel.cancelled() => break,
            }
        }

        info!("Shutting down, waiting for workers to finish...");
        // keep draining so no worker stays blocked on a full channel
        let mut joined = std::pin::pin!(join_all(handles));
        let outcomes = loop {
            tokio::select! {
                outcomes = &mut joined => break outcomes,
                Some(result) = self.result_rx.recv() => self.handle_result(result).await,
            }
        };
        for outcome in outcomes {
            if let Err(error) = outcome {
                error!(%error, "Ping worker panicked");
            }
        }
        while let Ok(result) = self.result_rx.try_recv() {
            self.handle_result(result).await;
        }

        info!("Ping service stopped");
        Ok(())
    }

    async fn handle_result(&self, result: BatchResult) {
        let Some(database) = &self.database else {
            if let Err(error) = LogSink.publish(result).await {
                warn!(%error, "Failed to log batch result");
            }
            return;
        };

        match database.save_result(&result).await {
            Ok(id) => info!(
                id,
                cluster = %result.cluster,
                loss = result.loss,
                mean = result.mean,
                "Saved batch result"
            ),
            Err(error) => {
                warn!(%error, cluster = %result.cluster, "Failed to save batch result");
                if let Err(error) = LogSink.publish(result).await {
                    warn!(%error, "Failed to log batch result");
                }
            }
        }
    }
}

/// Report where each selected cluster left off on the previous run
async fn log_last_results(database: &dyn Database, mode: &RunMode) {
    for cluster in mode.clusters() {
        match database.get_recent_results(cluster, 1).await {
            Ok(recent) => match recent.first() {
                Some(last) => info!(
                    %cluster,
                    id = last.id,
                    stored_at = last.created_at,
                    loss = last.result.loss,
                    mean = last.result.mean,
                    "Last recorded result"
                ),
                None => info!(%cluster, "No previous results recorded"),
            },
            Err(error) => warn!(%cluster, %error, "Failed to read previous results"),
        }
    }
}
