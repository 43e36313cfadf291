//! Long-running probe workers and the pool that launches them.
//!
//! Each worker owns its RPC connection and cycles through
//! `Connecting -> Probing -> Cooling -> Probing ...` until shutdown.
//! Workers share nothing but immutable configuration.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::batch::{BatchRunner, PingType};
use crate::cluster::{Cluster, RunMode};
use crate::config::ClusterSettings;
use crate::credentials::CredentialResolver;
use crate::error::{ProbeError, Result};
use crate::prober::Probe;
use crate::rpc::{Connector, RpcTransport};
use crate::sink::ResultSink;

/// Delay between two worker launches
pub const DEFAULT_LAUNCH_STAGGER: Duration = Duration::from_secs(5);

/// Back-off after a failed connection attempt
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Lifecycle of a single worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Connecting,
    Probing,
    /// Waiting out the rest of the minimum batch period
    Cooling { take_time_ms: i64 },
    Terminated,
}

/// Sleep unless cancelled first; `false` means shutdown was requested
async fn pause(duration: Duration, cancel: &CancellationToken) -> bool {
    if duration.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = sleep(duration) => true,
    }
}

/// Seconds left of the minimum batch period after a batch took `take_time_ms`
pub fn cooling_secs(min_per_ping_secs: u64, take_time_ms: i64) -> i64 {
    min_per_ping_secs as i64 - take_time_ms / 1000
}

struct Connection {
    transport: Arc<dyn RpcTransport>,
    failed_batches: u32,
}

struct Worker {
    id: usize,
    settings: Arc<ClusterSettings>,
    hostname: Arc<str>,
    connector: Arc<dyn Connector>,
    runner: BatchRunner,
    sink: Arc<dyn ResultSink>,
    connection: Option<Connection>,
}

impl Worker {
    fn cluster(&self) -> Cluster {
        self.settings.cluster
    }

    async fn run(mut self, launch_delay: Duration, cancel: CancellationToken) {
        let cluster = self.cluster();
        if !pause(launch_delay, &cancel).await {
            return;
        }
        info!(%cluster, worker = self.id, ">> Ping worker start");

        let mut state = WorkerState::Connecting;
        while state != WorkerState::Terminated {
            let next = match state {
                WorkerState::Connecting => self.connect(&cancel).await,
                WorkerState::Probing => self.probe(&cancel).await,
                WorkerState::Cooling { take_time_ms } => self.cool(take_time_ms, &cancel).await,
                WorkerState::Terminated => WorkerState::Terminated,
            };
            if next != state {
                debug!(%cluster, worker = self.id, from = ?state, to = ?next, "Worker state change");
            }
            state = next;
        }

        info!(%cluster, worker = self.id, ">> Ping worker end");
    }

    async fn connect(&mut self, cancel: &CancellationToken) -> WorkerState {
        if cancel.is_cancelled() {
            return WorkerState::Terminated;
        }
        let cluster = self.cluster();
        let endpoint = self.settings.endpoint();

        match self.connector.connect(cluster, endpoint).await {
            Ok(transport) => {
                if self.settings.alternate_endpoint.is_some() {
                    info!(%cluster, worker = self.id, endpoint, "Using alternate endpoint");
                }
                self.connection = Some(Connection { transport, failed_batches: 0 });
                WorkerState::Probing
            }
            Err(error) => {
                warn!(%cluster, worker = self.id, endpoint, %error, "Failed to connect, retrying");
                if pause(RECONNECT_DELAY, cancel).await {
                    WorkerState::Connecting
                } else {
                    WorkerState::Terminated
                }
            }
        }
    }

    async fn probe(&mut self, cancel: &CancellationToken) -> WorkerState {
        let cluster = self.cluster();
        let Some(connection) = self.connection.as_mut() else {
            return WorkerState::Connecting;
        };

        let outcome = self
            .runner
            .run_batch(
                cluster,
                connection.transport.as_ref(),
                &self.hostname,
                PingType::DataPoint1Min,
                &self.settings.worker,
                cancel,
            )
            .await;

        let result = match outcome {
            Ok(result) => result,
            Err(ProbeError::Cancelled) => return WorkerState::Terminated,
            Err(error) => {
                warn!(%cluster, worker = self.id, %error, "Batch failed");
                return WorkerState::Cooling { take_time_ms: 0 };
            }
        };

        if result.setup_failed() {
            warn!(%cluster, worker = self.id, errors = ?result.errors, "Batch setup failed");
            return WorkerState::Cooling { take_time_ms: 0 };
        }

        if result.is_total_loss() {
            connection.failed_batches += 1;
        } else {
            connection.failed_batches = 0;
        }

        let take_time_ms = result.take_time;
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(%cluster, worker = self.id, "Shutdown while publishing, result dropped");
                return WorkerState::Terminated;
            }
            published = self.sink.publish(result) => {
                if let Err(error) = published {
                    warn!(%cluster, worker = self.id, %error, "Failed to publish batch result");
                }
            }
        }
        WorkerState::Cooling { take_time_ms }
    }

    async fn cool(&mut self, take_time_ms: i64, cancel: &CancellationToken) -> WorkerState {
        let wait_secs = cooling_secs(self.settings.worker.min_per_ping_secs, take_time_ms);
        if wait_secs > 0 && !pause(Duration::from_secs(wait_secs as u64), cancel).await {
            return WorkerState::Terminated;
        }
        if cancel.is_cancelled() {
            return WorkerState::Terminated;
        }

        let threshold = self.settings.worker.reconnect_after_failed_batches;
        let unusable = match &self.connection {
            None => true,
            Some(connection) => threshold > 0 && connection.failed_batches >= threshold,
        };
        if unusable {
            if let Some(connection) = self.connection.take() {
                warn!(
                    cluster = %self.cluster(),
                    worker = self.id,
                    failed_batches = connection.failed_batches,
                    threshold,
                    "Connection unusable, reconnecting"
                );
            }
            return WorkerState::Connecting;
        }
        WorkerState::Probing
    }
}

/// Launches probe workers for the configured clusters
pub struct WorkerPool {
    clusters: HashMap<Cluster, Arc<ClusterSettings>>,
    hostname: Arc<str>,
    connector: Arc<dyn Connector>,
    runner: BatchRunner,
    sink: Arc<dyn ResultSink>,
    stagger: Duration,
}

impl WorkerPool {
    pub fn new(
        hostname: impl Into<String>,
        connector: Arc<dyn Connector>,
        prober: Arc<dyn Probe>,
        credentials: Arc<dyn CredentialResolver>,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        Self {
            clusters: HashMap::new(),
            hostname: Arc::from(hostname.into()),
            connector,
            runner: BatchRunner::new(prober, credentials),
            sink,
            stagger: DEFAULT_LAUNCH_STAGGER,
        }
    }

    /// Register (or replace) a cluster's settings
    pub fn with_cluster(mut self, settings: ClusterSettings) -> Self {
        self.clusters.insert(settings.cluster, Arc::new(settings));
        self
    }

    /// Delay inserted between consecutive worker launches
    pub fn with_stagger(mut self, stagger: Duration) -> Self {
        self.stagger = stagger;
        self
    }

    pub fn cluster_settings(&self, cluster: Cluster) -> Option<&ClusterSettings> {
        self.clusters.get(&cluster).map(Arc::as_ref)
    }

    /// Resolve cluster names and launch their workers
    pub fn launch_named(&self, names: &[&str], cancel: &CancellationToken) -> Result<Vec<JoinHandle<()>>> {
        let clusters = names.iter().map(|name| name.parse::<Cluster>()).collect::<Result<Vec<_>>>()?;
        self.launch(&RunMode::Subset(clusters), cancel)
    }

    /// Spawn `num_workers` workers for every selected cluster.
    ///
    /// [`RunMode::All`] runs every configured cluster in canonical order.
    /// Explicitly named clusters are validated before anything is spawned, so
    /// an unconfigured one fails with [`ProbeError::InvalidCluster`] and
    /// leaves no task running. Must be called from within a tokio runtime.
    pub fn launch(&self, mode: &RunMode, cancel: &CancellationToken) -> Result<Vec<JoinHandle<()>>> {
        let selected = match mode {
            RunMode::All => Cluster::ALL
                .iter()
                .filter_map(|cluster| self.clusters.get(cluster).cloned())
                .collect(),
            _ => mode
                .clusters()
                .into_iter()
                .map(|cluster| {
                    self.clusters.get(&cluster).cloned().ok_or_else(|| {
                        ProbeError::InvalidCluster(format!("{cluster} is not configured"))
                    })
                })
                .collect::<Result<Vec<_>>>()?,
        };

        info!(mode = %mode, hostname = %self.hostname, "Launching ping workers");

        let mut handles = Vec::new();
        for settings in selected {
            if settings.worker.num_workers == 0 {
                warn!(cluster = %settings.cluster, "num_workers is 0, cluster will not be probed");
                continue;
            }
            for _ in 0..settings.worker.num_workers {
                let launch_delay = self.stagger * handles.len() as u32;
                let worker = Worker {
                    id: handles.len(),
                    settings: settings.clone(),
                    hostname: self.hostname.clone(),
                    connector: self.connector.clone(),
                    runner: self.runner.clone(),
                    sink: self.sink.clone(),
                    connection: None,
                };
                handles.push(tokio::spawn(worker.run(launch_delay, cancel.clone())));
            }
        }

        Ok(handles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooling_secs() {
        assert_eq!(cooling_secs(60, 0), 60);
        assert_eq!(cooling_secs(60, 4_999), 56);
        assert_eq!(cooling_secs(10, 12_000), -2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_observes_cancellation() {
        let cancel = CancellationToken::new();
        assert!(pause(Duration::from_millis(10), &cancel).await);

        cancel.cancel();
        assert!(!pause(Duration::from_secs(60), &cancel).await);
        assert!(!pause(Duration::ZERO, &cancel).await);
    }
}
