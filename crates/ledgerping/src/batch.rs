use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cluster::Cluster;
use crate::config::WorkerConfig;
use crate::credentials::CredentialResolver;
use crate::error::{ProbeError, Result};
use crate::prober::Probe;
use crate::rpc::RpcTransport;
use crate::timer::{Stopwatch, TakeTime};

/// Label describing why a batch was run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PingType {
    Report,
    DataPoint1Min,
}

impl fmt::Display for PingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PingType::Report => write!(f, "report"),
            PingType::DataPoint1Min => write!(f, "datapoint1min"),
        }
    }
}

impl FromStr for PingType {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "report" => Ok(PingType::Report),
            "datapoint1min" => Ok(PingType::DataPoint1Min),
            other => Err(ProbeError::Config(format!("unknown ping type {other}"))),
        }
    }
}

/// Summary of one batch of probes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    /// Completion time, unix seconds (UTC)
    pub timestamp: i64,
    pub cluster: Cluster,
    pub hostname: String,
    pub ping_type: PingType,
    pub submitted: usize,
    pub confirmed: usize,
    /// Percentage of submitted probes that were not confirmed
    pub loss: f64,
    pub max: i64,
    pub mean: i64,
    pub min: i64,
    pub stddev: i64,
    /// Sum of the successful probe latencies, in milliseconds
    pub take_time: i64,
    /// One entry per failed attempt, in order
    pub errors: Vec<String>,
}

impl BatchResult {
    pub fn new(cluster: Cluster, hostname: impl Into<String>, ping_type: PingType) -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp(),
            cluster,
            hostname: hostname.into(),
            ping_type,
            submitted: 0,
            confirmed: 0,
            loss: 0.0,
            max: 0,
            mean: 0,
            min: 0,
            stddev: 0,
            take_time: 0,
            errors: Vec::new(),
        }
    }

    /// A batch that never ran any attempt because setup failed
    pub fn setup_failed(&self) -> bool {
        self.submitted == 0 && !self.errors.is_empty()
    }

    pub fn is_total_loss(&self) -> bool {
        self.submitted > 0 && self.confirmed == 0
    }

    /// Fill in counts, loss and latency statistics
    fn finish(&mut self, submitted: usize, confirmed: usize, timings: &TakeTime) {
        let summary = timings.statistic();
        self.timestamp = chrono::Utc::now().timestamp();
        self.submitted = submitted;
        self.confirmed = confirmed;
        self.loss = if submitted > 0 {
            (submitted - confirmed) as f64 / submitted as f64 * 100.0
        } else {
            0.0
        };
        self.max = summary.max;
        self.mean = summary.mean as i64;
        self.min = summary.min;
        self.stddev = summary.stddev as i64;
        self.take_time = summary.sum;
    }
}

/// Runs a configured number of probes back to back
#[derive(Clone)]
pub struct BatchRunner {
    prober: Arc<dyn Probe>,
    credentials: Arc<dyn CredentialResolver>,
}

impl BatchRunner {
    pub fn new(prober: Arc<dyn Probe>, credentials: Arc<dyn CredentialResolver>) -> Self {
        Self { prober, credentials }
    }

    /// Run one batch.
    ///
    /// Failed attempts are recorded in the result and never abort the batch.
    /// The only error returned is [`ProbeError::Cancelled`].
    pub async fn run_batch(
        &self,
        cluster: Cluster,
        transport: &dyn RpcTransport,
        host: &str,
        ping_type: PingType,
        config: &WorkerConfig,
        cancel: &CancellationToken,
    ) -> Result<BatchResult> {
        let mut result = BatchResult::new(cluster, host, ping_type);

        let fee_payer = match self.credentials.resolve_fee_payer(cluster) {
            Ok(fee_payer) => fee_payer,
            Err(error) => {
                warn!(%cluster, %error, "Failed to resolve fee payer, skipping batch");
                result.errors.push(error.to_string());
                return Ok(result);
            }
        };

        let wall = Stopwatch::start();
        let mut timings = TakeTime::new();
        let mut confirmed = 0;

        for attempt in 0..config.batch_count {
            if attempt > 0 {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(ProbeError::Cancelled),
                    _ = sleep(config.batch_interval()) => {}
                }
            }

            match self.prober.probe_once(cluster, transport, &fee_payer, config, cancel).await {
                Ok(elapsed_ms) => {
                    timings.add(elapsed_ms);
                    confirmed += 1;
                }
                Err(ProbeError::Cancelled) => return Err(ProbeError::Cancelled),
                Err(error) => result.errors.push(error.to_string()),
            }
        }

        result.finish(config.batch_count, confirmed, &timings);

        let wall_ms = wall.elapsed_ms();
        if let Some(budget) = config.max_per_ping() {
            if wall_ms > budget.as_millis() as i64 {
                warn!(%cluster, wall_ms, budget_secs = budget.as_secs(), "Batch exceeded its time budget");
            }
        }
        info!(
            %cluster,
            submitted = result.submitted,
            confirmed = result.confirmed,
            loss = result.loss,
            mean_ms = result.mean,
            max_ms = result.max,
            "Batch finished"
        );

        Ok(result)
    }
}
