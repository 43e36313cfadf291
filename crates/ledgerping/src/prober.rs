use async_trait::async_trait;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cluster::Cluster;
use crate::config::WorkerConfig;
use crate::error::{ProbeError, Result};
use crate::poller::{PollSettings, wait_confirmation};
use crate::rpc::RpcTransport;
use crate::timer::Stopwatch;
use crate::tx::{Keypair, Signature, build_probe_transaction};

/// One submit-and-confirm probe attempt
#[async_trait]
pub trait Probe: Send + Sync {
    /// Run a probe and return the milliseconds from submission start to
    /// confirmation
    async fn probe_once(
        &self,
        cluster: Cluster,
        transport: &dyn RpcTransport,
        fee_payer: &Keypair,
        config: &WorkerConfig,
        cancel: &CancellationToken,
    ) -> Result<i64>;
}

/// Prober submitting real probe transactions through an [`RpcTransport`]
#[derive(Debug, Clone, Copy, Default)]
pub struct LedgerProber;

impl LedgerProber {
    pub fn new() -> Self {
        Self
    }

    /// Fetch a block hash, build, sign and send, all under `tx_timeout`
    async fn submit(
        &self,
        cluster: Cluster,
        transport: &dyn RpcTransport,
        fee_payer: &Keypair,
        config: &WorkerConfig,
    ) -> Result<Signature> {
        let tx_timeout = config.tx_timeout();
        let submission = async {
            let blockhash = transport.latest_blockhash().await?;
            let transaction = build_probe_transaction(cluster.probe_mode(), fee_payer, config, blockhash)?;
            transport.send_transaction(&transaction).await
        };

        match timeout(tx_timeout, submission).await {
            Ok(Ok(signature)) => Ok(signature),
            Ok(Err(ProbeError::Submission(message))) => Err(ProbeError::Submission(message)),
            Ok(Err(error)) => Err(ProbeError::Submission(error.to_string())),
            Err(_) => Err(ProbeError::Submission(format!(
                "timed out after {}ms",
                tx_timeout.as_millis()
            ))),
        }
    }
}

#[async_trait]
impl Probe for LedgerProber {
    async fn probe_once(
        &self,
        cluster: Cluster,
        transport: &dyn RpcTransport,
        fee_payer: &Keypair,
        config: &WorkerConfig,
        cancel: &CancellationToken,
    ) -> Result<i64> {
        let mut watch = Stopwatch::start();

        let signature = match self.submit(cluster, transport, fee_payer, config).await {
            Ok(signature) => signature,
            Err(error) => {
                watch.stop();
                warn!(%cluster, %error, "Probe submission failed");
                return Err(error);
            }
        };
        if config.tx_log {
            info!(%cluster, %signature, "Probe transaction sent");
        } else {
            debug!(%cluster, %signature, "Probe transaction sent");
        }

        let confirmation =
            wait_confirmation(transport, &signature, PollSettings::from_config(config), cancel).await;
        let elapsed_ms = watch.stop();

        match confirmation {
            Ok(()) => {
                if config.tx_log {
                    info!(%cluster, %signature, elapsed_ms, "Probe confirmed");
                } else {
                    debug!(%cluster, %signature, elapsed_ms, "Probe confirmed");
                }
                Ok(elapsed_ms)
            }
            Err(error) => {
                if !error.is_cancelled() {
                    warn!(%cluster, %signature, %error, "Probe confirmation failed");
                }
                Err(error)
            }
        }
    }
}
