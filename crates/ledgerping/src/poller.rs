//! Confirmation polling for submitted probe transactions.

use std::time::Duration;

use tokio::time::{Instant, sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::{DEFAULT_STATUS_CHECK_INTERVAL, DEFAULT_WAIT_CONFIRMATION_TIMEOUT, WorkerConfig};
use crate::error::{ProbeError, Result};
use crate::rpc::{Commitment, RpcTransport};
use crate::tx::Signature;

/// Timeouts governing one confirmation wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Overall bound on the wait; zero selects the 50s default
    pub overall_timeout: Duration,
    /// Bound on each individual status query
    pub request_timeout: Duration,
    /// Sleep between status queries; zero selects the 1s default
    pub poll_interval: Duration,
}

impl PollSettings {
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self {
            overall_timeout: config.wait_confirmation_timeout(),
            request_timeout: config.tx_timeout(),
            poll_interval: config.status_check_interval(),
        }
    }
}

/// Poll `signature` until it is confirmed or finalized.
///
/// Transport errors are retried immediately until the overall timeout has
/// elapsed, after which the last transport error is returned. Running out of
/// time on non-terminal statuses yields [`ProbeError::ConfirmationTimeout`].
pub async fn wait_confirmation(
    transport: &dyn RpcTransport,
    signature: &Signature,
    settings: PollSettings,
    cancel: &CancellationToken,
) -> Result<()> {
    let overall_timeout = if settings.overall_timeout.is_zero() {
        info!(
            timeout_secs = DEFAULT_WAIT_CONFIRMATION_TIMEOUT.as_secs(),
            "Confirmation timeout is not set, using default"
        );
        DEFAULT_WAIT_CONFIRMATION_TIMEOUT
    } else {
        settings.overall_timeout
    };
    let poll_interval = if settings.poll_interval.is_zero() {
        DEFAULT_STATUS_CHECK_INTERVAL
    } else {
        settings.poll_interval
    };

    let started = Instant::now();
    let mut last_status: Option<Commitment> = None;

    loop {
        if cancel.is_cancelled() {
            return Err(ProbeError::Cancelled);
        }

        let response = match timeout(settings.request_timeout, transport.signature_status(signature)).await {
            Ok(response) => response,
            Err(_) => Err(ProbeError::Transport(format!(
                "status query timed out after {}ms",
                settings.request_timeout.as_millis()
            ))),
        };

        match response {
            Err(error) => {
                if started.elapsed() < overall_timeout {
                    debug!(%signature, %error, "Status query failed, retrying");
                    tokio::task::yield_now().await;
                    continue;
                }
                return Err(error);
            }
            Ok(Some(commitment)) if commitment.is_terminal() => {
                debug!(%signature, %commitment, "Transaction reached terminal commitment");
                return Ok(());
            }
            Ok(status) => last_status = status.or(last_status),
        }

        let waited = started.elapsed();
        if waited > overall_timeout {
            return Err(ProbeError::ConfirmationTimeout {
                signature: signature.to_string(),
                waited_ms: waited.as_millis() as u64,
                last_status: last_status.map_or_else(|| "unknown".to_string(), |c| c.to_string()),
            });
        }

        tokio::select! {
            _ = cancel.cancelled() => return Err(ProbeError::Cancelled),
            _ = sleep(poll_interval) => {}
        }
    }
}
