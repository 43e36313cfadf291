//! Destinations for finished batch results.

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::batch::BatchResult;

/// Accepts one [`BatchResult`] per completed batch
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn publish(&self, result: BatchResult) -> Result<()>;
}

/// Forwards results to a channel consumed elsewhere (persistence, alerting)
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<BatchResult>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<BatchResult>) -> Self {
        Self { tx }
    }

    /// Create a sink together with the receiving half
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<BatchResult>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl ResultSink for ChannelSink {
    async fn publish(&self, result: BatchResult) -> Result<()> {
        self.tx
            .send(result)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to send batch result: {}", e))
    }
}

/// Writes each result to the log and nothing else
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl ResultSink for LogSink {
    async fn publish(&self, result: BatchResult) -> Result<()> {
        tracing::info!(
            cluster = %result.cluster,
            hostname = %result.hostname,
            ping_type = %result.ping_type,
            submitted = result.submitted,
            confirmed = result.confirmed,
            loss = result.loss,
            max = result.max,
            mean = result.mean,
            min = result.min,
            stddev = result.stddev,
            take_time = result.take_time,
            errors = result.errors.len(),
            "Ping result"
        );
        Ok(())
    }
}
