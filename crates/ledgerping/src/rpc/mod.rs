//! RPC transport seam.
//!
//! Workers only ever talk to a cluster through [`RpcTransport`], so the
//! prober and poller can be driven by in-memory fakes in tests.

mod client;

pub use client::JsonRpcClient;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::cluster::Cluster;
use crate::error::{ProbeError, Result};
use crate::tx::{Hash, Signature, Transaction};

/// Durability level reported for a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commitment {
    Processed,
    Confirmed,
    Finalized,
}

impl Commitment {
    /// Confirmed and finalized end a confirmation wait
    pub fn is_terminal(self) -> bool {
        matches!(self, Commitment::Confirmed | Commitment::Finalized)
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Commitment::Processed => write!(f, "processed"),
            Commitment::Confirmed => write!(f, "confirmed"),
            Commitment::Finalized => write!(f, "finalized"),
        }
    }
}

impl FromStr for Commitment {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "processed" => Ok(Commitment::Processed),
            "confirmed" => Ok(Commitment::Confirmed),
            "finalized" => Ok(Commitment::Finalized),
            other => Err(ProbeError::Transport(format!("unknown commitment level {other:?}"))),
        }
    }
}

/// Connection to one cluster RPC endpoint, owned by a single worker
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Recent block hash to anchor a new transaction
    async fn latest_blockhash(&self) -> Result<Hash>;

    /// Submit a signed transaction and return its signature
    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature>;

    /// Current commitment of a signature, `None` while it is unknown
    async fn signature_status(&self, signature: &Signature) -> Result<Option<Commitment>>;
}

/// Creates fresh transports when a worker (re)connects
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, cluster: Cluster, endpoint: &str) -> Result<Arc<dyn RpcTransport>>;
}

/// Connector producing [`JsonRpcClient`]s over HTTP
#[derive(Debug, Clone)]
pub struct HttpConnector {
    request_timeout: Duration,
}

impl HttpConnector {
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }
}

impl Default for HttpConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn connect(&self, cluster: Cluster, endpoint: &str) -> Result<Arc<dyn RpcTransport>> {
        tracing::debug!(%cluster, endpoint, "Creating RPC client");
        Ok(Arc::new(JsonRpcClient::new(endpoint, self.request_timeout)?))
    }
}
