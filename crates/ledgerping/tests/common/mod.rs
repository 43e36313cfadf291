//! Shared fakes for integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use ledgerping::tx::Transaction;
use ledgerping::{
    Cluster, Commitment, Connector, CredentialResolver, Hash, Keypair, ProbeError, RpcTransport,
    Signature,
};

/// Outcome of one `send_transaction` call
#[derive(Debug, Clone)]
pub enum SendStep {
    Accept { latency: Duration },
    Reject { message: String },
}

/// Transport driven by a per-send script; statuses confirm immediately
pub struct ScriptedTransport {
    steps: Mutex<Vec<SendStep>>,
    pub sends: AtomicUsize,
    pub status_queries: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(steps: Vec<SendStep>) -> Self {
        Self { steps: Mutex::new(steps), sends: AtomicUsize::new(0), status_queries: AtomicUsize::new(0) }
    }

    pub fn always_accept(latency: Duration) -> Self {
        Self::new(vec![SendStep::Accept { latency }])
    }

    pub fn always_reject(message: &str) -> Self {
        Self::new(vec![SendStep::Reject { message: message.to_string() }])
    }

    fn next_step(&self) -> SendStep {
        let mut steps = self.steps.lock().unwrap();
        if steps.len() > 1 { steps.remove(0) } else { steps[0].clone() }
    }
}

#[async_trait]
impl RpcTransport for ScriptedTransport {
    async fn latest_blockhash(&self) -> ledgerping::Result<Hash> {
        Ok(Hash::new_unique())
    }

    async fn send_transaction(&self, transaction: &Transaction) -> ledgerping::Result<Signature> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        match self.next_step() {
            SendStep::Accept { latency } => {
                tokio::time::sleep(latency).await;
                Ok(transaction.signatures[0])
            }
            SendStep::Reject { message } => Err(ProbeError::Transport(message)),
        }
    }

    async fn signature_status(&self, _signature: &Signature) -> ledgerping::Result<Option<Commitment>> {
        self.status_queries.fetch_add(1, Ordering::SeqCst);
        Ok(Some(Commitment::Confirmed))
    }
}

/// Connector handing out transports built by a factory, counting calls
pub struct CountingConnector {
    factory: Box<dyn Fn() -> ScriptedTransport + Send + Sync>,
    failures_left: AtomicUsize,
    pub connects: AtomicUsize,
    pub endpoints: Mutex<Vec<String>>,
}

impl CountingConnector {
    pub fn new(factory: impl Fn() -> ScriptedTransport + Send + Sync + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            failures_left: AtomicUsize::new(0),
            connects: AtomicUsize::new(0),
            endpoints: Mutex::new(Vec::new()),
        }
    }

    /// Refuse the first `failures` connection attempts
    pub fn failing_first(self, failures: usize) -> Self {
        self.failures_left.store(failures, Ordering::SeqCst);
        self
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for CountingConnector {
    async fn connect(&self, _cluster: Cluster, endpoint: &str) -> ledgerping::Result<Arc<dyn RpcTransport>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.endpoints.lock().unwrap().push(endpoint.to_string());
        let refused = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if refused {
            return Err(ProbeError::Transport("connection refused".into()));
        }
        Ok(Arc::new((self.factory)()))
    }
}

/// Same fee payer for every cluster
pub struct StaticCredentials;

impl CredentialResolver for StaticCredentials {
    fn resolve_fee_payer(&self, _cluster: Cluster) -> ledgerping::Result<Keypair> {
        Ok(Keypair::new())
    }
}

/// Fails to resolve the fee payer for the first `failures` calls
pub struct FlakyCredentials {
    failures_left: AtomicUsize,
    pub calls: AtomicUsize,
}

impl FlakyCredentials {
    pub fn new(failures: usize) -> Self {
        Self { failures_left: AtomicUsize::new(failures), calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CredentialResolver for FlakyCredentials {
    fn resolve_fee_payer(&self, _cluster: Cluster) -> ledgerping::Result<Keypair> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ProbeError::Config("keypair file is not readable yet".into()));
        }
        Ok(Keypair::new())
    }
}
