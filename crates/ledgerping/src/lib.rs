//! ledgerping - synthetic transaction probes for ledger RPC clusters
//!
//! Workers submit small transactions to a cluster, time how long each one
//! takes to reach a confirmed commitment level, and fold a batch of those
//! timings into a [`BatchResult`] (loss rate, min/max/mean/stddev latency).

pub mod batch;
pub mod cluster;
pub mod config;
pub mod credentials;
pub mod error;
pub mod poller;
pub mod prober;
pub mod rpc;
pub mod sink;
pub mod stats;
pub mod timer;
pub mod tx;
pub mod worker;

// Re-export main types
pub use batch::{BatchResult, BatchRunner, PingType};
pub use cluster::{Cluster, ProbeMode, RunMode};
pub use config::{ClusterSettings, WorkerConfig};
pub use credentials::{CredentialResolver, KeypairFileResolver};
pub use error::{ProbeError, Result};
pub use poller::{PollSettings, wait_confirmation};
pub use prober::{LedgerProber, Probe};
pub use rpc::{Commitment, Connector, HttpConnector, JsonRpcClient, RpcTransport};
pub use sink::{ChannelSink, LogSink, ResultSink};
pub use stats::{Summary, aggregate};
pub use timer::{Stopwatch, TakeTime};
pub use tx::{Hash, Keypair, Pubkey, Signature, Signer, Transaction};
pub use worker::{WorkerPool, WorkerState};
