//! Fee-payer credential loading.
//!
//! Keypair files hold a JSON array of 64 bytes (secret seed followed by the
//! public key). Solana CLI `config.yml` files are read for their
//! `keypair_path` entry.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use solana_sdk::signature;

use crate::cluster::Cluster;
use crate::error::{ProbeError, Result};
use crate::tx::Keypair;

/// Resolves the keypair that pays for a cluster's probes
pub trait CredentialResolver: Send + Sync {
    fn resolve_fee_payer(&self, cluster: Cluster) -> Result<Keypair>;
}

/// Resolver reading one keypair file per cluster, on every call
#[derive(Debug, Clone, Default)]
pub struct KeypairFileResolver {
    paths: HashMap<Cluster, PathBuf>,
}

impl KeypairFileResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keypair(mut self, cluster: Cluster, path: impl Into<PathBuf>) -> Self {
        self.paths.insert(cluster, path.into());
        self
    }

    pub fn insert(&mut self, cluster: Cluster, path: impl Into<PathBuf>) {
        self.paths.insert(cluster, path.into());
    }

    pub fn path(&self, cluster: Cluster) -> Option<&Path> {
        self.paths.get(&cluster).map(PathBuf::as_path)
    }
}

impl CredentialResolver for KeypairFileResolver {
    fn resolve_fee_payer(&self, cluster: Cluster) -> Result<Keypair> {
        let path = self.paths.get(&cluster).ok_or_else(|| {
            ProbeError::InvalidCluster(format!("no keypair configured for {cluster}"))
        })?;
        read_keypair_file(path)
    }
}

/// Load a keypair from a JSON byte-array file
pub fn read_keypair_file(path: &Path) -> Result<Keypair> {
    signature::read_keypair_file(path).map_err(|e| {
        ProbeError::Config(format!("failed to read keypair {}: {e}", path.display()))
    })
}

/// Write a keypair in the JSON byte-array format
pub fn write_keypair_file(keypair: &Keypair, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ProbeError::Config(e.to_string()))?;
    }
    signature::write_keypair_file(keypair, path)
        .map(|_| ())
        .map_err(|e| ProbeError::Config(format!("failed to write keypair {}: {e}", path.display())))
}

/// Subset of a Solana CLI `config.yml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SolanaCliConfig {
    pub json_rpc_url: String,
    pub websocket_url: String,
    pub keypair_path: String,
    pub commitment: String,
    pub address_labels: HashMap<String, String>,
}

impl SolanaCliConfig {
    pub fn read(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            ProbeError::Config(format!("failed to read Solana CLI config {}: {e}", path.display()))
        })?;
        Self::parse(&raw).map_err(|e| match e {
            ProbeError::Config(reason) => {
                ProbeError::Config(format!("{}: {reason}", path.display()))
            }
            other => other,
        })
    }

    pub fn parse(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw)
            .map_err(|e| ProbeError::Config(format!("malformed Solana CLI config: {e}")))
    }
}
