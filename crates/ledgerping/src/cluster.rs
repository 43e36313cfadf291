use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProbeError;

/// A ledger cluster that can be probed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cluster {
    Mainnet,
    Testnet,
    Devnet,
}

/// Kind of transaction a probe submits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeMode {
    /// One-lamport system transfer
    Transfer,
    /// Memo instruction with a declared compute-unit budget
    Memo,
}

impl Cluster {
    pub const ALL: [Cluster; 3] = [Cluster::Mainnet, Cluster::Testnet, Cluster::Devnet];

    /// Public RPC endpoint used when no alternate endpoint is configured
    pub fn default_endpoint(self) -> &'static str {
        match self {
            Cluster::Mainnet => "https://api.mainnet-beta.solana.com",
            Cluster::Testnet => "https://api.testnet.solana.com",
            Cluster::Devnet => "https://api.devnet.solana.com",
        }
    }

    /// Which transaction shape is used to probe this cluster
    pub fn probe_mode(self) -> ProbeMode {
        match self {
            Cluster::Testnet => ProbeMode::Memo,
            Cluster::Mainnet | Cluster::Devnet => ProbeMode::Transfer,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Cluster::Mainnet => "mainnet",
            Cluster::Testnet => "testnet",
            Cluster::Devnet => "devnet",
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Cluster {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "mainnet-beta" | "mainnetbeta" => Ok(Cluster::Mainnet),
            "testnet" => Ok(Cluster::Testnet),
            "devnet" => Ok(Cluster::Devnet),
            _ => Err(ProbeError::InvalidCluster(s.to_string())),
        }
    }
}

/// Which clusters a process should run workers for
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RunMode {
    Single(Cluster),
    Subset(Vec<Cluster>),
    #[default]
    All,
}

impl RunMode {
    /// Expand the selection into concrete clusters, without duplicates
    pub fn clusters(&self) -> Vec<Cluster> {
        match self {
            RunMode::Single(cluster) => vec![*cluster],
            RunMode::Subset(clusters) => {
                let mut selected: Vec<Cluster> = Vec::with_capacity(clusters.len());
                for cluster in clusters {
                    if !selected.contains(cluster) {
                        selected.push(*cluster);
                    }
                }
                selected
            }
            RunMode::All => Cluster::ALL.to_vec(),
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Single(cluster) => write!(f, "{cluster}"),
            RunMode::Subset(clusters) => {
                let names: Vec<&str> = clusters.iter().map(|c| c.as_str()).collect();
                f.write_str(&names.join(","))
            }
            RunMode::All => f.write_str("all"),
        }
    }
}

impl FromStr for RunMode {
    type Err = ProbeError;

    /// Parse `all`, a single cluster name, or a comma separated list
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return Ok(RunMode::All);
        }

        let clusters = trimmed
            .split(',')
            .map(str::parse::<Cluster>)
            .collect::<Result<Vec<_>, _>>()?;

        match clusters.as_slice() {
            [single] => Ok(RunMode::Single(*single)),
            _ => Ok(RunMode::Subset(clusters)),
        }
    }
}
