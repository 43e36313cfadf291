use std::collections::BTreeMap;
use std::{env, fmt, fs, path};

use ledgerping::credentials::SolanaCliConfig;
use ledgerping::{Cluster, ClusterSettings, KeypairFileResolver, WorkerConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read config file {}", .0.display())]
    ReadFailed(path::PathBuf, #[source] std::io::Error),
    #[error("failed to write config file {}", .0.display())]
    WriteFailed(path::PathBuf, #[source] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseFailed(String),
    #[error("no config path available, set XDG_CONFIG_HOME or HOME")]
    ConfigPathUnavailable,
    #[error("unknown cluster section [clusters.{0}]")]
    UnknownCluster(String),
    #[error("invalid endpoint for {cluster}: {reason}")]
    InvalidEndpoint { cluster: Cluster, reason: String },
    #[error("no keypair configured for {0}, set keypair_path or solana_cli_config")]
    MissingKeypair(Cluster),
    #[error("failed to load solana cli config for {cluster}: {reason}")]
    SolanaConfig { cluster: Cluster, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Reported with every result; empty means the system hostname
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub clusters: BTreeMap<String, ClusterConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub enabled: bool,
    pub path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Alternate RPC endpoint, the public one is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keypair_path: Option<String>,
    /// Solana CLI `config.yml` whose `keypair_path` is used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solana_cli_config: Option<String>,
    #[serde(default)]
    pub ping: WorkerConfig,
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/ledgerping/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, Error> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(Error::ConfigPathUnavailable);
    };

    Ok(path.join("ledgerping/config.toml"))
}

/// Expand a leading `~/` to the home directory
fn expand_home(raw: &str) -> path::PathBuf {
    match (raw.strip_prefix("~/"), env::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => path::PathBuf::from(raw),
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { enabled: true, path: "ledgerping.db".into() }
    }
}

impl Default for Config {
    fn default() -> Self {
        let clusters = Cluster::ALL
            .iter()
            .map(|cluster| {
                let section = ClusterConfig {
                    solana_cli_config: Some("~/.config/solana/cli/config.yml".into()),
                    ..ClusterConfig::default()
                };
                (cluster.to_string(), section)
            })
            .collect();

        Self { hostname: String::new(), database: DatabaseConfig::default(), clusters }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_title_2 = write_title_indented(2);
        let write_1 = write_indented(1);
        let write_2 = write_indented(2);
        let write_3 = write_indented(3);
        let or_unset = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".into());

        writeln!(f, "Current Internal Configuration State:")?;
        write_title_1(f, "Host")?;
        write_1(f, "Hostname", &self.resolved_hostname())?;
        write_title_1(f, "Database")?;
        write_1(f, "Enabled", &self.database.enabled)?;
        write_1(f, "Path", &self.database.path)?;
        write_title_1(f, "Clusters")?;
        for (name, section) in &self.clusters {
            let ping = &section.ping;
            write_title_2(f, name)?;
            write_2(f, "Endpoint", &or_unset(&section.endpoint))?;
            write_2(f, "Keypair", &or_unset(&section.keypair_path))?;
            write_2(f, "Solana CLI Config", &or_unset(&section.solana_cli_config))?;
            write_2(f, "Workers", &ping.num_workers)?;
            write_3(f, "Batch Count", &ping.batch_count)?;
            write_3(f, "Batch Interval (ms)", &ping.batch_interval_ms)?;
            write_3(f, "Tx Timeout (ms)", &ping.tx_timeout().as_millis())?;
            write_3(
                f,
                "Confirmation Timeout (ms)",
                &ping.effective_wait_confirmation_timeout().as_millis(),
            )?;
            write_3(f, "Status Check Interval (ms)", &ping.status_check_interval().as_millis())?;
            write_3(f, "Min Per Ping (s)", &ping.min_per_ping_secs)?;
            write_3(f, "Max Per Ping (s)", &ping.max_per_ping_secs)?;
            write_3(f, "Receiver", &or_unset(&ping.receiver))?;
            write_3(f, "Tx Log", &ping.tx_log)?;
        }

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/ledgerping/config.toml
    ///  or the specified path, with the name config.toml if one does not exist
    ///
    /// ```rust,ignore
    /// let cfg = config::Config::from_config(None::<&path::Path>)?;
    /// println!("{}", cfg);
    /// ```
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, Error> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path)
                .map_err(|err| Error::ReadFailed(config_path.clone(), err))?;
            let config: Self = toml::from_str(raw_string.as_str())
                .map_err(|err| Error::ParseFailed(err.to_string()))?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            Ok(config)
        }
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), Error> {
        let config_str: String =
            toml::to_string_pretty(self).map_err(|err| Error::ParseFailed(err.to_string()))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| Error::WriteFailed(parent.to_path_buf(), err))?;
        }

        fs::write(path, config_str).map_err(|err| Error::WriteFailed(path.to_path_buf(), err))
    }

    /// Check cluster names and endpoint URLs
    pub fn validate(&self) -> Result<(), Error> {
        for (cluster, section) in self.sections()? {
            if let Some(endpoint) = section.endpoint.as_deref().filter(|e| !e.trim().is_empty()) {
                let parsed = url::Url::parse(endpoint)
                    .map_err(|err| Error::InvalidEndpoint { cluster, reason: err.to_string() })?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(Error::InvalidEndpoint {
                        cluster,
                        reason: format!("unsupported scheme {}", parsed.scheme()),
                    });
                }
            }
        }
        Ok(())
    }

    /// Hostname attached to results
    pub fn resolved_hostname(&self) -> String {
        if !self.hostname.trim().is_empty() {
            return self.hostname.trim().to_string();
        }
        hostname::get()
            .ok()
            .and_then(|host| host.into_string().ok())
            .filter(|host| !host.trim().is_empty())
            .unwrap_or_else(|| "unknown".to_string())
    }

    fn sections(&self) -> Result<Vec<(Cluster, &ClusterConfig)>, Error> {
        self.clusters
            .iter()
            .map(|(name, section)| {
                name.parse::<Cluster>()
                    .map(|cluster| (cluster, section))
                    .map_err(|_| Error::UnknownCluster(name.clone()))
            })
            .collect()
    }

    /// Per-cluster worker settings for the pool
    pub fn cluster_settings(&self) -> Result<Vec<ClusterSettings>, Error> {
        Ok(self
            .sections()?
            .into_iter()
            .map(|(cluster, section)| {
                let settings = ClusterSettings::new(cluster, section.ping.clone());
                match &section.endpoint {
                    Some(endpoint) => settings.with_alternate_endpoint(endpoint.clone()),
                    None => settings,
                }
            })
            .collect())
    }

    /// Map every configured cluster to its fee payer keypair file.
    ///
    /// An explicit `keypair_path` wins over the one named in
    /// `solana_cli_config`.
    pub fn credentials(&self) -> Result<KeypairFileResolver, Error> {
        let mut resolver = KeypairFileResolver::new();
        for (cluster, section) in self.sections()? {
            let keypair_path = match (&section.keypair_path, &section.solana_cli_config) {
                (Some(path), _) => path.clone(),
                (None, Some(cli_config)) => {
                    let parsed = SolanaCliConfig::read(&expand_home(cli_config))
                        .map_err(|err| Error::SolanaConfig { cluster, reason: err.to_string() })?;
                    if parsed.keypair_path.is_empty() {
                        return Err(Error::MissingKeypair(cluster));
                    }
                    parsed.keypair_path
                }
                (None, None) => return Err(Error::MissingKeypair(cluster)),
            };
            resolver.insert(cluster, expand_home(&keypair_path));
        }
        Ok(resolver)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    const SAMPLE: &str = r#"
hostname = "probe-eu-1"

[database]
enabled = false
path = "/var/lib/ledgerping/results.db"

[clusters.devnet]
endpoint = "http://127.0.0.1:8899"
keypair_path = "/etc/ledgerping/devnet.json"

[clusters.devnet.ping]
num_workers = 2
batch_count = 5
tx_timeout_ms = 0
status_check_interval_ms = 500
receiver = "11111111111111111111111111111111"

[clusters.mainnet-beta]
keypair_path = "/etc/ledgerping/mainnet.json"
"#;

    #[test]
    fn test_parse_sample_config() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        config.validate().unwrap();

        assert_eq!(config.resolved_hostname(), "probe-eu-1");
        assert!(!config.database.enabled);

        let settings = config.cluster_settings().unwrap();
        let devnet = settings.iter().find(|s| s.cluster == Cluster::Devnet).unwrap();
        assert_eq!(devnet.endpoint(), "http://127.0.0.1:8899");
        assert_eq!(devnet.worker.num_workers, 2);
        assert_eq!(devnet.worker.tx_timeout(), Duration::from_secs(10));
        assert_eq!(devnet.worker.status_check_interval(), Duration::from_millis(500));
        assert_eq!(devnet.worker.effective_wait_confirmation_timeout(), Duration::from_secs(50));

        let mainnet = settings.iter().find(|s| s.cluster == Cluster::Mainnet).unwrap();
        assert_eq!(mainnet.endpoint(), "https://api.mainnet-beta.solana.com");
        assert_eq!(mainnet.worker, WorkerConfig::default());
    }

    #[test]
    fn test_unknown_cluster_section_rejected() {
        let config: Config = toml::from_str("[clusters.localnet]\nkeypair_path = \"a.json\"").unwrap();
        assert!(matches!(config.validate(), Err(Error::UnknownCluster(name)) if name == "localnet"));
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let config: Config =
            toml::from_str("[clusters.testnet]\nendpoint = \"ftp://example.com\"").unwrap();
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidEndpoint { cluster: Cluster::Testnet, .. })
        ));

        let config: Config = toml::from_str("[clusters.testnet]\nendpoint = \"not a url\"").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_config_written_and_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config");

        let created = Config::from_config(Some(&path)).unwrap();
        let written = dir.path().join("nested/config.toml");
        assert!(written.exists());

        let reloaded = Config::from_config(Some(&written)).unwrap();
        assert_eq!(reloaded.clusters.len(), 3);
        assert_eq!(reloaded.database.path, created.database.path);
        assert_eq!(reloaded.clusters["devnet"].ping, WorkerConfig::default());
    }

    #[test]
    fn test_credentials_from_solana_cli_config() {
        let dir = tempfile::tempdir().unwrap();
        let cli_config = dir.path().join("config.yml");
        fs::write(
            &cli_config,
            "json_rpc_url: https://api.testnet.solana.com\nkeypair_path: /keys/testnet.json\ncommitment: confirmed\n",
        )
        .unwrap();

        let raw = format!(
            "[clusters.testnet]\nsolana_cli_config = \"{}\"\n\n[clusters.devnet]\nkeypair_path = \"/keys/devnet.json\"\n",
            cli_config.display()
        );
        let config: Config = toml::from_str(&raw).unwrap();
        let resolver = config.credentials().unwrap();

        assert_eq!(resolver.path(Cluster::Testnet), Some(path::Path::new("/keys/testnet.json")));
        assert_eq!(resolver.path(Cluster::Devnet), Some(path::Path::new("/keys/devnet.json")));
        assert_eq!(resolver.path(Cluster::Mainnet), None);
    }

    #[test]
    fn test_missing_keypair_is_an_error() {
        let config: Config = toml::from_str("[clusters.devnet]\n").unwrap();
        assert!(matches!(config.credentials(), Err(Error::MissingKeypair(Cluster::Devnet))));
    }

    #[test]
    fn test_display_lists_clusters() {
        let rendered = Config::default().to_string();
        assert!(rendered.starts_with("Current Internal Configuration State:"));
        assert!(rendered.contains("mainnet"));
        assert!(rendered.contains("Confirmation Timeout (ms): 50000"));
    }

    #[test]
    fn test_hostname_falls_back_to_system_name() {
        let configured: Config = toml::from_str("hostname = \"  probe-01 \"\n").unwrap();
        assert_eq!(configured.resolved_hostname(), "probe-01");

        let unset: Config = toml::from_str("hostname = \"\"\n").unwrap();
        let expected = hostname::get()
            .ok()
            .and_then(|host| host.into_string().ok())
            .filter(|host| !host.trim().is_empty())
            .unwrap_or_else(|| "unknown".to_string());
        assert_eq!(unset.resolved_hostname(), expected);
        assert!(!unset.resolved_hostname().is_empty());
    }
}
