use thiserror::Error;

/// Errors produced while probing a cluster.
///
/// Only [`ProbeError::InvalidCluster`] raised at pool startup and
/// [`ProbeError::Config`] raised while loading configuration are fatal.
/// Everything else is counted against a batch and reflected in its loss.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid cluster: {0}")]
    InvalidCluster(String),

    #[error("failed to submit probe transaction: {0}")]
    Submission(String),

    #[error(
        "transaction {signature} not confirmed within {waited_ms}ms (last status: {last_status})"
    )]
    ConfirmationTimeout { signature: String, waited_ms: u64, last_status: String },

    #[error("rpc transport error: {0}")]
    Transport(String),

    #[error("probe cancelled")]
    Cancelled,
}

impl ProbeError {
    /// Whether this error is a shutdown signal rather than a probe failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProbeError::Cancelled)
    }
}

impl From<solana_client::client_error::ClientError> for ProbeError {
    fn from(error: solana_client::client_error::ClientError) -> Self {
        ProbeError::Transport(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ProbeError>;
