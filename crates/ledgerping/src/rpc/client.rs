use std::time::Duration;

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use url::Url;

use super::{Commitment, RpcTransport};
use crate::error::{ProbeError, Result};
use crate::tx::{Hash, Signature, Transaction};

/// Transport backed by the nonblocking Solana RPC client
pub struct JsonRpcClient {
    client: RpcClient,
}

impl JsonRpcClient {
    pub fn new(endpoint: &str, request_timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| ProbeError::Config(format!("invalid RPC endpoint {endpoint:?}: {e}")))?;
        let client = RpcClient::new_with_timeout_and_commitment(
            endpoint.to_string(),
            request_timeout,
            CommitmentConfig::confirmed(),
        );

        Ok(Self { client })
    }

    pub fn endpoint(&self) -> String {
        self.client.url()
    }
}

/// Highest level a status satisfies, checked from the strongest down
fn commitment_of(satisfies: impl Fn(CommitmentConfig) -> bool) -> Commitment {
    if satisfies(CommitmentConfig::finalized()) {
        Commitment::Finalized
    } else if satisfies(CommitmentConfig::confirmed()) {
        Commitment::Confirmed
    } else {
        Commitment::Processed
    }
}

#[async_trait]
impl RpcTransport for JsonRpcClient {
    async fn latest_blockhash(&self) -> Result<Hash> {
        Ok(self.client.get_latest_blockhash().await?)
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature> {
        self.client
            .send_transaction(transaction)
            .await
            .map_err(|e| ProbeError::Submission(e.to_string()))
    }

    async fn signature_status(&self, signature: &Signature) -> Result<Option<Commitment>> {
        let response = self.client.get_signature_statuses(&[*signature]).await?;

        Ok(response
            .value
            .into_iter()
            .next()
            .flatten()
            .map(|status| commitment_of(|level| status.satisfies_commitment(level))))
    }
}
