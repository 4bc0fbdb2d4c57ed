//! RPC-backed network connection

use super::{BlockReference, ConfirmationStatus, NetworkConnection, NetworkFault};
use crate::config::RpcConfig;
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_rpc_client_api::config::RpcSendTransactionConfig;
use solana_sdk::{
    commitment_config::CommitmentConfig, pubkey::Pubkey, signature::Signature,
    transaction::Transaction,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Delay between signature status polls
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// `NetworkConnection` over a single Solana JSON-RPC endpoint
#[derive(Clone)]
pub struct RpcConnection {
    client: Arc<RpcClient>,
    endpoint: String,
    commitment: CommitmentConfig,
    poll_interval: Duration,
}

impl std::fmt::Debug for RpcConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcConnection")
            .field("endpoint", &self.endpoint)
            .field("commitment", &self.commitment.commitment)
            .finish()
    }
}

impl RpcConnection {
    pub fn new(endpoint: impl Into<String>, commitment: CommitmentConfig, timeout: Duration) -> Self {
        let endpoint = endpoint.into();
        let client = RpcClient::new_with_timeout_and_commitment(endpoint.clone(), timeout, commitment);
        Self {
            client: Arc::new(client),
            endpoint,
            commitment,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn from_config(config: &RpcConfig) -> anyhow::Result<Self> {
        Ok(Self::new(
            config.url.clone(),
            config.commitment_config()?,
            config.timeout(),
        ))
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn fault(&self, err: solana_client::client_error::ClientError) -> NetworkFault {
        NetworkFault::from_client_error(err, &self.endpoint)
    }
}

/// Where a signature stands after one status poll
#[derive(Debug, PartialEq, Eq)]
enum SignatureProgress {
    /// Reached the commitment, or failed on chain
    Resolved(ConfirmationStatus),
    /// Processed below the requested commitment
    Landed,
    /// Not known to the cluster yet
    Unseen,
}

/// An execution error is final once the transaction has landed
fn signature_progress(seen: Option<ConfirmationStatus>, satisfied: bool) -> SignatureProgress {
    match seen {
        Some(status) if status.err.is_some() || satisfied => SignatureProgress::Resolved(status),
        Some(_) => SignatureProgress::Landed,
        None => SignatureProgress::Unseen,
    }
}

/// Only a transaction that has not landed can outlive its blockhash
fn is_expired(landed: bool, block_height: u64, reference: &BlockReference) -> bool {
    !landed && block_height > reference.last_valid_block_height
}

#[async_trait]
impl NetworkConnection for RpcConnection {
    async fn latest_block_reference(&self) -> Result<BlockReference, NetworkFault> {
        let (blockhash, last_valid_block_height) = self
            .client
            .get_latest_blockhash_with_commitment(self.commitment)
            .await
            .map_err(|e| self.fault(e))?;

        debug!(
            endpoint = %self.endpoint,
            blockhash = %blockhash,
            last_valid_block_height,
            "Fetched latest blockhash"
        );

        Ok(BlockReference {
            blockhash,
            last_valid_block_height,
        })
    }

    async fn account_owner(&self, address: &Pubkey) -> Result<Option<Pubkey>, NetworkFault> {
        let response = self
            .client
            .get_account_with_commitment(address, self.commitment)
            .await
            .map_err(|e| self.fault(e))?;
        Ok(response.value.map(|account| account.owner))
    }

    async fn balance(&self, address: &Pubkey) -> Result<u64, NetworkFault> {
        let response = self
            .client
            .get_balance_with_commitment(address, self.commitment)
            .await
            .map_err(|e| self.fault(e))?;
        Ok(response.value)
    }

    async fn send_transaction(
        &self,
        tx: &Transaction,
        skip_preflight: bool,
    ) -> Result<Signature, NetworkFault> {
        let config = RpcSendTransactionConfig {
            skip_preflight,
            preflight_commitment: Some(self.commitment.commitment),
            ..RpcSendTransactionConfig::default()
        };

        self.client
            .send_transaction_with_config(tx, config)
            .await
            .map_err(|e| self.fault(e))
    }

    async fn confirm_signature(
        &self,
        signature: &Signature,
        reference: &BlockReference,
    ) -> Result<ConfirmationStatus, NetworkFault> {
        let started_at = Instant::now();
        let mut attempts: u32 = 0;
        let mut landed = false;

        loop {
            attempts += 1;

            let seen = self
                .client
                .get_signature_statuses(std::slice::from_ref(signature))
                .await
                .map_err(|e| self.fault(e))?
                .value
                .into_iter()
                .next()
                .flatten();
            let satisfied = seen
                .as_ref()
                .is_some_and(|status| status.satisfies_commitment(self.commitment));
            let seen = seen.map(|status| ConfirmationStatus {
                slot: status.slot,
                err: status.err,
            });

            match signature_progress(seen, satisfied) {
                SignatureProgress::Resolved(status) => {
                    debug!(
                        signature = %signature,
                        slot = status.slot,
                        attempts,
                        latency_ms = started_at.elapsed().as_millis() as u64,
                        failed = status.err.is_some(),
                        "Signature status resolved"
                    );
                    return Ok(status);
                }
                SignatureProgress::Landed => landed = true,
                SignatureProgress::Unseen => {}
            }

            if landed {
                trace!(signature = %signature, attempts, "Signature landed, awaiting commitment");
            } else {
                let block_height = self
                    .client
                    .get_block_height_with_commitment(self.commitment)
                    .await
                    .map_err(|e| self.fault(e))?;

                if is_expired(landed, block_height, reference) {
                    return Err(NetworkFault::BlockHeightExceeded {
                        endpoint: self.endpoint.clone(),
                    });
                }
                trace!(signature = %signature, attempts, block_height, "Signature not yet confirmed");
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
