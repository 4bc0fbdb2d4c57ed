//! Network connection
//!
//! The pipeline talks to the network only through `NetworkConnection`;
//! `RpcConnection` is the production implementation over the Solana
//! nonblocking RPC client.

use async_trait::async_trait;
use solana_sdk::{
    hash::Hash, pubkey::Pubkey, signature::Signature, transaction::Transaction,
    transaction::TransactionError,
};

pub mod client;
pub mod errors;

pub use client::RpcConnection;
pub use errors::NetworkFault;

/// Recent blockhash bounding a transaction's validity window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockReference {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

/// Outcome of waiting for a signature to reach the requested commitment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationStatus {
    pub slot: u64,
    /// On-chain execution error, if the transaction failed
    pub err: Option<TransactionError>,
}

/// Network operations the execution pipeline depends on
#[async_trait]
pub trait NetworkConnection: Send + Sync {
    /// Latest blockhash and the last block height it stays valid for
    async fn latest_block_reference(&self) -> Result<BlockReference, NetworkFault>;

    /// Owner of `address`, or `None` if the account does not exist
    async fn account_owner(&self, address: &Pubkey) -> Result<Option<Pubkey>, NetworkFault>;

    /// Balance of `address` in lamports
    async fn balance(&self, address: &Pubkey) -> Result<u64, NetworkFault>;

    /// Submit a signed transaction
    async fn send_transaction(
        &self,
        tx: &Transaction,
        skip_preflight: bool,
    ) -> Result<Signature, NetworkFault>;

    /// Wait until `signature` is confirmed or `reference` expires
    async fn confirm_signature(
        &self,
        signature: &Signature,
        reference: &BlockReference,
    ) -> Result<ConfirmationStatus, NetworkFault>;
}
