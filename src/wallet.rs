//! Wallet integration
//!
//! `WalletSender` is the signing seam used by the orchestrator: it exposes the
//! payer key and signs-and-sends a stamped transaction. `KeypairWallet` is the
//! local keypair implementation.

use crate::rpc::{NetworkConnection, NetworkFault};
use anyhow::{Context, Result};
use async_trait::async_trait;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Failure reported by a wallet while signing or sending
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WalletError {
    /// The user declined the signing request
    #[error("User rejected the request: {0}")]
    Rejected(String),

    #[error("Wallet not connected")]
    NotConnected,

    #[error("Signing failed: {0}")]
    Signing(String),

    /// The wallet signed but the network refused the submission
    #[error(transparent)]
    Network(#[from] NetworkFault),

    /// Failure known only by the adapter's error name and message
    #[error("{name}: {message}")]
    Adapter { name: String, message: String },
}

impl WalletError {
    pub fn adapter(name: impl Into<String>, message: impl Into<String>) -> Self {
        WalletError::Adapter {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Signs a stamped transaction and submits it through a connection
#[async_trait]
pub trait WalletSender: Send + Sync {
    /// Fee payer key, or `None` when no wallet is connected
    fn public_key(&self) -> Option<Pubkey>;

    async fn send_transaction(
        &self,
        tx: Transaction,
        connection: &dyn NetworkConnection,
        skip_preflight: bool,
    ) -> Result<Signature, WalletError>;
}

/// Wallet backed by a local keypair
#[derive(Clone)]
pub struct KeypairWallet {
    keypair: Arc<Keypair>,
}

impl std::fmt::Debug for KeypairWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeypairWallet")
            .field("pubkey", &self.keypair.pubkey())
            .finish()
    }
}

impl KeypairWallet {
    /// Load a keypair file: either 64 raw bytes or the Solana CLI JSON array
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = expand_home(path.as_ref());
        let keypair_bytes = std::fs::read(&path)
            .with_context(|| format!("Failed to read keypair file: {}", path.display()))?;

        let bytes = if keypair_bytes.len() == 64 {
            keypair_bytes
        } else {
            serde_json::from_slice::<Vec<u8>>(&keypair_bytes)
                .context("Failed to parse keypair JSON")?
        };

        if bytes.len() != 64 {
            anyhow::bail!("Invalid keypair length: expected 64 bytes, got {}", bytes.len());
        }
        if bytes.iter().all(|&b| b == 0) {
            anyhow::bail!("Invalid keypair: all-zero key rejected");
        }

        let keypair = Keypair::try_from(bytes.as_slice()).context("Invalid keypair bytes")?;
        Ok(Self::from_keypair(keypair))
    }

    pub fn from_keypair(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }
}

#[async_trait]
impl WalletSender for KeypairWallet {
    fn public_key(&self) -> Option<Pubkey> {
        Some(self.keypair.pubkey())
    }

    async fn send_transaction(
        &self,
        mut tx: Transaction,
        connection: &dyn NetworkConnection,
        skip_preflight: bool,
    ) -> Result<Signature, WalletError> {
        let blockhash = tx.message.recent_blockhash;
        tx.try_sign(&[self.keypair.as_ref()], blockhash)
            .map_err(|e| WalletError::Signing(e.to_string()))?;

        debug!(
            signer = %self.keypair.pubkey(),
            skip_preflight,
            "Transaction signed, submitting"
        );

        Ok(connection.send_transaction(&tx, skip_preflight).await?)
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
