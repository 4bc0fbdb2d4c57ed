//! Test Utilities Module
//!
//! Deterministic stand-ins for the network connection and the wallet, so the
//! whole execution pipeline can be driven without a cluster.
//!
//! These utilities are only compiled when running tests or when the
//! `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use crate::rpc::{BlockReference, ConfirmationStatus, NetworkConnection, NetworkFault};
use crate::wallet::{WalletError, WalletSender};
use async_trait::async_trait;
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::{Transaction, TransactionError},
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// How `MockConnection::confirm_signature` resolves
#[derive(Debug, Clone)]
pub enum ConfirmBehavior {
    /// Confirm at `slot` without error
    Confirm { slot: u64 },
    /// Land at `slot` with an on-chain execution error
    FailOnChain { slot: u64, err: TransactionError },
    /// Report a network fault
    Fault(NetworkFault),
    /// Never resolve
    Never,
}

/// In-memory `NetworkConnection`
///
/// Behavior is fixed at construction; submitted transactions and call counts
/// are recorded for assertions.
pub struct MockConnection {
    block_reference: Result<BlockReference, NetworkFault>,
    owners: HashMap<Pubkey, Pubkey>,
    balances: HashMap<Pubkey, u64>,
    lookup_fault: Option<NetworkFault>,
    stalled_lookups: bool,
    send_fault: Option<NetworkFault>,
    confirm: ConfirmBehavior,

    sent: Arc<Mutex<Vec<Transaction>>>,
    calls: AtomicUsize,
    confirm_calls: AtomicUsize,
}

impl MockConnection {
    /// Connection that confirms every submission at slot 42
    pub fn new() -> Self {
        Self {
            block_reference: Ok(BlockReference {
                blockhash: Hash::new_from_array([7u8; 32]),
                last_valid_block_height: 1_000,
            }),
            owners: HashMap::new(),
            balances: HashMap::new(),
            lookup_fault: None,
            stalled_lookups: false,
            send_fault: None,
            confirm: ConfirmBehavior::Confirm { slot: 42 },
            sent: Arc::new(Mutex::new(Vec::new())),
            calls: AtomicUsize::new(0),
            confirm_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_block_reference_fault(mut self, fault: NetworkFault) -> Self {
        self.block_reference = Err(fault);
        self
    }

    /// Register an existing account
    pub fn with_account(mut self, address: Pubkey, owner: Pubkey, lamports: u64) -> Self {
        self.owners.insert(address, owner);
        self.balances.insert(address, lamports);
        self
    }

    /// Make account and balance lookups fail
    pub fn with_lookup_fault(mut self, fault: NetworkFault) -> Self {
        self.lookup_fault = Some(fault);
        self
    }

    /// Make account and balance lookups hang forever
    pub fn with_stalled_lookups(mut self) -> Self {
        self.stalled_lookups = true;
        self
    }

    pub fn with_send_fault(mut self, fault: NetworkFault) -> Self {
        self.send_fault = Some(fault);
        self
    }

    pub fn with_confirm(mut self, confirm: ConfirmBehavior) -> Self {
        self.confirm = confirm;
        self
    }

    /// Blockhash handed out by `latest_block_reference`
    pub fn blockhash(&self) -> Option<Hash> {
        self.block_reference.as_ref().ok().map(|r| r.blockhash)
    }

    /// Transactions accepted by `send_transaction`
    pub async fn sent_transactions(&self) -> Vec<Transaction> {
        self.sent.lock().await.clone()
    }

    /// Total number of trait calls
    pub fn network_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn confirm_calls(&self) -> usize {
        self.confirm_calls.load(Ordering::SeqCst)
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl Default for MockConnection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetworkConnection for MockConnection {
    async fn latest_block_reference(&self) -> Result<BlockReference, NetworkFault> {
        self.record_call();
        self.block_reference.clone()
    }

    async fn account_owner(&self, address: &Pubkey) -> Result<Option<Pubkey>, NetworkFault> {
        self.record_call();
        if self.stalled_lookups {
            return std::future::pending().await;
        }
        if let Some(fault) = &self.lookup_fault {
            return Err(fault.clone());
        }
        Ok(self.owners.get(address).copied())
    }

    async fn balance(&self, address: &Pubkey) -> Result<u64, NetworkFault> {
        self.record_call();
        if self.stalled_lookups {
            return std::future::pending().await;
        }
        if let Some(fault) = &self.lookup_fault {
            return Err(fault.clone());
        }
        Ok(self.balances.get(address).copied().unwrap_or(0))
    }

    async fn send_transaction(
        &self,
        tx: &Transaction,
        _skip_preflight: bool,
    ) -> Result<Signature, NetworkFault> {
        self.record_call();
        if let Some(fault) = &self.send_fault {
            return Err(fault.clone());
        }
        self.sent.lock().await.push(tx.clone());
        Ok(tx.signatures.first().copied().unwrap_or_default())
    }

    async fn confirm_signature(
        &self,
        _signature: &Signature,
        _reference: &BlockReference,
    ) -> Result<ConfirmationStatus, NetworkFault> {
        self.record_call();
        self.confirm_calls.fetch_add(1, Ordering::SeqCst);
        match &self.confirm {
            ConfirmBehavior::Confirm { slot } => Ok(ConfirmationStatus {
                slot: *slot,
                err: None,
            }),
            ConfirmBehavior::FailOnChain { slot, err } => Ok(ConfirmationStatus {
                slot: *slot,
                err: Some(err.clone()),
            }),
            ConfirmBehavior::Fault(fault) => Err(fault.clone()),
            ConfirmBehavior::Never => std::future::pending().await,
        }
    }
}

/// Scripted `WalletSender`
///
/// A connected mock signs with its own keypair (partial signing, so extra
/// signer roles do not fail) and submits through the given connection.
pub struct MockWallet {
    keypair: Option<Keypair>,
    failure: Option<WalletError>,
    received: Mutex<Vec<Transaction>>,
}

impl MockWallet {
    pub fn connected() -> Self {
        Self {
            keypair: Some(Keypair::new()),
            failure: None,
            received: Mutex::new(Vec::new()),
        }
    }

    /// No wallet connected: `public_key()` is `None`
    pub fn disconnected() -> Self {
        Self {
            keypair: None,
            failure: None,
            received: Mutex::new(Vec::new()),
        }
    }

    /// Connected wallet whose `send_transaction` always fails with `error`
    pub fn failing(error: WalletError) -> Self {
        Self {
            failure: Some(error),
            ..Self::connected()
        }
    }

    pub fn pubkey(&self) -> Option<Pubkey> {
        self.keypair.as_ref().map(|k| k.pubkey())
    }

    /// Transactions handed to the wallet for signing
    pub async fn received(&self) -> Vec<Transaction> {
        self.received.lock().await.clone()
    }
}

#[async_trait]
impl WalletSender for MockWallet {
    fn public_key(&self) -> Option<Pubkey> {
        self.pubkey()
    }

    async fn send_transaction(
        &self,
        mut tx: Transaction,
        connection: &dyn NetworkConnection,
        skip_preflight: bool,
    ) -> Result<Signature, WalletError> {
        self.received.lock().await.push(tx.clone());

        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        let keypair = self.keypair.as_ref().ok_or(WalletError::NotConnected)?;

        let blockhash = tx.message.recent_blockhash;
        tx.try_partial_sign(&[keypair], blockhash)
            .map_err(|e| WalletError::Signing(e.to_string()))?;

        Ok(connection.send_transaction(&tx, skip_preflight).await?)
    }
}
