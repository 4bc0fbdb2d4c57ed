//! Submission orchestration
//!
//! Drives one unsigned transaction through
//! `Preparing -> AwaitingWalletApproval -> Submitted -> Confirming` and into
//! exactly one terminal phase. Confirmation runs as a spawned task raced
//! against a timer. When the timer wins, the task is detached, not aborted:
//! the transaction may still land and the caller keeps the signature.

use crate::config::DiagnosticsConfig;
use crate::executor::builder::UnsignedTransaction;
use crate::executor::classify::{classify_network_fault, classify_wallet_error};
use crate::executor::diagnostics::run_diagnostics;
use crate::executor::errors::ExecutionError;
use crate::executor::output::{Confirmed, ExecutionResult};
use crate::rpc::NetworkConnection;
use crate::structured_logging::ExecutionLogger;
use crate::wallet::{WalletError, WalletSender};
use solana_sdk::pubkey::Pubkey;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default confirmation wait
pub const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_secs(60);

/// Lifecycle of one execution attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionPhase {
    Building,
    Preparing,
    AwaitingWalletApproval,
    Submitted,
    Confirming,
    Confirmed,
    Failed,
    TimedOut,
}

impl ExecutionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Building => "building",
            Self::Preparing => "preparing",
            Self::AwaitingWalletApproval => "awaiting_wallet_approval",
            Self::Submitted => "submitted",
            Self::Confirming => "confirming",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed | Self::TimedOut)
    }
}

impl fmt::Display for ExecutionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct SubmitOptions {
    pub confirm_timeout: Duration,
    pub skip_preflight: bool,
    /// Pre-flight diagnostics; `None` disables them
    pub diagnostics: Option<DiagnosticsConfig>,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            confirm_timeout: DEFAULT_CONFIRM_TIMEOUT,
            skip_preflight: false,
            diagnostics: None,
        }
    }
}

impl SubmitOptions {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            confirm_timeout: config.execution.confirm_timeout(),
            skip_preflight: config.execution.skip_preflight,
            diagnostics: config
                .diagnostics
                .enabled
                .then(|| config.diagnostics.clone()),
        }
    }
}

/// Stamps, hands to the wallet, submits and confirms
pub struct SubmissionOrchestrator {
    connection: Arc<dyn NetworkConnection>,
    options: SubmitOptions,
}

impl SubmissionOrchestrator {
    pub fn new(connection: Arc<dyn NetworkConnection>, options: SubmitOptions) -> Self {
        Self {
            connection,
            options,
        }
    }

    pub fn options(&self) -> &SubmitOptions {
        &self.options
    }

    pub fn connection(&self) -> &Arc<dyn NetworkConnection> {
        &self.connection
    }

    /// Submit `unsigned` with `payer` as fee payer and wait for confirmation.
    ///
    /// Wallet and network failures are classified before being returned.
    pub async fn submit(
        &self,
        unsigned: &UnsignedTransaction,
        payer: Option<Pubkey>,
        wallet: &dyn WalletSender,
        logger: &ExecutionLogger,
    ) -> ExecutionResult {
        logger.log_phase(ExecutionPhase::Preparing);

        let result = self.drive(unsigned, payer, wallet, logger).await;

        let terminal = match &result {
            Ok(_) => ExecutionPhase::Confirmed,
            Err(ExecutionError::ConfirmationTimeout { .. }) => ExecutionPhase::TimedOut,
            Err(_) => ExecutionPhase::Failed,
        };
        logger.log_phase(terminal);

        result
    }

    async fn drive(
        &self,
        unsigned: &UnsignedTransaction,
        payer: Option<Pubkey>,
        wallet: &dyn WalletSender,
        logger: &ExecutionLogger,
    ) -> ExecutionResult {
        let payer = payer.ok_or_else(|| classify_wallet_error(WalletError::NotConnected))?;

        if let Some(config) = &self.options.diagnostics {
            run_diagnostics(self.connection.as_ref(), unsigned, &payer, config, logger).await;
        }

        let reference = self
            .connection
            .latest_block_reference()
            .await
            .map_err(|fault| {
                ExecutionError::network(format!("Failed to fetch latest blockhash: {}", fault))
            })?;

        let tx = unsigned.stamp(&payer, &reference);

        logger.log_phase(ExecutionPhase::AwaitingWalletApproval);
        let signature = wallet
            .send_transaction(tx, self.connection.as_ref(), self.options.skip_preflight)
            .await
            .map_err(classify_wallet_error)?;

        logger.log_phase(ExecutionPhase::Submitted);
        logger.log_submitted(&signature);

        logger.log_phase(ExecutionPhase::Confirming);
        let connection = Arc::clone(&self.connection);
        let confirmation =
            tokio::spawn(async move { connection.confirm_signature(&signature, &reference).await });

        // Dropping the handle on timeout detaches the confirmation task
        match tokio::time::timeout(self.options.confirm_timeout, confirmation).await {
            Ok(Ok(Ok(status))) => match status.err {
                None => Ok(Confirmed {
                    signature,
                    slot: status.slot,
                }),
                Some(err) => Err(ExecutionError::TransactionFailed {
                    signature,
                    payload: serde_json::to_string(&err).unwrap_or_else(|_| format!("{:?}", err)),
                }),
            },
            // The transaction is out; an unrecognised fault still keeps its signature
            Ok(Ok(Err(fault))) => Err(match classify_network_fault(fault) {
                ExecutionError::Unknown(message) => {
                    ExecutionError::network(format!("Confirmation failed: {}", message))
                }
                classified => classified,
            }
            .with_signature(signature)),
            Ok(Err(join_error)) => Err(ExecutionError::Network {
                message: format!("Confirmation task failed: {}", join_error),
                signature: Some(signature),
            }),
            Err(_elapsed) => Err(ExecutionError::ConfirmationTimeout {
                signature,
                timeout_secs: self.options.confirm_timeout.as_secs(),
            }),
        }
    }
}
