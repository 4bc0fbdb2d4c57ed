//! Error types for the execution pipeline
//!
//! Every failure an execution attempt can surface is one `ExecutionError`.
//! Validation errors (arguments, addresses, build) are raised locally before
//! any I/O; wallet and network failures are classified once at the
//! orchestrator boundary (see `classify`) and arrive here already relabelled.

use serde::{Deserialize, Serialize};
use solana_sdk::signature::Signature;
use std::fmt;
use thiserror::Error;

/// User-facing error category, one per `ExecutionError` variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    MissingArgument,
    InvalidArgument,
    InvalidAddress,
    BuildError,
    NetworkError,
    UserCancelled,
    WalletNotConnected,
    SimulationFailed,
    ConfirmationTimeout,
    TransactionFailed,
    Unknown,
}

impl ErrorCategory {
    /// Stable label used for metrics and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingArgument => "missing_argument",
            Self::InvalidArgument => "invalid_argument",
            Self::InvalidAddress => "invalid_address",
            Self::BuildError => "build_error",
            Self::NetworkError => "network_error",
            Self::UserCancelled => "user_cancelled",
            Self::WalletNotConnected => "wallet_not_connected",
            Self::SimulationFailed => "simulation_failed",
            Self::ConfirmationTimeout => "confirmation_timeout",
            Self::TransactionFailed => "transaction_failed",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal failure of one execution attempt
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    /// A declared instruction parameter has no raw value
    #[error("Missing argument: {name}")]
    MissingArgument { name: String },

    /// A raw value could not be coerced to its declared kind
    ///
    /// `name` is the dotted path of the offending value (`config.fee`, `ids[2]`)
    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },

    /// An account role was bound to a malformed address
    #[error("Invalid public key for account \"{role}\": {value}")]
    InvalidAddress { role: String, value: String },

    /// The instruction could not be composed from the given inputs
    #[error("Instruction build error (instruction={instruction}): {reason}")]
    Build { instruction: String, reason: String },

    /// Block reference fetch, submission transport or confirmation wait failed
    #[error("Network error: {message}")]
    Network {
        message: String,
        signature: Option<Signature>,
    },

    /// The user rejected the approval request in the wallet
    #[error("Transaction cancelled by user")]
    UserCancelled,

    /// No signer / payer address available
    #[error("Wallet not connected: {0}")]
    WalletNotConnected(String),

    /// Preflight simulation rejected the transaction
    #[error("{}", simulation_failure_message(.original))]
    SimulationFailed { original: String },

    /// Confirmation did not arrive in time; the transaction may still land
    #[error("Transaction confirmation timed out after {timeout_secs}s; it may still confirm later (signature: {signature})")]
    ConfirmationTimeout {
        signature: Signature,
        timeout_secs: u64,
    },

    /// The transaction landed and failed on-chain
    #[error("Transaction failed: {payload}")]
    TransactionFailed { signature: Signature, payload: String },

    /// Anything no classifier rule matched
    #[error("Transaction execution failed: {0}")]
    Unknown(String),
}

/// Enrich a simulation failure with the usual suspects, original text appended.
pub fn simulation_failure_message(original: &str) -> String {
    format!(
        "Transaction simulation failed. Common causes:\n\n\
         1. Account does not exist on this network\n\
         2. Insufficient SOL balance for transaction fees\n\
         3. Invalid account permissions or ownership\n\
         4. Network mismatch (check your RPC endpoint)\n\
         5. Program state not initialized\n\n\
         Enable pre-flight diagnostics for account verification details.\n\n\
         Original error: {}",
        original
    )
}

impl ExecutionError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingArgument { .. } => ErrorCategory::MissingArgument,
            Self::InvalidArgument { .. } => ErrorCategory::InvalidArgument,
            Self::InvalidAddress { .. } => ErrorCategory::InvalidAddress,
            Self::Build { .. } => ErrorCategory::BuildError,
            Self::Network { .. } => ErrorCategory::NetworkError,
            Self::UserCancelled => ErrorCategory::UserCancelled,
            Self::WalletNotConnected(_) => ErrorCategory::WalletNotConnected,
            Self::SimulationFailed { .. } => ErrorCategory::SimulationFailed,
            Self::ConfirmationTimeout { .. } => ErrorCategory::ConfirmationTimeout,
            Self::TransactionFailed { .. } => ErrorCategory::TransactionFailed,
            Self::Unknown(_) => ErrorCategory::Unknown,
        }
    }

    /// Signature obtained at submission, if the attempt got that far
    pub fn signature(&self) -> Option<&Signature> {
        match self {
            Self::ConfirmationTimeout { signature, .. } => Some(signature),
            Self::TransactionFailed { signature, .. } => Some(signature),
            Self::Network { signature, .. } => signature.as_ref(),
            _ => None,
        }
    }

    /// Whether the failure was raised before any network I/O
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::MissingArgument { .. }
                | Self::InvalidArgument { .. }
                | Self::InvalidAddress { .. }
                | Self::Build { .. }
        )
    }
}

// Convenience constructors for common error scenarios
impl ExecutionError {
    pub fn missing_argument(name: impl Into<String>) -> Self {
        Self::MissingArgument { name: name.into() }
    }

    pub fn invalid_argument(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_address(role: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidAddress {
            role: role.into(),
            value: value.into(),
        }
    }

    pub fn build(instruction: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Build {
            instruction: instruction.into(),
            reason: reason.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            signature: None,
        }
    }

    /// Attach the submission signature to errors raised after `Submitted`
    pub fn with_signature(self, sig: Signature) -> Self {
        match self {
            Self::Network { message, .. } => Self::Network {
                message,
                signature: Some(sig),
            },
            other => other,
        }
    }
}
