//! Error classification
//!
//! Maps raw wallet and network failures onto `ExecutionError` categories.
//! Typed variants are matched first. Message text is inspected only for
//! failures that arrive untyped (`WalletError::Adapter`, generic RPC
//! responses), where the wallet integration's marker strings are the only
//! signal available.

use crate::executor::errors::ExecutionError;
use crate::rpc::NetworkFault;
use crate::rpc::errors::PREFLIGHT_FAILURE_CODE;
use crate::wallet::WalletError;

/// Substrings emitted by wallet integrations when the user declines
const CANCELLATION_MARKERS: &[&str] = &["User rejected", "Transaction cancelled", "Plugin Closed"];

/// Adapter error name some wallets raise for a declined send
const CANCELLATION_ERROR_NAME: &str = "WalletSendTransactionError";

const NOT_CONNECTED_MARKERS: &[&str] = &["WalletNotConnectedError", "Wallet not connected"];

/// Classify a failure reported by the wallet during signing or sending
pub fn classify_wallet_error(err: WalletError) -> ExecutionError {
    match err {
        WalletError::Rejected(_) => ExecutionError::UserCancelled,
        WalletError::NotConnected => {
            ExecutionError::WalletNotConnected("no signer available".to_string())
        }
        WalletError::Network(fault) => classify_network_fault(fault),
        WalletError::Signing(message) => classify_message(None, &format!("Signing failed: {}", message)),
        WalletError::Adapter { name, message } => classify_message(Some(&name), &message),
    }
}

/// Classify a network fault raised by the connection
pub fn classify_network_fault(fault: NetworkFault) -> ExecutionError {
    match &fault {
        NetworkFault::PreflightFailure { message, logs, .. } => {
            let mut original = message.clone();
            if !logs.is_empty() {
                original.push_str("\nProgram logs:\n");
                original.push_str(&logs.join("\n"));
            }
            ExecutionError::SimulationFailed { original }
        }
        NetworkFault::RpcResponse {
            code: Some(code), ..
        } if *code == PREFLIGHT_FAILURE_CODE => ExecutionError::SimulationFailed {
            original: fault.to_string(),
        },
        NetworkFault::Transport { .. }
        | NetworkFault::Timeout { .. }
        | NetworkFault::BlockhashNotFound { .. }
        | NetworkFault::BlockHeightExceeded { .. } => ExecutionError::network(fault.to_string()),
        NetworkFault::RpcResponse { .. } | NetworkFault::Internal(_) => {
            classify_message(None, &fault.to_string())
        }
    }
}

/// Classify an untyped failure by its error name and message text
pub fn classify_message(name: Option<&str>, message: &str) -> ExecutionError {
    if name == Some(CANCELLATION_ERROR_NAME)
        || CANCELLATION_MARKERS.iter().any(|m| message.contains(m))
    {
        return ExecutionError::UserCancelled;
    }

    if message.contains("-32002") || message.to_lowercase().contains("simulation failed") {
        return ExecutionError::SimulationFailed {
            original: message.to_string(),
        };
    }

    if NOT_CONNECTED_MARKERS.iter().any(|m| message.contains(m))
        || name == Some("WalletNotConnectedError")
    {
        return ExecutionError::WalletNotConnected(message.to_string());
    }

    ExecutionError::Unknown(message.to_string())
}
