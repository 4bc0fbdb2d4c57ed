use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_rpc_client_api::request::{RpcError, RpcResponseErrorData};
use thiserror::Error;

/// JSON-RPC code returned when preflight simulation rejects a transaction
pub const PREFLIGHT_FAILURE_CODE: i64 = -32002;

/// Network-level failure reported by a `NetworkConnection`
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NetworkFault {
    /// Transport-level errors (network, connection)
    #[error("Transport error: {message} (endpoint: {endpoint})")]
    Transport { endpoint: String, message: String },

    /// Request timed out
    #[error("Timeout after {timeout_ms}ms (endpoint: {endpoint})")]
    Timeout { endpoint: String, timeout_ms: u64 },

    /// RPC response errors (from the RPC server)
    #[error("RPC response error: {message} (endpoint: {endpoint}, code: {code:?})")]
    RpcResponse {
        endpoint: String,
        message: String,
        code: Option<i64>,
    },

    /// Preflight simulation rejected the transaction
    #[error("Transaction simulation failed: {message} (endpoint: {endpoint})")]
    PreflightFailure {
        endpoint: String,
        message: String,
        logs: Vec<String>,
    },

    #[error("Blockhash not found (endpoint: {endpoint})")]
    BlockhashNotFound { endpoint: String },

    /// The block reference expired before the signature confirmed
    #[error("Block height exceeded, transaction expired (endpoint: {endpoint})")]
    BlockHeightExceeded { endpoint: String },

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl NetworkFault {
    /// Get the endpoint associated with this error, if any
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            NetworkFault::Transport { endpoint, .. } => Some(endpoint),
            NetworkFault::Timeout { endpoint, .. } => Some(endpoint),
            NetworkFault::RpcResponse { endpoint, .. } => Some(endpoint),
            NetworkFault::PreflightFailure { endpoint, .. } => Some(endpoint),
            NetworkFault::BlockhashNotFound { endpoint } => Some(endpoint),
            NetworkFault::BlockHeightExceeded { endpoint } => Some(endpoint),
            NetworkFault::Internal(_) => None,
        }
    }

    /// Whether the request never produced a server answer
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            NetworkFault::Transport { .. } | NetworkFault::Timeout { .. }
        )
    }

    /// Create from ClientError with context
    ///
    /// The structured error kind is inspected first; message text is only a
    /// fallback for kinds that carry no code.
    pub fn from_client_error(err: ClientError, endpoint: &str) -> Self {
        let endpoint = endpoint.to_string();

        match err.kind() {
            ClientErrorKind::RpcError(RpcError::RpcResponseError {
                code,
                message,
                data,
            }) => {
                if *code == PREFLIGHT_FAILURE_CODE {
                    let logs = match data {
                        RpcResponseErrorData::SendTransactionPreflightFailure(result) => {
                            result.logs.clone().unwrap_or_default()
                        }
                        _ => Vec::new(),
                    };
                    return NetworkFault::PreflightFailure {
                        endpoint,
                        message: message.clone(),
                        logs,
                    };
                }
                return NetworkFault::RpcResponse {
                    endpoint,
                    message: message.clone(),
                    code: Some(*code),
                };
            }
            ClientErrorKind::Reqwest(e) if e.is_timeout() => {
                return NetworkFault::Timeout {
                    endpoint,
                    timeout_ms: 0,
                };
            }
            ClientErrorKind::Io(_) | ClientErrorKind::Reqwest(_) => {
                return NetworkFault::Transport {
                    endpoint,
                    message: err.to_string(),
                };
            }
            _ => {}
        }

        let err_str = err.to_string().to_lowercase();

        // Classify based on error message
        if err_str.contains("blockhash not found") {
            NetworkFault::BlockhashNotFound { endpoint }
        } else if err_str.contains("block height exceeded") || err_str.contains("transaction expired") {
            NetworkFault::BlockHeightExceeded { endpoint }
        } else if err_str.contains("timeout") || err_str.contains("timed out") {
            NetworkFault::Timeout {
                endpoint,
                timeout_ms: 0,
            }
        } else {
            // Extract error code if available
            let code = err_str
                .split("code:")
                .nth(1)
                .and_then(|s| s.split_whitespace().next())
                .and_then(|s| s.trim_end_matches(|c: char| !c.is_ascii_digit()).parse::<i64>().ok());

            NetworkFault::RpcResponse {
                endpoint,
                message: err.to_string(),
                code,
            }
        }
    }
}
