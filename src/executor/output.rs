//! Execution outcomes

use crate::executor::errors::{ErrorCategory, ExecutionError};
use serde::{Deserialize, Serialize};
use solana_sdk::signature::Signature;

/// A transaction that reached the requested commitment without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmed {
    pub signature: Signature,
    pub slot: u64,
}

/// Outcome of one execution attempt
pub type ExecutionResult = Result<Confirmed, ExecutionError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Confirmed,
    Failed,
}

/// Serializable summary of an `ExecutionResult`, as printed by the CLI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub status: ReportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ErrorCategory>,
    pub message: String,
}

impl ExecutionReport {
    pub fn from_result(result: &ExecutionResult) -> Self {
        match result {
            Ok(confirmed) => Self {
                status: ReportStatus::Confirmed,
                signature: Some(confirmed.signature.to_string()),
                slot: Some(confirmed.slot),
                category: None,
                message: format!("Transaction confirmed in slot {}", confirmed.slot),
            },
            Err(err) => Self {
                status: ReportStatus::Failed,
                signature: err.signature().map(|s| s.to_string()),
                slot: None,
                category: Some(err.category()),
                message: err.to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ReportStatus::Confirmed
    }
}

impl From<&ExecutionResult> for ExecutionReport {
    fn from(result: &ExecutionResult) -> Self {
        Self::from_result(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmed_report() {
        let signature = Signature::from([3u8; 64]);
        let report = ExecutionReport::from_result(&Ok(Confirmed { signature, slot: 77 }));

        assert!(report.is_success());
        assert_eq!(report.signature, Some(signature.to_string()));
        assert_eq!(report.slot, Some(77));
        assert_eq!(report.category, None);
    }

    #[test]
    fn test_timeout_report_keeps_signature() {
        let signature = Signature::from([9u8; 64]);
        let result: ExecutionResult = Err(ExecutionError::ConfirmationTimeout {
            signature,
            timeout_secs: 60,
        });
        let report = ExecutionReport::from(&result);

        assert!(!report.is_success());
        assert_eq!(report.signature, Some(signature.to_string()));
        assert_eq!(report.category, Some(ErrorCategory::ConfirmationTimeout));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["category"], "confirmation_timeout");
        assert!(json.get("slot").is_none());
    }
}
