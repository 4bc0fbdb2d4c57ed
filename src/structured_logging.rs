//! Structured logging for execution attempts

use crate::executor::errors::ExecutionError;
use crate::executor::submit::ExecutionPhase;
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use uuid::Uuid;

/// Structured logger scoped to one execution attempt
///
/// Every event carries the same `context_id`, so an attempt can be followed
/// through JSON logs.
#[derive(Debug, Clone)]
pub struct ExecutionLogger {
    context_id: String,
}

impl ExecutionLogger {
    pub fn new() -> Self {
        Self::with_context_id(Uuid::new_v4().to_string())
    }

    pub fn with_context_id(context_id: String) -> Self {
        Self { context_id }
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    pub fn log_attempt(&self, instruction: &str, program: &Pubkey) {
        tracing::info!(
            context_id = %self.context_id,
            instruction = %instruction,
            program = %program,
            "Executing instruction"
        );
    }

    pub fn log_phase(&self, phase: ExecutionPhase) {
        tracing::debug!(
            context_id = %self.context_id,
            phase = %phase,
            "Execution phase"
        );
    }

    pub fn log_submitted(&self, signature: &Signature) {
        tracing::info!(
            context_id = %self.context_id,
            signature = %signature,
            "Transaction submitted"
        );
    }

    pub fn log_confirmed(&self, signature: &Signature, slot: u64, latency_ms: u64) {
        tracing::info!(
            context_id = %self.context_id,
            signature = %signature,
            slot = %slot,
            latency_ms = %latency_ms,
            "Transaction confirmed"
        );
    }

    pub fn log_failure(&self, error: &ExecutionError, latency_ms: u64) {
        let signature = error.signature().map(|s| s.to_string());
        tracing::warn!(
            context_id = %self.context_id,
            category = %error.category(),
            signature = ?signature,
            error = %error,
            latency_ms = %latency_ms,
            "Execution failed"
        );
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!(
            context_id = %self.context_id,
            detail = %message,
            "Warning"
        );
    }
}

impl Default for ExecutionLogger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_context_ids_are_unique() {
        let a = ExecutionLogger::new();
        let b = ExecutionLogger::new();
        assert_ne!(a.context_id(), b.context_id());
        assert!(Uuid::parse_str(a.context_id()).is_ok());
    }

    #[test]
    fn test_logging_without_subscriber() {
        let logger = ExecutionLogger::with_context_id("test-ctx".to_string());
        assert_eq!(logger.context_id(), "test-ctx");

        logger.log_attempt("initialize", &Pubkey::new_unique());
        logger.log_phase(ExecutionPhase::Building);
        logger.log_failure(&ExecutionError::UserCancelled, 3);
        logger.warn("payer balance low");
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_warning_detail_does_not_shadow_message() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            ExecutionLogger::with_context_id("ctx-1".to_string()).warn("payer balance low");
        });

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        let line = output.lines().next().unwrap();
        assert_eq!(line.matches("\"message\"").count(), 1, "{}", line);

        let event: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(event["fields"]["message"], "Warning");
        assert_eq!(event["fields"]["detail"], "payer balance low");
        assert_eq!(event["fields"]["context_id"], "ctx-1");
    }
}
