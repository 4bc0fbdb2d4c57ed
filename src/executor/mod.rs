//! Instruction execution pipeline
//!
//! Takes an IDL instruction plus user-entered argument and account text and
//! carries it to a confirmed (or classified failed) transaction:
//!
//! - **args**: raw argument text -> typed values
//! - **accounts**: role -> address validation
//! - **builder**: discriminator, Borsh data and account metas
//! - **submit**: block reference, wallet approval, submission, confirmation race
//! - **classify**: wallet/network failures -> user-facing categories
//!
//! Validation happens entirely before the first network call.

pub mod accounts;
pub mod args;
pub mod builder;
pub mod classify;
pub mod diagnostics;
pub mod errors;
pub mod output;
pub mod submit;

pub use accounts::{resolve_accounts, RawAccountMap, ResolvedAccountMap};
pub use args::{coerce_arguments, CoercedValue, RawArgumentSet};
pub use builder::{build_transaction, UnsignedTransaction};
pub use errors::{ErrorCategory, ExecutionError};
pub use output::{Confirmed, ExecutionReport, ExecutionResult};
pub use submit::{ExecutionPhase, SubmissionOrchestrator, SubmitOptions};

use crate::idl::ProgramIdl;
use crate::metrics::{Metrics, Timer};
use crate::rpc::NetworkConnection;
use crate::structured_logging::ExecutionLogger;
use crate::wallet::WalletSender;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;

/// One instruction invocation as entered by the user
#[derive(Debug, Clone)]
pub struct ExecutionRequest<'a> {
    pub idl: &'a ProgramIdl,
    pub program_id: Pubkey,
    pub instruction: &'a str,
    pub args: RawArgumentSet,
    pub accounts: RawAccountMap,
}

/// Runs execution requests against one network connection
pub struct Executor {
    orchestrator: SubmissionOrchestrator,
    metrics: Option<Arc<Metrics>>,
}

impl Executor {
    pub fn new(connection: Arc<dyn NetworkConnection>, options: SubmitOptions) -> Self {
        Self {
            orchestrator: SubmissionOrchestrator::new(connection, options),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn options(&self) -> &SubmitOptions {
        self.orchestrator.options()
    }

    /// Coerce, resolve, build, submit and confirm one instruction.
    pub async fn execute(
        &self,
        request: &ExecutionRequest<'_>,
        wallet: &dyn WalletSender,
    ) -> ExecutionResult {
        let logger = ExecutionLogger::new();
        logger.log_attempt(request.instruction, &request.program_id);

        // Dropping the attempt mid-flight still releases the in-flight slot
        let _in_flight = self.metrics.clone().map(|metrics| {
            metrics.record_started();
            scopeguard::guard(metrics, |metrics| metrics.record_finished())
        });
        let timer = Timer::new();

        let result = match self.prepare(request, &logger) {
            Ok(unsigned) => {
                self.orchestrator
                    .submit(&unsigned, wallet.public_key(), wallet, &logger)
                    .await
            }
            Err(err) => {
                logger.log_phase(ExecutionPhase::Failed);
                Err(err)
            }
        };

        match &result {
            Ok(confirmed) => {
                logger.log_confirmed(&confirmed.signature, confirmed.slot, timer.elapsed_ms());
                if let Some(metrics) = &self.metrics {
                    metrics.record_confirmed(timer.elapsed());
                }
            }
            Err(err) => {
                logger.log_failure(err, timer.elapsed_ms());
                if let Some(metrics) = &self.metrics {
                    metrics.record_failed(err.category(), timer.elapsed());
                }
            }
        }

        result
    }

    /// Local half of the pipeline: no network access.
    pub fn prepare(
        &self,
        request: &ExecutionRequest<'_>,
        logger: &ExecutionLogger,
    ) -> Result<UnsignedTransaction, ExecutionError> {
        logger.log_phase(ExecutionPhase::Building);
        let timer = Timer::new();

        let ix = request.idl.instruction(request.instruction).ok_or_else(|| {
            ExecutionError::build(request.instruction, "instruction not found in IDL")
        })?;
        let types = request.idl.type_dictionary();

        let args = coerce_arguments(ix, &request.args, Some(&types))?;
        let accounts = resolve_accounts(&request.accounts)?;
        let unsigned = build_transaction(&request.program_id, ix, &args, &accounts)?;

        if let Some(metrics) = &self.metrics {
            timer.observe_duration(&metrics.build_latency);
        }
        Ok(unsigned)
    }
}
