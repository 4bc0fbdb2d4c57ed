//! IDL Playground - Solana program instruction execution library
//!
//! Loads a program IDL, turns user-entered argument and account text into a
//! transaction, and drives it through wallet approval, submission and
//! confirmation, reporting every failure under one classified error type.

pub mod config;
pub mod executor;
pub mod idl;
pub mod metrics;
pub mod rpc;
pub mod structured_logging;
pub mod wallet;

pub mod test_utils;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use executor::{
    ErrorCategory, ExecutionError, ExecutionReport, ExecutionRequest, ExecutionResult, Executor,
    SubmitOptions,
};
pub use idl::ProgramIdl;
pub use solana_sdk::{pubkey::Pubkey, signature::Signature};
