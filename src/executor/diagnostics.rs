//! Pre-flight account diagnostics
//!
//! Optional checks run before submission: do the bound accounts exist, and
//! can the payer cover fees. Findings are logged as warnings and returned;
//! they never stop the submission, and lookup failures are only reported.

use crate::config::DiagnosticsConfig;
use crate::executor::builder::UnsignedTransaction;
use crate::rpc::NetworkConnection;
use crate::structured_logging::ExecutionLogger;
use solana_sdk::pubkey::Pubkey;
use std::time::Duration;
use tracing::debug;

/// Upper bound on the time spent in diagnostics
const DIAGNOSTICS_BUDGET: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticReport {
    /// Roles whose account was not found on the network
    pub missing_accounts: Vec<String>,
    pub payer_balance: Option<u64>,
    /// Payer balance is below the configured minimum
    pub low_balance: bool,
    /// Lookups that failed or did not finish in time
    pub failed_lookups: usize,
}

impl DiagnosticReport {
    pub fn is_clean(&self) -> bool {
        self.missing_accounts.is_empty() && !self.low_balance && self.failed_lookups == 0
    }
}

/// Check every bound account and the payer balance.
pub async fn run_diagnostics(
    connection: &dyn NetworkConnection,
    unsigned: &UnsignedTransaction,
    payer: &Pubkey,
    config: &DiagnosticsConfig,
    logger: &ExecutionLogger,
) -> DiagnosticReport {
    match tokio::time::timeout(
        DIAGNOSTICS_BUDGET,
        collect(connection, unsigned, payer, config, logger),
    )
    .await
    {
        Ok(report) => report,
        Err(_) => {
            logger.warn("Pre-flight diagnostics timed out; continuing with submission");
            DiagnosticReport {
                failed_lookups: 1,
                ..DiagnosticReport::default()
            }
        }
    }
}

async fn collect(
    connection: &dyn NetworkConnection,
    unsigned: &UnsignedTransaction,
    payer: &Pubkey,
    config: &DiagnosticsConfig,
    logger: &ExecutionLogger,
) -> DiagnosticReport {
    let mut report = DiagnosticReport::default();
    let program_id = *unsigned.program_id();

    for (role, meta) in unsigned.labelled_accounts() {
        // Omitted optional accounts are bound to the program itself
        if meta.pubkey == program_id {
            continue;
        }

        match connection.account_owner(&meta.pubkey).await {
            Ok(Some(owner)) => {
                debug!(role = %role, account = %meta.pubkey, owner = %owner, "Account exists");
            }
            Ok(None) => {
                logger.warn(&format!(
                    "Account \"{}\" ({}) does not exist on this network",
                    role, meta.pubkey
                ));
                report.missing_accounts.push(role.to_string());
            }
            Err(fault) => {
                logger.warn(&format!("Could not look up account \"{}\": {}", role, fault));
                report.failed_lookups += 1;
            }
        }
    }

    match connection.balance(payer).await {
        Ok(lamports) => {
            report.payer_balance = Some(lamports);
            if lamports < config.min_balance_lamports {
                report.low_balance = true;
                logger.warn(&format!(
                    "Payer {} balance is {} lamports, below the {} lamports needed for fees",
                    payer, lamports, config.min_balance_lamports
                ));
            }
        }
        Err(fault) => {
            logger.warn(&format!("Could not fetch payer balance: {}", fault));
            report.failed_lookups += 1;
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::accounts::ResolvedAccountMap;
    use crate::executor::args::CoercedValue;
    use crate::executor::builder::build_transaction;
    use crate::idl::IdlInstruction;
    use crate::rpc::NetworkFault;
    use crate::test_utils::MockConnection;
    use serde_json::json;

    fn transfer(source: Pubkey, destination: Pubkey) -> UnsignedTransaction {
        let ix: IdlInstruction = serde_json::from_value(json!({
            "name": "transfer",
            "accounts": [
                { "name": "source", "writable": true, "signer": true },
                { "name": "destination", "writable": true }
            ],
            "args": [ { "name": "amount", "type": "u64" } ]
        }))
        .unwrap();
        let accounts: ResolvedAccountMap = [
            ("source".to_string(), source),
            ("destination".to_string(), destination),
        ]
        .into_iter()
        .collect();
        build_transaction(&Pubkey::new_unique(), &ix, &[CoercedValue::U64(1)], &accounts).unwrap()
    }

    fn enabled() -> DiagnosticsConfig {
        DiagnosticsConfig {
            enabled: true,
            min_balance_lamports: 5_000,
        }
    }

    #[tokio::test]
    async fn test_missing_account_and_low_balance() {
        let payer = Pubkey::new_unique();
        let destination = Pubkey::new_unique();
        let connection = MockConnection::new().with_account(payer, Pubkey::default(), 1_000);

        let report = run_diagnostics(
            &connection,
            &transfer(payer, destination),
            &payer,
            &enabled(),
            &ExecutionLogger::new(),
        )
        .await;

        assert_eq!(report.missing_accounts, vec!["destination".to_string()]);
        assert_eq!(report.payer_balance, Some(1_000));
        assert!(report.low_balance);
        assert!(!report.is_clean());
    }

    #[tokio::test]
    async fn test_clean_report() {
        let payer = Pubkey::new_unique();
        let destination = Pubkey::new_unique();
        let connection = MockConnection::new()
            .with_account(payer, Pubkey::default(), 2_000_000)
            .with_account(destination, Pubkey::default(), 0);

        let report = run_diagnostics(
            &connection,
            &transfer(payer, destination),
            &payer,
            &enabled(),
            &ExecutionLogger::new(),
        )
        .await;

        assert!(report.is_clean(), "{:?}", report);
    }

    #[tokio::test]
    async fn test_lookup_failures_are_counted_not_raised() {
        let payer = Pubkey::new_unique();
        let connection = MockConnection::new().with_lookup_fault(NetworkFault::Transport {
            endpoint: "rpc".to_string(),
            message: "connection refused".to_string(),
        });

        let report = run_diagnostics(
            &connection,
            &transfer(payer, Pubkey::new_unique()),
            &payer,
            &enabled(),
            &ExecutionLogger::new(),
        )
        .await;

        // two accounts plus the balance lookup
        assert_eq!(report.failed_lookups, 3);
        assert!(report.missing_accounts.is_empty());
        assert_eq!(report.payer_balance, None);
    }
}
