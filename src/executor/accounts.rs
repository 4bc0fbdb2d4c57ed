//! Account role resolution
//!
//! Validates user-entered account addresses. Empty entries mean "not
//! provided" and are left for the builder to default or reject; malformed
//! entries are errors naming the role.

use crate::executor::errors::ExecutionError;
use solana_sdk::pubkey::Pubkey;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Account role -> raw address string
pub type RawAccountMap = BTreeMap<String, String>;

/// Account role -> validated address
pub type ResolvedAccountMap = BTreeMap<String, Pubkey>;

/// Validate every non-empty entry of `raw`.
pub fn resolve_accounts(raw: &RawAccountMap) -> Result<ResolvedAccountMap, ExecutionError> {
    let mut resolved = ResolvedAccountMap::new();

    for (role, value) in raw {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            continue;
        }

        let pubkey = parse_address(trimmed)
            .ok_or_else(|| ExecutionError::invalid_address(role, value.as_str()))?;
        resolved.insert(role.clone(), pubkey);
    }

    Ok(resolved)
}

/// Base58 text decoding to exactly 32 bytes.
pub fn parse_address(text: &str) -> Option<Pubkey> {
    Pubkey::from_str(text).ok()
}
