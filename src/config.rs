//! Configuration module for the IDL playground
//!
//! This module handles configuration loading from TOML files and
//! environment variables, and provides structured configuration types.

use serde::{Deserialize, Serialize};
use solana_sdk::commitment_config::{CommitmentConfig, CommitmentLevel};
use std::path::Path;
use std::time::Duration;

/// Overrides `rpc.url`
pub const ENV_RPC_URL: &str = "PLAYGROUND_RPC_URL";
/// Overrides `wallet.keypair_path`
pub const ENV_KEYPAIR: &str = "PLAYGROUND_KEYPAIR";

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rpc: RpcConfig,

    #[serde(default)]
    pub wallet: WalletConfig,

    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Optional pre-submission checks
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcConfig {
    /// RPC endpoint
    #[serde(default = "default_rpc_url")]
    pub url: String,

    /// Commitment used for reads and confirmation
    /// (`processed`, `confirmed` or `finalized`)
    #[serde(default = "default_commitment")]
    pub commitment: String,

    /// Request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Path to keypair file
    #[serde(default = "default_keypair_path")]
    pub keypair_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// How long to wait for confirmation after submission
    #[serde(default = "default_confirm_timeout")]
    pub confirm_timeout_secs: u64,

    /// Skip preflight simulation when sending
    #[serde(default)]
    pub skip_preflight: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Payer balances below this are reported
    #[serde(default = "default_min_balance")]
    pub min_balance_lamports: u64,
}

// Default value functions
fn default_rpc_url() -> String { "https://api.devnet.solana.com".to_string() }
fn default_commitment() -> String { "confirmed".to_string() }
fn default_rpc_timeout() -> u64 { 30 }
fn default_keypair_path() -> String { "~/.config/solana/id.json".to_string() }
fn default_confirm_timeout() -> u64 { 60 }
fn default_min_balance() -> u64 { 5_000 }

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            commitment: default_commitment(),
            timeout_secs: default_rpc_timeout(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            keypair_path: default_keypair_path(),
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            confirm_timeout_secs: default_confirm_timeout(),
            skip_preflight: false,
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_balance_lamports: default_min_balance(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc: RpcConfig::default(),
            wallet: WalletConfig::default(),
            execution: ExecutionConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
        }
    }
}

impl RpcConfig {
    /// Parsed commitment level
    pub fn commitment_config(&self) -> anyhow::Result<CommitmentConfig> {
        let commitment = match self.commitment.to_ascii_lowercase().as_str() {
            "processed" => CommitmentLevel::Processed,
            "confirmed" => CommitmentLevel::Confirmed,
            "finalized" => CommitmentLevel::Finalized,
            other => anyhow::bail!("Unknown commitment level: {}", other),
        };
        Ok(CommitmentConfig { commitment })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ExecutionConfig {
    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.confirm_timeout_secs)
    }
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;
        Self::from_toml(&content)
    }

    /// Load configuration (file if given, defaults otherwise) with
    /// `.env` and environment variable overrides
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from `lookup` (normally the process environment)
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_RPC_URL).filter(|v| !v.trim().is_empty()) {
            self.rpc.url = url;
        }
        if let Some(path) = lookup(ENV_KEYPAIR).filter(|v| !v.trim().is_empty()) {
            self.wallet.keypair_path = path;
        }
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rpc.url.trim().is_empty() {
            anyhow::bail!("rpc.url must not be empty");
        }
        if self.rpc.timeout_secs == 0 {
            anyhow::bail!("rpc.timeout_secs must be greater than zero");
        }
        if self.execution.confirm_timeout_secs == 0 {
            anyhow::bail!("execution.confirm_timeout_secs must be greater than zero");
        }
        self.rpc.commitment_config()?;
        Ok(())
    }
}
