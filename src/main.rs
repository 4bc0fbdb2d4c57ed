//! IDL Playground - execute Solana program instructions from an IDL
//!
//! `inspect` lists what an IDL declares; `exec` coerces the given argument and
//! account text, builds the transaction, signs it with the configured keypair,
//! waits for confirmation and prints the execution report as JSON.

// Compiler warning configuration
#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(unused_must_use)]

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use idl_playground::config::Config;
use idl_playground::executor::{
    ExecutionReport, ExecutionRequest, Executor, RawAccountMap, RawArgumentSet, SubmitOptions,
};
use idl_playground::idl::{IdlAccount, ProgramIdl};
use idl_playground::metrics::Metrics;
use idl_playground::rpc::{NetworkConnection, RpcConnection};
use idl_playground::wallet::KeypairWallet;
use serde_json::Value;
use solana_sdk::pubkey::Pubkey;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the instructions, arguments and accounts an IDL declares
    Inspect {
        /// Path to the IDL JSON file
        #[arg(long)]
        idl: PathBuf,

        /// Only show this instruction
        #[arg(long)]
        instruction: Option<String>,
    },

    /// Build, sign, submit and confirm one instruction
    Exec(ExecArgs),
}

#[derive(ClapArgs, Debug)]
struct ExecArgs {
    /// Path to the IDL JSON file
    #[arg(long)]
    idl: PathBuf,

    /// Instruction name as declared in the IDL
    #[arg(long)]
    instruction: String,

    /// Argument as name=value (repeatable)
    #[arg(long = "arg", value_name = "NAME=VALUE")]
    args: Vec<String>,

    /// Arguments as a JSON object, merged before --arg values
    #[arg(long)]
    args_json: Option<String>,

    /// Account as role=address (repeatable)
    #[arg(long = "account", value_name = "ROLE=ADDRESS")]
    accounts: Vec<String>,

    /// Program address (defaults to the address declared by the IDL)
    #[arg(long)]
    program_id: Option<String>,

    /// Keypair file (overrides config)
    #[arg(long, env = "PLAYGROUND_KEYPAIR")]
    keypair: Option<String>,

    /// RPC endpoint (overrides config)
    #[arg(long, env = "PLAYGROUND_RPC_URL")]
    rpc_url: Option<String>,

    /// Run pre-flight account diagnostics
    #[arg(long)]
    diagnostics: bool,

    /// Print Prometheus metrics after execution
    #[arg(long)]
    print_metrics: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.json_logs)?;

    match args.command {
        Command::Inspect { idl, instruction } => inspect(&idl, instruction.as_deref()),
        Command::Exec(exec_args) => {
            let config = Config::load(args.config.as_deref())?;
            let success = exec(config, exec_args).await?;
            if !success {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

/// Initialize tracing/logging
fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let env_filter = if verbose {
        "idl_playground=debug,info"
    } else {
        "idl_playground=info,warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| env_filter.into());

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }

    Ok(())
}

fn load_idl(path: &Path) -> Result<ProgramIdl> {
    ProgramIdl::from_file(&path.to_string_lossy())
}

fn inspect(path: &Path, only: Option<&str>) -> Result<()> {
    let idl = load_idl(path)?;

    println!(
        "Program: {} ({})",
        idl.program_name().unwrap_or("unnamed"),
        idl.program_address().unwrap_or("no address")
    );

    let mut shown = 0;
    for ix in idl.instructions.iter().filter(|ix| only.map_or(true, |name| ix.name == name)) {
        shown += 1;
        println!();
        println!("{} [{}]", ix.display_name(), ix.name);

        if !ix.args.is_empty() {
            println!("  args:");
            for arg in &ix.args {
                println!("    {}: {}", arg.name, arg.ty);
            }
        }

        let accounts = ix.flattened_accounts();
        if !accounts.is_empty() {
            println!("  accounts:");
            for account in accounts {
                println!("    {}{}", account.name, account_flags(account));
            }
        }
    }

    if let Some(name) = only {
        if shown == 0 {
            anyhow::bail!("Instruction '{}' not found in IDL", name);
        }
    }

    Ok(())
}

fn account_flags(account: &IdlAccount) -> String {
    let mut flags = Vec::new();
    if account.writable {
        flags.push("writable");
    }
    if account.signer {
        flags.push("signer");
    }
    if account.optional {
        flags.push("optional");
    }
    if account.pda.is_some() {
        flags.push("pda");
    }
    if account.address.is_some() {
        flags.push("fixed");
    }

    if flags.is_empty() {
        String::new()
    } else {
        format!(" ({})", flags.join(", "))
    }
}

async fn exec(mut config: Config, args: ExecArgs) -> Result<bool> {
    if let Some(url) = args.rpc_url.clone() {
        config.rpc.url = url;
    }
    if let Some(keypair) = args.keypair.clone() {
        config.wallet.keypair_path = keypair;
    }
    if args.diagnostics {
        config.diagnostics.enabled = true;
    }
    config.validate()?;

    let idl = load_idl(&args.idl)?;
    let program_id = resolve_program_id(args.program_id.as_deref(), &idl)?;
    let raw_args = parse_raw_args(args.args_json.as_deref(), &args.args)?;
    let raw_accounts = parse_raw_accounts(&args.accounts)?;

    let wallet = KeypairWallet::from_file(&config.wallet.keypair_path)
        .with_context(|| format!("Failed to load wallet from {}", config.wallet.keypair_path))?;

    let connection: Arc<dyn NetworkConnection> = Arc::new(RpcConnection::from_config(&config.rpc)?);
    let metrics = Arc::new(Metrics::new()?);
    let executor = Executor::new(connection, SubmitOptions::from_config(&config)).with_metrics(metrics.clone());

    info!(
        rpc = %config.rpc.url,
        program = %program_id,
        instruction = %args.instruction,
        payer = %wallet.pubkey(),
        "Starting execution"
    );

    let request = ExecutionRequest {
        idl: &idl,
        program_id,
        instruction: &args.instruction,
        args: raw_args,
        accounts: raw_accounts,
    };
    let result = executor.execute(&request, &wallet).await;
    let report = ExecutionReport::from_result(&result);

    println!("{}", serde_json::to_string_pretty(&report)?);

    if args.print_metrics {
        print!("{}", metrics.gather_text()?);
    }

    Ok(report.is_success())
}

fn resolve_program_id(explicit: Option<&str>, idl: &ProgramIdl) -> Result<Pubkey> {
    let text = explicit
        .or_else(|| idl.program_address())
        .context("No program id given and the IDL declares no address")?;
    Pubkey::from_str(text).with_context(|| format!("Invalid program id: {}", text))
}

/// Merge `--args-json` with `--arg name=value` pairs (the latter win)
fn parse_raw_args(json: Option<&str>, pairs: &[String]) -> Result<RawArgumentSet> {
    let mut raw = match json {
        Some(text) => match serde_json::from_str::<Value>(text).context("Invalid --args-json")? {
            Value::Object(map) => map,
            _ => anyhow::bail!("--args-json must be a JSON object"),
        },
        None => RawArgumentSet::new(),
    };

    for pair in pairs {
        let (name, value) = split_pair(pair, "--arg")?;
        raw.insert(name.to_string(), Value::String(value.to_string()));
    }

    Ok(raw)
}

fn parse_raw_accounts(pairs: &[String]) -> Result<RawAccountMap> {
    let mut raw = RawAccountMap::new();
    for pair in pairs {
        let (role, address) = split_pair(pair, "--account")?;
        if raw.insert(role.to_string(), address.to_string()).is_some() {
            warn!(role = %role, "Account role given more than once, using the last value");
        }
    }
    Ok(raw)
}

fn split_pair<'a>(pair: &'a str, flag: &str) -> Result<(&'a str, &'a str)> {
    match pair.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value)),
        _ => anyhow::bail!("{} expects NAME=VALUE, got '{}'", flag, pair),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_raw_args_merges() {
        let raw = parse_raw_args(
            Some(r#"{"amount": 5, "memo": "hi"}"#),
            &["amount=1000".to_string(), "flags=1,2".to_string()],
        )
        .unwrap();

        assert_eq!(raw["amount"], Value::String("1000".to_string()));
        assert_eq!(raw["memo"], Value::String("hi".to_string()));
        assert_eq!(raw["flags"], Value::String("1,2".to_string()));
    }

    #[test]
    fn test_parse_raw_args_rejects_non_object() {
        assert!(parse_raw_args(Some("[1, 2]"), &[]).is_err());
        assert!(parse_raw_args(None, &["=5".to_string()]).is_err());
        assert!(parse_raw_args(None, &["amount".to_string()]).is_err());
    }

    #[test]
    fn test_parse_raw_accounts_keeps_empty_values() {
        let raw = parse_raw_accounts(&["source=".to_string(), "destination=abc=".to_string()]).unwrap();
        assert_eq!(raw["source"], "");
        assert_eq!(raw["destination"], "abc=");
    }

    #[test]
    fn test_resolve_program_id() {
        let idl = ProgramIdl::from_json(
            r#"{"address": "11111111111111111111111111111111", "instructions": []}"#,
        )
        .unwrap();
        assert_eq!(resolve_program_id(None, &idl).unwrap(), Pubkey::default());

        let explicit = Pubkey::new_unique();
        assert_eq!(
            resolve_program_id(Some(&explicit.to_string()), &idl).unwrap(),
            explicit
        );
        assert!(resolve_program_id(Some("bogus"), &idl).is_err());
    }

    #[test]
    fn test_cli_parses_exec() {
        let args = Args::parse_from([
            "idl-playground",
            "exec",
            "--idl",
            "counter.json",
            "--instruction",
            "transfer",
            "--arg",
            "amount=1000",
            "--account",
            "source=",
            "--print-metrics",
        ]);
        match args.command {
            Command::Exec(exec) => {
                assert_eq!(exec.instruction, "transfer");
                assert_eq!(exec.args, vec!["amount=1000"]);
                assert_eq!(exec.accounts, vec!["source="]);
                assert!(exec.print_metrics);
            }
            other => panic!("Expected exec, got {:?}", other),
        }
    }
}
