//! Transaction composition
//!
//! Turns an IDL instruction, its coerced arguments and the resolved account
//! roles into an unsigned program instruction. Purely local: the fee payer and
//! block reference are stamped later by the orchestrator.
//!
//! Instruction data layout (Anchor):
//! 1. discriminator (IDL-declared, else `sha256("global:<snake_name>")[..8]`)
//! 2. each argument, Borsh-encoded, in declaration order

use crate::executor::accounts::ResolvedAccountMap;
use crate::executor::args::CoercedValue;
use crate::executor::errors::ExecutionError;
use crate::idl::{IdlAccount, IdlInstruction, IdlSeed};
use crate::rpc::BlockReference;
use sha2::{Digest, Sha256};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    message::Message,
    pubkey::Pubkey,
    transaction::Transaction,
};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, warn};

/// A program instruction ready to be stamped with payer and block reference
#[derive(Debug, Clone, PartialEq)]
pub struct UnsignedTransaction {
    /// IDL name of the invoked instruction
    pub instruction_name: String,
    pub instruction: Instruction,
    /// Declared role of each entry in `instruction.accounts`
    pub account_roles: Vec<String>,
}

impl UnsignedTransaction {
    /// Attach fee payer and recent blockhash, producing an unsigned transaction
    pub fn stamp(&self, payer: &Pubkey, reference: &BlockReference) -> Transaction {
        let message = Message::new_with_blockhash(
            std::slice::from_ref(&self.instruction),
            Some(payer),
            &reference.blockhash,
        );
        Transaction::new_unsigned(message)
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.instruction.program_id
    }

    /// Role and meta pairs, in instruction order
    pub fn labelled_accounts(&self) -> impl Iterator<Item = (&str, &AccountMeta)> {
        self.account_roles
            .iter()
            .map(String::as_str)
            .zip(self.instruction.accounts.iter())
    }
}

/// Compose the instruction invoking `ix` on `program_id`.
///
/// `args` must be the coerced list for `ix` (same length, same order).
pub fn build_transaction(
    program_id: &Pubkey,
    ix: &IdlInstruction,
    args: &[CoercedValue],
    accounts: &ResolvedAccountMap,
) -> Result<UnsignedTransaction, ExecutionError> {
    if args.len() != ix.args.len() {
        return Err(ExecutionError::build(
            &ix.name,
            format!(
                "expected {} arguments, got {}",
                ix.args.len(),
                args.len()
            ),
        ));
    }

    let data = encode_instruction_data(ix, args)?;
    let metas = bind_accounts(program_id, ix, args, accounts)?;

    debug!(
        instruction = %ix.name,
        program = %program_id,
        data_len = data.len(),
        accounts = metas.len(),
        "Instruction composed"
    );

    Ok(UnsignedTransaction {
        instruction_name: ix.name.clone(),
        instruction: Instruction {
            program_id: *program_id,
            accounts: metas,
            data,
        },
        account_roles: ix
            .flattened_accounts()
            .iter()
            .map(|acc| acc.name.clone())
            .collect(),
    })
}

/// Discriminator followed by the Borsh encoding of every argument
pub fn encode_instruction_data(
    ix: &IdlInstruction,
    args: &[CoercedValue],
) -> Result<Vec<u8>, ExecutionError> {
    let mut data = match &ix.discriminator {
        Some(disc) if !disc.is_empty() => disc.clone(),
        _ => sighash(&ix.name).to_vec(),
    };

    for (arg, value) in ix.args.iter().zip(args) {
        value.encode(&mut data).map_err(|e| {
            ExecutionError::build(&ix.name, format!("failed to encode argument '{}': {}", arg.name, e))
        })?;
    }

    Ok(data)
}

/// Anchor global instruction selector
pub fn sighash(instruction_name: &str) -> [u8; 8] {
    let preimage = format!("global:{}", to_snake_case(instruction_name));
    let digest = Sha256::digest(preimage.as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower_or_digit = false;
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            if prev_lower_or_digit {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            prev_lower_or_digit = false;
        } else {
            out.push(c);
            prev_lower_or_digit = c.is_ascii_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

/// Bind every declared account role to an address and produce the metas.
fn bind_accounts(
    program_id: &Pubkey,
    ix: &IdlInstruction,
    args: &[CoercedValue],
    resolved: &ResolvedAccountMap,
) -> Result<Vec<AccountMeta>, ExecutionError> {
    let declared = ix.flattened_accounts();

    for role in resolved.keys() {
        if !declared.iter().any(|acc| &acc.name == role) {
            warn!(instruction = %ix.name, role = %role, "Ignoring account not declared by instruction");
        }
    }

    let mut bound: HashMap<&str, Pubkey> = HashMap::with_capacity(declared.len());

    // Caller-provided addresses and fixed IDL addresses
    for acc in &declared {
        if let Some(pubkey) = resolved.get(&acc.name) {
            bound.insert(acc.name.as_str(), *pubkey);
        } else if let Some(address) = &acc.address {
            let pubkey = Pubkey::from_str(address).map_err(|e| {
                ExecutionError::build(
                    &ix.name,
                    format!("IDL address for account '{}' is invalid: {}", acc.name, e),
                )
            })?;
            bound.insert(acc.name.as_str(), pubkey);
        }
    }

    // PDAs may depend on each other; derive until no more progress
    loop {
        let mut progressed = false;
        for acc in &declared {
            if bound.contains_key(acc.name.as_str()) {
                continue;
            }
            if let Some(pubkey) = derive_pda(program_id, ix, acc, args, &bound) {
                debug!(role = %acc.name, pda = %pubkey, "Derived PDA account");
                bound.insert(acc.name.as_str(), pubkey);
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }

    declared
        .iter()
        .map(|acc| match bound.get(acc.name.as_str()) {
            Some(pubkey) if acc.writable => Ok(AccountMeta::new(*pubkey, acc.signer)),
            Some(pubkey) => Ok(AccountMeta::new_readonly(*pubkey, acc.signer)),
            // Anchor convention: an omitted optional account is the program id
            None if acc.optional => Ok(AccountMeta::new_readonly(*program_id, false)),
            None => Err(ExecutionError::build(
                &ix.name,
                format!("missing required account '{}'", acc.name),
            )),
        })
        .collect()
}

fn derive_pda(
    program_id: &Pubkey,
    ix: &IdlInstruction,
    acc: &IdlAccount,
    args: &[CoercedValue],
    bound: &HashMap<&str, Pubkey>,
) -> Option<Pubkey> {
    let pda = acc.pda.as_ref()?;
    let mut seeds: Vec<Vec<u8>> = Vec::with_capacity(pda.seeds.len());

    for seed in &pda.seeds {
        let bytes = match seed {
            IdlSeed::Const { value } => value.as_bytes().to_vec(),
            IdlSeed::Account { path } => bound.get(path.as_str())?.to_bytes().to_vec(),
            IdlSeed::Arg { path } => {
                let index = ix.args.iter().position(|a| &a.name == path)?;
                seed_bytes(args.get(index)?)?
            }
        };
        seeds.push(bytes);
    }

    let seed_refs: Vec<&[u8]> = seeds.iter().map(Vec::as_slice).collect();
    Pubkey::try_find_program_address(&seed_refs, program_id).map(|(pubkey, _bump)| pubkey)
}

/// Seed bytes of an argument: strings and byte strings without length prefix
fn seed_bytes(value: &CoercedValue) -> Option<Vec<u8>> {
    match value {
        CoercedValue::String(s) => Some(s.as_bytes().to_vec()),
        CoercedValue::Bytes(b) => Some(b.clone()),
        other => other.to_bytes().ok(),
    }
}
