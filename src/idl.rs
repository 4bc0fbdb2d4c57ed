//! Program interface description (Anchor-style IDL)
//!
//! Serde model of the JSON interface description a program publishes. Both the
//! legacy layout (`isMut`/`isSigner`, `publicKey`, `"defined": "Name"`) and the
//! Anchor 0.30 layout (`writable`/`signer`, `pubkey`, `"defined": {"name": ..}`)
//! deserialize into the same types.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Top-level program IDL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramIdl {
    /// Program address (Anchor >= 0.30)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// Program name (legacy layout)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<IdlMetadata>,

    pub instructions: Vec<IdlInstruction>,

    /// Program-wide user-defined types
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<IdlTypeDef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdlMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Program address (legacy layout)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// An instruction exposed by the program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlInstruction {
    pub name: String,

    /// Explicit 8-byte discriminator (Anchor >= 0.30)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<Vec<u8>>,

    #[serde(default)]
    pub accounts: Vec<IdlAccountItem>,

    #[serde(default)]
    pub args: Vec<IdlArg>,
}

/// Account slot: either a single account or a named group of accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdlAccountItem {
    Composite(IdlAccountGroup),
    Single(IdlAccount),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlAccountGroup {
    pub name: String,
    pub accounts: Vec<IdlAccountItem>,
}

/// A single account role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlAccount {
    pub name: String,
    #[serde(default, alias = "isMut")]
    pub writable: bool,
    #[serde(default, alias = "isSigner")]
    pub signer: bool,
    #[serde(default, alias = "isOptional")]
    pub optional: bool,
    /// Fixed address, e.g. the system program
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pda: Option<IdlPda>,
}

/// Seeds for a program-derived account address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlPda {
    pub seeds: Vec<IdlSeed>,
}

/// A seed component for PDA derivation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum IdlSeed {
    Const { value: IdlSeedValue },
    Account { path: String },
    Arg { path: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdlSeedValue {
    Bytes(Vec<u8>),
    Text(String),
}

impl IdlSeedValue {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            IdlSeedValue::Bytes(bytes) => bytes,
            IdlSeedValue::Text(text) => text.as_bytes(),
        }
    }
}

/// An instruction argument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlArg {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: IdlType,
}

/// Type representation in the IDL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdlType {
    Primitive(IdlPrimitive),
    Option { option: Box<IdlType> },
    Vec { vec: Box<IdlType> },
    Array { array: (Box<IdlType>, usize) },
    Defined { defined: IdlDefinedRef },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdlPrimitive {
    Bool,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    U128,
    I128,
    F32,
    F64,
    String,
    Bytes,
    #[serde(rename = "pubkey", alias = "publicKey")]
    Pubkey,
}

impl IdlPrimitive {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdlPrimitive::Bool => "bool",
            IdlPrimitive::U8 => "u8",
            IdlPrimitive::I8 => "i8",
            IdlPrimitive::U16 => "u16",
            IdlPrimitive::I16 => "i16",
            IdlPrimitive::U32 => "u32",
            IdlPrimitive::I32 => "i32",
            IdlPrimitive::U64 => "u64",
            IdlPrimitive::I64 => "i64",
            IdlPrimitive::U128 => "u128",
            IdlPrimitive::I128 => "i128",
            IdlPrimitive::F32 => "f32",
            IdlPrimitive::F64 => "f64",
            IdlPrimitive::String => "string",
            IdlPrimitive::Bytes => "bytes",
            IdlPrimitive::Pubkey => "pubkey",
        }
    }
}

/// Reference to a user-defined type, in either IDL spelling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdlDefinedRef {
    Name(String),
    Named { name: String },
}

impl IdlDefinedRef {
    pub fn name(&self) -> &str {
        match self {
            IdlDefinedRef::Name(name) => name,
            IdlDefinedRef::Named { name } => name,
        }
    }
}

impl fmt::Display for IdlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdlType::Primitive(p) => write!(f, "{}", p.as_str()),
            IdlType::Option { option } => write!(f, "Option<{}>", option),
            IdlType::Vec { vec } => write!(f, "Vec<{}>", vec),
            IdlType::Array { array } => write!(f, "[{}; {}]", array.0, array.1),
            IdlType::Defined { defined } => write!(f, "{}", defined.name()),
        }
    }
}

/// User-defined type definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlTypeDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: IdlTypeDefTy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum IdlTypeDefTy {
    Struct {
        #[serde(default)]
        fields: IdlFields,
    },
    Enum {
        variants: Vec<IdlEnumVariant>,
    },
    #[serde(rename = "type")]
    Alias { alias: IdlType },
}

/// Struct or variant fields: named (`{name, type}`) or positional (types only).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdlFields {
    Named(Vec<IdlField>),
    Tuple(Vec<IdlType>),
}

impl Default for IdlFields {
    fn default() -> Self {
        IdlFields::Named(Vec::new())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: IdlType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlEnumVariant {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<IdlFields>,
}

/// Lookup table of user-defined types, keyed by type name.
#[derive(Debug, Clone, Default)]
pub struct TypeDictionary {
    types: HashMap<String, IdlTypeDefTy>,
}

impl TypeDictionary {
    pub fn from_defs(defs: &[IdlTypeDef]) -> Self {
        Self {
            types: defs
                .iter()
                .map(|def| (def.name.clone(), def.ty.clone()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&IdlTypeDefTy> {
        self.types.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl ProgramIdl {
    /// Parse an IDL from JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load an IDL from a JSON file.
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read IDL file: {}", path))?;
        Self::from_json(&content).with_context(|| format!("Failed to parse IDL file: {}", path))
    }

    /// Program address declared by the IDL, if any.
    pub fn program_address(&self) -> Option<&str> {
        self.address
            .as_deref()
            .or_else(|| self.metadata.as_ref().and_then(|m| m.address.as_deref()))
    }

    /// Program name, from whichever layout carries it.
    pub fn program_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .or_else(|| self.metadata.as_ref().and_then(|m| m.name.as_deref()))
    }

    pub fn instruction(&self, name: &str) -> Option<&IdlInstruction> {
        self.instructions.iter().find(|ix| ix.name == name)
    }

    pub fn type_dictionary(&self) -> TypeDictionary {
        TypeDictionary::from_defs(&self.types)
    }
}

impl IdlInstruction {
    /// Human-readable instruction name, e.g. `"Transfer funds"`.
    pub fn display_name(&self) -> String {
        format_instruction_name(&self.name)
    }

    /// All single accounts in declaration order, composite groups flattened.
    pub fn flattened_accounts(&self) -> Vec<&IdlAccount> {
        fn walk<'a>(items: &'a [IdlAccountItem], out: &mut Vec<&'a IdlAccount>) {
            for item in items {
                match item {
                    IdlAccountItem::Single(account) => out.push(account),
                    IdlAccountItem::Composite(group) => walk(&group.accounts, out),
                }
            }
        }

        let mut out = Vec::new();
        walk(&self.accounts, &mut out);
        out
    }
}

/// Upper-case the first character and replace underscores with spaces.
pub fn format_instruction_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>().replace('_', " "),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGACY_IDL: &str = r#"{
        "version": "0.1.0",
        "name": "vault",
        "metadata": { "address": "11111111111111111111111111111111" },
        "instructions": [{
            "name": "deposit",
            "accounts": [
                { "name": "owner", "isMut": true, "isSigner": true },
                { "name": "vault", "isMut": true, "isSigner": false },
                { "name": "systemProgram", "isMut": false, "isSigner": false }
            ],
            "args": [
                { "name": "amount", "type": "u64" },
                { "name": "beneficiary", "type": "publicKey" },
                { "name": "memo", "type": { "option": "string" } },
                { "name": "config", "type": { "defined": "Config" } }
            ]
        }],
        "types": [{
            "name": "Config",
            "type": { "kind": "struct", "fields": [ { "name": "fee", "type": "u16" } ] }
        }]
    }"#;

    const MODERN_IDL: &str = r#"{
        "address": "Fg6PaFpoGXkYsidMpWTK6W2BeZ7FEfcYkg476zPFsLnS",
        "metadata": { "name": "counter", "version": "0.1.0" },
        "instructions": [{
            "name": "set_values",
            "discriminator": [1, 2, 3, 4, 5, 6, 7, 8],
            "accounts": [
                { "name": "authority", "writable": true, "signer": true },
                { "name": "state_group", "accounts": [
                    { "name": "counter", "writable": true,
                      "pda": { "seeds": [ { "kind": "const", "value": [99, 111, 117, 110, 116] },
                                          { "kind": "account", "path": "authority" } ] } }
                ] },
                { "name": "system_program", "address": "11111111111111111111111111111111" }
            ],
            "args": [
                { "name": "values", "type": { "vec": "u32" } },
                { "name": "seed", "type": { "array": ["u8", 32] } },
                { "name": "mode", "type": { "defined": { "name": "Mode" } } }
            ]
        }],
        "types": [{
            "name": "Mode",
            "type": { "kind": "enum", "variants": [ { "name": "Off" }, { "name": "Fixed", "fields": ["u64"] } ] }
        }]
    }"#;

    #[test]
    fn test_parse_legacy_layout() {
        let idl = ProgramIdl::from_json(LEGACY_IDL).unwrap();
        assert_eq!(idl.program_address(), Some("11111111111111111111111111111111"));
        assert_eq!(idl.program_name(), Some("vault"));

        let ix = idl.instruction("deposit").unwrap();
        let accounts = ix.flattened_accounts();
        assert_eq!(accounts.len(), 3);
        assert!(accounts[0].writable && accounts[0].signer);
        assert!(!accounts[2].writable);

        assert_eq!(ix.args[0].ty, IdlType::Primitive(IdlPrimitive::U64));
        assert_eq!(ix.args[1].ty, IdlType::Primitive(IdlPrimitive::Pubkey));
        assert_eq!(ix.args[2].ty.to_string(), "Option<string>");
        assert_eq!(ix.args[3].ty.to_string(), "Config");
        assert!(idl.type_dictionary().get("Config").is_some());
    }

    #[test]
    fn test_parse_modern_layout() {
        let idl = ProgramIdl::from_json(MODERN_IDL).unwrap();
        assert_eq!(
            idl.program_address(),
            Some("Fg6PaFpoGXkYsidMpWTK6W2BeZ7FEfcYkg476zPFsLnS")
        );
        assert_eq!(idl.program_name(), Some("counter"));

        let ix = idl.instruction("set_values").unwrap();
        assert_eq!(ix.discriminator.as_deref(), Some(&[1u8, 2, 3, 4, 5, 6, 7, 8][..]));

        let names: Vec<&str> = ix.flattened_accounts().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["authority", "counter", "system_program"]);

        let counter = ix.flattened_accounts()[1];
        let seeds = &counter.pda.as_ref().unwrap().seeds;
        assert!(matches!(&seeds[0], IdlSeed::Const { value } if value.as_bytes() == b"count"));
        assert!(matches!(&seeds[1], IdlSeed::Account { path } if path == "authority"));

        assert_eq!(ix.args[1].ty.to_string(), "[u8; 32]");
        match idl.type_dictionary().get("Mode") {
            Some(IdlTypeDefTy::Enum { variants }) => {
                assert_eq!(variants.len(), 2);
                assert!(matches!(variants[1].fields, Some(IdlFields::Tuple(_))));
            }
            other => panic!("Expected enum definition, got {:?}", other),
        }
    }

    #[test]
    fn test_format_instruction_name() {
        assert_eq!(format_instruction_name("transfer_funds"), "Transfer funds");
        assert_eq!(format_instruction_name("initialize"), "Initialize");
        assert_eq!(format_instruction_name(""), "");
    }

    #[test]
    fn test_unknown_instruction() {
        let idl = ProgramIdl::from_json(LEGACY_IDL).unwrap();
        assert!(idl.instruction("withdraw").is_none());
    }
}
