//! Argument coercion
//!
//! Converts loosely-typed form values (`serde_json::Value`) into the typed,
//! positional argument list an instruction expects. Dispatch is over
//! `ParamKind`, the finite set of declared parameter kinds; each kind has
//! exactly one coercion rule. Coercion is pure: the same inputs always produce
//! the same output or the same error.

use crate::executor::errors::ExecutionError;
use crate::idl::{IdlFields, IdlInstruction, IdlPrimitive, IdlType, IdlTypeDefTy, TypeDictionary};
use borsh::BorshSerialize;
use serde_json::{Map, Value};
use solana_sdk::pubkey::Pubkey;
use std::borrow::Cow;
use std::fmt;
use std::io;
use std::str::FromStr;

/// Parameter name -> user-entered value
pub type RawArgumentSet = Map<String, Value>;

/// A strongly-typed instruction argument.
#[derive(Debug, Clone, PartialEq)]
pub enum CoercedValue {
    Bool(bool),
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    U128(u128),
    I128(i128),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Vec<u8>),
    Pubkey(Pubkey),
    Option(Option<Box<CoercedValue>>),
    Vec(Vec<CoercedValue>),
    /// Fixed-length array, encoded without a length prefix
    Array(Vec<CoercedValue>),
    /// Struct fields in declaration order (tuple fields are named "0", "1", ...)
    Struct(Vec<(String, CoercedValue)>),
    Enum {
        variant: String,
        index: u8,
        fields: Vec<(String, CoercedValue)>,
    },
}

/// Declared parameter kind.
#[derive(Debug, Clone, Copy)]
enum ParamKind<'a> {
    Numeric(IdlPrimitive),
    Bool,
    Address,
    String,
    Bytes,
    Optional(&'a IdlType),
    Collection { elem: &'a IdlType, len: Option<usize> },
    Composite(&'a str),
}

impl<'a> ParamKind<'a> {
    fn of(ty: &'a IdlType) -> Self {
        match ty {
            IdlType::Primitive(p) => match p {
                IdlPrimitive::Bool => ParamKind::Bool,
                IdlPrimitive::Pubkey => ParamKind::Address,
                IdlPrimitive::String => ParamKind::String,
                IdlPrimitive::Bytes => ParamKind::Bytes,
                numeric => ParamKind::Numeric(*numeric),
            },
            IdlType::Option { option } => ParamKind::Optional(option),
            IdlType::Vec { vec } => ParamKind::Collection {
                elem: vec,
                len: None,
            },
            IdlType::Array { array } => ParamKind::Collection {
                elem: &array.0,
                len: Some(array.1),
            },
            IdlType::Defined { defined } => ParamKind::Composite(defined.name()),
        }
    }
}

/// Coerce every declared parameter of `ix`, in declaration order.
///
/// A parameter without a raw value fails `MissingArgument`, except `option`
/// parameters, which coerce to `None`.
pub fn coerce_arguments(
    ix: &IdlInstruction,
    raw: &RawArgumentSet,
    types: Option<&TypeDictionary>,
) -> Result<Vec<CoercedValue>, ExecutionError> {
    let mut coerced = Vec::with_capacity(ix.args.len());

    for arg in &ix.args {
        let value = match raw.get(&arg.name) {
            Some(value) => coerce_value(value, &arg.ty, types, &arg.name)?,
            None if matches!(arg.ty, IdlType::Option { .. }) => CoercedValue::Option(None),
            None => return Err(ExecutionError::missing_argument(&arg.name)),
        };
        coerced.push(value);
    }

    Ok(coerced)
}

/// Nesting limit for declared types. Option and alias chains consume no input,
/// so a self-referencing IDL would otherwise recurse without bound.
const MAX_TYPE_DEPTH: usize = 64;

/// Coerce one raw value against a declared type. `path` names the value in errors.
pub fn coerce_value(
    raw: &Value,
    ty: &IdlType,
    types: Option<&TypeDictionary>,
    path: &str,
) -> Result<CoercedValue, ExecutionError> {
    coerce_nested(raw, ty, types, path, 0)
}

fn coerce_nested(
    raw: &Value,
    ty: &IdlType,
    types: Option<&TypeDictionary>,
    path: &str,
    depth: usize,
) -> Result<CoercedValue, ExecutionError> {
    if depth > MAX_TYPE_DEPTH {
        return Err(ExecutionError::invalid_argument(
            path,
            format!("type nesting exceeds {} levels", MAX_TYPE_DEPTH),
        ));
    }

    match ParamKind::of(ty) {
        ParamKind::Numeric(prim) => coerce_numeric(raw, prim, path),
        ParamKind::Bool => coerce_bool(raw, path),
        ParamKind::Address => coerce_address(raw, path),
        ParamKind::String => coerce_string(raw, path),
        ParamKind::Bytes => coerce_bytes(raw, path),
        ParamKind::Optional(inner) => {
            if is_none_like(raw, inner) {
                Ok(CoercedValue::Option(None))
            } else {
                let value = coerce_nested(raw, inner, types, path, depth + 1)?;
                Ok(CoercedValue::Option(Some(Box::new(value))))
            }
        }
        ParamKind::Collection { elem, len } => coerce_collection(raw, elem, len, types, path, depth + 1),
        ParamKind::Composite(name) => coerce_defined(raw, name, types, path, depth + 1),
    }
}

/// `null`, `"null"` and `"none"` are `None`; `""` is too, unless the inner
/// kind is a string, where it is `Some("")`.
fn is_none_like(raw: &Value, inner: &IdlType) -> bool {
    match raw {
        Value::Null => true,
        Value::String(s) => {
            let s = s.trim();
            (s.is_empty() && !matches!(ParamKind::of(inner), ParamKind::String))
                || s.eq_ignore_ascii_case("null")
                || s.eq_ignore_ascii_case("none")
        }
        _ => false,
    }
}

/// Largest integer an f64 holds exactly
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

fn numeric_text(raw: &Value) -> Option<String> {
    match raw {
        // `1000.0` and `1e3` arrive as floats; whole ones read as integers
        Value::Number(n) if n.is_f64() => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() <= MAX_EXACT_FLOAT => Some(format!("{:.0}", f)),
            _ => Some(n.to_string()),
        },
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.trim().to_string()),
        _ => None,
    }
}

macro_rules! parse_number {
    ($text:expr, $ty:ty, $variant:ident, $path:expr) => {
        $text.parse::<$ty>().map(CoercedValue::$variant).map_err(|e| {
            ExecutionError::invalid_argument(
                $path,
                format!("expected {} but got '{}': {}", stringify!($ty), $text, e),
            )
        })
    };
}

fn coerce_numeric(raw: &Value, prim: IdlPrimitive, path: &str) -> Result<CoercedValue, ExecutionError> {
    let text = numeric_text(raw).ok_or_else(|| {
        ExecutionError::invalid_argument(
            path,
            format!("expected {} but got {}", prim.as_str(), type_name(raw)),
        )
    })?;

    match prim {
        IdlPrimitive::U8 => parse_number!(text, u8, U8, path),
        IdlPrimitive::I8 => parse_number!(text, i8, I8, path),
        IdlPrimitive::U16 => parse_number!(text, u16, U16, path),
        IdlPrimitive::I16 => parse_number!(text, i16, I16, path),
        IdlPrimitive::U32 => parse_number!(text, u32, U32, path),
        IdlPrimitive::I32 => parse_number!(text, i32, I32, path),
        IdlPrimitive::U64 => parse_number!(text, u64, U64, path),
        IdlPrimitive::I64 => parse_number!(text, i64, I64, path),
        IdlPrimitive::U128 => parse_number!(text, u128, U128, path),
        IdlPrimitive::I128 => parse_number!(text, i128, I128, path),
        IdlPrimitive::F32 => {
            let value = parse_number!(text, f32, F32, path)?;
            ensure_finite(value, &text, path)
        }
        IdlPrimitive::F64 => {
            let value = parse_number!(text, f64, F64, path)?;
            ensure_finite(value, &text, path)
        }
        other => Err(ExecutionError::invalid_argument(
            path,
            format!("{} is not a numeric kind", other.as_str()),
        )),
    }
}

fn ensure_finite(value: CoercedValue, text: &str, path: &str) -> Result<CoercedValue, ExecutionError> {
    let finite = match value {
        CoercedValue::F32(v) => v.is_finite(),
        CoercedValue::F64(v) => v.is_finite(),
        _ => true,
    };
    if finite {
        Ok(value)
    } else {
        Err(ExecutionError::invalid_argument(
            path,
            format!("'{}' is not a finite number", text),
        ))
    }
}

fn coerce_bool(raw: &Value, path: &str) -> Result<CoercedValue, ExecutionError> {
    match raw {
        Value::Bool(b) => Ok(CoercedValue::Bool(*b)),
        Value::String(s) if s.trim().eq_ignore_ascii_case("true") => Ok(CoercedValue::Bool(true)),
        Value::String(s) if s.trim().eq_ignore_ascii_case("false") => Ok(CoercedValue::Bool(false)),
        other => Err(ExecutionError::invalid_argument(
            path,
            format!("expected true/false but got {}", describe(other)),
        )),
    }
}

fn coerce_address(raw: &Value, path: &str) -> Result<CoercedValue, ExecutionError> {
    let text = match raw {
        Value::String(s) => s.trim(),
        other => {
            return Err(ExecutionError::invalid_argument(
                path,
                format!("expected a base58 address but got {}", type_name(other)),
            ))
        }
    };

    Pubkey::from_str(text).map(CoercedValue::Pubkey).map_err(|e| {
        ExecutionError::invalid_argument(path, format!("invalid address '{}': {}", text, e))
    })
}

fn coerce_string(raw: &Value, path: &str) -> Result<CoercedValue, ExecutionError> {
    let text = match raw {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => {
            return Err(ExecutionError::invalid_argument(
                path,
                format!("expected a string but got {}", type_name(other)),
            ))
        }
    };

    // Borsh strings carry a u32 length prefix
    if u32::try_from(text.len()).is_err() {
        return Err(ExecutionError::invalid_argument(path, "string is too long"));
    }
    Ok(CoercedValue::String(text))
}

fn coerce_bytes(raw: &Value, path: &str) -> Result<CoercedValue, ExecutionError> {
    let bytes = match raw {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                numeric_text(item)
                    .and_then(|text| text.parse::<u8>().ok())
                    .ok_or_else(|| {
                        ExecutionError::invalid_argument(
                            format!("{}[{}]", path, i),
                            format!("expected a byte (0-255) but got {}", describe(item)),
                        )
                    })
            })
            .collect::<Result<Vec<u8>, _>>()?,
        Value::String(s) => match strip_hex_prefix(s.trim()) {
            Some(hex_digits) => hex::decode(hex_digits).map_err(|e| {
                ExecutionError::invalid_argument(path, format!("invalid hex '{}': {}", s, e))
            })?,
            None => s.as_bytes().to_vec(),
        },
        other => {
            return Err(ExecutionError::invalid_argument(
                path,
                format!("expected bytes but got {}", type_name(other)),
            ))
        }
    };

    if u32::try_from(bytes.len()).is_err() {
        return Err(ExecutionError::invalid_argument(path, "byte string is too long"));
    }
    Ok(CoercedValue::Bytes(bytes))
}

fn strip_hex_prefix(s: &str) -> Option<&str> {
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))
}

fn coerce_collection(
    raw: &Value,
    elem: &IdlType,
    len: Option<usize>,
    types: Option<&TypeDictionary>,
    path: &str,
    depth: usize,
) -> Result<CoercedValue, ExecutionError> {
    // [u8; N] also accepts a hex string
    if let (Some(expected), IdlType::Primitive(IdlPrimitive::U8), Value::String(s)) = (len, elem, raw) {
        if let Some(hex_digits) = strip_hex_prefix(s.trim()) {
            let bytes = hex::decode(hex_digits).map_err(|e| {
                ExecutionError::invalid_argument(path, format!("invalid hex '{}': {}", s, e))
            })?;
            if bytes.len() != expected {
                return Err(ExecutionError::invalid_argument(
                    path,
                    format!("expected {} bytes, got {}", expected, bytes.len()),
                ));
            }
            return Ok(CoercedValue::Array(bytes.into_iter().map(CoercedValue::U8).collect()));
        }
    }

    let items = collection_items(raw, path)?;

    if let Some(expected) = len {
        if items.len() != expected {
            return Err(ExecutionError::invalid_argument(
                path,
                format!("expected exactly {} elements, got {}", expected, items.len()),
            ));
        }
    } else if u32::try_from(items.len()).is_err() {
        return Err(ExecutionError::invalid_argument(path, "too many elements"));
    }

    let values = items
        .iter()
        .enumerate()
        .map(|(i, item)| coerce_nested(item, elem, types, &format!("{}[{}]", path, i), depth))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(match len {
        Some(_) => CoercedValue::Array(values),
        None => CoercedValue::Vec(values),
    })
}

/// Elements of a collection value: a JSON array, a string holding a JSON
/// array, or a comma-separated string.
fn collection_items<'v>(raw: &'v Value, path: &str) -> Result<Cow<'v, [Value]>, ExecutionError> {
    match raw {
        Value::Array(items) => Ok(Cow::Borrowed(items.as_slice())),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                Ok(Cow::Owned(Vec::new()))
            } else if s.starts_with('[') {
                serde_json::from_str::<Vec<Value>>(s).map(Cow::Owned).map_err(|e| {
                    ExecutionError::invalid_argument(path, format!("invalid JSON array: {}", e))
                })
            } else {
                Ok(Cow::Owned(
                    s.split(',')
                        .map(|part| Value::String(part.trim().to_string()))
                        .collect(),
                ))
            }
        }
        other => Err(ExecutionError::invalid_argument(
            path,
            format!("expected a list but got {}", type_name(other)),
        )),
    }
}

fn coerce_defined(
    raw: &Value,
    name: &str,
    types: Option<&TypeDictionary>,
    path: &str,
    depth: usize,
) -> Result<CoercedValue, ExecutionError> {
    let def = types
        .and_then(|dict| dict.get(name))
        .ok_or_else(|| ExecutionError::invalid_argument(path, format!("unknown type '{}'", name)))?;

    match def {
        IdlTypeDefTy::Alias { alias } => {
            let target = alias_target(name, alias, types, path)?;
            coerce_nested(raw, target, types, path, depth)
        }
        IdlTypeDefTy::Struct { fields } => {
            let raw = json_container(raw, path)?;
            let fields = coerce_fields(&raw, fields, types, path, depth)?;
            Ok(CoercedValue::Struct(fields))
        }
        IdlTypeDefTy::Enum { variants } => {
            let (variant_name, payload) = match raw {
                Value::String(s) if !s.trim_start().starts_with('{') => (s.trim().to_string(), Value::Null),
                _ => {
                    let container = json_container(raw, path)?;
                    match &*container {
                        Value::Object(map) if map.len() == 1 => match map.iter().next() {
                            Some((key, value)) => (key.clone(), value.clone()),
                            None => (String::new(), Value::Null),
                        },
                        _ => {
                            return Err(ExecutionError::invalid_argument(
                                path,
                                format!("expected a '{}' variant name or {{\"Variant\": {{..}}}}", name),
                            ))
                        }
                    }
                }
            };

            let (index, variant) = variants
                .iter()
                .enumerate()
                .find(|(_, v)| v.name == variant_name)
                .or_else(|| {
                    variants
                        .iter()
                        .enumerate()
                        .find(|(_, v)| v.name.eq_ignore_ascii_case(&variant_name))
                })
                .ok_or_else(|| {
                    ExecutionError::invalid_argument(
                        path,
                        format!("unknown variant '{}' for enum '{}'", variant_name, name),
                    )
                })?;

            let index = u8::try_from(index).map_err(|_| {
                ExecutionError::invalid_argument(path, format!("enum '{}' has too many variants", name))
            })?;

            let fields = match &variant.fields {
                Some(fields) => {
                    coerce_fields(&payload, fields, types, &format!("{}.{}", path, variant.name), depth)?
                }
                None => Vec::new(),
            };

            Ok(CoercedValue::Enum {
                variant: variant.name.clone(),
                index,
                fields,
            })
        }
    }
}

/// Follow an alias through any aliases it names directly, failing on a loop.
fn alias_target<'t>(
    name: &str,
    alias: &'t IdlType,
    types: Option<&'t TypeDictionary>,
    path: &str,
) -> Result<&'t IdlType, ExecutionError> {
    let mut seen = vec![name.to_string()];
    let mut target = alias;

    while let IdlType::Defined { defined } = target {
        let next = defined.name();
        if seen.iter().any(|s| s == next) {
            return Err(ExecutionError::invalid_argument(
                path,
                format!("recursive type alias '{}'", name),
            ));
        }
        match types.and_then(|dict| dict.get(next)) {
            Some(IdlTypeDefTy::Alias { alias }) => {
                seen.push(next.to_string());
                target = alias;
            }
            _ => break,
        }
    }

    Ok(target)
}

/// Object/array value, parsing strings that hold JSON.
fn json_container<'v>(raw: &'v Value, path: &str) -> Result<Cow<'v, Value>, ExecutionError> {
    match raw {
        Value::Object(_) | Value::Array(_) => Ok(Cow::Borrowed(raw)),
        Value::String(s) => serde_json::from_str::<Value>(s.trim())
            .ok()
            .filter(|v| v.is_object() || v.is_array())
            .map(Cow::Owned)
            .ok_or_else(|| {
                ExecutionError::invalid_argument(path, format!("expected a JSON object but got '{}'", s))
            }),
        other => Err(ExecutionError::invalid_argument(
            path,
            format!("expected an object but got {}", type_name(other)),
        )),
    }
}

fn coerce_fields(
    raw: &Value,
    fields: &IdlFields,
    types: Option<&TypeDictionary>,
    path: &str,
    depth: usize,
) -> Result<Vec<(String, CoercedValue)>, ExecutionError> {
    match fields {
        IdlFields::Named(fields) => {
            let empty = Map::new();
            let map = match raw {
                Value::Object(map) => map,
                Value::Null if fields.is_empty() => &empty,
                other => {
                    return Err(ExecutionError::invalid_argument(
                        path,
                        format!("expected an object but got {}", type_name(other)),
                    ))
                }
            };

            fields
                .iter()
                .map(|field| {
                    let field_path = format!("{}.{}", path, field.name);
                    let value = match map.get(&field.name) {
                        Some(value) => coerce_nested(value, &field.ty, types, &field_path, depth)?,
                        None if matches!(field.ty, IdlType::Option { .. }) => CoercedValue::Option(None),
                        None => {
                            return Err(ExecutionError::invalid_argument(field_path, "missing field"))
                        }
                    };
                    Ok((field.name.clone(), value))
                })
                .collect()
        }
        IdlFields::Tuple(tys) => {
            let items = match raw {
                Value::Array(items) => items,
                other => {
                    return Err(ExecutionError::invalid_argument(
                        path,
                        format!("expected a list of {} values but got {}", tys.len(), type_name(other)),
                    ))
                }
            };
            if items.len() != tys.len() {
                return Err(ExecutionError::invalid_argument(
                    path,
                    format!("expected {} values, got {}", tys.len(), items.len()),
                ));
            }

            tys.iter()
                .zip(items)
                .enumerate()
                .map(|(i, (ty, item))| {
                    let value = coerce_nested(item, ty, types, &format!("{}.{}", path, i), depth)?;
                    Ok((i.to_string(), value))
                })
                .collect()
        }
    }
}

fn type_name(raw: &Value) -> &'static str {
    match raw {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

fn describe(raw: &Value) -> String {
    match raw {
        Value::String(s) => format!("'{}'", s),
        other => type_name(other).to_string(),
    }
}

impl CoercedValue {
    /// Append the Borsh encoding of this value.
    pub fn encode(&self, out: &mut Vec<u8>) -> io::Result<()> {
        match self {
            CoercedValue::Bool(v) => v.serialize(out),
            CoercedValue::U8(v) => v.serialize(out),
            CoercedValue::I8(v) => v.serialize(out),
            CoercedValue::U16(v) => v.serialize(out),
            CoercedValue::I16(v) => v.serialize(out),
            CoercedValue::U32(v) => v.serialize(out),
            CoercedValue::I32(v) => v.serialize(out),
            CoercedValue::U64(v) => v.serialize(out),
            CoercedValue::I64(v) => v.serialize(out),
            CoercedValue::U128(v) => v.serialize(out),
            CoercedValue::I128(v) => v.serialize(out),
            CoercedValue::F32(v) => v.serialize(out),
            CoercedValue::F64(v) => v.serialize(out),
            CoercedValue::String(v) => v.serialize(out),
            CoercedValue::Bytes(v) => v.serialize(out),
            CoercedValue::Pubkey(v) => v.to_bytes().serialize(out),
            CoercedValue::Option(None) => 0u8.serialize(out),
            CoercedValue::Option(Some(inner)) => {
                1u8.serialize(out)?;
                inner.encode(out)
            }
            CoercedValue::Vec(items) => {
                let len = u32::try_from(items.len())
                    .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "vec too long"))?;
                len.serialize(out)?;
                items.iter().try_for_each(|item| item.encode(out))
            }
            CoercedValue::Array(items) => items.iter().try_for_each(|item| item.encode(out)),
            CoercedValue::Struct(fields) => fields.iter().try_for_each(|(_, v)| v.encode(out)),
            CoercedValue::Enum { index, fields, .. } => {
                index.serialize(out)?;
                fields.iter().try_for_each(|(_, v)| v.encode(out))
            }
        }
    }

    /// Borsh encoding as a standalone buffer.
    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.encode(&mut out)?;
        Ok(out)
    }
}

impl fmt::Display for CoercedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, items: &[CoercedValue]) -> fmt::Result {
            write!(f, "[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", item)?;
            }
            write!(f, "]")
        }

        fn fields(f: &mut fmt::Formatter<'_>, fields: &[(String, CoercedValue)]) -> fmt::Result {
            write!(f, "{{")?;
            for (i, (name, value)) in fields.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: {}", name, value)?;
            }
            write!(f, "}}")
        }

        match self {
            CoercedValue::Bool(v) => write!(f, "{}", v),
            CoercedValue::U8(v) => write!(f, "{}", v),
            CoercedValue::I8(v) => write!(f, "{}", v),
            CoercedValue::U16(v) => write!(f, "{}", v),
            CoercedValue::I16(v) => write!(f, "{}", v),
            CoercedValue::U32(v) => write!(f, "{}", v),
            CoercedValue::I32(v) => write!(f, "{}", v),
            CoercedValue::U64(v) => write!(f, "{}", v),
            CoercedValue::I64(v) => write!(f, "{}", v),
            CoercedValue::U128(v) => write!(f, "{}", v),
            CoercedValue::I128(v) => write!(f, "{}", v),
            CoercedValue::F32(v) => write!(f, "{}", v),
            CoercedValue::F64(v) => write!(f, "{}", v),
            CoercedValue::String(s) => write!(f, "\"{}\"", s),
            CoercedValue::Bytes(bytes) => write!(f, "0x{}", hex::encode(bytes)),
            CoercedValue::Pubkey(pk) => write!(f, "{}", pk),
            CoercedValue::Option(None) => write!(f, "None"),
            CoercedValue::Option(Some(inner)) => write!(f, "Some({})", inner),
            CoercedValue::Vec(items) | CoercedValue::Array(items) => join(f, items),
            CoercedValue::Struct(fs) => fields(f, fs),
            CoercedValue::Enum { variant, fields: fs, .. } if fs.is_empty() => write!(f, "{}", variant),
            CoercedValue::Enum { variant, fields: fs, .. } => {
                write!(f, "{}", variant)?;
                fields(f, fs)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idl::ProgramIdl;
    use serde_json::json;

    fn instruction(args: Value) -> IdlInstruction {
        serde_json::from_value(json!({ "name": "test_ix", "accounts": [], "args": args })).unwrap()
    }

    fn raw(value: Value) -> RawArgumentSet {
        value.as_object().cloned().unwrap()
    }

    fn dictionary() -> TypeDictionary {
        let idl = ProgramIdl::from_json(
            r#"{
                "instructions": [],
                "types": [
                    { "name": "Config", "type": { "kind": "struct", "fields": [
                        { "name": "fee", "type": "u16" },
                        { "name": "admin", "type": "pubkey" },
                        { "name": "label", "type": { "option": "string" } }
                    ] } },
                    { "name": "Side", "type": { "kind": "enum", "variants": [
                        { "name": "Bid" },
                        { "name": "Ask" },
                        { "name": "Limit", "fields": [ { "name": "price", "type": "u64" } ] }
                    ] } },
                    { "name": "Amount", "type": { "kind": "type", "alias": "u64" } }
                ]
            }"#,
        )
        .unwrap();
        idl.type_dictionary()
    }

    #[test]
    fn test_transfer_amount_string() {
        let ix = instruction(json!([{ "name": "amount", "type": "u64" }]));
        let coerced = coerce_arguments(&ix, &raw(json!({ "amount": "1000" })), None).unwrap();
        assert_eq!(coerced, vec![CoercedValue::U64(1000)]);
    }

    #[test]
    fn test_declaration_order_preserved() {
        let ix = instruction(json!([
            { "name": "b", "type": "bool" },
            { "name": "a", "type": "i32" },
            { "name": "c", "type": "string" }
        ]));
        let coerced =
            coerce_arguments(&ix, &raw(json!({ "c": "x", "a": -5, "b": "TRUE" })), None).unwrap();
        assert_eq!(
            coerced,
            vec![
                CoercedValue::Bool(true),
                CoercedValue::I32(-5),
                CoercedValue::String("x".to_string())
            ]
        );
    }

    #[test]
    fn test_missing_argument_named() {
        let ix = instruction(json!([
            { "name": "amount", "type": "u64" },
            { "name": "memo", "type": "string" }
        ]));
        let err = coerce_arguments(&ix, &raw(json!({ "amount": 1 })), None).unwrap_err();
        assert_eq!(err, ExecutionError::missing_argument("memo"));
    }

    #[test]
    fn test_absent_option_is_none() {
        let ix = instruction(json!([{ "name": "memo", "type": { "option": "string" } }]));
        let coerced = coerce_arguments(&ix, &raw(json!({})), None).unwrap();
        assert_eq!(coerced, vec![CoercedValue::Option(None)]);

        let coerced = coerce_arguments(&ix, &raw(json!({ "memo": "hi" })), None).unwrap();
        assert_eq!(
            coerced,
            vec![CoercedValue::Option(Some(Box::new(CoercedValue::String("hi".to_string()))))]
        );
    }

    #[test]
    fn test_numeric_ranges() {
        let u8_ty = IdlType::Primitive(IdlPrimitive::U8);
        assert!(coerce_value(&json!(255), &u8_ty, None, "x").is_ok());
        assert!(coerce_value(&json!(256), &u8_ty, None, "x").is_err());
        assert!(coerce_value(&json!("-1"), &u8_ty, None, "x").is_err());

        let i8_ty = IdlType::Primitive(IdlPrimitive::I8);
        assert_eq!(coerce_value(&json!("-128"), &i8_ty, None, "x").unwrap(), CoercedValue::I8(-128));
        assert!(coerce_value(&json!(-129), &i8_ty, None, "x").is_err());

        let u128_ty = IdlType::Primitive(IdlPrimitive::U128);
        assert_eq!(
            coerce_value(&json!("340282366920938463463374607431768211455"), &u128_ty, None, "x").unwrap(),
            CoercedValue::U128(u128::MAX)
        );

        let u64_ty = IdlType::Primitive(IdlPrimitive::U64);
        let err = coerce_value(&json!("12abc"), &u64_ty, None, "amount").unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidArgument { ref name, .. } if name == "amount"));
        assert!(coerce_value(&json!(1.5), &u64_ty, None, "amount").is_err());
        assert!(coerce_value(&json!(true), &u64_ty, None, "amount").is_err());
    }

    #[test]
    fn test_float_must_be_finite() {
        let f64_ty = IdlType::Primitive(IdlPrimitive::F64);
        assert_eq!(coerce_value(&json!("2.5"), &f64_ty, None, "x").unwrap(), CoercedValue::F64(2.5));
        assert!(coerce_value(&json!("NaN"), &f64_ty, None, "x").is_err());
        assert!(coerce_value(&json!("inf"), &f64_ty, None, "x").is_err());
    }

    #[test]
    fn test_bool_coercion() {
        let ty = IdlType::Primitive(IdlPrimitive::Bool);
        assert_eq!(coerce_value(&json!(false), &ty, None, "x").unwrap(), CoercedValue::Bool(false));
        assert_eq!(coerce_value(&json!(" false "), &ty, None, "x").unwrap(), CoercedValue::Bool(false));
        assert!(coerce_value(&json!("yes"), &ty, None, "x").is_err());
        assert!(coerce_value(&json!(1), &ty, None, "x").is_err());
    }

    #[test]
    fn test_address_coercion() {
        let ty = IdlType::Primitive(IdlPrimitive::Pubkey);
        let key = Pubkey::new_unique();
        assert_eq!(
            coerce_value(&json!(key.to_string()), &ty, None, "owner").unwrap(),
            CoercedValue::Pubkey(key)
        );

        for bad in [json!("not-a-valid-address"), json!(""), json!("1111"), json!(42)] {
            let err = coerce_value(&bad, &ty, None, "owner").unwrap_err();
            assert!(
                matches!(err, ExecutionError::InvalidArgument { ref name, .. } if name == "owner"),
                "unexpected error for {:?}: {:?}",
                bad,
                err
            );
        }
    }

    #[test]
    fn test_bytes_coercion() {
        let ty = IdlType::Primitive(IdlPrimitive::Bytes);
        assert_eq!(
            coerce_value(&json!("0xdeadbeef"), &ty, None, "x").unwrap(),
            CoercedValue::Bytes(vec![0xde, 0xad, 0xbe, 0xef])
        );
        assert_eq!(
            coerce_value(&json!([1, 2, 3]), &ty, None, "x").unwrap(),
            CoercedValue::Bytes(vec![1, 2, 3])
        );
        assert_eq!(
            coerce_value(&json!("hi"), &ty, None, "x").unwrap(),
            CoercedValue::Bytes(b"hi".to_vec())
        );
        assert!(coerce_value(&json!("0xzz"), &ty, None, "x").is_err());
        let err = coerce_value(&json!([1, 300]), &ty, None, "data").unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidArgument { ref name, .. } if name == "data[1]"));
    }

    #[test]
    fn test_collections() {
        let vec_ty: IdlType = serde_json::from_value(json!({ "vec": "u32" })).unwrap();
        let expected = CoercedValue::Vec(vec![CoercedValue::U32(1), CoercedValue::U32(2)]);
        assert_eq!(coerce_value(&json!([1, "2"]), &vec_ty, None, "v").unwrap(), expected);
        assert_eq!(coerce_value(&json!("1, 2"), &vec_ty, None, "v").unwrap(), expected);
        assert_eq!(coerce_value(&json!("[1,2]"), &vec_ty, None, "v").unwrap(), expected);
        assert_eq!(coerce_value(&json!([]), &vec_ty, None, "v").unwrap(), CoercedValue::Vec(vec![]));
        assert_eq!(coerce_value(&json!(""), &vec_ty, None, "v").unwrap(), CoercedValue::Vec(vec![]));

        let err = coerce_value(&json!([1, "x"]), &vec_ty, None, "v").unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidArgument { ref name, .. } if name == "v[1]"));

        let arr_ty: IdlType = serde_json::from_value(json!({ "array": ["u8", 4] })).unwrap();
        assert_eq!(
            coerce_value(&json!("0x01020304"), &arr_ty, None, "a").unwrap(),
            CoercedValue::Array(vec![
                CoercedValue::U8(1),
                CoercedValue::U8(2),
                CoercedValue::U8(3),
                CoercedValue::U8(4)
            ])
        );
        assert!(coerce_value(&json!([1, 2, 3]), &arr_ty, None, "a").is_err());
        assert!(coerce_value(&json!("0x0102"), &arr_ty, None, "a").is_err());
    }

    #[test]
    fn test_struct_coercion() {
        let types = dictionary();
        let ty: IdlType = serde_json::from_value(json!({ "defined": "Config" })).unwrap();
        let admin = Pubkey::new_unique();

        let value = coerce_value(
            &json!({ "fee": "30", "admin": admin.to_string() }),
            &ty,
            Some(&types),
            "config",
        )
        .unwrap();
        assert_eq!(
            value,
            CoercedValue::Struct(vec![
                ("fee".to_string(), CoercedValue::U16(30)),
                ("admin".to_string(), CoercedValue::Pubkey(admin)),
                ("label".to_string(), CoercedValue::Option(None)),
            ])
        );

        // JSON text from a form field
        let text = format!(r#"{{"fee": 1, "admin": "{}", "label": "x"}}"#, admin);
        assert!(coerce_value(&json!(text), &ty, Some(&types), "config").is_ok());

        let err = coerce_value(&json!({ "fee": 1 }), &ty, Some(&types), "config").unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidArgument { ref name, .. } if name == "config.admin"));

        let err = coerce_value(
            &json!({ "fee": 70000, "admin": admin.to_string() }),
            &ty,
            Some(&types),
            "config",
        )
        .unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidArgument { ref name, .. } if name == "config.fee"));
    }

    #[test]
    fn test_enum_and_alias_coercion() {
        let types = dictionary();
        let side: IdlType = serde_json::from_value(json!({ "defined": { "name": "Side" } })).unwrap();

        assert_eq!(
            coerce_value(&json!("Ask"), &side, Some(&types), "side").unwrap(),
            CoercedValue::Enum {
                variant: "Ask".to_string(),
                index: 1,
                fields: vec![]
            }
        );
        assert_eq!(
            coerce_value(&json!({ "limit": { "price": "5" } }), &side, Some(&types), "side").unwrap(),
            CoercedValue::Enum {
                variant: "Limit".to_string(),
                index: 2,
                fields: vec![("price".to_string(), CoercedValue::U64(5))]
            }
        );
        assert!(coerce_value(&json!("Market"), &side, Some(&types), "side").is_err());

        let amount: IdlType = serde_json::from_value(json!({ "defined": "Amount" })).unwrap();
        assert_eq!(
            coerce_value(&json!("9"), &amount, Some(&types), "amount").unwrap(),
            CoercedValue::U64(9)
        );
    }

    #[test]
    fn test_unknown_defined_type() {
        let ty: IdlType = serde_json::from_value(json!({ "defined": "Nope" })).unwrap();
        let err = coerce_value(&json!({}), &ty, None, "x").unwrap_err();
        assert!(err.to_string().contains("unknown type 'Nope'"));
    }

    #[test]
    fn test_recursive_alias_is_invalid_argument() {
        let idl = ProgramIdl::from_json(
            r#"{
                "instructions": [],
                "types": [
                    { "name": "A", "type": { "kind": "type", "alias": { "defined": "B" } } },
                    { "name": "B", "type": { "kind": "type", "alias": { "defined": "A" } } },
                    { "name": "Loop", "type": { "kind": "type", "alias": { "option": { "defined": "Loop" } } } }
                ]
            }"#,
        )
        .unwrap();
        let types = idl.type_dictionary();

        let ty: IdlType = serde_json::from_value(json!({ "defined": "A" })).unwrap();
        let err = coerce_value(&json!("1"), &ty, Some(&types), "value").unwrap_err();
        assert_eq!(
            err,
            ExecutionError::invalid_argument("value", "recursive type alias 'A'")
        );

        // an option around the loop consumes no input either
        let ty: IdlType = serde_json::from_value(json!({ "defined": "Loop" })).unwrap();
        let err = coerce_value(&json!("1"), &ty, Some(&types), "value").unwrap_err();
        assert_eq!(err.category(), crate::executor::ErrorCategory::InvalidArgument);
        assert!(err.to_string().contains("type nesting exceeds"), "{}", err);
    }

    #[test]
    fn test_empty_string_option() {
        let text: IdlType = serde_json::from_value(json!({ "option": "string" })).unwrap();
        assert_eq!(
            coerce_value(&json!(""), &text, None, "memo").unwrap(),
            CoercedValue::Option(Some(Box::new(CoercedValue::String(String::new()))))
        );
        assert_eq!(coerce_value(&json!("none"), &text, None, "memo").unwrap(), CoercedValue::Option(None));

        let number: IdlType = serde_json::from_value(json!({ "option": "u64" })).unwrap();
        assert_eq!(coerce_value(&json!(""), &number, None, "limit").unwrap(), CoercedValue::Option(None));
    }

    #[test]
    fn test_whole_floats_accepted_for_integers() {
        let u64_ty = IdlType::Primitive(IdlPrimitive::U64);
        assert_eq!(coerce_value(&json!(1000.0), &u64_ty, None, "amount").unwrap(), CoercedValue::U64(1000));
        assert_eq!(coerce_value(&json!(1e3), &u64_ty, None, "amount").unwrap(), CoercedValue::U64(1000));
        assert!(coerce_value(&json!(1000.5), &u64_ty, None, "amount").is_err());
        assert!(coerce_value(&json!(1e300), &u64_ty, None, "amount").is_err());

        let i8_ty = IdlType::Primitive(IdlPrimitive::I8);
        assert_eq!(coerce_value(&json!(-3.0), &i8_ty, None, "x").unwrap(), CoercedValue::I8(-3));
    }

    #[test]
    fn test_borsh_encoding() {
        assert_eq!(CoercedValue::U64(1000).to_bytes().unwrap(), 1000u64.to_le_bytes().to_vec());
        assert_eq!(
            CoercedValue::String("ab".to_string()).to_bytes().unwrap(),
            vec![2, 0, 0, 0, b'a', b'b']
        );
        assert_eq!(CoercedValue::Option(None).to_bytes().unwrap(), vec![0]);
        assert_eq!(
            CoercedValue::Option(Some(Box::new(CoercedValue::U8(7)))).to_bytes().unwrap(),
            vec![1, 7]
        );
        assert_eq!(
            CoercedValue::Vec(vec![CoercedValue::U16(1)]).to_bytes().unwrap(),
            vec![1, 0, 0, 0, 1, 0]
        );
        assert_eq!(
            CoercedValue::Array(vec![CoercedValue::U8(1), CoercedValue::U8(2)]).to_bytes().unwrap(),
            vec![1, 2]
        );

        let key = Pubkey::new_unique();
        assert_eq!(CoercedValue::Pubkey(key).to_bytes().unwrap(), key.to_bytes().to_vec());

        let e = CoercedValue::Enum {
            variant: "Limit".to_string(),
            index: 2,
            fields: vec![("price".to_string(), CoercedValue::U32(5))],
        };
        assert_eq!(e.to_bytes().unwrap(), vec![2, 5, 0, 0, 0]);
    }

    #[test]
    fn test_display() {
        assert_eq!(CoercedValue::U64(1000).to_string(), "1000");
        assert_eq!(CoercedValue::Bytes(vec![0xab]).to_string(), "0xab");
        assert_eq!(
            CoercedValue::Vec(vec![CoercedValue::Bool(true), CoercedValue::Option(None)]).to_string(),
            "[true, None]"
        );
    }
}
