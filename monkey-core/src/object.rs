// monkey-core - Value types for Monkey
// Copyright (c) 2025 The Monkey Authors. MIT licensed.

//! Core value type for Monkey.
//!
//! `Object` is the central enum representing all runtime values. Values
//! are cheap to clone: strings and compiled artifacts are `Rc`-shared,
//! arrays and hashes are persistent `im` collections.

use std::fmt;
use std::rc::Rc;

use im::{OrdMap, Vector};
use monkey_parser::ast::BlockStatement;

use crate::builtins::Builtin;
use crate::code::Instructions;
use crate::environment::Environment;

/// A Monkey runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Integer(i64),
    Boolean(bool),
    Null,
    String(Rc<str>),
    Array(Vector<Object>),
    Hash(OrdMap<HashKey, HashPair>),
    /// Evaluator function value: parameters, body and captured environment.
    Function(Rc<Function>),
    /// Compiled instruction stream plus frame layout metadata.
    CompiledFunction(Rc<CompiledFunction>),
    /// A compiled function paired with its captured free variables.
    Closure(Rc<Closure>),
    Builtin(&'static Builtin),
    /// Wrapper propagating an explicit `return` through nested blocks on
    /// the tree-walking path. The bytecode path has an opcode for this.
    ReturnValue(Box<Object>),
    /// In-band runtime error. Flows as an ordinary value.
    Error(String),
}

impl Object {
    /// Build a string value.
    pub fn string(value: impl Into<Rc<str>>) -> Object {
        Object::String(value.into())
    }

    /// Build an array value.
    pub fn array(elements: impl IntoIterator<Item = Object>) -> Object {
        Object::Array(elements.into_iter().collect())
    }

    /// Build an in-band error value.
    pub fn error(message: impl Into<String>) -> Object {
        Object::Error(message.into())
    }

    /// The type tag used in error messages and dispatch.
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Integer(_) => "INTEGER",
            Object::Boolean(_) => "BOOLEAN",
            Object::Null => "NULL",
            Object::String(_) => "STRING",
            Object::Array(_) => "ARRAY",
            Object::Hash(_) => "HASH",
            Object::Function(_) => "FUNCTION",
            Object::CompiledFunction(_) => "COMPILED_FUNCTION",
            Object::Closure(_) => "CLOSURE",
            Object::Builtin(_) => "BUILTIN",
            Object::ReturnValue(_) => "RETURN_VALUE",
            Object::Error(_) => "ERROR",
        }
    }

    /// Derive the hash key for this value, or `None` for unhashable kinds.
    ///
    /// Integers use their two's-complement bit pattern, booleans map to
    /// 0/1, strings hash their bytes with 64-bit FNV-1a. The type tag is
    /// part of the key, so numerically equal payloads of different kinds
    /// never collide.
    pub fn hash_key(&self) -> Option<HashKey> {
        let key = match self {
            Object::Integer(value) => HashKey {
                kind: self.type_name(),
                value: *value as u64,
            },
            Object::Boolean(value) => HashKey {
                kind: self.type_name(),
                value: u64::from(*value),
            },
            Object::String(value) => HashKey {
                kind: self.type_name(),
                value: fnv1a(value.as_bytes()),
            },
            _ => return None,
        };
        Some(key)
    }

    /// Truthiness: `false` and `null` are falsy, everything else
    /// (including `0`) is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Object::Boolean(false) | Object::Null)
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Integer(value) => write!(f, "{}", value),
            Object::Boolean(value) => write!(f, "{}", value),
            Object::Null => write!(f, "null"),
            Object::String(value) => write!(f, "{}", value),
            Object::Array(elements) => {
                let elems: Vec<String> = elements.iter().map(|e| e.to_string()).collect();
                write!(f, "[{}]", elems.join(", "))
            }
            Object::Hash(pairs) => {
                let pairs: Vec<String> = pairs
                    .values()
                    .map(|pair| format!("{}: {}", pair.key, pair.value))
                    .collect();
                write!(f, "{{{}}}", pairs.join(", "))
            }
            Object::Function(function) => {
                write!(
                    f,
                    "fn({}) {{\n{}\n}}",
                    function.parameters.join(", "),
                    function.body
                )
            }
            Object::CompiledFunction(function) => {
                write!(f, "CompiledFunction[{:p}]", Rc::as_ptr(function))
            }
            Object::Closure(closure) => write!(f, "Closure[{:p}]", Rc::as_ptr(closure)),
            Object::Builtin(_) => write!(f, "builtin function"),
            Object::ReturnValue(value) => write!(f, "{}", value),
            Object::Error(message) => write!(f, "ERROR: {}", message),
        }
    }
}

/// Hash key: type tag plus 64-bit payload. Values with equal content
/// produce identical keys; distinct kinds never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HashKey {
    pub kind: &'static str,
    pub value: u64,
}

/// One hash entry. The original key object is kept so the hash can
/// render itself.
#[derive(Debug, Clone, PartialEq)]
pub struct HashPair {
    pub key: Object,
    pub value: Object,
}

/// An evaluator function value, closing over its defining environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub parameters: Vec<String>,
    pub body: BlockStatement,
    pub env: Environment,
}

/// A compiled function: instruction stream plus the number of local
/// slots to reserve and the number of parameters expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFunction {
    pub instructions: Instructions,
    pub num_locals: usize,
    pub num_parameters: usize,
}

/// A closure: a compiled function paired with the values captured from
/// enclosing scopes, in the order the compiler emitted them.
#[derive(Debug, Clone, PartialEq)]
pub struct Closure {
    pub func: Rc<CompiledFunction>,
    pub free: Vec<Object>,
}

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

/// 64-bit FNV-1a over a byte slice.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}
