// monkey-core - Runtime for the Monkey programming language
// Copyright (c) 2025 The Monkey Authors. MIT licensed.

//! # monkey-core
//!
//! Runtime for the Monkey programming language: the value model, the
//! bytecode instruction set, the built-in function registry, and the
//! tree-walking evaluator. The bytecode compiler and virtual machine
//! live in `monkey-vm` and build on these types.
//!
//! # Quick Start
//!
//! ```
//! use monkey_core::{Environment, eval_program};
//! use monkey_parser::Parser;
//!
//! let program = Parser::new("let x = 2; x * 3").parse_program().unwrap();
//! let env = Environment::new();
//! let result = eval_program(&program, &env);
//!
//! assert_eq!(result.to_string(), "6");
//! ```

pub mod builtins;
pub mod code;
pub mod environment;
pub mod eval;
pub mod object;

pub use builtins::{BUILTINS, Builtin, BuiltinFunction};
pub use code::{Instructions, Opcode};
pub use environment::Environment;
pub use eval::{apply_function, eval_program};
pub use object::{Closure, CompiledFunction, Function, HashKey, HashPair, Object};
