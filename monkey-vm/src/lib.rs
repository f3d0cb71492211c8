// monkey-vm - Bytecode compiler and virtual machine for the Monkey programming language
// Copyright (c) 2025 The Monkey Authors. MIT licensed.

//! # monkey-vm
//!
//! Bytecode compiler and stack-based virtual machine for Monkey.
//!
//! This crate provides an alternative execution model to the AST-walking
//! evaluator in `monkey-core`. Code is first compiled to bytecode, then
//! executed by a stack-based VM.
//!
//! ```
//! use monkey_parser::Parser;
//! use monkey_vm::{Compiler, VM};
//!
//! let program = Parser::new("let one = 1; let two = one + one; one + two")
//!     .parse_program()
//!     .unwrap();
//!
//! let mut compiler = Compiler::new();
//! compiler.compile(&program).unwrap();
//!
//! let mut vm = VM::new(compiler.bytecode());
//! vm.run().unwrap();
//!
//! assert_eq!(vm.last_popped().to_string(), "3");
//! ```

pub mod compiler;
pub mod symbol_table;
pub mod vm;

pub use compiler::{Bytecode, CompileError, Compiler};
pub use symbol_table::{Symbol, SymbolScope, SymbolTable};
pub use vm::{GLOBALS_SIZE, MAX_FRAMES, STACK_SIZE, VM, VmError};
