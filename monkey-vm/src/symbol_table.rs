// monkey-vm - Symbol table for the Monkey compiler
// Copyright (c) 2025 The Monkey Authors. MIT licensed.

//! Lexically scoped symbol table.
//!
//! Scope nodes are cheap shared handles, so the REPL can hold on to the
//! root table across compilations while the compiler pushes and pops
//! enclosed scopes during function compilation.
//!
//! Resolution through an outer scope *promotes* local bindings: a name
//! defined in an enclosing function and referenced here is appended to
//! this scope's free list and re-registered locally with `Free` scope,
//! which is how closures come to capture their variables.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Where a symbol lives, which decides the load instruction the
/// compiler emits for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolScope {
    Global,
    Local,
    Builtin,
    Free,
    /// The currently-compiling function's own name. Loads compile to
    /// `CurrentClosure`, so recursion needs no self-capture.
    Function,
}

/// A resolved name: scope kind plus an index unique within that kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub scope: SymbolScope,
    pub index: usize,
}

/// One scope node with a link to its enclosing scope.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    inner: Rc<RefCell<TableInner>>,
}

#[derive(Debug)]
struct TableInner {
    store: HashMap<String, Symbol>,
    outer: Option<SymbolTable>,
    free_symbols: Vec<Symbol>,
    num_definitions: usize,
}

impl SymbolTable {
    /// Create a new root (global) scope.
    pub fn new() -> Self {
        SymbolTable {
            inner: Rc::new(RefCell::new(TableInner {
                store: HashMap::new(),
                outer: None,
                free_symbols: Vec::new(),
                num_definitions: 0,
            })),
        }
    }

    /// Create a scope enclosed by this one.
    #[must_use]
    pub fn enclosed(&self) -> Self {
        let table = SymbolTable::new();
        table.inner.borrow_mut().outer = Some(self.clone());
        table
    }

    /// The enclosing scope, if any.
    pub fn outer(&self) -> Option<SymbolTable> {
        self.inner.borrow().outer.clone()
    }

    /// Allocate a new symbol in this scope. Global at the root, Local
    /// everywhere else. Rebinding a name in the same scope overwrites
    /// the previous entry.
    pub fn define(&self, name: &str) -> Symbol {
        let mut inner = self.inner.borrow_mut();
        let scope = if inner.outer.is_none() {
            SymbolScope::Global
        } else {
            SymbolScope::Local
        };
        let symbol = Symbol {
            name: name.to_string(),
            scope,
            index: inner.num_definitions,
        };
        inner.store.insert(name.to_string(), symbol.clone());
        inner.num_definitions += 1;
        symbol
    }

    /// Register a built-in at an explicit registry index. Does not
    /// advance the definition counter.
    pub fn define_builtin(&self, index: usize, name: &str) -> Symbol {
        let symbol = Symbol {
            name: name.to_string(),
            scope: SymbolScope::Builtin,
            index,
        };
        self.inner
            .borrow_mut()
            .store
            .insert(name.to_string(), symbol.clone());
        symbol
    }

    /// Register the currently-compiling function's own name.
    pub fn define_function_name(&self, name: &str) -> Symbol {
        let symbol = Symbol {
            name: name.to_string(),
            scope: SymbolScope::Function,
            index: 0,
        };
        self.inner
            .borrow_mut()
            .store
            .insert(name.to_string(), symbol.clone());
        symbol
    }

    /// Look up a name here or in the outer chain.
    ///
    /// A hit in an enclosing scope with Local, Free or Function scope is
    /// promoted into this scope's free list; the promoted symbol is
    /// recorded locally so repeated lookups return the same Free index.
    /// Global and Builtin hits pass through unchanged.
    pub fn resolve(&self, name: &str) -> Option<Symbol> {
        if let Some(symbol) = self.inner.borrow().store.get(name) {
            return Some(symbol.clone());
        }

        let outer = self.outer()?;
        let symbol = outer.resolve(name)?;

        if matches!(symbol.scope, SymbolScope::Global | SymbolScope::Builtin) {
            return Some(symbol);
        }

        Some(self.define_free(symbol))
    }

    fn define_free(&self, original: Symbol) -> Symbol {
        let mut inner = self.inner.borrow_mut();
        inner.free_symbols.push(original.clone());
        let symbol = Symbol {
            name: original.name.clone(),
            scope: SymbolScope::Free,
            index: inner.free_symbols.len() - 1,
        };
        inner.store.insert(original.name, symbol.clone());
        symbol
    }

    /// Snapshot of the free symbols captured so far, in capture order.
    pub fn free_symbols(&self) -> Vec<Symbol> {
        self.inner.borrow().free_symbols.clone()
    }

    /// Number of Global/Local definitions allocated in this scope.
    pub fn num_definitions(&self) -> usize {
        self.inner.borrow().num_definitions
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
