// monkey-vm - Bytecode compiler for Monkey
// Copyright (c) 2025 The Monkey Authors. MIT licensed.

//! Bytecode compiler.
//!
//! Walks the syntax tree and emits a flat instruction stream plus a
//! constant pool. Function literals are compiled in their own
//! compilation scope; jumps are emitted with a placeholder operand and
//! backpatched once the target offset is known.

use std::fmt;
use std::rc::Rc;

use monkey_core::builtins::BUILTINS;
use monkey_core::code::{Instructions, Opcode, make};
use monkey_core::object::{CompiledFunction, Object};
use monkey_parser::ast::{
    BlockStatement, Expression, FunctionLiteral, InfixOperator, PrefixOperator, Program, Statement,
};

use crate::symbol_table::{Symbol, SymbolScope, SymbolTable};

/// Error during compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// Reference to a name no scope defines.
    UndefinedVariable(String),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::UndefinedVariable(name) => write!(f, "undefined variable {}", name),
        }
    }
}

impl std::error::Error for CompileError {}

/// Result type for compilation.
pub type Result<T> = std::result::Result<T, CompileError>;

/// The compiled artifact: main instruction stream plus constant pool.
#[derive(Debug, Clone)]
pub struct Bytecode {
    pub instructions: Instructions,
    pub constants: Vec<Object>,
}

/// Opcode and offset of an already-emitted instruction, tracked for the
/// trailing-Pop peepholes.
#[derive(Debug, Clone, Copy)]
struct EmittedInstruction {
    opcode: Opcode,
    position: usize,
}

/// One compilation scope: the instructions being emitted for the
/// current function body, plus the last two emitted instructions.
#[derive(Debug, Default)]
struct CompilationScope {
    instructions: Instructions,
    last_instruction: Option<EmittedInstruction>,
    previous_instruction: Option<EmittedInstruction>,
}

/// The bytecode compiler.
pub struct Compiler {
    constants: Vec<Object>,
    symbol_table: SymbolTable,
    scopes: Vec<CompilationScope>,
}

impl Compiler {
    /// Create a compiler with a fresh symbol table. The built-in
    /// registry is predefined so `GetBuiltin` indices line up with the
    /// VM's dispatch.
    pub fn new() -> Self {
        let symbol_table = SymbolTable::new();
        for (i, builtin) in BUILTINS.iter().enumerate() {
            symbol_table.define_builtin(i, builtin.name);
        }
        Compiler::with_state(symbol_table, Vec::new())
    }

    /// Create a compiler that resumes an existing session: the REPL
    /// passes the symbol table and constants from the previous cycle so
    /// earlier definitions stay bound and constant indices stay valid.
    pub fn with_state(symbol_table: SymbolTable, constants: Vec<Object>) -> Self {
        Compiler {
            constants,
            symbol_table,
            scopes: vec![CompilationScope::default()],
        }
    }

    /// Compile a program into the current scope.
    pub fn compile(&mut self, program: &Program) -> Result<()> {
        for stmt in &program.statements {
            self.compile_statement(stmt)?;
        }
        Ok(())
    }

    /// The compiled artifact for the outermost scope.
    pub fn bytecode(&self) -> Bytecode {
        Bytecode {
            instructions: self.scopes[0].instructions.clone(),
            constants: self.constants.clone(),
        }
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn compile_statement(&mut self, stmt: &Statement) -> Result<()> {
        match stmt {
            Statement::Expression(expr) => {
                self.compile_expression(expr)?;
                self.emit(Opcode::Pop, &[]);
            }
            Statement::Let { name, value } => {
                // Define before compiling the value so a global function
                // body can refer to its own binding.
                let symbol = self.symbol_table.define(name);
                self.compile_expression(value)?;
                match symbol.scope {
                    SymbolScope::Global => self.emit(Opcode::SetGlobal, &[symbol.index]),
                    _ => self.emit(Opcode::SetLocal, &[symbol.index]),
                };
            }
            Statement::Return(value) => {
                self.compile_expression(value)?;
                self.emit(Opcode::ReturnValue, &[]);
            }
        }
        Ok(())
    }

    fn compile_block(&mut self, block: &BlockStatement) -> Result<()> {
        for stmt in &block.statements {
            self.compile_statement(stmt)?;
        }
        Ok(())
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn compile_expression(&mut self, expr: &Expression) -> Result<()> {
        match expr {
            Expression::IntegerLiteral(value) => {
                let index = self.add_constant(Object::Integer(*value));
                self.emit(Opcode::Constant, &[index]);
            }
            Expression::StringLiteral(value) => {
                let index = self.add_constant(Object::string(value.as_str()));
                self.emit(Opcode::Constant, &[index]);
            }
            Expression::Boolean(true) => {
                self.emit(Opcode::True, &[]);
            }
            Expression::Boolean(false) => {
                self.emit(Opcode::False, &[]);
            }
            Expression::Identifier(name) => {
                let symbol = self
                    .symbol_table
                    .resolve(name)
                    .ok_or_else(|| CompileError::UndefinedVariable(name.clone()))?;
                self.load_symbol(&symbol);
            }
            Expression::Prefix { operator, right } => {
                self.compile_expression(right)?;
                match operator {
                    PrefixOperator::Bang => self.emit(Opcode::Bang, &[]),
                    PrefixOperator::Minus => self.emit(Opcode::Minus, &[]),
                };
            }
            Expression::Infix {
                left,
                operator,
                right,
            } => {
                // There is no less-than opcode: compile the operands in
                // swapped order and emit GreaterThan.
                if *operator == InfixOperator::Lt {
                    self.compile_expression(right)?;
                    self.compile_expression(left)?;
                    self.emit(Opcode::GreaterThan, &[]);
                    return Ok(());
                }

                self.compile_expression(left)?;
                self.compile_expression(right)?;
                match operator {
                    InfixOperator::Plus => self.emit(Opcode::Add, &[]),
                    InfixOperator::Minus => self.emit(Opcode::Sub, &[]),
                    InfixOperator::Asterisk => self.emit(Opcode::Mul, &[]),
                    InfixOperator::Slash => self.emit(Opcode::Div, &[]),
                    InfixOperator::Gt => self.emit(Opcode::GreaterThan, &[]),
                    InfixOperator::Eq => self.emit(Opcode::Equal, &[]),
                    InfixOperator::NotEq => self.emit(Opcode::NotEqual, &[]),
                    InfixOperator::Lt => unreachable!("handled above"),
                };
            }
            Expression::If {
                condition,
                consequence,
                alternative,
            } => {
                self.compile_expression(condition)?;

                // Placeholder operand, backpatched below.
                let jump_not_truthy_pos = self.emit(Opcode::JumpNotTruthy, &[9999]);

                self.compile_block(consequence)?;
                if self.last_instruction_is(Opcode::Pop) {
                    self.remove_last_pop();
                }

                let jump_pos = self.emit(Opcode::Jump, &[9999]);

                let after_consequence = self.current_instructions().len();
                self.change_operand(jump_not_truthy_pos, after_consequence);

                match alternative {
                    Some(alternative) => {
                        self.compile_block(alternative)?;
                        if self.last_instruction_is(Opcode::Pop) {
                            self.remove_last_pop();
                        }
                    }
                    None => {
                        self.emit(Opcode::Null, &[]);
                    }
                }

                let after_alternative = self.current_instructions().len();
                self.change_operand(jump_pos, after_alternative);
            }
            Expression::ArrayLiteral(elements) => {
                for element in elements {
                    self.compile_expression(element)?;
                }
                self.emit(Opcode::Array, &[elements.len()]);
            }
            Expression::HashLiteral(pairs) => {
                // Stable iteration order for testability: sort the keys
                // by their textual representation.
                let mut sorted: Vec<_> = pairs.iter().collect();
                sorted.sort_by_key(|(key, _)| key.to_string());

                for (key, value) in sorted {
                    self.compile_expression(key)?;
                    self.compile_expression(value)?;
                }
                self.emit(Opcode::Hash, &[pairs.len() * 2]);
            }
            Expression::Index { left, index } => {
                self.compile_expression(left)?;
                self.compile_expression(index)?;
                self.emit(Opcode::Index, &[]);
            }
            Expression::Function(function) => {
                self.compile_function_literal(function)?;
            }
            Expression::Call {
                function,
                arguments,
            } => {
                self.compile_expression(function)?;
                for arg in arguments {
                    self.compile_expression(arg)?;
                }
                self.emit(Opcode::Call, &[arguments.len()]);
            }
        }
        Ok(())
    }

    fn compile_function_literal(&mut self, function: &FunctionLiteral) -> Result<()> {
        self.enter_scope();

        if let Some(name) = &function.name {
            self.symbol_table.define_function_name(name);
        }
        for parameter in &function.parameters {
            self.symbol_table.define(parameter);
        }

        self.compile_block(&function.body)?;

        // An expression-statement result at the end of the body becomes
        // the implicit return value.
        if self.last_instruction_is(Opcode::Pop) {
            self.replace_last_pop_with_return();
        }
        if !self.last_instruction_is(Opcode::ReturnValue) {
            self.emit(Opcode::Return, &[]);
        }

        let free_symbols = self.symbol_table.free_symbols();
        let num_locals = self.symbol_table.num_definitions();
        let instructions = self.leave_scope();

        // Load each captured variable in the enclosing scope, in the
        // order the free list recorded them; the VM copies them into
        // the closure.
        for symbol in &free_symbols {
            self.load_symbol(symbol);
        }

        let compiled = CompiledFunction {
            instructions,
            num_locals,
            num_parameters: function.parameters.len(),
        };
        let index = self.add_constant(Object::CompiledFunction(Rc::new(compiled)));
        self.emit(Opcode::Closure, &[index, free_symbols.len()]);
        Ok(())
    }

    fn load_symbol(&mut self, symbol: &Symbol) {
        match symbol.scope {
            SymbolScope::Global => self.emit(Opcode::GetGlobal, &[symbol.index]),
            SymbolScope::Local => self.emit(Opcode::GetLocal, &[symbol.index]),
            SymbolScope::Builtin => self.emit(Opcode::GetBuiltin, &[symbol.index]),
            SymbolScope::Free => self.emit(Opcode::GetFree, &[symbol.index]),
            SymbolScope::Function => self.emit(Opcode::CurrentClosure, &[]),
        };
    }

    // =========================================================================
    // Emit helpers
    // =========================================================================

    /// Append a constant to the pool and return its index. The pool is
    /// append-only, so indices handed out earlier stay valid.
    fn add_constant(&mut self, obj: Object) -> usize {
        self.constants.push(obj);
        self.constants.len() - 1
    }

    /// Encode and append an instruction, returning its offset.
    fn emit(&mut self, op: Opcode, operands: &[usize]) -> usize {
        let instruction = make(op, operands);
        let position = self.current_scope_mut().instructions.add(&instruction);

        let scope = self.current_scope_mut();
        scope.previous_instruction = scope.last_instruction;
        scope.last_instruction = Some(EmittedInstruction {
            opcode: op,
            position,
        });

        position
    }

    fn current_scope_mut(&mut self) -> &mut CompilationScope {
        self.scopes.last_mut().expect("compiler has no scope")
    }

    fn current_instructions(&self) -> &Instructions {
        &self.scopes.last().expect("compiler has no scope").instructions
    }

    fn last_instruction_is(&self, op: Opcode) -> bool {
        self.scopes
            .last()
            .and_then(|scope| scope.last_instruction)
            .is_some_and(|last| last.opcode == op)
    }

    fn remove_last_pop(&mut self) {
        let scope = self.current_scope_mut();
        let last = scope.last_instruction.expect("no instruction to remove");
        scope.instructions.truncate(last.position);
        scope.last_instruction = scope.previous_instruction;
    }

    /// Rewrite the operand of the jump emitted at `position` now that
    /// the target offset is known. Operand widths are fixed, so the
    /// replacement is the same length as the placeholder.
    fn change_operand(&mut self, position: usize, operand: usize) {
        let op = Opcode::from_byte(self.current_instructions().bytes()[position])
            .expect("backpatching a valid instruction");
        let instruction = make(op, &[operand]);
        self.current_scope_mut()
            .instructions
            .replace_at(position, &instruction);
    }

    fn replace_last_pop_with_return(&mut self) {
        let scope = self.current_scope_mut();
        let last = scope.last_instruction.as_mut().expect("no last instruction");
        let position = last.position;
        last.opcode = Opcode::ReturnValue;
        scope
            .instructions
            .replace_at(position, &make(Opcode::ReturnValue, &[]));
    }

    fn enter_scope(&mut self) {
        self.scopes.push(CompilationScope::default());
        self.symbol_table = self.symbol_table.enclosed();
    }

    fn leave_scope(&mut self) -> Instructions {
        let scope = self.scopes.pop().expect("leave_scope without enter_scope");
        self.symbol_table = self
            .symbol_table
            .outer()
            .expect("left the outermost symbol scope");
        scope.instructions
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}
