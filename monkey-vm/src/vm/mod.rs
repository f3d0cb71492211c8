// monkey-vm - Stack-based virtual machine for Monkey
// Copyright (c) 2025 The Monkey Authors. MIT licensed.

//! Stack-based virtual machine executing Monkey bytecode.
//!
//! The VM owns a fixed-capacity operand stack, a globals store and a
//! frame stack. Local variables live *inside* the operand stack between
//! a frame's base pointer and `base_pointer + num_locals`; calling a
//! closure reserves those slots by raising `sp`, and returning restores
//! `sp` to just below the callee, removing locals, arguments and the
//! callee in one step.

pub mod frame;

use std::fmt;
use std::rc::Rc;

use im::{OrdMap, Vector};
use monkey_core::builtins::BUILTINS;
use monkey_core::code::{self, Opcode};
use monkey_core::object::{Closure, CompiledFunction, HashPair, Object};

use crate::compiler::Bytecode;

pub use frame::Frame;

/// Operand stack capacity.
pub const STACK_SIZE: usize = 2048;
/// Globals store capacity.
pub const GLOBALS_SIZE: usize = 65536;
/// Call depth capacity.
pub const MAX_FRAMES: usize = 1024;

/// Fatal runtime error. Execution halts and the VM instance is
/// poisoned; in-band `Object::Error` values produced by built-ins are
/// *not* routed through here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmError {
    /// Operand stack or frame stack exhausted.
    StackOverflow,
    /// Decoded a byte that is not an opcode.
    UnknownOpcode(u8),
    /// Binary operation on operand types it does not support.
    UnsupportedBinaryTypes {
        left: &'static str,
        right: &'static str,
    },
    /// Non-Add operation on two strings.
    UnknownStringOperator(u8),
    /// Ordering comparison on non-integer operands.
    UnknownComparison {
        opcode: u8,
        left: &'static str,
        right: &'static str,
    },
    /// Negation of a non-integer.
    UnsupportedNegation(&'static str),
    /// Integer division by zero.
    DivisionByZero,
    /// Closure call with the wrong number of arguments.
    WrongArity { want: usize, got: usize },
    /// Call of a value that is neither a closure nor a built-in.
    CallingNonFunction,
    /// `Closure` instruction pointing at a non-function constant.
    NotAFunction(String),
    /// Hash construction or lookup with an unhashable key.
    UnusableHashKey(&'static str),
    /// Index operation on an unsupported target.
    IndexNotSupported(&'static str),
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmError::StackOverflow => write!(f, "stack overflow"),
            VmError::UnknownOpcode(byte) => write!(f, "unknown opcode: {}", byte),
            VmError::UnsupportedBinaryTypes { left, right } => {
                write!(f, "unsupported types for binary operation: {} {}", left, right)
            }
            VmError::UnknownStringOperator(opcode) => {
                write!(f, "unknown string operator: {}", opcode)
            }
            VmError::UnknownComparison {
                opcode,
                left,
                right,
            } => write!(f, "unknown operator: {} ({} {})", opcode, left, right),
            VmError::UnsupportedNegation(kind) => {
                write!(f, "unsupported type for negation: {}", kind)
            }
            VmError::DivisionByZero => write!(f, "division by zero"),
            VmError::WrongArity { want, got } => {
                write!(f, "wrong number of arguments: want={}, got={}", want, got)
            }
            VmError::CallingNonFunction => write!(f, "calling non-function and non-builtin"),
            VmError::NotAFunction(value) => write!(f, "not a function: {}", value),
            VmError::UnusableHashKey(kind) => write!(f, "unusable as hash key: {}", kind),
            VmError::IndexNotSupported(kind) => {
                write!(f, "index operator not supported: {}", kind)
            }
        }
    }
}

impl std::error::Error for VmError {}

/// Result type for VM execution.
pub type Result<T> = std::result::Result<T, VmError>;

/// The Monkey virtual machine.
pub struct VM {
    constants: Vec<Object>,

    /// Operand stack. `sp` is the next free slot; the top of the stack
    /// is `stack[sp - 1]`.
    stack: Vec<Object>,
    sp: usize,

    globals: Vec<Object>,

    frames: Vec<Frame>,
}

impl VM {
    /// Create a VM for a compiled artifact with a fresh globals store.
    pub fn new(bytecode: Bytecode) -> Self {
        VM::with_globals(bytecode, vec![Object::Null; GLOBALS_SIZE])
    }

    /// Create a VM that reuses an existing globals store, so REPL
    /// cycles keep earlier definitions. Reclaim it afterwards with
    /// [`VM::into_globals`].
    pub fn with_globals(bytecode: Bytecode, globals: Vec<Object>) -> Self {
        // The main program runs as a closure over a synthetic
        // zero-argument function whose locals start at the stack bottom.
        let main_fn = CompiledFunction {
            instructions: bytecode.instructions,
            num_locals: 0,
            num_parameters: 0,
        };
        let main_closure = Closure {
            func: Rc::new(main_fn),
            free: Vec::new(),
        };

        let mut frames = Vec::with_capacity(MAX_FRAMES);
        frames.push(Frame::new(Rc::new(main_closure), 0));

        VM {
            constants: bytecode.constants,
            stack: vec![Object::Null; STACK_SIZE],
            sp: 0,
            globals,
            frames,
        }
    }

    /// Give the globals store back for the next compile/run cycle.
    pub fn into_globals(self) -> Vec<Object> {
        self.globals
    }

    /// The value most recently popped off the stack. After a completed
    /// run this is the result of the program's last expression
    /// statement (its trailing Pop leaves the value at `stack[sp]`).
    pub fn last_popped(&self) -> &Object {
        &self.stack[self.sp]
    }

    /// Execute the bytecode to completion or error.
    pub fn run(&mut self) -> Result<()> {
        loop {
            let frame = self.frames.last_mut().expect("no active frame");
            frame.ip += 1;
            let ip = frame.ip as usize;
            if ip >= frame.instructions().len() {
                break;
            }
            let byte = frame.instructions().bytes()[ip];
            let op = Opcode::from_byte(byte).ok_or(VmError::UnknownOpcode(byte))?;

            match op {
                Opcode::Constant => {
                    let index = self.read_u16_operand(ip);
                    self.push(self.constants[index].clone())?;
                }
                Opcode::Pop => {
                    self.pop();
                }

                Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div => {
                    self.execute_binary_operation(op)?;
                }
                Opcode::Equal | Opcode::NotEqual | Opcode::GreaterThan => {
                    self.execute_comparison(op)?;
                }

                Opcode::True => self.push(Object::Boolean(true))?,
                Opcode::False => self.push(Object::Boolean(false))?,
                Opcode::Null => self.push(Object::Null)?,

                Opcode::Bang => {
                    let operand = self.pop();
                    self.push(Object::Boolean(!operand.is_truthy()))?;
                }
                Opcode::Minus => {
                    let operand = self.pop();
                    match operand {
                        Object::Integer(value) => {
                            self.push(Object::Integer(value.wrapping_neg()))?
                        }
                        other => return Err(VmError::UnsupportedNegation(other.type_name())),
                    }
                }

                Opcode::Jump => {
                    let target = self.read_u16_operand(ip);
                    self.current_frame_mut().ip = target as isize - 1;
                }
                Opcode::JumpNotTruthy => {
                    let target = self.read_u16_operand(ip);
                    let condition = self.pop();
                    if !condition.is_truthy() {
                        self.current_frame_mut().ip = target as isize - 1;
                    }
                }

                Opcode::SetGlobal => {
                    let index = self.read_u16_operand(ip);
                    self.globals[index] = self.pop();
                }
                Opcode::GetGlobal => {
                    let index = self.read_u16_operand(ip);
                    self.push(self.globals[index].clone())?;
                }
                Opcode::SetLocal => {
                    let index = self.read_u8_operand(ip);
                    let base = self.current_frame().base_pointer;
                    self.stack[base + index] = self.pop();
                }
                Opcode::GetLocal => {
                    let index = self.read_u8_operand(ip);
                    let base = self.current_frame().base_pointer;
                    self.push(self.stack[base + index].clone())?;
                }

                Opcode::Array => {
                    let count = self.read_u16_operand(ip);
                    let array = self.build_array(self.sp - count, self.sp);
                    self.sp -= count;
                    self.push(array)?;
                }
                Opcode::Hash => {
                    let count = self.read_u16_operand(ip);
                    let hash = self.build_hash(self.sp - count, self.sp)?;
                    self.sp -= count;
                    self.push(hash)?;
                }
                Opcode::Index => {
                    let index = self.pop();
                    let left = self.pop();
                    self.execute_index(left, index)?;
                }

                Opcode::Call => {
                    let num_args = self.read_u8_operand(ip);
                    self.execute_call(num_args)?;
                }
                Opcode::ReturnValue => {
                    let return_value = self.pop();
                    let frame = self.frames.pop().expect("return without frame");
                    if self.frames.is_empty() {
                        // Top-level return: halt with the value exposed
                        // as the last-popped result.
                        self.push(return_value)?;
                        self.pop();
                        return Ok(());
                    }
                    self.sp = frame.base_pointer - 1;
                    self.push(return_value)?;
                }
                Opcode::Return => {
                    let frame = self.frames.pop().expect("return without frame");
                    self.sp = frame.base_pointer - 1;
                    self.push(Object::Null)?;
                }

                Opcode::Closure => {
                    let const_index = self.read_u16_operand(ip);
                    let num_free = self.read_u8_operand(ip + 2);
                    self.push_closure(const_index, num_free)?;
                }
                Opcode::GetFree => {
                    let index = self.read_u8_operand(ip);
                    let value = self.current_frame().closure.free[index].clone();
                    self.push(value)?;
                }
                Opcode::CurrentClosure => {
                    let closure = Rc::clone(&self.current_frame().closure);
                    self.push(Object::Closure(closure))?;
                }
                Opcode::GetBuiltin => {
                    let index = self.read_u8_operand(ip);
                    self.push(Object::Builtin(&BUILTINS[index]))?;
                }
            }
        }

        Ok(())
    }

    // =========================================================================
    // Frame and operand access
    // =========================================================================

    fn current_frame(&self) -> &Frame {
        self.frames.last().expect("no active frame")
    }

    fn current_frame_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("no active frame")
    }

    /// Read the big-endian u16 operand following the opcode at `ip` and
    /// advance the instruction pointer past it.
    fn read_u16_operand(&mut self, ip: usize) -> usize {
        let frame = self.current_frame_mut();
        let value = code::read_u16(&frame.instructions().bytes()[ip + 1..]) as usize;
        frame.ip += 2;
        value
    }

    /// Read the u8 operand following the opcode at `ip` and advance the
    /// instruction pointer past it.
    fn read_u8_operand(&mut self, ip: usize) -> usize {
        let frame = self.current_frame_mut();
        let value = code::read_u8(&frame.instructions().bytes()[ip + 1..]) as usize;
        frame.ip += 1;
        value
    }

    fn push(&mut self, obj: Object) -> Result<()> {
        if self.sp >= STACK_SIZE {
            return Err(VmError::StackOverflow);
        }
        self.stack[self.sp] = obj;
        self.sp += 1;
        Ok(())
    }

    /// Pop the top of the stack. The slot is left in place so
    /// [`VM::last_popped`] can still read it.
    fn pop(&mut self) -> Object {
        self.sp -= 1;
        self.stack[self.sp].clone()
    }

    // =========================================================================
    // Operations
    // =========================================================================

    fn execute_binary_operation(&mut self, op: Opcode) -> Result<()> {
        let right = self.pop();
        let left = self.pop();

        match (&left, &right) {
            (Object::Integer(a), Object::Integer(b)) => {
                self.execute_binary_integer_operation(op, *a, *b)
            }
            (Object::String(a), Object::String(b)) => {
                if op != Opcode::Add {
                    return Err(VmError::UnknownStringOperator(op as u8));
                }
                self.push(Object::string(format!("{}{}", a, b)))
            }
            _ => Err(VmError::UnsupportedBinaryTypes {
                left: left.type_name(),
                right: right.type_name(),
            }),
        }
    }

    fn execute_binary_integer_operation(&mut self, op: Opcode, a: i64, b: i64) -> Result<()> {
        let result = match op {
            Opcode::Add => a.wrapping_add(b),
            Opcode::Sub => a.wrapping_sub(b),
            Opcode::Mul => a.wrapping_mul(b),
            Opcode::Div => {
                if b == 0 {
                    return Err(VmError::DivisionByZero);
                }
                a.wrapping_div(b)
            }
            _ => unreachable!("non-arithmetic opcode {:?} dispatched as binary", op),
        };
        self.push(Object::Integer(result))
    }

    fn execute_comparison(&mut self, op: Opcode) -> Result<()> {
        let right = self.pop();
        let left = self.pop();

        if let (Object::Integer(a), Object::Integer(b)) = (&left, &right) {
            let result = match op {
                Opcode::Equal => a == b,
                Opcode::NotEqual => a != b,
                Opcode::GreaterThan => a > b,
                _ => unreachable!("non-comparison opcode {:?} dispatched as comparison", op),
            };
            return self.push(Object::Boolean(result));
        }

        match op {
            Opcode::Equal => self.push(Object::Boolean(singleton_eq(&left, &right))),
            Opcode::NotEqual => self.push(Object::Boolean(!singleton_eq(&left, &right))),
            _ => Err(VmError::UnknownComparison {
                opcode: op as u8,
                left: left.type_name(),
                right: right.type_name(),
            }),
        }
    }

    fn build_array(&self, start: usize, end: usize) -> Object {
        let elements: Vector<Object> = self.stack[start..end].iter().cloned().collect();
        Object::Array(elements)
    }

    fn build_hash(&self, start: usize, end: usize) -> Result<Object> {
        let mut pairs = OrdMap::new();
        let mut i = start;
        while i < end {
            let key = self.stack[i].clone();
            let value = self.stack[i + 1].clone();
            let hash_key = key
                .hash_key()
                .ok_or(VmError::UnusableHashKey(key.type_name()))?;
            pairs.insert(hash_key, HashPair { key, value });
            i += 2;
        }
        Ok(Object::Hash(pairs))
    }

    fn execute_index(&mut self, left: Object, index: Object) -> Result<()> {
        match (&left, &index) {
            (Object::Array(elements), Object::Integer(i)) => {
                let value = if *i < 0 || *i as usize >= elements.len() {
                    Object::Null
                } else {
                    elements[*i as usize].clone()
                };
                self.push(value)
            }
            (Object::Hash(pairs), _) => {
                let hash_key = index
                    .hash_key()
                    .ok_or(VmError::UnusableHashKey(index.type_name()))?;
                let value = pairs
                    .get(&hash_key)
                    .map(|pair| pair.value.clone())
                    .unwrap_or(Object::Null);
                self.push(value)
            }
            _ => Err(VmError::IndexNotSupported(left.type_name())),
        }
    }

    fn execute_call(&mut self, num_args: usize) -> Result<()> {
        let callee = self.stack[self.sp - 1 - num_args].clone();
        match callee {
            Object::Closure(closure) => self.call_closure(closure, num_args),
            Object::Builtin(builtin) => {
                let args = self.stack[self.sp - num_args..self.sp].to_vec();
                let result = builtin.call(&args);
                self.sp = self.sp - num_args - 1;
                self.push(result.unwrap_or(Object::Null))
            }
            _ => Err(VmError::CallingNonFunction),
        }
    }

    fn call_closure(&mut self, closure: Rc<Closure>, num_args: usize) -> Result<()> {
        if num_args != closure.func.num_parameters {
            return Err(VmError::WrongArity {
                want: closure.func.num_parameters,
                got: num_args,
            });
        }
        if self.frames.len() >= MAX_FRAMES {
            return Err(VmError::StackOverflow);
        }

        let base_pointer = self.sp - num_args;
        let num_locals = closure.func.num_locals;
        if base_pointer + num_locals > STACK_SIZE {
            return Err(VmError::StackOverflow);
        }

        self.frames.push(Frame::new(closure, base_pointer));
        // The arguments already occupy the first num_args local slots;
        // raising sp reserves the rest.
        self.sp = base_pointer + num_locals;
        Ok(())
    }

    fn push_closure(&mut self, const_index: usize, num_free: usize) -> Result<()> {
        let constant = self.constants[const_index].clone();
        let func = match &constant {
            Object::CompiledFunction(func) => Rc::clone(func),
            other => return Err(VmError::NotAFunction(other.to_string())),
        };

        let free = self.stack[self.sp - num_free..self.sp].to_vec();
        self.sp -= num_free;

        let closure = Closure { func, free };
        self.push(Object::Closure(Rc::new(closure)))
    }
}

/// Equality for non-integer operands: the canonical singletons compare
/// by identity, everything else is unequal.
fn singleton_eq(left: &Object, right: &Object) -> bool {
    match (left, right) {
        (Object::Boolean(a), Object::Boolean(b)) => a == b,
        (Object::Null, Object::Null) => true,
        _ => false,
    }
}
