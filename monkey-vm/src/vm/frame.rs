// monkey-vm - Call frames for the VM
// Copyright (c) 2025 The Monkey Authors. MIT licensed.

//! Call frames for the VM.

use std::rc::Rc;

use monkey_core::code::Instructions;
use monkey_core::object::Closure;

/// A call frame: the closure being executed, its instruction pointer,
/// and where its locals start in the operand stack.
#[derive(Debug, Clone)]
pub struct Frame {
    /// The executing closure. `CurrentClosure` and `GetFree` read it.
    pub closure: Rc<Closure>,

    /// Instruction pointer. Starts at -1 so the dispatch loop's
    /// increment lands on offset 0.
    pub ip: isize,

    /// Stack index of the frame's first local slot. Locals occupy
    /// `[base_pointer, base_pointer + num_locals)`; the arguments passed
    /// on the stack become the first locals without copying.
    pub base_pointer: usize,
}

impl Frame {
    /// Create a frame for a closure whose locals start at `base_pointer`.
    pub fn new(closure: Rc<Closure>, base_pointer: usize) -> Self {
        Frame {
            closure,
            ip: -1,
            base_pointer,
        }
    }

    /// The instruction stream this frame executes.
    #[inline]
    pub fn instructions(&self) -> &Instructions {
        &self.closure.func.instructions
    }
}
