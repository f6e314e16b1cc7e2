//! This module contains the instruction set and the [`Program`] type, a
//! sequence of instructions that is executed by the [`crate::vm::Vm`].

pub mod assembler;

use std::rc::Rc;

use derivative::Derivative;

/// A program counter: an index into the instruction sequence of a
/// [`Program`].
pub type Pc = u32;

/// The decision callback for [`Instruction::Test`].
///
/// It is handed the input item under consideration together with the options
/// value threaded through the run, and returns whether the thread survives.
pub type TestFn<T, C> = Rc<dyn Fn(&T, &C) -> bool>;

/// The emission callback for [`Instruction::Record`].
///
/// It is handed the instruction's payload, the index of the next input item
/// (equivalently, the number of items consumed so far), and the options
/// value. Returning [`None`] suppresses the emission entirely.
pub type RecordFn<R, C> = Rc<dyn Fn(&R, usize, &C) -> Option<R>>;

/// The gate callback for [`Instruction::Bad`].
///
/// Returning `false` means the badness cost is not applied for this run.
pub type CostFn<C> = Rc<dyn Fn(&C) -> bool>;

/// A single instruction in a [`Program`].
///
/// The instruction set is deliberately tiny: one opcode that consumes input
/// (`Test`), one that branches (`Jump`), and three bookkeeping opcodes that
/// execute without consuming anything (`Record`, `Bad`, `Accept`).
///
/// Instructions are parameterised over the input element type `T`, the
/// record payload type `R`, and the options type `C` that is threaded
/// through every callback for the duration of a run.
#[derive(Derivative)]
#[derivative(Clone(bound = "R: Clone"), Debug(bound = "R: std::fmt::Debug"))]
pub enum Instruction<T, R, C> {
    /// Consumes one input item; the callback decides whether the executing
    /// thread survives into the next generation.
    Test(#[derivative(Debug = "ignore")] TestFn<T, C>),

    /// Forks the executing thread to every target in order. The target list
    /// is mutable during assembly only (see
    /// [`assembler::Assembler::push_target`]); an empty list at run time
    /// silently terminates the thread.
    Jump(Vec<Pc>),

    /// Emits a value onto the executing thread's trace. Without `func` the
    /// emitted value is a clone of `data`; with `func` it is whatever the
    /// callback returns, and a [`None`] return emits nothing.
    Record {
        data: R,
        #[derivative(Debug = "ignore")]
        func: Option<RecordFn<R, C>>,
    },

    /// Adds `cost` to the executing thread's badness, unless `func` is
    /// present and returns `false`.
    Bad {
        cost: usize,
        #[derivative(Debug = "ignore")]
        func: Option<CostFn<C>>,
    },

    /// Marks the executing thread as accepting at the current input
    /// position; the thread ceases execution.
    Accept,
}

/// An immutable sequence of instructions, executable by the
/// [`crate::vm::Vm`].
///
/// # Program Validity
///
/// The program is a pure representation of an instruction sequence and
/// carries no guarantee of being well-formed. Every reachable path should
/// end in [`Instruction::Accept`] or run off a failing
/// [`Instruction::Test`]; a thread that steps past the end of the program is
/// silently dropped, as there is no implicit halt. Validity is entirely the
/// program author's problem, and malformed programs surface as missing
/// matches rather than as errors.
///
/// # Sharing
///
/// Programs hold no per-run state, so a program (or a [`crate::vm::Vm`]
/// holding one) can be executed any number of times, including over
/// interleaved inputs.
#[derive(Derivative)]
#[derivative(Clone(bound = "R: Clone"), Debug(bound = "R: std::fmt::Debug"))]
pub struct Program<T, R, C> {
    /// The instructions in execution order; [`Pc`]s index into this.
    instructions: Vec<Instruction<T, R, C>>,
}

impl<T, R, C> Program<T, R, C> {
    /// Constructs a program directly from `instructions`.
    ///
    /// Most callers want [`assembler::Assembler`] instead, which provides
    /// position bookkeeping and jump back-patching on top of this.
    ///
    /// # Panics
    ///
    /// Panics if `instructions` contains more than [`Pc::MAX`] entries. This
    /// is a programmer bug.
    #[must_use]
    pub fn new(instructions: Vec<Instruction<T, R, C>>) -> Self {
        assert!(
            Pc::try_from(instructions.len()).is_ok(),
            "Program length must not exceed {}",
            Pc::MAX
        );
        Self { instructions }
    }

    /// Gets the number of instructions in the program.
    #[allow(clippy::missing_panics_doc)] // Guarded by validation at construction
    #[must_use]
    pub fn len(&self) -> Pc {
        self.instructions
            .len()
            .try_into()
            .unwrap_or_else(|_| panic!("Program length must not exceed {}", Pc::MAX))
    }

    /// Checks if the program contains no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Gets the instruction at `pc`, if it exists.
    #[must_use]
    pub fn instruction(&self, pc: Pc) -> Option<&Instruction<T, R, C>> {
        self.instructions.get(pc as usize)
    }
}

#[cfg(test)]
mod test {
    use std::rc::Rc;

    use crate::program::{Instruction, Program};

    #[test]
    fn indexes_instructions_by_pc() {
        let program: Program<char, u8, ()> = Program::new(vec![
            Instruction::Test(Rc::new(|item, _| *item == 'x')),
            Instruction::Accept,
        ]);

        assert_eq!(program.len(), 2);
        assert!(!program.is_empty());
        assert!(matches!(program.instruction(0), Some(Instruction::Test(_))));
        assert!(matches!(program.instruction(1), Some(Instruction::Accept)));
        assert!(program.instruction(2).is_none());
    }

    #[test]
    fn can_be_empty() {
        let program: Program<char, u8, ()> = Program::new(vec![]);
        assert!(program.is_empty());
        assert_eq!(program.len(), 0);
    }
}
