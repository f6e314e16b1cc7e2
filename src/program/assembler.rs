//! This module contains the [`Assembler`], the frontend-facing builder for
//! [`Program`]s.

use std::rc::Rc;

use crate::program::{Instruction, Pc, Program};

/// A handle to an emitted [`Instruction::Jump`], used to patch its target
/// list after further instructions have been emitted.
///
/// Handles index the program under construction and are only meaningful for
/// the assembler that produced them.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct JumpHandle(Pc);

/// An incremental builder for [`Program`]s.
///
/// Each emit method appends exactly one instruction and returns its [`Pc`]
/// (or, for jumps, a [`JumpHandle`]). [`Assembler::here`] reports the
/// position the next instruction will land at, which is what branch
/// compilers use to record "where I am now".
///
/// # Forward Jumps
///
/// The target of a branch is frequently not known until the branch body has
/// been emitted. The supported idiom is to emit `jump(vec![])` up front,
/// compile the bodies, and then patch targets in via
/// [`Assembler::push_target`]:
///
/// ```
/// use match_tracer::Assembler;
///
/// let mut asm: Assembler<char, (), ()> = Assembler::new();
/// let fork = asm.jump(vec![]);
/// let left = asm.here();
/// asm.accept();
/// let right = asm.here();
/// asm.accept();
/// asm.set_targets(fork, vec![left, right]);
///
/// let program = asm.finish();
/// assert_eq!(program.len(), 3);
/// ```
///
/// # Validation
///
/// The assembler performs none. Unpatched jumps, unreachable accepts and
/// out-of-bounds targets all produce programs that execute without error but
/// fail to match.
pub struct Assembler<T, R, C> {
    /// The instructions emitted so far.
    instructions: Vec<Instruction<T, R, C>>,
}

impl<T, R, C> Assembler<T, R, C> {
    /// Constructs a new assembler containing no instructions.
    #[must_use]
    pub fn new() -> Self {
        let instructions = Vec::new();
        Self { instructions }
    }

    /// Gets the position at which the next emitted instruction will land.
    ///
    /// # Panics
    ///
    /// Panics if the program under construction already contains [`Pc::MAX`]
    /// instructions. This is a programmer bug.
    #[must_use]
    pub fn here(&self) -> Pc {
        Pc::try_from(self.instructions.len())
            .unwrap_or_else(|_| panic!("Program length must not exceed {}", Pc::MAX))
    }

    /// Emits an instruction and returns the position it landed at.
    fn emit(&mut self, instruction: Instruction<T, R, C>) -> Pc {
        let pc = self.here();
        self.instructions.push(instruction);
        pc
    }

    /// Emits a [`Instruction::Test`] that consumes one input item and keeps
    /// the thread alive if `func` returns `true`.
    pub fn test(&mut self, func: impl Fn(&T, &C) -> bool + 'static) -> Pc {
        self.emit(Instruction::Test(Rc::new(func)))
    }

    /// Emits a [`Instruction::Jump`] fanning out to `targets` in order,
    /// returning a handle for later patching.
    pub fn jump(&mut self, targets: impl Into<Vec<Pc>>) -> JumpHandle {
        JumpHandle(self.emit(Instruction::Jump(targets.into())))
    }

    /// Emits a [`Instruction::Record`] that emits a clone of `data`.
    pub fn record(&mut self, data: R) -> Pc {
        self.emit(Instruction::Record { data, func: None })
    }

    /// Emits a [`Instruction::Record`] whose emitted value is computed by
    /// `func` from `data`, the current input index and the options value. A
    /// [`None`] return from `func` emits nothing.
    pub fn record_with(&mut self, data: R, func: impl Fn(&R, usize, &C) -> Option<R> + 'static) -> Pc {
        self.emit(Instruction::Record {
            data,
            func: Some(Rc::new(func)),
        })
    }

    /// Emits a [`Instruction::Bad`] adding `cost` to the executing thread's
    /// badness. The conventional unit penalty is a cost of 1.
    pub fn bad(&mut self, cost: usize) -> Pc {
        self.emit(Instruction::Bad { cost, func: None })
    }

    /// Emits a [`Instruction::Bad`] whose cost only applies when `func`
    /// returns `true` for the run's options value.
    pub fn bad_if(&mut self, cost: usize, func: impl Fn(&C) -> bool + 'static) -> Pc {
        self.emit(Instruction::Bad {
            cost,
            func: Some(Rc::new(func)),
        })
    }

    /// Emits an [`Instruction::Accept`].
    pub fn accept(&mut self) -> Pc {
        self.emit(Instruction::Accept)
    }

    /// Appends `target` to the target list of the jump addressed by
    /// `handle`.
    ///
    /// # Panics
    ///
    /// Panics if `handle` does not address a jump instruction in this
    /// assembler. Handles are only ever minted by [`Assembler::jump`], so
    /// this is a programmer bug (usually a handle from a different
    /// assembler).
    pub fn push_target(&mut self, handle: JumpHandle, target: Pc) {
        self.targets_mut(handle).push(target);
    }

    /// Replaces the target list of the jump addressed by `handle`.
    ///
    /// # Panics
    ///
    /// Panics if `handle` does not address a jump instruction in this
    /// assembler.
    pub fn set_targets(&mut self, handle: JumpHandle, targets: impl Into<Vec<Pc>>) {
        *self.targets_mut(handle) = targets.into();
    }

    /// Gets the mutable target list behind `handle`.
    fn targets_mut(&mut self, handle: JumpHandle) -> &mut Vec<Pc> {
        match self.instructions.get_mut(handle.0 as usize) {
            Some(Instruction::Jump(targets)) => targets,
            _ => panic!("Handle {handle:?} does not address a jump instruction"),
        }
    }

    /// Freezes the assembled instructions into an immutable [`Program`].
    #[must_use]
    pub fn finish(self) -> Program<T, R, C> {
        Program::new(self.instructions)
    }
}

impl<T, R, C> Default for Assembler<T, R, C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use crate::program::{assembler::Assembler, Instruction};

    #[test]
    fn reports_positions_during_emission() {
        let mut asm: Assembler<char, (), ()> = Assembler::new();
        assert_eq!(asm.here(), 0);

        let first = asm.test(|item, _| *item == 'a');
        assert_eq!(first, 0);
        assert_eq!(asm.here(), 1);

        let second = asm.accept();
        assert_eq!(second, 1);
        assert_eq!(asm.here(), 2);
    }

    #[test]
    fn patches_forward_jumps() {
        let mut asm: Assembler<char, (), ()> = Assembler::new();
        let fork = asm.jump(vec![]);
        let left = asm.accept();
        let right = asm.accept();
        asm.push_target(fork, left);
        asm.push_target(fork, right);

        let program = asm.finish();
        match program.instruction(0) {
            Some(Instruction::Jump(targets)) => assert_eq!(targets, &vec![left, right]),
            _ => panic!("Expected a jump at position 0"),
        }
    }

    #[test]
    fn replaces_jump_targets() {
        let mut asm: Assembler<char, (), ()> = Assembler::new();
        let fork = asm.jump(vec![7]);
        let target = asm.accept();
        asm.set_targets(fork, vec![target]);

        let program = asm.finish();
        match program.instruction(0) {
            Some(Instruction::Jump(targets)) => assert_eq!(targets, &vec![target]),
            _ => panic!("Expected a jump at position 0"),
        }
    }

    #[test]
    #[should_panic(expected = "does not address a jump instruction")]
    fn rejects_handles_that_address_other_instructions() {
        let mut asm: Assembler<char, (), ()> = Assembler::new();
        let fork = asm.jump(vec![]);
        asm.accept();

        // Forge a handle pointing at the accept by abusing a second
        // assembler's jump at the same position.
        let mut other: Assembler<char, (), ()> = Assembler::new();
        other.accept();
        let bogus = other.jump(vec![]);
        drop(other);

        let _ = fork;
        asm.push_target(bogus, 0);
    }
}
