//! This library implements a virtual machine for *structure matching with
//! explanation*: programs match a finite sequence of input items, and the
//! machine reports not just whether the input matched but *why*. For
//! programs written to do so, it can also enumerate what would have had to
//! be different for a failing input to match.
//!
//! # How it Works
//!
//! From a very high level, a match is performed as follows:
//!
//! 1. A frontend compiles its surface structure (a pattern, a grammar, a
//!    schema) into a [`program::Program`] using the
//!    [`program::assembler::Assembler`]. The instruction set is tiny:
//!    `test` consumes an input item, `jump` forks to any number of targets,
//!    `record` emits an explanatory value, `bad` penalises an
//!    interpretation, and `accept` finishes one.
//! 2. The [`vm::Vm`] pulls items from an input adapter one at a time. At
//!    each item, every live thread runs through its zero-input instructions
//!    breadth-first; threads that pass a `test` survive into the next
//!    generation, threads that converge on the same instruction are merged,
//!    and threads that loop without consuming input are pruned.
//! 3. Every thread drags a [`vm::trace::Trace`] behind it: a directed
//!    acyclic graph of the program counters it moved through and the values
//!    it recorded, with joins wherever histories converged.
//! 4. When the input runs out, the accepting and failing traces are
//!    compacted and handed back in a [`vm::MatchResult`].
//!
//! # Basic Usage
//!
//! For the most basic usage, it is sufficient to build a machine with
//! [`compile`] and call [`vm::Vm::execute_iter`]:
//!
//! ```
//! use match_tracer::{compile, Assembler};
//!
//! let vm = compile(|asm: &mut Assembler<char, &str, ()>| {
//!     asm.test(|item, _| *item == 'h');
//!     asm.record("saw h");
//!     asm.test(|item, _| *item == 'i');
//!     asm.accept();
//! });
//!
//! let result = vm.execute_iter("hi".chars(), &()).unwrap();
//! assert!(result.success);
//! assert_eq!(result.accepting_traces.len(), 1);
//! assert_eq!(result.accepting_traces[0].records, vec!["saw h"]);
//!
//! let result = vm.execute_iter("ho".chars(), &()).unwrap();
//! assert!(!result.success);
//! assert_eq!(result.failing_traces.len(), 1);
//! ```

#![warn(clippy::all, clippy::cargo, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Allows for better API naming

pub mod constant;
pub mod error;
pub mod program;
pub mod vm;
pub mod watchdog;

// Re-exports to provide the library interface.
pub use program::{
    assembler::{Assembler, JumpHandle},
    Instruction, Pc, Program,
};
pub use vm::{trace::Trace, Config, MatchResult, Vm};

use watchdog::{DynWatchdog, LazyWatchdog};

/// Compiles a new virtual machine whose program is built by `build`, with
/// the default configuration and no watchdog restrictions.
///
/// The callback receives a fresh [`Assembler`] and emits the program into
/// it; the finished machine is immutable and reusable.
pub fn compile<T, R, C>(build: impl FnOnce(&mut Assembler<T, R, C>)) -> Vm<T, R, C>
where
    R: Clone,
{
    compile_with(build, Config::default(), LazyWatchdog.in_rc())
}

/// Compiles a new virtual machine whose program is built by `build`,
/// executing under `config` and polling `watchdog`.
pub fn compile_with<T, R, C>(
    build: impl FnOnce(&mut Assembler<T, R, C>),
    config: Config,
    watchdog: DynWatchdog,
) -> Vm<T, R, C>
where
    R: Clone,
{
    let mut asm = Assembler::new();
    build(&mut asm);
    Vm::new(asm.finish(), config, watchdog)
}
