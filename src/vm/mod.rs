//! This module contains the virtual machine: a breadth-first, explanation
//! producing engine for running matching programs over finite inputs.
//!
//! The machine executes every viable interpretation of the input in
//! lock-step. Logical threads fork at [`crate::program::Instruction::Jump`]
//! instructions, suspend at [`crate::program::Instruction::Test`]
//! instructions (which consume one input item each), and converge again when
//! two of them arrive at the same instruction within the same generation.
//! Each thread drags a provenance trace behind it, and the traces of the
//! threads that accept (or fail) become the returned explanation.

pub mod data;
pub(crate) mod scheduler;
pub(crate) mod thread;
pub mod trace;

use std::rc::Rc;

use derivative::Derivative;

use crate::{
    constant::{DEFAULT_BADNESS_LIMIT, DEFAULT_RECORD_FAILING},
    error::execution,
    program::Program,
    vm::{scheduler::Scheduler, trace::Trace},
    watchdog::DynWatchdog,
};

/// The virtual machine: a compiled program plus the configuration and
/// monitoring needed to execute it.
///
/// The machine holds no per-run state, so a single instance can be executed
/// any number of times, and a cloned instance shares the underlying
/// program.
#[derive(Derivative)]
#[derivative(Clone(bound = "R: Clone"), Debug(bound = "R: std::fmt::Debug"))]
pub struct Vm<T, R, C = ()> {
    /// The program executed by this virtual machine.
    program: Program<T, R, C>,

    /// The configuration of the virtual machine.
    config: Config,

    /// A watchdog that gets polled at intervals to check whether execution
    /// needs to exit.
    watchdog: DynWatchdog,
}

impl<T, R, C> Vm<T, R, C>
where
    R: Clone,
{
    /// Constructs a new virtual machine executing `program` under `config`,
    /// polling `watchdog` for early exit.
    #[must_use]
    pub fn new(program: Program<T, R, C>, config: Config, watchdog: DynWatchdog) -> Self {
        Self {
            program,
            config,
            watchdog,
        }
    }

    /// Executes the program over the items produced by `input`, threading
    /// `options` through every callback in the program.
    ///
    /// The input adapter is called exactly once per generation advance and
    /// signals end-of-input by returning [`None`]. All traces in the
    /// returned result are compacted.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the watchdog stopped the run. Failure to match is
    /// not an error: it is reported by [`MatchResult::success`] being
    /// `false`, with the failing traces explaining what went wrong.
    pub fn execute(
        &self,
        input: impl FnMut() -> Option<T>,
        options: &C,
    ) -> execution::Result<MatchResult<R>> {
        Scheduler::new(&self.program, &self.config, &self.watchdog, options).run(input)
    }

    /// Executes the program over the items of `input`.
    ///
    /// This is [`Vm::execute`] for the common case where the input is
    /// already an iterable collection.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the watchdog stopped the run.
    pub fn execute_iter(
        &self,
        input: impl IntoIterator<Item = T>,
        options: &C,
    ) -> execution::Result<MatchResult<R>> {
        let mut items = input.into_iter();
        self.execute(move || items.next(), options)
    }

    /// Gets the program executed by this virtual machine.
    #[must_use]
    pub fn program(&self) -> &Program<T, R, C> {
        &self.program
    }

    /// Gets the configuration of this virtual machine.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// The outcome of one execution.
///
/// Trace ordering is part of the contract: both accepting and failing traces
/// appear in the order their threads were enqueued, which together with the
/// preferred-prefix ordering at joins is what lets callers pick the best
/// interpretation without further ranking.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MatchResult<R> {
    /// Whether the input matched; always equivalent to
    /// `!accepting_traces.is_empty()`.
    pub success: bool,

    /// The explanations of every way the program accepted the entire input.
    pub accepting_traces: Vec<Rc<Trace<R>>>,

    /// The explanations of every thread that could not proceed, retained
    /// for diagnostics (unless disabled via [`Config::with_record_failing`]).
    pub failing_traces: Vec<Rc<Trace<R>>>,
}

/// The configuration for the virtual machine instance.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// The maximum badness any single thread may accumulate; a thread whose
    /// badness would exceed this is retired as failing at the offending
    /// instruction.
    ///
    /// Defaults to [`DEFAULT_BADNESS_LIMIT`].
    pub badness_limit: usize,

    /// Whether failing traces are retained in the result.
    ///
    /// Defaults to [`DEFAULT_RECORD_FAILING`].
    pub record_failing: bool,
}

impl Config {
    /// Sets the `badness_limit` config parameter to `value`.
    #[must_use]
    pub fn with_badness_limit(mut self, value: usize) -> Self {
        self.badness_limit = value;
        self
    }

    /// Sets the `record_failing` config parameter to `value`.
    #[must_use]
    pub fn with_record_failing(mut self, value: bool) -> Self {
        self.record_failing = value;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        let badness_limit = DEFAULT_BADNESS_LIMIT;
        let record_failing = DEFAULT_RECORD_FAILING;
        Self {
            badness_limit,
            record_failing,
        }
    }
}
