//! This module contains constants that are needed throughout the codebase.

/// The default limit on the badness that any single thread of execution can
/// accumulate before it is culled from the run.
///
/// The default places no practical restriction on accumulation. It exists so
/// that callers who know their programs can bound pathological
/// interpretation blow-up via [`crate::vm::Config::with_badness_limit`].
pub const DEFAULT_BADNESS_LIMIT: usize = usize::MAX;

/// Whether failing traces are retained by default.
///
/// Retention is the useful default, as the failing traces are the
/// explanation of _why_ an input did not match. Callers that only probe for
/// success can disable it via [`crate::vm::Config::with_record_failing`].
pub const DEFAULT_RECORD_FAILING: bool = true;

/// The default number of thread-steps the scheduler takes between polls of
/// the watchdog.
pub const DEFAULT_WATCHDOG_POLL_STEPS: usize = 100;
