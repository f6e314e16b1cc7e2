//! This module contains the type definitions necessary to support monitoring
//! of in-progress executions.
//!
//! # Best-Effort Monitoring
//!
//! The monitoring provided by the watchdog is a best-effort approach: the
//! scheduler polls it between thread-steps, so a stop request takes effect
//! at the next poll rather than instantaneously. A callback that blocks
//! cannot be interrupted by the watchdog at all.

use std::{
    fmt::Debug,
    rc::Rc,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crate::constant::DEFAULT_WATCHDOG_POLL_STEPS;

/// A dynamically dispatched [`Watchdog`] instance.
pub type DynWatchdog = Rc<dyn Watchdog>;

/// The interface to an object that can be polled to see if an execution
/// needs to abort.
///
/// The interface is simple, but it can encapsulate arbitrary logic as far as
/// the virtual machine is concerned, allowing the client to implement
/// complex stop conditions such as deadlines or memory pressure.
pub trait Watchdog
where
    Self: Debug,
{
    /// Checks if the execution should halt and return an error.
    #[must_use]
    fn should_stop(&self) -> bool;

    /// Gets the number of thread-steps the scheduler should take between
    /// polls of the watchdog.
    ///
    /// Polling is cheap but not free, so implementations whose stop
    /// condition changes slowly should ask to be polled rarely.
    #[must_use]
    fn poll_every(&self) -> usize;
}

/// An implementation of the [`Watchdog`] trait that does not place any
/// restrictions on execution.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LazyWatchdog;

impl LazyWatchdog {
    /// Wraps `self` into an [`Rc`] for handing to the virtual machine.
    #[must_use]
    pub fn in_rc(self) -> Rc<dyn Watchdog> {
        Rc::new(self)
    }
}

impl Watchdog for LazyWatchdog {
    fn should_stop(&self) -> bool {
        false
    }

    fn poll_every(&self) -> usize {
        // The answer never changes, so any poll beyond the scheduler's
        // unavoidable first one is wasted work.
        usize::MAX
    }
}

/// A watchdog that stops execution based on a flag in the form of an atomic
/// boolean, typically set from another thread of the host application.
///
/// By default it requests a poll every [`DEFAULT_WATCHDOG_POLL_STEPS`]
/// thread-steps. This is configurable by calling [`Self::polling_every`].
#[derive(Clone, Debug)]
pub struct FlagWatchdog {
    /// The flag that should be set externally to stop the execution.
    flag: Arc<AtomicBool>,

    /// The number of thread-steps between polls.
    poll_steps: usize,
}

impl FlagWatchdog {
    /// Constructs a new `FlagWatchdog` wrapping the provided `flag`.
    #[must_use]
    pub fn new(flag: Arc<AtomicBool>) -> Self {
        let poll_steps = DEFAULT_WATCHDOG_POLL_STEPS;
        Self { flag, poll_steps }
    }

    /// Specifies the number of thread-steps the scheduler should take
    /// between polls of this watchdog.
    #[must_use]
    pub fn polling_every(mut self, steps: usize) -> Self {
        self.poll_steps = steps;
        self
    }

    /// Wraps the watchdog into an [`Rc`] for handing to the virtual
    /// machine.
    #[must_use]
    pub fn in_rc(self) -> Rc<dyn Watchdog> {
        Rc::new(self)
    }
}

impl Watchdog for FlagWatchdog {
    fn should_stop(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    fn poll_every(&self) -> usize {
        self.poll_steps
    }
}
