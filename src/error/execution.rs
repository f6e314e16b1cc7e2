//! This module contains errors pertaining to the execution of a program by
//! the [`crate::vm::Vm`].

use thiserror::Error;

use crate::error::container;

/// Errors that abort an execution.
///
/// Note that neither match failure nor input exhaustion is an error; both
/// are ordinary outcomes surfaced through [`crate::vm::MatchResult`].
/// Malformed programs are not errors either: threads that step out of
/// bounds, or through a jump with no targets, are pruned silently.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("Execution was stopped by the watchdog")]
    StoppedByWatchdog,
}

/// An execution error with an associated program counter.
pub type LocatedError = container::Located<Error>;

/// The result type for operations that may abort an execution.
pub type Result<T> = std::result::Result<T, LocatedError>;

/// Make it possible to attach locations to these errors.
impl container::Locatable for Error {
    type Located = LocatedError;

    fn locate(self, pc: crate::program::Pc) -> Self::Located {
        container::Located {
            location: pc,
            payload: self,
        }
    }
}
