use std::fmt::Formatter;

use thiserror::Error;

use crate::program::Pc;

/// An error that is localised to a particular program counter in the program
/// being executed.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub struct Located<E>
where
    E: Clone,
{
    /// The program counter at which the error occurred.
    pub location: Pc,

    /// The error data.
    pub payload: E,
}

/// Displays the error associated with the program counter at which it
/// occurred.
impl<E> std::fmt::Display for Located<E>
where
    E: std::fmt::Display + Clone,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[pc {}]: {}", self.location, self.payload)
    }
}

/// A trait for types that can have a program counter attached to them.
pub trait Locatable
where
    Self: Sized,
{
    /// The return type with the attached program counter.
    type Located;

    /// Attach the location described by `pc` to the error.
    fn locate(self, pc: Pc) -> Self::Located;
}

/// A blanket implementation that allows for attaching a location to any
/// result.
impl<T, E> Locatable for Result<T, E>
where
    E: std::error::Error + Clone,
{
    type Located = Result<T, Located<E>>;

    fn locate(self, pc: Pc) -> Self::Located {
        self.map_err(|e| Located {
            location: pc,
            payload: e,
        })
    }
}
