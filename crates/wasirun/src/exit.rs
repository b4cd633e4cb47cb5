//! # Exit signal
//!
//! `proc_exit` must abandon the guest no matter how deep the call stack is.
//! The signal rides the engine's trap channel as an error payload and is
//! turned back into a value at exactly one place: `Callee::invoke`, which
//! reports it as `Outcome::Exited`. It never surfaces as an error.

/// A voluntary termination request carrying the guest's status code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ExitSignal {
    code: i32,
}

impl ExitSignal {
    pub fn new(code: i32) -> Self {
        Self { code }
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    /// Wraps the signal for return from a host function.
    pub(crate) fn raise(self) -> wasmtime::Error {
        wasmtime::Error::new(self)
    }

    /// Recovers a signal from an engine error, if that is what it carries.
    pub(crate) fn caught(err: &wasmtime::Error) -> Option<Self> {
        err.downcast_ref::<Self>().copied()
    }
}

impl std::fmt::Display for ExitSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "exited with status {}", self.code)
    }
}

impl std::error::Error for ExitSignal {}

/// How a successful invocation ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome<R> {
    /// The export returned normally with a typed result.
    Returned(R),
    /// A host function requested termination.
    Exited(ExitSignal),
}

impl<R> Outcome<R> {
    pub fn is_exit(&self) -> bool {
        matches!(self, Self::Exited(_))
    }

    /// The returned value, or `None` if the guest exited.
    pub fn returned(self) -> Option<R> {
        match self {
            Self::Returned(value) => Some(value),
            Self::Exited(_) => None,
        }
    }

    pub fn exit_signal(&self) -> Option<ExitSignal> {
        match self {
            Self::Returned(_) => None,
            Self::Exited(signal) => Some(*signal),
        }
    }
}
