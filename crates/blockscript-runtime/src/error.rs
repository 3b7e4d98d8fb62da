//! Runtime error taxonomy.

use thiserror::Error;

/// Why a block failed.
///
/// Carried inside [`ExecutionResult::Error`](crate::ExecutionResult::Error). An error aborts the
/// rest of its line for the current trigger only; it never disables the script.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    /// Malformed authored value.
    #[error("parse error: {0}")]
    Parse(String),

    /// A value resolved to the wrong kind for the operation.
    #[error("type error: {0}")]
    Type(String),

    /// Division or modulo by zero, or an undefined domain.
    #[error("arithmetic error: {0}")]
    Arithmetic(String),

    /// An iteration, length, recursion or magnitude cap was exceeded.
    #[error("limit exceeded: {0}")]
    Bounds(String),

    /// Unknown function or variable, or an unresolvable target.
    #[error("not found: {0}")]
    Reference(String),

    /// Illegal state: duplicate loop, argument count mismatch, ...
    #[error("{0}")]
    State(String),

    /// A side effect handler reported failure.
    #[error("{kind} failed: {message}")]
    Effect { kind: String, message: String },

    /// A host capability failed.
    #[error("host error: {0}")]
    Host(#[from] HostError),
}

impl ScriptError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::Type(message.into())
    }

    pub fn arithmetic(message: impl Into<String>) -> Self {
        Self::Arithmetic(message.into())
    }

    pub fn bounds(message: impl Into<String>) -> Self {
        Self::Bounds(message.into())
    }

    pub fn reference(message: impl Into<String>) -> Self {
        Self::Reference(message.into())
    }

    pub fn state(message: impl Into<String>) -> Self {
        Self::State(message.into())
    }
}

/// Failure reported by a [`Host`](crate::Host) capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("actor {0} is not online")]
    ActorOffline(String),

    #[error("unknown world '{0}'")]
    UnknownWorld(String),

    #[error("{0}")]
    Other(String),
}

pub type ScriptResult<T> = Result<T, ScriptError>;
