//! Control-flow signal produced by every block.

use crate::error::ScriptError;
use crate::value::RuntimeValue;

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResult {
    /// Continue with the next sibling.
    Success,
    /// Abort the line; propagates unchanged.
    Error(ScriptError),
    /// Leave the nearest enclosing loop.
    Break,
    /// Skip to the next iteration of the nearest enclosing loop.
    Continue,
    /// Leave the nearest enclosing function with an optional value.
    Return(Option<RuntimeValue>),
}

impl ExecutionResult {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Short label for logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error(_) => "error",
            Self::Break => "break",
            Self::Continue => "continue",
            Self::Return(_) => "return",
        }
    }
}

impl From<ScriptError> for ExecutionResult {
    fn from(error: ScriptError) -> Self {
        Self::Error(error)
    }
}

impl<T> From<Result<T, ScriptError>> for ExecutionResult {
    fn from(result: Result<T, ScriptError>) -> Self {
        match result {
            Ok(_) => Self::Success,
            Err(error) => Self::Error(error),
        }
    }
}
