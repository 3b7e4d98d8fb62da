//! Error types for documents and structural validation.

use thiserror::Error;

use crate::block::BlockId;
use crate::kinds::BlockType;
use crate::value::ValueKind;

/// Failure to turn a stored document into a script.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Malformed JSON or a document that does not have the expected shape.
    #[error("invalid document: {0}")]
    Json(#[from] serde_json::Error),

    /// A block names a variant this build does not know. Rejects the whole document.
    #[error("unknown block type '{0}'")]
    UnknownBlockType(String),

    /// A parameter value has the wrong JSON shape for its schema entry.
    #[error("block {block}: parameter '{name}' is malformed: {reason}")]
    MalformedParameter {
        block: BlockId,
        name: String,
        reason: String,
    },

    /// Two blocks in the document share an identity.
    #[error("duplicate block id {0}")]
    DuplicateId(BlockId),
}

/// A structural problem found without evaluating anything.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{ty} block {block}: missing required parameter '{name}'")]
    MissingParameter {
        block: BlockId,
        ty: BlockType,
        name: &'static str,
    },

    #[error("{ty} block {block}: parameter '{name}' expects {expected}, found {found}")]
    WrongValueKind {
        block: BlockId,
        ty: BlockType,
        name: &'static str,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("{ty} block {block}: {reason}")]
    InvalidParameter {
        block: BlockId,
        ty: BlockType,
        reason: String,
    },

    #[error("{ty} block {block} cannot have children")]
    UnexpectedChildren { block: BlockId, ty: BlockType },

    #[error("ELSE block {0} does not directly follow an IF block")]
    DanglingElse(BlockId),

    #[error("EVENT block {0} must be the first block of a line")]
    MisplacedEvent(BlockId),

    #[error("block id {0} appears more than once")]
    DuplicateId(BlockId),

    #[error("function '{0}' is defined more than once")]
    DuplicateFunction(String),
}

/// Result type for document operations.
pub type DocumentResult<T> = Result<T, DocumentError>;
