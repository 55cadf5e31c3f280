//! Compiler Errors
//!
//! Internal invariant failures of the template pipeline. These abort a compile and are
//! distinct from `ParseError`s, which describe problems in the user's template and are
//! collected on the job instead.

use crate::template::pipeline::ir::enums::OpKind;
use crate::template::pipeline::ir::handle::XrefId;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompilerError {
    #[error("op list {expected} cannot splice relative to an op owned by list {actual}")]
    OpListOwnership { expected: usize, actual: usize },

    #[error("op handle {index} does not refer to a live op in list {list}")]
    StaleOp { list: usize, index: usize },

    #[error("slot for {0:?} read before slot allocation")]
    UnresolvedSlot(XrefId),

    #[error("expected all {list} ops to have been compiled, but got {kind:?}")]
    UnreifiedOp { list: &'static str, kind: OpKind },

    #[error("unsupported template node: {0}")]
    UnsupportedNode(String),

    #[error("unsupported expression in constant key: {0}")]
    UnsupportedConstantKey(String),

    #[error("view {0:?} is unnamed")]
    UnnamedView(XrefId),

    #[error("no view with id {0:?}")]
    UnknownView(XrefId),

    #[error("no lexical reads should remain, but found read of {0}")]
    UnresolvedName(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("AssertionError: {0}")]
    Invariant(String),
}

pub type Result<T, E = CompilerError> = std::result::Result<T, E>;

/// Shorthand for an `Err(CompilerError::Invariant(..))`.
pub fn invariant<T>(msg: impl Into<String>) -> Result<T> {
    Err(CompilerError::Invariant(msg.into()))
}
