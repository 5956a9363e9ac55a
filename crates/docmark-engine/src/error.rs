use thiserror::Error;

use crate::markup::Diagnostic;

/// Errors produced by the editing core.
///
/// Command inapplicability is deliberately not represented here: commands
/// report it through [`CommandOutcome::Inapplicable`](crate::commands::CommandOutcome).
#[derive(Debug, Error)]
pub enum EditorError {
    /// The schema is unusable, e.g. a structural role is claimed by zero or
    /// several node types. Fatal at startup.
    #[error("schema configuration error: {0}")]
    Configuration(String),

    /// A position outside `0..=size` of the document it was resolved against.
    #[error("position {pos} is outside the document (size {size})")]
    OutOfRange { pos: usize, size: usize },

    /// A step would produce a tree violating a content expression. The
    /// transaction holding it is never applied.
    #[error("invalid edit: {0}")]
    InvalidEdit(String),

    /// Strict parsing found problems in the markup.
    #[error("malformed markup ({} problem(s))", .0.len())]
    MalformedMarkup(Vec<Diagnostic>),
}

pub type Result<T, E = EditorError> = std::result::Result<T, E>;

impl EditorError {
    pub(crate) fn invalid_edit(msg: impl Into<String>) -> Self {
        EditorError::InvalidEdit(msg.into())
    }
}
