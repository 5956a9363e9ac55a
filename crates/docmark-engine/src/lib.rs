//! Structured document editing with block-level attributes.
//!
//! A schema-checked document tree, reversible transactions over integer
//! positions, and an attribute cursor that sits between blocks so metadata
//! can be attached to them. Documents are read from and written to a
//! Markdown dialect with Markdoc `{% key=value %}` annotations.

pub mod autocomplete;
pub mod commands;
pub mod decoration;
pub mod editor;
pub mod error;
pub mod markup;
pub mod model;
pub mod schema;
pub mod selection;
pub mod state;
pub mod transform;

#[cfg(test)]
mod test_support;

// Re-export key types for easier usage
pub use commands::{CommandOutcome, add_attribute};
pub use decoration::{Decoration, DecorationKind, DecorationSet};
pub use editor::{Editor, EditorOptions, EditorUpdate, EventOutcome, Key};
pub use error::{EditorError, Result};
pub use markup::{Diagnostic, MarkupProblem, Parsed, parse, parse_strict, serialize};
pub use model::{Node, ResolvedPos};
pub use schema::{Schema, markdoc_schema};
pub use selection::{AttributeCursor, Selection};
pub use state::{EditorState, Transaction};
pub use transform::Mapping;
