//! # Document Model
//!
//! Immutable document trees addressed by integer positions.
//!
//! Positions count tokens in a flattened view of the tree: entering or
//! leaving a non-leaf node is one token, a non-text leaf is one token, and
//! each Unicode scalar of text is one token. The document node's own
//! boundaries are not counted, so a document's positions run from `0` to
//! its content size.
//!
//! ```text
//! doc( paragraph("ab") )
//!     0   1  2  3    4
//! ```

mod attrs;
mod fragment;
mod json;
mod mark;
mod node;
mod replace;
mod resolve;
mod slice;

pub use attrs::{AttrValue, Attrs, attrs};
pub use fragment::Fragment;
pub use mark::{Mark, same_set};
pub use node::{Node, char_len, char_slice};
pub use resolve::ResolvedPos;
pub use slice::Slice;

#[cfg(test)]
mod tests;
