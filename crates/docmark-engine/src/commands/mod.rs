//! Commands: functions from an [`EditorState`](crate::state::EditorState)
//! to a transaction, or to nothing when they do not apply there.

mod attributes;

pub use attributes::{AttributeTarget, add_attribute, find_attribute_target};
pub(crate) use attributes::add_attribute_in;

use crate::state::Transaction;

/// What running a command produced. Inapplicability is an ordinary
/// outcome the caller can use to skip re-rendering, not an error.
#[derive(Debug)]
pub enum CommandOutcome {
    Applied(Transaction),
    Inapplicable,
}

impl CommandOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, CommandOutcome::Applied(_))
    }
}
