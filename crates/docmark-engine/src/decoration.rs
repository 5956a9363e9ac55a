//! Ephemeral markers for the rendering layer. Decorations are derived from
//! an [`EditorState`] after every transaction and never reach the document
//! or its markup.

use crate::autocomplete::AttributeKey;
use crate::selection::Selection;
use crate::state::EditorState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecorationKind {
    /// The trigger and query of an open attribute menu.
    PendingAutocomplete {
        query: String,
        candidates: Vec<AttributeKey>,
        highlighted: usize,
    },
    /// Widget marking an active attribute cursor.
    AttributeCursor,
}

/// A marker over the half-open range `from..to`. Widgets have
/// `from == to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoration {
    pub from: usize,
    pub to: usize,
    pub kind: DecorationKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecorationSet {
    decorations: Vec<Decoration>,
}

impl DecorationSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn for_state(state: &EditorState) -> Self {
        let mut decorations = Vec::new();
        if let (Some(pending), Some(query)) = (
            state.autocomplete().pending(),
            state.autocomplete().query(state.doc()),
        ) {
            let candidates = state.candidates();
            let highlighted = pending.highlighted.min(candidates.len().saturating_sub(1));
            decorations.push(Decoration {
                from: pending.from,
                to: pending.to,
                kind: DecorationKind::PendingAutocomplete {
                    query,
                    candidates,
                    highlighted,
                },
            });
        }
        if let Selection::AttributeCursor(cursor) = state.selection() {
            // drawn just inside the block the cursor sits before
            let at = cursor.pos() + 1;
            decorations.push(Decoration {
                from: at,
                to: at,
                kind: DecorationKind::AttributeCursor,
            });
        }
        Self { decorations }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Decoration> {
        self.decorations.iter()
    }

    pub fn len(&self) -> usize {
        self.decorations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decorations.is_empty()
    }

    /// The open autocomplete menu, if any.
    pub fn pending(&self) -> Option<&Decoration> {
        self.decorations
            .iter()
            .find(|d| matches!(d.kind, DecorationKind::PendingAutocomplete { .. }))
    }
}
