use crate::model::{Node, ResolvedPos};
use crate::schema::StructuralRole;
use crate::transform::{Assoc, Mapping};

use super::{Dir, Selection};

/// A caret sitting in the gap before an attribute-eligible block, where
/// no text caret can go. It is invisible to text input; typing there
/// opens the attribute autocomplete instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeCursor {
    pos: usize,
}

impl AttributeCursor {
    /// A cursor at `rpos`, if that position is valid for one.
    pub fn at(rpos: &ResolvedPos<'_>) -> Option<Self> {
        Self::is_valid(rpos).then_some(Self { pos: rpos.pos() })
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Valid when the node starting at the position can be annotated and
    /// the position is not already inside attribute structure.
    pub fn is_valid(rpos: &ResolvedPos<'_>) -> bool {
        let Some(node) = rpos.doc().node_at(rpos.pos()) else {
            return false;
        };
        if !node.node_type().can_be_in_attributes_container() {
            return false;
        }
        !matches!(
            rpos.parent().node_type().role(),
            Some(StructuralRole::AttributesContainer | StructuralRole::Attributes)
        )
    }

    /// The cursor a collapsed pointer selection at `head` should become.
    pub fn between(anchor: &ResolvedPos<'_>, head: &ResolvedPos<'_>) -> Option<Self> {
        if anchor.pos() != head.pos() {
            return None;
        }
        Self::at(head)
    }

    /// Maps the cursor through `mapping` into `doc`, falling back to the
    /// nearest regular selection when the new position is not valid.
    pub fn map(&self, doc: &Node, mapping: &Mapping) -> Selection {
        let rpos = doc.resolve_clamped(mapping.map(self.pos, Assoc::Right));
        match Self::at(&rpos) {
            Some(cursor) => Selection::AttributeCursor(cursor),
            None => Selection::near(&rpos, Dir::Forward),
        }
    }

    /// Searches from `rpos` in direction `dir` for the next valid cursor
    /// position. Without `must_move`, `rpos` itself counts. The search
    /// never descends into text: crossing text ends it.
    pub fn find_from(rpos: &ResolvedPos<'_>, dir: Dir, must_move: bool) -> Option<usize> {
        let doc = rpos.doc();
        let mut start = rpos.clone();
        let mut must_move = must_move;
        'search: loop {
            if !must_move && Self::is_valid(&start) {
                return Some(start.pos());
            }
            let mut pos = start.pos();
            let mut next: &Node;

            // scan up
            let mut d = start.depth();
            loop {
                let parent = start.node(d);
                let has_next = match dir {
                    Dir::Forward => start.index_after(d) < parent.child_count(),
                    Dir::Backward => start.index(d) > 0,
                };
                if has_next {
                    next = match dir {
                        Dir::Forward => parent.child(start.index_after(d)),
                        Dir::Backward => parent.child(start.index(d) - 1),
                    };
                    break;
                }
                if d == 0 {
                    return None;
                }
                pos = dir.step(pos, 1);
                let cur = doc.resolve_clamped(pos);
                if Self::is_valid(&cur) {
                    return Some(pos);
                }
                d -= 1;
            }

            // then down into the next node
            loop {
                let inside = match dir {
                    Dir::Forward => next.first_child(),
                    Dir::Backward => next.last_child(),
                };
                let Some(inside) = inside else {
                    if next.is_atom() && !next.is_text() && !next.node_type().is_selectable() {
                        start = doc.resolve_clamped(dir.step(pos, next.node_size()));
                        must_move = false;
                        continue 'search;
                    }
                    break;
                };
                next = inside;
                pos = dir.step(pos, 1);
                let cur = doc.resolve_clamped(pos);
                if Self::is_valid(&cur) {
                    return Some(pos);
                }
            }
            return None;
        }
    }
}
