use crate::error::{EditorError, Result};

use super::fragment::Fragment;
use super::node::Node;

/// A piece of document: a fragment plus how many levels are open on
/// each side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Slice {
    pub content: Fragment,
    pub open_start: usize,
    pub open_end: usize,
}

impl Slice {
    pub fn new(content: Fragment, open_start: usize, open_end: usize) -> Self {
        Self {
            content,
            open_start,
            open_end,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// A closed slice holding `content`.
    pub fn closed(content: Fragment) -> Self {
        Self::new(content, 0, 0)
    }

    /// Size the slice adds when inserted.
    pub fn size(&self) -> usize {
        self.content
            .size()
            .saturating_sub(self.open_start + self.open_end)
    }

    /// Inserts `fragment` at `pos` (relative to the slice's open start).
    /// Returns `None` when the fragment does not fit there.
    pub fn insert_at(&self, pos: usize, fragment: &Fragment) -> Option<Slice> {
        let content = insert_into(&self.content, pos + self.open_start, fragment, None)?;
        Some(Slice::new(content, self.open_start, self.open_end))
    }

    /// Removes the flat range `from..to` (relative to the open start).
    pub fn remove_between(&self, from: usize, to: usize) -> Result<Slice> {
        let content = remove_range(&self.content, from + self.open_start, to + self.open_start)?;
        Ok(Slice::new(content, self.open_start, self.open_end))
    }
}

fn remove_range(content: &Fragment, from: usize, to: usize) -> Result<Fragment> {
    let (index, offset) = content.find_index(from);
    let (index_to, offset_to) = content.find_index(to);
    let child = content.maybe_child(index);
    if offset == from || child.is_some_and(Node::is_text) {
        if offset_to != to && !content.maybe_child(index_to).is_some_and(Node::is_text) {
            return Err(EditorError::invalid_edit("removing a non-flat range"));
        }
        return Ok(content
            .cut(0, from)
            .append(&content.cut(to, content.size())));
    }
    let Some(child) = child else {
        return Err(EditorError::invalid_edit("removing a range past the slice"));
    };
    if index != index_to {
        return Err(EditorError::invalid_edit("removing a non-flat range"));
    }
    let inner = remove_range(child.content(), from - offset - 1, to - offset - 1)?;
    Ok(content.replace_child(index, child.copy(inner)))
}

fn insert_into(
    content: &Fragment,
    dist: usize,
    insert: &Fragment,
    parent: Option<&Node>,
) -> Option<Fragment> {
    let (index, offset) = content.find_index(dist);
    let child = content.maybe_child(index);
    if offset == dist || child.is_some_and(Node::is_text) {
        if let Some(parent) = parent
            && !parent.can_replace(index, index, insert)
        {
            return None;
        }
        return Some(
            content
                .cut(0, dist)
                .append(insert)
                .append(&content.cut(dist, content.size())),
        );
    }
    let child = child?;
    let inner = insert_into(child.content(), dist - offset - 1, insert, Some(child))?;
    Some(content.replace_child(index, child.copy(inner)))
}
