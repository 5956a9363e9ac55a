//! # Selections
//!
//! A selection is a value: plain positions into a specific document. After
//! a transaction it is mapped into the new document, and it falls back to
//! the nearest valid selection when its old form no longer fits.

mod attribute_cursor;

pub use attribute_cursor::AttributeCursor;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EditorError, Result};
use crate::model::{Node, ResolvedPos, Slice};
use crate::transform::{Assoc, Mapping};

/// Search direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dir {
    Backward,
    Forward,
}

impl Dir {
    /// Moves `pos` by `n` in this direction.
    pub fn step(self, pos: usize, n: usize) -> usize {
        match self {
            Dir::Forward => pos + n,
            Dir::Backward => pos.saturating_sub(n),
        }
    }

    pub fn reverse(self) -> Dir {
        match self {
            Dir::Forward => Dir::Backward,
            Dir::Backward => Dir::Forward,
        }
    }
}

/// A text range or caret inside inline content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextSelection {
    pub anchor: usize,
    pub head: usize,
}

impl TextSelection {
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    pub fn caret(pos: usize) -> Self {
        Self::new(pos, pos)
    }
}

/// A single selected node, spanning `from..to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeSelection {
    from: usize,
    to: usize,
}

impl NodeSelection {
    /// Selects the node starting at `pos`.
    pub fn create(doc: &Node, pos: usize) -> Result<Self> {
        let node = doc.node_at(pos).ok_or_else(|| {
            EditorError::invalid_edit(format!("no node to select at position {pos}"))
        })?;
        Ok(Self {
            from: pos,
            to: pos + node.node_size(),
        })
    }

    /// Whether `node` can be selected on its own.
    pub fn is_selectable(node: &Node) -> bool {
        !node.is_text() && node.node_type().is_selectable()
    }

    pub fn from(&self) -> usize {
        self.from
    }

    pub fn to(&self) -> usize {
        self.to
    }
}

/// The selection a pointer drag from `anchor` to `head` produces. A
/// collapsed drag onto an attribute gap becomes an attribute cursor.
pub fn create_selection_between(anchor: &ResolvedPos<'_>, head: &ResolvedPos<'_>) -> Selection {
    match AttributeCursor::between(anchor, head) {
        Some(cursor) => Selection::AttributeCursor(cursor),
        None => Selection::text(anchor.pos(), head.pos()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Text(TextSelection),
    Node(NodeSelection),
    AttributeCursor(AttributeCursor),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum SelectionJson {
    Text { anchor: usize, head: usize },
    Node { anchor: usize },
    AttributeCursor { pos: usize },
}

impl Selection {
    pub fn caret(pos: usize) -> Selection {
        Selection::Text(TextSelection::caret(pos))
    }

    pub fn text(anchor: usize, head: usize) -> Selection {
        Selection::Text(TextSelection::new(anchor, head))
    }

    pub fn anchor(&self) -> usize {
        match self {
            Selection::Text(t) => t.anchor,
            Selection::Node(n) => n.from,
            Selection::AttributeCursor(c) => c.pos(),
        }
    }

    pub fn head(&self) -> usize {
        match self {
            Selection::Text(t) => t.head,
            Selection::Node(n) => n.to,
            Selection::AttributeCursor(c) => c.pos(),
        }
    }

    pub fn from(&self) -> usize {
        self.anchor().min(self.head())
    }

    pub fn to(&self) -> usize {
        self.anchor().max(self.head())
    }

    pub fn is_empty(&self) -> bool {
        self.from() == self.to()
    }

    /// The selected content. An attribute cursor selects nothing.
    pub fn content(&self, doc: &Node) -> Result<Slice> {
        match self {
            Selection::AttributeCursor(_) => Ok(Slice::empty()),
            _ => doc.slice(self.from(), self.to()),
        }
    }

    /// Maps this selection through `mapping` into `doc`.
    pub fn map(&self, doc: &Node, mapping: &Mapping) -> Selection {
        match self {
            Selection::Text(t) => {
                let head = doc.resolve_clamped(mapping.map(t.head, Assoc::Right));
                if !head.parent().inline_content() {
                    return Selection::near(&head, Dir::Forward);
                }
                let anchor = doc.resolve_clamped(mapping.map(t.anchor, Assoc::Right));
                let anchor = if anchor.parent().inline_content() {
                    anchor.pos()
                } else {
                    head.pos()
                };
                Selection::text(anchor, head.pos())
            }
            Selection::Node(n) => {
                let result = mapping.map_result(n.from, Assoc::Right);
                let rpos = doc.resolve_clamped(result.pos);
                if result.deleted {
                    return Selection::near(&rpos, Dir::Forward);
                }
                match NodeSelection::create(doc, result.pos) {
                    Ok(sel) => Selection::Node(sel),
                    Err(_) => Selection::near(&rpos, Dir::Forward),
                }
            }
            Selection::AttributeCursor(c) => c.map(doc, mapping),
        }
    }

    /// Finds a valid selection near `rpos`, searching in `bias` first.
    pub fn near(rpos: &ResolvedPos<'_>, bias: Dir) -> Selection {
        Selection::find_from(rpos, bias, false)
            .or_else(|| Selection::find_from(rpos, bias.reverse(), false))
            .unwrap_or_else(|| Selection::caret(rpos.pos()))
    }

    /// Finds the first cursor position from `rpos` in direction `dir`,
    /// optionally only text positions.
    pub fn find_from(rpos: &ResolvedPos<'_>, dir: Dir, text_only: bool) -> Option<Selection> {
        let doc = rpos.doc();
        if rpos.parent().inline_content() {
            return Some(Selection::caret(rpos.pos()));
        }
        if let Some(found) = find_selection_in(
            doc,
            rpos.parent(),
            rpos.pos(),
            rpos.index(rpos.depth()),
            dir,
            text_only,
        ) {
            return Some(found);
        }
        for depth in (0..rpos.depth()).rev() {
            let found = match dir {
                Dir::Backward => find_selection_in(
                    doc,
                    rpos.node(depth),
                    rpos.before(depth + 1)?,
                    rpos.index(depth),
                    dir,
                    text_only,
                ),
                Dir::Forward => find_selection_in(
                    doc,
                    rpos.node(depth),
                    rpos.after(depth + 1)?,
                    rpos.index(depth) + 1,
                    dir,
                    text_only,
                ),
            };
            if found.is_some() {
                return found;
            }
        }
        None
    }

    pub fn at_start(doc: &Node) -> Selection {
        find_selection_in(doc, doc, 0, 0, Dir::Forward, false)
            .unwrap_or_else(|| Selection::caret(0))
    }

    pub fn at_end(doc: &Node) -> Selection {
        find_selection_in(
            doc,
            doc,
            doc.content_size(),
            doc.child_count(),
            Dir::Backward,
            false,
        )
        .unwrap_or_else(|| Selection::caret(doc.content_size()))
    }

    pub fn to_json(&self) -> Value {
        let json = match self {
            Selection::Text(t) => SelectionJson::Text {
                anchor: t.anchor,
                head: t.head,
            },
            Selection::Node(n) => SelectionJson::Node { anchor: n.from },
            Selection::AttributeCursor(c) => SelectionJson::AttributeCursor { pos: c.pos() },
        };
        serde_json::to_value(json).unwrap_or_default()
    }

    /// Rebuilds a selection from [`Selection::to_json`] output against `doc`.
    pub fn from_json(doc: &Node, value: &Value) -> Result<Selection> {
        let json = SelectionJson::deserialize(value)
            .map_err(|e| EditorError::invalid_edit(format!("invalid selection JSON: {e}")))?;
        match json {
            SelectionJson::Text { anchor, head } => {
                doc.resolve(anchor)?;
                doc.resolve(head)?;
                Ok(Selection::text(anchor, head))
            }
            SelectionJson::Node { anchor } => {
                doc.resolve(anchor)?;
                Ok(Selection::Node(NodeSelection::create(doc, anchor)?))
            }
            SelectionJson::AttributeCursor { pos } => {
                let rpos = doc.resolve(pos)?;
                AttributeCursor::at(&rpos)
                    .map(Selection::AttributeCursor)
                    .ok_or_else(|| {
                        EditorError::invalid_edit(format!(
                            "position {pos} is not a valid attribute cursor position"
                        ))
                    })
            }
        }
    }
}

fn find_selection_in(
    doc: &Node,
    node: &Node,
    pos: usize,
    index: usize,
    dir: Dir,
    text_only: bool,
) -> Option<Selection> {
    if node.inline_content() {
        return Some(Selection::caret(pos));
    }
    let mut pos = pos;
    let indices: Box<dyn Iterator<Item = usize>> = match dir {
        Dir::Forward => Box::new(index..node.child_count()),
        Dir::Backward => Box::new((0..index.min(node.child_count())).rev()),
    };
    for i in indices {
        let child = node.child(i);
        if !child.is_atom() {
            let inner_index = match dir {
                Dir::Forward => 0,
                Dir::Backward => child.child_count(),
            };
            if let Some(inner) =
                find_selection_in(doc, child, dir.step(pos, 1), inner_index, dir, text_only)
            {
                return Some(inner);
            }
        } else if !text_only && NodeSelection::is_selectable(child) {
            let at = match dir {
                Dir::Forward => pos,
                Dir::Backward => pos - child.node_size(),
            };
            return NodeSelection::create(doc, at).ok().map(Selection::Node);
        }
        pos = dir.step(pos, child.node_size());
    }
    None
}
