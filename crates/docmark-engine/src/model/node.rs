use std::fmt;
use std::sync::Arc;

use crate::error::{EditorError, Result};
use crate::schema::NodeType;

use super::attrs::{AttrValue, Attrs};
use super::fragment::Fragment;
use super::mark::Mark;
use super::replace;
use super::resolve::ResolvedPos;
use super::slice::Slice;

/// A node in the document tree.
///
/// Nodes are immutable values: every edit builds new nodes and shares
/// nothing mutable with the previous version. Text nodes measure their
/// size in Unicode scalar values.
#[derive(Debug, Clone)]
pub struct Node {
    node_type: Arc<NodeType>,
    attrs: Attrs,
    content: Fragment,
    marks: Vec<Mark>,
    text: Option<String>,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.node_type.id() == other.node_type.id()
            && self.attrs == other.attrs
            && self.marks == other.marks
            && self.text == other.text
            && self.content == other.content
    }
}

impl Node {
    /// Creates a node without checking its content against the type's
    /// content expression. Attributes are completed from their defaults.
    pub fn create(
        node_type: &Arc<NodeType>,
        attrs: Option<&Attrs>,
        content: Fragment,
        marks: Vec<Mark>,
    ) -> Result<Node> {
        if node_type.is_text() {
            return Err(EditorError::invalid_edit(
                "text nodes must be created with Node::text",
            ));
        }
        Ok(Node {
            node_type: Arc::clone(node_type),
            attrs: node_type.compute_attrs(attrs)?,
            content,
            marks,
            text: None,
        })
    }

    /// Like [`Node::create`] but rejects content the type does not allow.
    pub fn create_checked(
        node_type: &Arc<NodeType>,
        attrs: Option<&Attrs>,
        content: Fragment,
        marks: Vec<Mark>,
    ) -> Result<Node> {
        node_type.check_content(&content)?;
        Node::create(node_type, attrs, content, marks)
    }

    pub(crate) fn new_text(node_type: &Arc<NodeType>, text: String, marks: Vec<Mark>) -> Node {
        Node {
            node_type: Arc::clone(node_type),
            attrs: Attrs::new(),
            content: Fragment::empty(),
            marks,
            text: Some(text),
        }
    }

    pub fn node_type(&self) -> &Arc<NodeType> {
        &self.node_type
    }

    pub fn type_name(&self) -> &str {
        self.node_type.name()
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    pub fn content(&self) -> &Fragment {
        &self.content
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn is_text(&self) -> bool {
        self.text.is_some()
    }

    pub fn is_leaf(&self) -> bool {
        self.node_type.is_leaf()
    }

    pub fn is_inline(&self) -> bool {
        self.node_type.is_inline()
    }

    pub fn is_block(&self) -> bool {
        self.node_type.is_block()
    }

    pub fn is_textblock(&self) -> bool {
        self.node_type.is_textblock()
    }

    pub fn inline_content(&self) -> bool {
        self.node_type.inline_content()
    }

    pub fn is_atom(&self) -> bool {
        self.node_type.is_atom()
    }

    /// Size of this node in positions: text length, 1 for a non-text
    /// leaf, otherwise content size plus the two boundary tokens.
    pub fn node_size(&self) -> usize {
        match &self.text {
            Some(t) => char_len(t),
            None if self.is_leaf() => 1,
            None => self.content.size() + 2,
        }
    }

    pub fn content_size(&self) -> usize {
        self.content.size()
    }

    pub fn child_count(&self) -> usize {
        self.content.child_count()
    }

    pub fn child(&self, index: usize) -> &Node {
        self.content.child(index)
    }

    pub fn maybe_child(&self, index: usize) -> Option<&Node> {
        self.content.maybe_child(index)
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.content.first_child()
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.content.last_child()
    }

    /// Same type, attributes and marks.
    pub fn same_markup(&self, other: &Node) -> bool {
        self.node_type.id() == other.node_type.id()
            && self.attrs == other.attrs
            && self.marks == other.marks
    }

    /// A copy of this node with different content.
    pub fn copy(&self, content: Fragment) -> Node {
        Node {
            node_type: Arc::clone(&self.node_type),
            attrs: self.attrs.clone(),
            content,
            marks: self.marks.clone(),
            text: None,
        }
    }

    pub(crate) fn with_text(&self, text: String) -> Node {
        Node {
            text: Some(text),
            ..self.clone()
        }
    }

    /// A copy of this node carrying `marks`.
    pub fn mark(&self, marks: Vec<Mark>) -> Node {
        Node {
            marks,
            ..self.clone()
        }
    }

    /// Cuts the node down to the content between `from` and `to`
    /// (positions relative to the start of its content).
    pub fn cut(&self, from: usize, to: usize) -> Node {
        match &self.text {
            Some(t) => {
                if from == 0 && to >= char_len(t) {
                    return self.clone();
                }
                self.with_text(char_slice(t, from, to).to_string())
            }
            None => {
                if from == 0 && to >= self.content.size() {
                    return self.clone();
                }
                self.copy(self.content.cut(from, to))
            }
        }
    }

    /// Resolves a position inside this node's content.
    pub fn resolve(&self, pos: usize) -> Result<ResolvedPos<'_>> {
        ResolvedPos::resolve(self, pos)
    }

    /// Resolves a position that is known to be bounded by a mapping,
    /// clamping it into the document.
    pub fn resolve_clamped(&self, pos: usize) -> ResolvedPos<'_> {
        ResolvedPos::resolve_unchecked(self, pos.min(self.content.size()))
    }

    /// The node starting directly at `pos`, if any.
    pub fn node_at(&self, pos: usize) -> Option<&Node> {
        let mut node = self;
        let mut pos = pos;
        loop {
            let (index, offset) = node.content.find_index(pos);
            let child = node.content.maybe_child(index)?;
            if offset == pos || child.is_text() {
                return Some(child);
            }
            pos -= offset + 1;
            node = child;
        }
    }

    /// The slice of this node's content between two positions.
    pub fn slice(&self, from: usize, to: usize) -> Result<Slice> {
        if from >= to {
            return Ok(Slice::empty());
        }
        let rfrom = self.resolve(from)?;
        let rto = self.resolve(to)?;
        let depth = rfrom.shared_depth(to);
        let start = rfrom.start(depth);
        let node = rfrom.node(depth);
        let content = node.content.cut(rfrom.pos() - start, rto.pos() - start);
        Ok(Slice::new(
            content,
            rfrom.depth() - depth,
            rto.depth() - depth,
        ))
    }

    /// Replaces `from..to` with `slice`, returning the new node. Fails if
    /// the slice does not fit the surrounding content expressions.
    pub fn replace(&self, from: usize, to: usize, slice: &Slice) -> Result<Node> {
        let rfrom = self.resolve(from)?;
        let rto = self.resolve(to)?;
        replace::replace(&rfrom, &rto, slice)
    }

    /// Whether replacing the children `from..to` with `replacement` would
    /// leave valid content.
    pub fn can_replace(&self, from: usize, to: usize, replacement: &Fragment) -> bool {
        if from > to || to > self.child_count() {
            return false;
        }
        let children = self.content.children();
        let ids: Vec<usize> = children[..from]
            .iter()
            .chain(replacement.iter())
            .chain(children[to..].iter())
            .map(|c| c.node_type.id())
            .collect();
        if !self.node_type.content().matches(&ids) {
            return false;
        }
        replacement
            .iter()
            .all(|c| self.node_type.allows_marks() || c.marks.is_empty())
    }

    pub fn nodes_between<F>(&self, from: usize, to: usize, f: &mut F)
    where
        F: FnMut(&Node, usize, Option<&Node>, usize) -> bool,
    {
        self.content.nodes_between(from, to, f, 0, Some(self));
    }

    /// Calls `f` for every descendant.
    pub fn descendants<F>(&self, f: &mut F)
    where
        F: FnMut(&Node, usize, Option<&Node>, usize) -> bool,
    {
        self.nodes_between(0, self.content.size(), f);
    }

    pub fn text_between(&self, from: usize, to: usize, block_separator: &str) -> String {
        self.content.text_between(from, to, block_separator)
    }

    pub fn text_content(&self) -> String {
        match &self.text {
            Some(t) => t.clone(),
            None => self.text_between(0, self.content.size(), ""),
        }
    }

    /// Verifies the whole subtree against the schema.
    pub fn check(&self) -> Result<()> {
        self.node_type.check_content(&self.content)?;
        for child in &self.content {
            child.check()?;
        }
        Ok(())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = &self.text {
            let mut s = format!("{text:?}");
            for mark in self.marks.iter().rev() {
                s = format!("{}({s})", mark.name());
            }
            return f.write_str(&s);
        }
        f.write_str(self.type_name())?;
        if self.content.child_count() > 0 {
            f.write_str("(")?;
            for (i, child) in self.content.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{child}")?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// Length of `s` in Unicode scalar values.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Substring of `s` between two scalar offsets, clamped to the string.
pub fn char_slice(s: &str, from: usize, to: usize) -> &str {
    let byte_at = |n: usize| {
        s.char_indices()
            .nth(n)
            .map(|(i, _)| i)
            .unwrap_or(s.len())
    };
    let start = byte_at(from);
    let end = byte_at(to.max(from));
    &s[start..end]
}
