use crate::error::{EditorError, Result};

use super::mark::Mark;
use super::node::Node;

#[derive(Debug, Clone, Copy)]
struct PathStep<'a> {
    node: &'a Node,
    index: usize,
    /// Absolute position where the child at `index` starts.
    offset: usize,
}

/// A document position together with the chain of ancestors containing it.
///
/// Depth 0 is the document itself; `depth()` is the innermost node whose
/// content holds the position.
#[derive(Debug, Clone)]
pub struct ResolvedPos<'a> {
    pos: usize,
    path: Vec<PathStep<'a>>,
    parent_offset: usize,
}

impl<'a> ResolvedPos<'a> {
    pub(crate) fn resolve(doc: &'a Node, pos: usize) -> Result<Self> {
        let size = doc.content_size();
        if pos > size {
            return Err(EditorError::OutOfRange { pos, size });
        }
        Ok(Self::resolve_unchecked(doc, pos))
    }

    pub(crate) fn resolve_unchecked(doc: &'a Node, pos: usize) -> Self {
        let mut path = Vec::new();
        let mut start = 0;
        let mut parent_offset = pos;
        let mut node = doc;
        loop {
            let (index, offset) = node.content().find_index(parent_offset);
            let rem = parent_offset - offset;
            path.push(PathStep {
                node,
                index,
                offset: start + offset,
            });
            if rem == 0 {
                break;
            }
            let child = node.child(index);
            if child.is_text() {
                break;
            }
            node = child;
            parent_offset = rem - 1;
            start += offset + 1;
        }
        Self {
            pos,
            path,
            parent_offset,
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }

    /// Offset of the position inside its parent's content.
    pub fn parent_offset(&self) -> usize {
        self.parent_offset
    }

    pub fn node(&self, depth: usize) -> &'a Node {
        self.path[depth].node
    }

    pub fn parent(&self) -> &'a Node {
        self.node(self.depth())
    }

    pub fn doc(&self) -> &'a Node {
        self.node(0)
    }

    /// Index into the node at `depth` of the child the position is in or
    /// before.
    pub fn index(&self, depth: usize) -> usize {
        self.path[depth].index
    }

    pub fn index_after(&self, depth: usize) -> usize {
        let at_boundary = depth == self.depth() && self.text_offset() == 0;
        self.index(depth) + usize::from(!at_boundary)
    }

    /// Position at the start of the content of the node at `depth`.
    pub fn start(&self, depth: usize) -> usize {
        if depth == 0 {
            0
        } else {
            self.path[depth - 1].offset + 1
        }
    }

    pub fn end(&self, depth: usize) -> usize {
        self.start(depth) + self.node(depth).content_size()
    }

    /// Position directly before the node at `depth`. `depth` may be one
    /// more than `self.depth()`, meaning the node after the position.
    pub fn before(&self, depth: usize) -> Option<usize> {
        if depth == 0 || depth > self.depth() + 1 {
            return None;
        }
        if depth == self.depth() + 1 {
            return Some(self.pos);
        }
        Some(self.path[depth - 1].offset)
    }

    /// Position directly after the node at `depth`.
    pub fn after(&self, depth: usize) -> Option<usize> {
        if depth == 0 || depth > self.depth() + 1 {
            return None;
        }
        if depth == self.depth() + 1 {
            return self.node_after().map(|n| self.pos + n.node_size());
        }
        Some(self.path[depth - 1].offset + self.node(depth).node_size())
    }

    /// Offset into a text node when the position points inside one.
    pub fn text_offset(&self) -> usize {
        self.pos - self.path[self.depth()].offset
    }

    pub fn node_after(&self) -> Option<Node> {
        let parent = self.parent();
        let index = self.index(self.depth());
        let child = parent.maybe_child(index)?;
        let off = self.text_offset();
        if off > 0 {
            Some(child.cut(off, child.node_size()))
        } else {
            Some(child.clone())
        }
    }

    pub fn node_before(&self) -> Option<Node> {
        let parent = self.parent();
        let index = self.index(self.depth());
        let off = self.text_offset();
        if off > 0 {
            return Some(parent.child(index).cut(0, off));
        }
        if index == 0 {
            None
        } else {
            Some(parent.child(index - 1).clone())
        }
    }

    /// Absolute position of child `index` of the node at `depth`.
    pub fn pos_at_index(&self, index: usize, depth: usize) -> usize {
        let node = self.node(depth);
        let mut pos = self.start(depth);
        for i in 0..index.min(node.child_count()) {
            pos += node.child(i).node_size();
        }
        pos
    }

    /// Deepest depth whose node contains both this position and `pos`.
    pub fn shared_depth(&self, pos: usize) -> usize {
        (1..=self.depth())
            .rev()
            .find(|&d| self.start(d) <= pos && self.end(d) >= pos)
            .unwrap_or(0)
    }

    /// Marks that text inserted here would receive.
    pub fn marks(&self) -> Vec<Mark> {
        let parent = self.parent();
        let index = self.index(self.depth());
        if parent.content_size() == 0 {
            return Vec::new();
        }
        if self.text_offset() > 0 {
            return parent.child(index).marks().to_vec();
        }
        let before = if index > 0 { parent.maybe_child(index - 1) } else { None };
        let after = parent.maybe_child(index);
        let (main, other) = match before {
            Some(b) => (b, after),
            None => match after {
                Some(a) => (a, None),
                None => return Vec::new(),
            },
        };
        main.marks()
            .iter()
            .filter(|m| {
                m.mark_type().inclusive() || other.is_some_and(|o| m.is_in_set(o.marks()))
            })
            .cloned()
            .collect()
    }
}
