use super::node::Node;

/// An ordered sequence of child nodes with a cached total size.
///
/// Adjacent text nodes carrying the same marks are always merged and empty
/// text nodes are dropped, so equal content has exactly one representation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    children: Vec<Node>,
    size: usize,
}

impl Fragment {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a fragment, normalizing text nodes.
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        let mut children: Vec<Node> = Vec::new();
        for node in nodes {
            push_normalized(&mut children, node);
        }
        let size = children.iter().map(Node::node_size).sum();
        Self { children, size }
    }

    pub fn from_node(node: Node) -> Self {
        Self::from_nodes([node])
    }

    /// Total size of the children in positions.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.children.iter()
    }

    /// The child at `index`. Panics when out of bounds, like slice indexing.
    pub fn child(&self, index: usize) -> &Node {
        &self.children[index]
    }

    pub fn maybe_child(&self, index: usize) -> Option<&Node> {
        self.children.get(index)
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.children.first()
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.children.last()
    }

    /// Finds the child index containing `pos` and the offset where that
    /// child starts. A position on a child boundary resolves to the child
    /// after it.
    pub fn find_index(&self, pos: usize) -> (usize, usize) {
        if pos == 0 {
            return (0, 0);
        }
        if pos >= self.size {
            return (self.children.len(), self.size);
        }
        let mut cur = 0;
        for (i, child) in self.children.iter().enumerate() {
            let end = cur + child.node_size();
            if end >= pos {
                if end == pos {
                    return (i + 1, end);
                }
                return (i, cur);
            }
            cur = end;
        }
        (self.children.len(), self.size)
    }

    /// The sub-fragment between two positions, cutting partially covered
    /// children.
    pub fn cut(&self, from: usize, to: usize) -> Fragment {
        if from == 0 && to >= self.size {
            return self.clone();
        }
        let mut out = Vec::new();
        if to > from {
            let mut pos = 0;
            for child in &self.children {
                if pos >= to {
                    break;
                }
                let end = pos + child.node_size();
                if end > from {
                    let piece = if pos < from || end > to {
                        if child.is_text() {
                            child.cut(from.saturating_sub(pos), (to - pos).min(child.node_size()))
                        } else {
                            child.cut(
                                from.saturating_sub(pos + 1),
                                (to.saturating_sub(pos + 1)).min(child.content_size()),
                            )
                        }
                    } else {
                        child.clone()
                    };
                    out.push(piece);
                }
                pos = end;
            }
        }
        Fragment::from_nodes(out)
    }

    /// Concatenates two fragments, merging text across the seam.
    pub fn append(&self, other: &Fragment) -> Fragment {
        if other.children.is_empty() {
            return self.clone();
        }
        if self.children.is_empty() {
            return other.clone();
        }
        Fragment::from_nodes(self.children.iter().chain(other.children.iter()).cloned())
    }

    pub fn replace_child(&self, index: usize, node: Node) -> Fragment {
        let mut children = self.children.clone();
        children[index] = node;
        Fragment::from_nodes(children)
    }

    pub fn add_to_start(&self, node: Node) -> Fragment {
        Fragment::from_nodes(std::iter::once(node).chain(self.children.iter().cloned()))
    }

    pub fn add_to_end(&self, node: Node) -> Fragment {
        Fragment::from_nodes(self.children.iter().cloned().chain(std::iter::once(node)))
    }

    /// Calls `f` for every node overlapping `from..to`, descending into
    /// children unless `f` returns `false`. `f` receives the node, its
    /// absolute start, its parent and its index in the parent.
    pub fn nodes_between<F>(
        &self,
        from: usize,
        to: usize,
        f: &mut F,
        node_start: usize,
        parent: Option<&Node>,
    ) where
        F: FnMut(&Node, usize, Option<&Node>, usize) -> bool,
    {
        let mut pos = 0;
        for (i, child) in self.children.iter().enumerate() {
            if pos >= to {
                break;
            }
            let end = pos + child.node_size();
            if end > from && f(child, node_start + pos, parent, i) && child.content_size() > 0 {
                let start = pos + 1;
                child.content().nodes_between(
                    from.saturating_sub(start),
                    (to.saturating_sub(start)).min(child.content_size()),
                    f,
                    node_start + start,
                    Some(child),
                );
            }
            pos = end;
        }
    }

    /// Text between two positions, with `block_separator` between text blocks.
    pub fn text_between(&self, from: usize, to: usize, block_separator: &str) -> String {
        let mut text = String::new();
        let mut first = true;
        self.nodes_between(
            from,
            to,
            &mut |node: &Node, pos: usize, _: Option<&Node>, _: usize| {
                let node_text = match node.text() {
                    Some(t) => {
                        let start = from.saturating_sub(pos);
                        let end = (to - pos).min(node.node_size());
                        super::node::char_slice(t, start, end).to_string()
                    }
                    None => node.node_type().leaf_text().unwrap_or_default().to_string(),
                };
                if node.is_block() && node.is_textblock() && !block_separator.is_empty() {
                    if first {
                        first = false;
                    } else {
                        text.push_str(block_separator);
                    }
                }
                text.push_str(&node_text);
                true
            },
            0,
            None,
        );
        text
    }
}

impl<'a> IntoIterator for &'a Fragment {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.children.iter()
    }
}

fn push_normalized(children: &mut Vec<Node>, node: Node) {
    if node.text().is_some_and(str::is_empty) {
        return;
    }
    if let Some(last) = children.last_mut()
        && let (Some(a), Some(b)) = (last.text(), node.text())
        && last.marks() == node.marks()
    {
        let merged = format!("{a}{b}");
        *last = last.with_text(merged);
        return;
    }
    children.push(node);
}
