//! # Schema Registry
//!
//! Node and mark types, their content expressions, and the structural
//! roles the attribute machinery relies on.
//!
//! Type ids are indices in declaration order. Group membership follows the
//! same order, which decides the default type picked when content has to
//! be filled in.

mod content;
mod markdoc;

pub use content::{ContentExpr, ContentTerm};
pub use markdoc::{ELIGIBLE_GROUP, markdoc_schema};

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use crate::error::{EditorError, Result};
use crate::model::{AttrValue, Attrs, Fragment, Mark, Node};

/// The roles that link the attribute cursor and commands to concrete node
/// types. Exactly one node type may claim each role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructuralRole {
    /// Wraps an attributes node and the block it annotates.
    AttributesContainer,
    /// Holds the attribute list.
    Attributes,
    /// A single `key = value` entry.
    Attribute,
}

/// Declared attribute of a node or mark type.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrSpec {
    pub name: String,
    /// `None` makes the attribute required.
    pub default: Option<AttrValue>,
}

/// Declarative description of a node type, compiled by [`SchemaBuilder`].
#[derive(Debug, Clone)]
pub struct NodeSpec {
    name: String,
    content: String,
    groups: Vec<String>,
    attrs: Vec<AttrSpec>,
    inline: bool,
    atom: bool,
    selectable: bool,
    marks: bool,
    code: bool,
    leaf_text: Option<String>,
    role: Option<StructuralRole>,
}

impl NodeSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: String::new(),
            groups: Vec::new(),
            attrs: Vec::new(),
            inline: false,
            atom: false,
            selectable: true,
            marks: true,
            code: false,
            leaf_text: None,
            role: None,
        }
    }

    pub fn content(mut self, expr: &str) -> Self {
        self.content = expr.to_string();
        self
    }

    /// Space separated group names.
    pub fn group(mut self, groups: &str) -> Self {
        self.groups = groups.split_whitespace().map(str::to_string).collect();
        self
    }

    pub fn attr(mut self, name: &str, default: Option<AttrValue>) -> Self {
        self.attrs.push(AttrSpec {
            name: name.to_string(),
            default,
        });
        self
    }

    pub fn inline(mut self) -> Self {
        self.inline = true;
        self
    }

    pub fn atom(mut self) -> Self {
        self.atom = true;
        self
    }

    pub fn not_selectable(mut self) -> Self {
        self.selectable = false;
        self
    }

    /// Disallows marks on the inline content of this node.
    pub fn no_marks(mut self) -> Self {
        self.marks = false;
        self
    }

    pub fn code(mut self) -> Self {
        self.code = true;
        self
    }

    pub fn leaf_text(mut self, text: &str) -> Self {
        self.leaf_text = Some(text.to_string());
        self
    }

    pub fn role(mut self, role: StructuralRole) -> Self {
        self.role = Some(role);
        self
    }
}

/// Declarative description of a mark type.
#[derive(Debug, Clone)]
pub struct MarkSpec {
    name: String,
    attrs: Vec<AttrSpec>,
    inclusive: bool,
}

impl MarkSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            inclusive: true,
        }
    }

    pub fn attr(mut self, name: &str, default: Option<AttrValue>) -> Self {
        self.attrs.push(AttrSpec {
            name: name.to_string(),
            default,
        });
        self
    }

    /// Text typed at the mark's end does not pick it up.
    pub fn exclusive(mut self) -> Self {
        self.inclusive = false;
        self
    }
}

#[derive(Debug)]
pub struct NodeType {
    id: usize,
    name: String,
    groups: Vec<String>,
    content: ContentExpr,
    attrs: Vec<AttrSpec>,
    inline: bool,
    atom: bool,
    selectable: bool,
    marks: bool,
    code: bool,
    text: bool,
    leaf_text: Option<String>,
    role: Option<StructuralRole>,
    inline_content: bool,
}

impl PartialEq for NodeType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.name == other.name
    }
}

impl NodeType {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    pub fn content(&self) -> &ContentExpr {
        &self.content
    }

    pub fn attr_specs(&self) -> &[AttrSpec] {
        &self.attrs
    }

    pub fn is_text(&self) -> bool {
        self.text
    }

    pub fn is_leaf(&self) -> bool {
        self.content.is_empty()
    }

    pub fn is_inline(&self) -> bool {
        self.inline
    }

    pub fn is_block(&self) -> bool {
        !self.inline
    }

    pub fn inline_content(&self) -> bool {
        self.inline_content
    }

    pub fn is_textblock(&self) -> bool {
        self.is_block() && self.inline_content
    }

    pub fn is_atom(&self) -> bool {
        self.is_leaf() || self.atom
    }

    pub fn is_selectable(&self) -> bool {
        self.selectable
    }

    pub fn allows_marks(&self) -> bool {
        self.marks
    }

    pub fn is_code(&self) -> bool {
        self.code
    }

    pub fn leaf_text(&self) -> Option<&str> {
        self.leaf_text.as_deref()
    }

    pub fn role(&self) -> Option<StructuralRole> {
        self.role
    }

    /// Whether nodes of this type may be wrapped in an attributes container.
    pub fn can_be_in_attributes_container(&self) -> bool {
        self.in_group(ELIGIBLE_GROUP)
    }

    fn has_required_attrs(&self) -> bool {
        self.attrs.iter().any(|a| a.default.is_none())
    }

    /// Completes `given` with defaults. Unknown keys are dropped and a
    /// missing required attribute is an error.
    pub fn compute_attrs(&self, given: Option<&Attrs>) -> Result<Attrs> {
        let mut out = Attrs::new();
        for spec in &self.attrs {
            let value = given
                .and_then(|g| g.get(&spec.name).cloned())
                .or_else(|| spec.default.clone())
                .ok_or_else(|| {
                    EditorError::invalid_edit(format!(
                        "no value supplied for attribute {} of {}",
                        spec.name, self.name
                    ))
                })?;
            out.insert(spec.name.clone(), value);
        }
        Ok(out)
    }

    pub fn valid_content(&self, content: &Fragment) -> bool {
        self.check_content(content).is_ok()
    }

    /// Checks child types against the content expression and marks
    /// against the mark policy.
    pub fn check_content(&self, content: &Fragment) -> Result<()> {
        let ids: Vec<usize> = content.iter().map(|c| c.node_type().id()).collect();
        if !self.content.matches(&ids) {
            let names: Vec<&str> = content.iter().map(Node::type_name).collect();
            return Err(EditorError::invalid_edit(format!(
                "invalid content for {} ({}): [{}]",
                self.name,
                self.content.source(),
                names.join(", ")
            )));
        }
        if !self.marks
            && let Some(marked) = content.iter().find(|c| !c.marks().is_empty())
        {
            return Err(EditorError::invalid_edit(format!(
                "{} does not allow marks on {}",
                self.name,
                marked.type_name()
            )));
        }
        Ok(())
    }

    /// Two types can be joined when they accept the same content.
    pub fn compatible_content(&self, other: &NodeType) -> bool {
        self.id == other.id || self.content == other.content
    }
}

#[derive(Debug)]
pub struct MarkType {
    rank: usize,
    name: String,
    attrs: Vec<AttrSpec>,
    inclusive: bool,
}

impl MarkType {
    /// Position in the canonical mark order.
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inclusive(&self) -> bool {
        self.inclusive
    }

    pub fn compute_attrs(&self, given: Option<&Attrs>) -> Result<Attrs> {
        let mut out = Attrs::new();
        for spec in &self.attrs {
            let value = given
                .and_then(|g| g.get(&spec.name).cloned())
                .or_else(|| spec.default.clone())
                .ok_or_else(|| {
                    EditorError::invalid_edit(format!(
                        "no value supplied for attribute {} of mark {}",
                        spec.name, self.name
                    ))
                })?;
            out.insert(spec.name.clone(), value);
        }
        Ok(out)
    }
}

#[derive(Debug, Default)]
pub struct SchemaBuilder {
    nodes: Vec<NodeSpec>,
    marks: Vec<MarkSpec>,
    top_node: Option<String>,
}

impl SchemaBuilder {
    pub fn node(mut self, spec: NodeSpec) -> Self {
        self.nodes.push(spec);
        self
    }

    pub fn mark(mut self, spec: MarkSpec) -> Self {
        self.marks.push(spec);
        self
    }

    /// Type of the document node. Defaults to `doc`.
    pub fn top_node(mut self, name: &str) -> Self {
        self.top_node = Some(name.to_string());
        self
    }

    pub fn build(self) -> Result<Schema> {
        let mut node_index = HashMap::new();
        let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
        for (id, spec) in self.nodes.iter().enumerate() {
            if node_index.insert(spec.name.clone(), id).is_some() {
                return Err(EditorError::Configuration(format!(
                    "node type {} declared twice",
                    spec.name
                )));
            }
            for group in &spec.groups {
                groups.entry(group.clone()).or_default().push(id);
            }
        }
        let text = *node_index
            .get("text")
            .ok_or_else(|| EditorError::Configuration("schema has no text type".into()))?;
        let top_name = self.top_node.as_deref().unwrap_or("doc");
        let top = *node_index.get(top_name).ok_or_else(|| {
            EditorError::Configuration(format!("top node type {top_name} is not declared"))
        })?;

        let resolve = |name: &str| {
            node_index
                .get(name)
                .map(|id| vec![*id])
                .or_else(|| groups.get(name).cloned())
        };
        let inline: Vec<bool> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(id, s)| s.inline || id == text)
            .collect();

        let mut nodes = Vec::with_capacity(self.nodes.len());
        for (id, spec) in self.nodes.into_iter().enumerate() {
            let content = ContentExpr::parse(&spec.content, &resolve)?;
            let inline_content = content
                .terms()
                .iter()
                .flat_map(|t| t.alternatives())
                .any(|alt| inline[*alt]);
            nodes.push(Arc::new(NodeType {
                id,
                text: id == text,
                inline: inline[id],
                name: spec.name,
                groups: spec.groups,
                content,
                attrs: spec.attrs,
                atom: spec.atom,
                selectable: spec.selectable,
                marks: spec.marks,
                code: spec.code,
                leaf_text: spec.leaf_text,
                role: spec.role,
                inline_content,
            }));
        }

        let mut mark_index = HashMap::new();
        let mut marks = Vec::with_capacity(self.marks.len());
        for (rank, spec) in self.marks.into_iter().enumerate() {
            if mark_index.insert(spec.name.clone(), rank).is_some() {
                return Err(EditorError::Configuration(format!(
                    "mark type {} declared twice",
                    spec.name
                )));
            }
            marks.push(Arc::new(MarkType {
                rank,
                name: spec.name,
                attrs: spec.attrs,
                inclusive: spec.inclusive,
            }));
        }

        debug!(
            "built schema with {} node types and {} mark types",
            nodes.len(),
            marks.len()
        );
        Ok(Schema {
            nodes,
            marks,
            node_index,
            mark_index,
            text,
            top,
        })
    }
}

/// Registry of node and mark types. Shared immutably, usually as
/// `Arc<Schema>`.
#[derive(Debug)]
pub struct Schema {
    nodes: Vec<Arc<NodeType>>,
    marks: Vec<Arc<MarkType>>,
    node_index: HashMap<String, usize>,
    mark_index: HashMap<String, usize>,
    text: usize,
    top: usize,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn node_type(&self, name: &str) -> Option<&Arc<NodeType>> {
        self.node_index.get(name).map(|id| &self.nodes[*id])
    }

    /// Like [`Schema::node_type`] but a missing type is a configuration
    /// error.
    pub fn require_node_type(&self, name: &str) -> Result<&Arc<NodeType>> {
        self.node_type(name).ok_or_else(|| {
            EditorError::Configuration(format!("schema has no node type {name}"))
        })
    }

    pub fn node_types(&self) -> &[Arc<NodeType>] {
        &self.nodes
    }

    pub fn mark_type(&self, name: &str) -> Option<&Arc<MarkType>> {
        self.mark_index.get(name).map(|id| &self.marks[*id])
    }

    pub fn mark_types(&self) -> &[Arc<MarkType>] {
        &self.marks
    }

    pub fn text_type(&self) -> &Arc<NodeType> {
        &self.nodes[self.text]
    }

    pub fn top_node_type(&self) -> &Arc<NodeType> {
        &self.nodes[self.top]
    }

    /// The unique node type claiming `role`. Zero or several claimants is
    /// a configuration error.
    pub fn role_type(&self, role: StructuralRole) -> Result<&Arc<NodeType>> {
        let mut claimants = self.nodes.iter().filter(|t| t.role == Some(role));
        match (claimants.next(), claimants.next()) {
            (Some(t), None) => Ok(t),
            (None, _) => Err(EditorError::Configuration(format!(
                "no node type has the {role:?} role"
            ))),
            (Some(a), Some(b)) => Err(EditorError::Configuration(format!(
                "the {role:?} role is claimed by both {} and {}",
                a.name, b.name
            ))),
        }
    }

    /// Fails unless every structural role is claimed exactly once.
    pub fn check_roles(&self) -> Result<()> {
        for role in [
            StructuralRole::AttributesContainer,
            StructuralRole::Attributes,
            StructuralRole::Attribute,
        ] {
            self.role_type(role)?;
        }
        Ok(())
    }

    /// Node types that may be wrapped in an attributes container.
    pub fn eligible_types(&self) -> impl Iterator<Item = &Arc<NodeType>> {
        self.nodes.iter().filter(|t| t.can_be_in_attributes_container())
    }

    pub fn text(&self, text: impl Into<String>, marks: Vec<Mark>) -> Node {
        Node::new_text(self.text_type(), text.into(), marks)
    }

    pub fn mark(&self, name: &str, attrs: Option<&Attrs>) -> Result<Mark> {
        let mark_type = self
            .mark_type(name)
            .ok_or_else(|| EditorError::invalid_edit(format!("unknown mark type {name}")))?;
        let attrs = mark_type.compute_attrs(attrs)?;
        Ok(Mark::new(Arc::clone(mark_type), attrs))
    }

    /// Creates a checked node of the named type.
    pub fn node(&self, name: &str, attrs: Option<&Attrs>, content: Vec<Node>) -> Result<Node> {
        let node_type = self
            .node_type(name)
            .ok_or_else(|| EditorError::invalid_edit(format!("unknown node type {name}")))?;
        Node::create_checked(node_type, attrs, Fragment::from_nodes(content), Vec::new())
    }

    /// Creates a node of `node_type`, filling required content with
    /// minimal default children.
    pub fn create_and_fill(&self, node_type: &Arc<NodeType>, attrs: Option<&Attrs>) -> Result<Node> {
        self.fill(node_type, attrs, 0)
    }

    fn fill(&self, node_type: &Arc<NodeType>, attrs: Option<&Attrs>, depth: usize) -> Result<Node> {
        if depth > 32 || node_type.is_text() {
            return Err(EditorError::Configuration(format!(
                "content of {} cannot be filled",
                node_type.name
            )));
        }
        let mut children = Vec::new();
        for term in node_type.content.terms() {
            if term.min() == 0 {
                continue;
            }
            let default = term
                .alternatives()
                .iter()
                .map(|id| &self.nodes[*id])
                .find(|t| !t.is_text() && !t.has_required_attrs())
                .ok_or_else(|| {
                    EditorError::Configuration(format!(
                        "no default child type for {} in {}",
                        node_type.content.source(),
                        node_type.name
                    ))
                })?;
            for _ in 0..term.min() {
                children.push(self.fill(default, None, depth + 1)?);
            }
        }
        Node::create_checked(node_type, attrs, Fragment::from_nodes(children), Vec::new())
    }
}
