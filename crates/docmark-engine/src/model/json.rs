use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EditorError, Result};
use crate::schema::Schema;

use super::attrs::Attrs;
use super::fragment::Fragment;
use super::mark::Mark;
use super::node::Node;

#[derive(Debug, Serialize, Deserialize)]
struct NodeJson {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    attrs: Attrs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    content: Vec<NodeJson>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    marks: Vec<MarkJson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct MarkJson {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    attrs: Attrs,
}

impl From<&Mark> for MarkJson {
    fn from(mark: &Mark) -> Self {
        MarkJson {
            kind: mark.name().to_string(),
            attrs: mark.attrs().clone(),
        }
    }
}

impl From<&Node> for NodeJson {
    fn from(node: &Node) -> Self {
        NodeJson {
            kind: node.type_name().to_string(),
            attrs: node.attrs().clone(),
            content: node.content().iter().map(NodeJson::from).collect(),
            marks: node.marks().iter().map(MarkJson::from).collect(),
            text: node.text().map(str::to_string),
        }
    }
}

impl Node {
    /// JSON form: `{"type", "attrs"?, "content"?, "marks"?, "text"?}`.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(NodeJson::from(self)).unwrap_or_default()
    }

    /// Rebuilds a node from [`Node::to_json`] output, validating it
    /// against `schema`.
    pub fn from_json(schema: &Schema, value: &Value) -> Result<Node> {
        let parsed = NodeJson::deserialize(value)
            .map_err(|e| EditorError::invalid_edit(format!("invalid node JSON: {e}")))?;
        build(schema, parsed)
    }
}

fn build(schema: &Schema, json: NodeJson) -> Result<Node> {
    let marks = json
        .marks
        .iter()
        .map(|m| schema.mark(&m.kind, Some(&m.attrs)))
        .collect::<Result<Vec<_>>>()?;
    if let Some(text) = json.text {
        if json.kind != schema.text_type().name() {
            return Err(EditorError::invalid_edit(format!(
                "node of type {} carries text",
                json.kind
            )));
        }
        if text.is_empty() {
            return Err(EditorError::invalid_edit("empty text nodes are not allowed"));
        }
        return Ok(schema.text(text, marks));
    }
    let node_type = schema
        .node_type(&json.kind)
        .ok_or_else(|| EditorError::invalid_edit(format!("unknown node type {}", json.kind)))?;
    let children = json
        .content
        .into_iter()
        .map(|c| build(schema, c))
        .collect::<Result<Vec<_>>>()?;
    Node::create_checked(node_type, Some(&json.attrs), Fragment::from_nodes(children), marks)
}
