use std::sync::Arc;

use crate::error::Result;
use crate::model::AttrValue;

use super::{MarkSpec, NodeSpec, Schema, StructuralRole};

/// Group whose members may be annotated with attributes.
pub const ELIGIBLE_GROUP: &str = "attribute_eligible";

/// Group of the value node types an attribute may hold.
pub const EXPRESSION_GROUP: &str = "attribute_expression";

/// The document schema used by the markup parser and serializer.
///
/// Declaration order matters: `paragraph` is the first block so it is the
/// filler for empty documents, and `attribute_string` is the first
/// expression so new attributes start out as strings.
pub fn markdoc_schema() -> Result<Arc<Schema>> {
    let schema = Schema::builder()
        .node(NodeSpec::new("doc").content("block+"))
        .node(
            NodeSpec::new("paragraph")
                .content("inline*")
                .group(&format!("block {ELIGIBLE_GROUP}")),
        )
        .node(
            NodeSpec::new("heading")
                .content("inline*")
                .group(&format!("block {ELIGIBLE_GROUP}"))
                .attr("level", Some(AttrValue::Int(1))),
        )
        .node(
            NodeSpec::new("code_block")
                .content("text*")
                .group(&format!("block {ELIGIBLE_GROUP}"))
                .attr("language", Some(AttrValue::from("")))
                .code()
                .no_marks(),
        )
        .node(NodeSpec::new("blockquote").content("block+").group("block"))
        .node(
            NodeSpec::new("bullet_list")
                .content("list_item+")
                .group("block"),
        )
        .node(
            NodeSpec::new("ordered_list")
                .content("list_item+")
                .group("block")
                .attr("start", Some(AttrValue::Int(1))),
        )
        .node(NodeSpec::new("list_item").content("block+"))
        .node(NodeSpec::new("divider").group("block"))
        .node(
            NodeSpec::new("attributes_container")
                .content(&format!("attributes {ELIGIBLE_GROUP}"))
                .group("block")
                .role(StructuralRole::AttributesContainer),
        )
        .node(
            NodeSpec::new("attributes")
                .content("attribute+")
                .role(StructuralRole::Attributes)
                .not_selectable(),
        )
        .node(
            NodeSpec::new("attribute")
                .content(EXPRESSION_GROUP)
                .attr("key", Some(AttrValue::from("attribute")))
                .role(StructuralRole::Attribute),
        )
        .node(
            NodeSpec::new("attribute_string")
                .content("text*")
                .group(EXPRESSION_GROUP)
                .no_marks(),
        )
        .node(
            NodeSpec::new("attribute_number")
                .content("text*")
                .group(EXPRESSION_GROUP)
                .no_marks(),
        )
        .node(NodeSpec::new("attribute_true").group(EXPRESSION_GROUP))
        .node(NodeSpec::new("attribute_false").group(EXPRESSION_GROUP))
        .node(NodeSpec::new("attribute_null").group(EXPRESSION_GROUP))
        .node(
            NodeSpec::new("attribute_variable")
                .content("text*")
                .group(EXPRESSION_GROUP)
                .no_marks(),
        )
        .node(
            NodeSpec::new("attribute_object")
                .content("attribute*")
                .group(EXPRESSION_GROUP),
        )
        .node(NodeSpec::new("text").group("inline"))
        .node(
            NodeSpec::new("hard_break")
                .inline()
                .group("inline")
                .leaf_text("\n")
                .not_selectable(),
        )
        .mark(
            MarkSpec::new("link")
                .attr("href", None)
                .attr("title", Some(AttrValue::Null))
                .exclusive(),
        )
        .mark(MarkSpec::new("em"))
        .mark(MarkSpec::new("strong"))
        .mark(MarkSpec::new("strike"))
        .mark(MarkSpec::new("code"))
        .build()?;
    schema.check_roles()?;
    Ok(Arc::new(schema))
}
