use log::debug;

use crate::error::Result;
use crate::model::{Fragment, Node, attrs};
use crate::schema::StructuralRole;
use crate::selection::{Dir, Selection};
use crate::state::{EditorState, Transaction};
use crate::transform::{Assoc, Step};

use super::CommandOutcome;

/// Where an attribute for a position would go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeTarget {
    /// The eligible block at `pos` is not wrapped yet.
    NeedsContainer { pos: usize },
    /// The eligible block is already wrapped; its attributes node starts
    /// at `attributes_pos`.
    CanAddAttributes { attributes_pos: usize },
}

/// Walks up from `pos` (starting with the node directly after it) to the
/// nearest node that can carry attributes.
pub fn find_attribute_target(doc: &Node, pos: usize) -> Result<Option<AttributeTarget>> {
    let rpos = doc.resolve(pos)?;
    for depth in (1..=rpos.depth() + 1).rev() {
        let node = if depth == rpos.depth() + 1 {
            match rpos.node_after() {
                Some(n) => n,
                None => continue,
            }
        } else {
            rpos.node(depth).clone()
        };
        if !node.node_type().can_be_in_attributes_container() {
            continue;
        }
        let parent = rpos.node(depth - 1);
        if parent.node_type().role() == Some(StructuralRole::AttributesContainer)
            && let Some(container_pos) = rpos.before(depth - 1)
        {
            return Ok(Some(AttributeTarget::CanAddAttributes {
                attributes_pos: container_pos + 1,
            }));
        }
        if let Some(pos) = rpos.before(depth) {
            return Ok(Some(AttributeTarget::NeedsContainer { pos }));
        }
    }
    Ok(None)
}

/// Adds attribute `key` to the block around the selection, or selects the
/// value of an existing attribute with that key.
pub fn add_attribute(state: &EditorState, key: &str) -> Result<CommandOutcome> {
    let mut tr = state.tr();
    if add_attribute_in(&mut tr, key)? {
        Ok(CommandOutcome::Applied(tr))
    } else {
        Ok(CommandOutcome::Inapplicable)
    }
}

/// [`add_attribute`] against the current document of `tr`. Returns false
/// when there is no block to attach the attribute to.
pub(crate) fn add_attribute_in(tr: &mut Transaction, key: &str) -> Result<bool> {
    let selection = tr.selection();
    let start = match &selection {
        Selection::AttributeCursor(cursor) => cursor.pos(),
        _ => {
            let rfrom = tr.doc().resolve(selection.from())?;
            let depth = rfrom.shared_depth(selection.to());
            // A selection whose ends share only the document (a top-level
            // node selection, or text spanning top-level blocks) targets the
            // block it starts in.
            rfrom.before(depth).unwrap_or(selection.from())
        }
    };
    let Some(target) = find_attribute_target(tr.doc(), start)? else {
        debug!("no block to hold attribute {key} near {start}");
        return Ok(false);
    };
    let schema = tr.schema().clone();
    let attribute_type = schema.role_type(StructuralRole::Attribute)?;
    match target {
        AttributeTarget::NeedsContainer { pos } => {
            let attribute = schema.create_and_fill(attribute_type, Some(&attrs([("key", key)])))?;
            let attributes = Node::create_checked(
                schema.role_type(StructuralRole::Attributes)?,
                None,
                Fragment::from_node(attribute),
                Vec::new(),
            )?;
            let container = schema.role_type(StructuralRole::AttributesContainer)?;
            let step = Step::wrap_in_container(tr.doc(), container, attributes, pos)?;
            tr.step(step)?;
            let mapped = tr.mapping().map(start, Assoc::Left);
            let rpos = tr.doc().resolve(mapped)?;
            if let Some(sel) = Selection::find_from(&rpos, Dir::Forward, true) {
                tr.set_selection(sel)?;
            }
            debug!("wrapped block at {pos} to add attribute {key}");
        }
        AttributeTarget::CanAddAttributes { attributes_pos } => {
            let Some(attributes) = tr.doc().node_at(attributes_pos).cloned() else {
                return Ok(false);
            };
            let mut offset = attributes_pos + 1;
            for entry in attributes.content() {
                if entry.node_type().id() == attribute_type.id()
                    && entry.attr("key").and_then(|k| k.as_str()) == Some(key)
                {
                    let doc = tr.doc();
                    let from = Selection::near(&doc.resolve(offset)?, Dir::Forward).from();
                    let to = Selection::near(&doc.resolve(offset + entry.node_size())?, Dir::Backward)
                        .to();
                    tr.set_selection(Selection::text(from, to))?;
                    debug!("attribute {key} already present, selecting its value");
                    return Ok(true);
                }
                offset += entry.node_size();
            }
            let before_closing = attributes_pos + attributes.node_size() - 1;
            let attribute = schema.create_and_fill(attribute_type, Some(&attrs([("key", key)])))?;
            tr.insert(before_closing, Fragment::from_node(attribute))?;
            let sel = Selection::near(&tr.doc().resolve(before_closing)?, Dir::Forward);
            tr.set_selection(sel)?;
            debug!("added attribute {key} to existing container");
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests;
