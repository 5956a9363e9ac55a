use std::sync::Arc;

use log::trace;

use crate::error::{EditorError, Result};
use crate::model::{Fragment, Node, Slice};
use crate::schema::NodeType;

use super::map::StepMap;

/// Replaces `from..to` with a slice.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceStep {
    pub from: usize,
    pub to: usize,
    pub slice: Slice,
    /// Refuse to run if the replaced range holds anything but node
    /// boundaries.
    pub structure: bool,
}

/// Replaces `from..to` with a slice while keeping the `gap_from..gap_to`
/// content, which is moved into the slice at offset `insert`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceAroundStep {
    pub from: usize,
    pub to: usize,
    pub gap_from: usize,
    pub gap_to: usize,
    pub slice: Slice,
    pub insert: usize,
    pub structure: bool,
}

/// An atomic, invertible document change.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Replace(ReplaceStep),
    ReplaceAround(ReplaceAroundStep),
}

impl Step {
    pub fn replace(from: usize, to: usize, slice: Slice) -> Step {
        Step::Replace(ReplaceStep {
            from,
            to,
            slice,
            structure: false,
        })
    }

    /// Wraps the block starting at `pos` in a new `container` whose first
    /// child is `attributes`. The block keeps its type, attributes and
    /// content; only its position in the tree changes.
    pub fn wrap_in_container(
        doc: &Node,
        container: &Arc<NodeType>,
        attributes: Node,
        pos: usize,
    ) -> Result<Step> {
        let node = doc.node_at(pos).ok_or_else(|| {
            EditorError::invalid_edit(format!("no node to wrap at position {pos}"))
        })?;
        if node.is_leaf() {
            return Err(EditorError::invalid_edit(format!(
                "cannot wrap leaf {} in {}",
                node.type_name(),
                container.name()
            )));
        }
        let insert = 1 + attributes.node_size() + 1;
        let shell = node.copy(Fragment::empty());
        let wrapper = Node::create_checked(
            container,
            None,
            Fragment::from_nodes([attributes, shell]),
            Vec::new(),
        )?;
        let to = pos + node.node_size();
        Ok(Step::ReplaceAround(ReplaceAroundStep {
            from: pos,
            to,
            gap_from: pos + 1,
            gap_to: to - 1,
            slice: Slice::closed(Fragment::from_node(wrapper)),
            insert,
            structure: true,
        }))
    }

    /// Applies the step, producing a new document. The input is never
    /// modified, so a failure leaves nothing half-applied.
    pub fn apply(&self, doc: &Node) -> Result<Node> {
        match self {
            Step::Replace(s) => {
                if s.structure && content_between(doc, s.from, s.to)? {
                    return Err(EditorError::invalid_edit(
                        "structure replace would overwrite content",
                    ));
                }
                doc.replace(s.from, s.to, &s.slice)
            }
            Step::ReplaceAround(s) => {
                if s.structure
                    && (content_between(doc, s.from, s.gap_from)?
                        || content_between(doc, s.gap_to, s.to)?)
                {
                    return Err(EditorError::invalid_edit(
                        "structure gap-replace would overwrite content",
                    ));
                }
                let gap = doc.slice(s.gap_from, s.gap_to)?;
                if gap.open_start > 0 || gap.open_end > 0 {
                    return Err(EditorError::invalid_edit("gap is not a flat range"));
                }
                let inserted = s.slice.insert_at(s.insert, &gap.content).ok_or_else(|| {
                    EditorError::invalid_edit("content does not fit in gap")
                })?;
                trace!(
                    "replace-around {}..{} keeping {}..{}",
                    s.from, s.to, s.gap_from, s.gap_to
                );
                doc.replace(s.from, s.to, &inserted)
            }
        }
    }

    pub fn get_map(&self) -> StepMap {
        match self {
            Step::Replace(s) => StepMap::new(vec![(s.from, s.to - s.from, s.slice.size())]),
            Step::ReplaceAround(s) => StepMap::new(vec![
                (s.from, s.gap_from - s.from, s.insert),
                (
                    s.gap_to,
                    s.to - s.gap_to,
                    s.slice.size().saturating_sub(s.insert),
                ),
            ]),
        }
    }

    /// The step that undoes this one, given the document it was applied to.
    pub fn invert(&self, doc: &Node) -> Result<Step> {
        match self {
            Step::Replace(s) => Ok(Step::Replace(ReplaceStep {
                from: s.from,
                to: s.from + s.slice.size(),
                slice: doc.slice(s.from, s.to)?,
                structure: false,
            })),
            Step::ReplaceAround(s) => {
                let gap = s.gap_to - s.gap_from;
                let removed = doc
                    .slice(s.from, s.to)?
                    .remove_between(s.gap_from - s.from, s.gap_to - s.from)?;
                Ok(Step::ReplaceAround(ReplaceAroundStep {
                    from: s.from,
                    to: s.from + s.slice.size() + gap,
                    gap_from: s.from + s.insert,
                    gap_to: s.from + s.insert + gap,
                    slice: removed,
                    insert: s.gap_from - s.from,
                    // undoing drops what the forward step wrapped around the gap
                    structure: false,
                }))
            }
        }
    }
}

/// Whether `from..to` contains anything besides node boundaries.
fn content_between(doc: &Node, from: usize, to: usize) -> Result<bool> {
    let rfrom = doc.resolve(from)?;
    let mut dist = to.saturating_sub(from);
    let mut depth = rfrom.depth();
    while dist > 0 && depth > 0 && rfrom.index_after(depth) == rfrom.node(depth).child_count() {
        depth -= 1;
        dist -= 1;
    }
    if dist > 0 {
        let mut next = rfrom.node(depth).maybe_child(rfrom.index_after(depth));
        while dist > 0 {
            match next {
                Some(n) if !n.is_leaf() => next = n.first_child(),
                _ => return Ok(true),
            }
            dist -= 1;
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attrs;
    use crate::schema::StructuralRole;
    use crate::test_support::Builder;
    use crate::transform::Assoc;
    use pretty_assertions::assert_eq;

    fn attributes(b: &Builder, key: &str) -> Node {
        let attribute = b
            .schema
            .create_and_fill(
                b.schema.role_type(StructuralRole::Attribute).unwrap(),
                Some(&attrs([("key", key)])),
            )
            .unwrap();
        b.node("attributes", None, vec![attribute])
    }

    #[test]
    fn replace_step_inverts_back_to_the_original() {
        let b = Builder::new();
        let doc = b.doc(vec![b.p("hello")]);
        let step = Step::replace(2, 4, Slice::closed(Fragment::from_node(b.text("EY"))));
        let changed = step.apply(&doc).unwrap();
        assert_eq!(changed, b.doc(vec![b.p("hEYlo")]));
        let undo = step.invert(&doc).unwrap();
        assert_eq!(undo.apply(&changed).unwrap(), doc);
    }

    #[test]
    fn wrap_moves_the_block_into_a_container() {
        let b = Builder::new();
        let doc = b.doc(vec![b.p("one"), b.h(2, "two")]);
        let container = b
            .schema
            .role_type(StructuralRole::AttributesContainer)
            .unwrap();
        let step = Step::wrap_in_container(&doc, container, attributes(&b, "id"), 5).unwrap();
        let wrapped = step.apply(&doc).unwrap();
        assert_eq!(
            wrapped,
            b.doc(vec![
                b.p("one"),
                b.container(vec![b.attr_str("id", "")], b.h(2, "two")),
            ])
        );

        // "two" starts at 6 before the wrap; the container opening, the
        // attributes node (size 6) and the new heading opening push it to 13.
        let map = step.get_map();
        assert_eq!(map.map(6, Assoc::Right), 13);
        assert_eq!(map.map(5, Assoc::Left), 5);
        assert_eq!(map.map(doc.content_size(), Assoc::Right), wrapped.content_size());

        let undo = step.invert(&doc).unwrap();
        assert_eq!(undo.apply(&wrapped).unwrap(), doc);
    }

    #[test]
    fn wrap_rejects_a_leaf() {
        let b = Builder::new();
        let doc = b.doc(vec![b.divider(), b.p("")]);
        let container = b
            .schema
            .role_type(StructuralRole::AttributesContainer)
            .unwrap();
        let err = Step::wrap_in_container(&doc, container, attributes(&b, "id"), 0).unwrap_err();
        assert!(matches!(err, EditorError::InvalidEdit(_)));
    }

    #[test]
    fn failing_step_reports_invalid_edit() {
        let b = Builder::new();
        let doc = b.doc(vec![b.p("x")]);
        let step = Step::replace(0, 3, Slice::empty());
        assert!(matches!(step.apply(&doc), Err(EditorError::InvalidEdit(_))));
        let out_of_range = Step::replace(0, 10, Slice::empty());
        assert!(matches!(
            out_of_range.apply(&doc),
            Err(EditorError::OutOfRange { .. })
        ));
    }
}
