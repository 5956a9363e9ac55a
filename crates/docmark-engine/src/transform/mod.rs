//! # Transforms
//!
//! Steps, position maps and the [`Transform`] accumulator that applies
//! steps in order. A transform never mutates a document: each step yields
//! a new one, and a failing step leaves the transform as it was.

mod map;
mod step;

pub use map::{Assoc, MapResult, Mapping, StepMap};
pub use step::{ReplaceAroundStep, ReplaceStep, Step};

use std::sync::Arc;

use log::trace;

use crate::error::Result;
use crate::model::{Fragment, Mark, Node, Slice};
use crate::schema::Schema;

/// An ordered list of steps applied to a starting document.
#[derive(Debug, Clone)]
pub struct Transform {
    schema: Arc<Schema>,
    docs: Vec<Node>,
    steps: Vec<Step>,
    mapping: Mapping,
    doc: Node,
}

impl Transform {
    pub fn new(schema: Arc<Schema>, doc: Node) -> Self {
        Self {
            schema,
            docs: Vec::new(),
            steps: Vec::new(),
            mapping: Mapping::new(),
            doc,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// The current document.
    pub fn doc(&self) -> &Node {
        &self.doc
    }

    /// The document before any step was applied.
    pub fn before(&self) -> &Node {
        self.docs.first().unwrap_or(&self.doc)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Maps positions in [`Transform::before`] to positions in the current
    /// document.
    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }

    /// Applies `step`. On failure nothing is recorded.
    pub fn step(&mut self, step: Step) -> Result<&mut Self> {
        let next = step.apply(&self.doc)?;
        trace!("step {} applied", self.steps.len());
        self.mapping.append_map(step.get_map());
        self.docs.push(std::mem::replace(&mut self.doc, next));
        self.steps.push(step);
        Ok(self)
    }

    pub fn replace(&mut self, from: usize, to: usize, slice: Slice) -> Result<&mut Self> {
        if from == to && slice.size() == 0 {
            return Ok(self);
        }
        self.step(Step::replace(from, to, slice))
    }

    pub fn replace_with(&mut self, from: usize, to: usize, content: Fragment) -> Result<&mut Self> {
        self.replace(from, to, Slice::closed(content))
    }

    pub fn insert(&mut self, pos: usize, content: Fragment) -> Result<&mut Self> {
        self.replace_with(pos, pos, content)
    }

    pub fn delete(&mut self, from: usize, to: usize) -> Result<&mut Self> {
        self.replace(from, to, Slice::empty())
    }

    /// Replaces `from..to` with text. Without explicit marks the text takes
    /// the marks active at `from`.
    pub fn insert_text(
        &mut self,
        text: &str,
        from: usize,
        to: usize,
        marks: Option<Vec<Mark>>,
    ) -> Result<&mut Self> {
        if text.is_empty() {
            return self.delete(from, to);
        }
        let marks = match marks {
            Some(m) => m,
            None => {
                let rfrom = self.doc.resolve(from)?;
                if rfrom.parent().node_type().allows_marks() {
                    rfrom.marks()
                } else {
                    Vec::new()
                }
            }
        };
        let node = self.schema.text(text, marks);
        self.replace_with(from, to, Fragment::from_node(node))
    }

    /// Steps that undo this transform, in application order.
    pub fn inverted_steps(&self) -> Result<Vec<Step>> {
        self.steps
            .iter()
            .zip(&self.docs)
            .rev()
            .map(|(step, doc)| step.invert(doc))
            .collect()
    }
}
