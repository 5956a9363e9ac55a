//! Turns parsed blocks into document nodes.

use crate::error::Result;
use crate::model::{AttrValue, Mark, Node, attrs};
use crate::schema::Schema;

use super::annotation::{Annotation, Entry, Value};
use super::blocks::{Block, ListKind};
use super::inline::{Inline, InlineMark, parse_inline};

pub struct Converter<'s> {
    schema: &'s Schema,
}

impl<'s> Converter<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self { schema }
    }

    pub fn blocks(&self, blocks: Vec<Block>) -> Result<Vec<Node>> {
        blocks.into_iter().map(|b| self.block(b)).collect()
    }

    /// Children for a node whose content is `block+`.
    fn non_empty(&self, blocks: Vec<Block>) -> Result<Vec<Node>> {
        let nodes = self.blocks(blocks)?;
        if nodes.is_empty() {
            return Ok(vec![self.empty_paragraph()?]);
        }
        Ok(nodes)
    }

    pub fn empty_paragraph(&self) -> Result<Node> {
        self.schema.node("paragraph", None, vec![])
    }

    fn block(&self, block: Block) -> Result<Node> {
        match block {
            Block::Paragraph { text, annotation } => {
                let node = self.schema.node("paragraph", None, self.inline(&text)?)?;
                self.annotate(node, annotation)
            }
            Block::Heading {
                level,
                text,
                annotation,
            } => {
                let node = self.schema.node(
                    "heading",
                    Some(&attrs([("level", i64::from(level))])),
                    self.inline(&text)?,
                )?;
                self.annotate(node, annotation)
            }
            Block::Code {
                language,
                text,
                annotation,
            } => {
                let node = self.schema.node(
                    "code_block",
                    Some(&attrs([("language", language)])),
                    self.text(&text),
                )?;
                self.annotate(node, annotation)
            }
            Block::Quote(children) => self.schema.node("blockquote", None, self.non_empty(children)?),
            Block::List { kind, start, items } => {
                let items = items
                    .into_iter()
                    .map(|item| self.schema.node("list_item", None, self.non_empty(item)?))
                    .collect::<Result<Vec<_>>>()?;
                match kind {
                    ListKind::Bullet { .. } => self.schema.node("bullet_list", None, items),
                    ListKind::Ordered { .. } => {
                        self.schema
                            .node("ordered_list", Some(&attrs([("start", start)])), items)
                    }
                }
            }
            Block::Divider => self.schema.node("divider", None, vec![]),
        }
    }

    fn text(&self, text: &str) -> Vec<Node> {
        if text.is_empty() {
            vec![]
        } else {
            vec![self.schema.text(text, vec![])]
        }
    }

    fn inline(&self, text: &str) -> Result<Vec<Node>> {
        parse_inline(text)
            .into_iter()
            .map(|item| match item {
                Inline::Text { text, marks } => Ok(self.schema.text(text, self.marks(&marks)?)),
                Inline::HardBreak { marks } => {
                    Ok(self.schema.node("hard_break", None, vec![])?.mark(self.marks(&marks)?))
                }
            })
            .collect()
    }

    fn marks(&self, marks: &[InlineMark]) -> Result<Vec<Mark>> {
        let mut set: Vec<Mark> = vec![];
        for mark in marks {
            let mark = match mark {
                InlineMark::Link { href, title } => {
                    let title = title.clone().map_or(AttrValue::Null, AttrValue::String);
                    self.schema.mark(
                        "link",
                        Some(&attrs([("href", AttrValue::from(href.as_str())), ("title", title)])),
                    )?
                }
                InlineMark::Em => self.schema.mark("em", None)?,
                InlineMark::Strong => self.schema.mark("strong", None)?,
                InlineMark::Strike => self.schema.mark("strike", None)?,
                InlineMark::Code => self.schema.mark("code", None)?,
            };
            set = mark.add_to_set(&set);
        }
        Ok(set)
    }

    /// Wraps `node` in an attributes container when it carries an
    /// annotation.
    fn annotate(&self, node: Node, annotation: Option<Annotation>) -> Result<Node> {
        let Some(annotation) = annotation else {
            return Ok(node);
        };
        let entries = annotation
            .entries
            .into_iter()
            .map(|e| self.entry(e))
            .collect::<Result<Vec<_>>>()?;
        let attributes = self.schema.node("attributes", None, entries)?;
        self.schema
            .node("attributes_container", None, vec![attributes, node])
    }

    fn entry(&self, entry: Entry) -> Result<Node> {
        let value = self.value(entry.value)?;
        self.schema
            .node("attribute", Some(&attrs([("key", entry.key)])), vec![value])
    }

    fn value(&self, value: Value) -> Result<Node> {
        match value {
            Value::String(s) => self.schema.node("attribute_string", None, self.text(&s)),
            Value::Number(n) => self.schema.node("attribute_number", None, self.text(&n)),
            Value::Bool(true) => self.schema.node("attribute_true", None, vec![]),
            Value::Bool(false) => self.schema.node("attribute_false", None, vec![]),
            Value::Null => self.schema.node("attribute_null", None, vec![]),
            Value::Variable(path) => self.schema.node("attribute_variable", None, self.text(&path)),
            Value::Object(fields) => {
                let fields = fields
                    .into_iter()
                    .map(|f| self.entry(f))
                    .collect::<Result<Vec<_>>>()?;
                self.schema.node("attribute_object", None, fields)
            }
        }
    }
}
