//! Small tree builders for unit tests.

use std::sync::Arc;

use crate::model::{Attrs, Node, attrs};
use crate::schema::{Schema, markdoc_schema};

pub(crate) struct Builder {
    pub schema: Arc<Schema>,
}

impl Builder {
    pub fn new() -> Self {
        Self {
            schema: markdoc_schema().unwrap(),
        }
    }

    pub fn node(&self, name: &str, attrs: Option<&Attrs>, content: Vec<Node>) -> Node {
        self.schema.node(name, attrs, content).unwrap()
    }

    pub fn doc(&self, content: Vec<Node>) -> Node {
        self.node("doc", None, content)
    }

    pub fn text(&self, text: &str) -> Node {
        self.schema.text(text, vec![])
    }

    pub fn em(&self, text: &str) -> Node {
        let em = self.schema.mark("em", None).unwrap();
        self.schema.text(text, vec![em])
    }

    pub fn p(&self, text: &str) -> Node {
        let content = if text.is_empty() {
            vec![]
        } else {
            vec![self.text(text)]
        };
        self.node("paragraph", None, content)
    }

    pub fn h(&self, level: i64, text: &str) -> Node {
        self.node(
            "heading",
            Some(&attrs([("level", level)])),
            vec![self.text(text)],
        )
    }

    pub fn quote(&self, content: Vec<Node>) -> Node {
        self.node("blockquote", None, content)
    }

    pub fn item(&self, content: Vec<Node>) -> Node {
        self.node("list_item", None, content)
    }

    pub fn bullets(&self, items: Vec<Node>) -> Node {
        self.node("bullet_list", None, items)
    }

    pub fn divider(&self) -> Node {
        self.node("divider", None, vec![])
    }

    /// `attribute(key, attribute_string(value))`.
    pub fn attr_str(&self, key: &str, value: &str) -> Node {
        let string = if value.is_empty() {
            self.node("attribute_string", None, vec![])
        } else {
            self.node("attribute_string", None, vec![self.text(value)])
        };
        self.node("attribute", Some(&attrs([("key", key)])), vec![string])
    }

    pub fn container(&self, entries: Vec<Node>, block: Node) -> Node {
        let attributes = self.node("attributes", None, entries);
        self.node("attributes_container", None, vec![attributes, block])
    }
}
