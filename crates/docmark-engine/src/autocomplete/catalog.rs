use std::collections::BTreeMap;

/// One attribute key offered by the autocomplete menu. `extra` is the
/// markup shorthand for keys that have one (`#` for `id`, `.` for `class`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeKey {
    pub key: String,
    pub extra: Option<&'static str>,
}

impl AttributeKey {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        let extra = match key.as_str() {
            "id" => Some("#"),
            "class" => Some("."),
            _ => None,
        };
        Self { key, extra }
    }
}

/// Attribute keys that may be added to each node type: the global keys
/// apply everywhere, followed by the keys registered for the type itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeCatalog {
    global: Vec<String>,
    nodes: BTreeMap<String, Vec<String>>,
}

impl Default for AttributeCatalog {
    fn default() -> Self {
        Self::new(vec!["id".to_string(), "class".to_string()])
    }
}

impl AttributeCatalog {
    pub fn new(global: Vec<String>) -> Self {
        Self {
            global,
            nodes: BTreeMap::new(),
        }
    }

    /// Registers the keys legal on `node_type`, replacing earlier ones.
    pub fn with_node(mut self, node_type: impl Into<String>, keys: Vec<String>) -> Self {
        self.nodes.insert(node_type.into(), keys);
        self
    }

    pub fn global(&self) -> &[String] {
        &self.global
    }

    /// Keys legal on `node_type`, global ones first, without duplicates.
    pub fn keys_for(&self, node_type: &str) -> Vec<AttributeKey> {
        let specific = self.nodes.get(node_type).map(Vec::as_slice).unwrap_or(&[]);
        let mut keys: Vec<AttributeKey> = Vec::new();
        for key in self.global.iter().chain(specific) {
            if !keys.iter().any(|k| &k.key == key) {
                keys.push(AttributeKey::new(key.clone()));
            }
        }
        keys
    }
}
