use std::sync::Arc;

use crate::schema::MarkType;

use super::attrs::Attrs;

/// A mark applied to inline content (emphasis, link, ...).
///
/// Mark sets are kept sorted by the rank of their type, which is the order
/// the types were declared in the schema.
#[derive(Debug, Clone)]
pub struct Mark {
    mark_type: Arc<MarkType>,
    attrs: Attrs,
}

impl PartialEq for Mark {
    fn eq(&self, other: &Self) -> bool {
        self.mark_type.rank() == other.mark_type.rank() && self.attrs == other.attrs
    }
}

impl Eq for Mark {}

impl Mark {
    pub(crate) fn new(mark_type: Arc<MarkType>, attrs: Attrs) -> Self {
        Self { mark_type, attrs }
    }

    pub fn mark_type(&self) -> &Arc<MarkType> {
        &self.mark_type
    }

    pub fn name(&self) -> &str {
        self.mark_type.name()
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    /// Returns a copy of `set` with this mark added, replacing any mark of
    /// the same type and keeping rank order.
    pub fn add_to_set(&self, set: &[Mark]) -> Vec<Mark> {
        let mut out: Vec<Mark> = set
            .iter()
            .filter(|m| m.mark_type.rank() != self.mark_type.rank())
            .cloned()
            .collect();
        let at = out
            .iter()
            .position(|m| m.mark_type.rank() > self.mark_type.rank())
            .unwrap_or(out.len());
        out.insert(at, self.clone());
        out
    }

    pub fn remove_from_set(&self, set: &[Mark]) -> Vec<Mark> {
        set.iter().filter(|m| *m != self).cloned().collect()
    }

    pub fn is_in_set(&self, set: &[Mark]) -> bool {
        set.contains(self)
    }
}

/// Whether two mark sets hold the same marks.
pub fn same_set(a: &[Mark], b: &[Mark]) -> bool {
    a == b
}
