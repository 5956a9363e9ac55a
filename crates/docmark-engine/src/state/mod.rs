//! # Editor state
//!
//! One immutable version of an edited document: the tree, the selection
//! and the autocomplete state. A [`Transaction`] built from a state is
//! applied as a whole to produce the next version; the old version stays
//! untouched.

mod transaction;

pub use transaction::Transaction;

use std::sync::Arc;

use log::debug;

use crate::autocomplete::{AttributeKey, AutocompleteState, rank};
use crate::decoration::DecorationSet;
use crate::editor::EditorOptions;
use crate::error::{EditorError, Result};
use crate::model::Node;
use crate::schema::Schema;
use crate::selection::Selection;
use crate::transform::Transform;

#[derive(Debug, Clone)]
pub struct EditorState {
    schema: Arc<Schema>,
    options: Arc<EditorOptions>,
    doc: Node,
    selection: Selection,
    autocomplete: AutocompleteState,
    version: u64,
}

impl EditorState {
    /// A state for `doc` with the selection at its start. Fails when the
    /// schema's structural roles are ambiguous or `doc` is not valid.
    pub fn new(schema: Arc<Schema>, doc: Node, options: Arc<EditorOptions>) -> Result<Self> {
        schema.check_roles()?;
        if doc.node_type().id() != schema.top_node_type().id() {
            return Err(EditorError::invalid_edit(format!(
                "document root is {}, expected {}",
                doc.type_name(),
                schema.top_node_type().name()
            )));
        }
        doc.check()?;
        let selection = Selection::at_start(&doc);
        Ok(Self {
            schema,
            options,
            doc,
            selection,
            autocomplete: AutocompleteState::Idle,
            version: 0,
        })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn options(&self) -> &Arc<EditorOptions> {
        &self.options
    }

    pub fn doc(&self) -> &Node {
        &self.doc
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn autocomplete(&self) -> &AutocompleteState {
        &self.autocomplete
    }

    /// Incremented by every applied transaction.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Starts a transaction against this version.
    pub fn tr(&self) -> Transaction {
        Transaction::new(
            Transform::new(Arc::clone(&self.schema), self.doc.clone()),
            self.version,
            self.selection.clone(),
        )
    }

    /// Produces the next version. A transaction started from another
    /// version is rejected.
    pub fn apply(&self, tr: Transaction) -> Result<EditorState> {
        if tr.base_version() != self.version {
            return Err(EditorError::invalid_edit(format!(
                "transaction was started at version {} but the state is at {}",
                tr.base_version(),
                self.version
            )));
        }
        let selection = tr.selection();
        let autocomplete = self
            .autocomplete
            .apply(&tr, &selection, self.options.trigger);
        debug!(
            "version {} -> {}: {} step(s), selection {}..{}",
            self.version,
            self.version + 1,
            tr.steps().len(),
            selection.from(),
            selection.to()
        );
        Ok(EditorState {
            schema: Arc::clone(&self.schema),
            options: Arc::clone(&self.options),
            doc: tr.into_transform().doc().clone(),
            selection,
            autocomplete,
            version: self.version + 1,
        })
    }

    /// Menu candidates for the pending query: the catalog keys of the
    /// deepest attribute-eligible ancestor, ranked against the query.
    pub fn candidates(&self) -> Vec<AttributeKey> {
        let (Some(pending), Some(query)) = (
            self.autocomplete.pending(),
            self.autocomplete.query(&self.doc),
        ) else {
            return Vec::new();
        };
        let Ok(rpos) = self.doc.resolve(pending.from) else {
            return Vec::new();
        };
        let Some(host) = (0..=rpos.depth())
            .rev()
            .map(|d| rpos.node(d))
            .find(|n| n.node_type().can_be_in_attributes_container())
        else {
            return Vec::new();
        };
        let keys = self.options.catalog.keys_for(host.type_name());
        rank(&query, keys, self.options.max_candidates)
    }

    pub fn decorations(&self) -> DecorationSet {
        DecorationSet::for_state(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autocomplete::AutocompleteMeta;
    use crate::test_support::Builder;
    use pretty_assertions::assert_eq;

    fn fresh(b: &Builder, doc: Node) -> EditorState {
        EditorState::new(b.schema.clone(), doc, Arc::new(EditorOptions::default())).unwrap()
    }

    #[test]
    fn new_state_starts_at_the_first_text_position() {
        let b = Builder::new();
        let state = fresh(&b, b.doc(vec![b.divider(), b.p("ab")]));
        assert!(matches!(state.selection(), Selection::Node(_)));
        let state2 = fresh(&b, b.doc(vec![b.p("ab")]));
        assert_eq!(state2.selection(), &Selection::caret(1));
        assert_eq!(state2.version(), 0);
    }

    #[test]
    fn invalid_document_is_rejected() {
        let b = Builder::new();
        let not_a_doc = b.p("ab");
        let err = EditorState::new(b.schema.clone(), not_a_doc, Arc::new(EditorOptions::default()))
            .unwrap_err();
        assert!(matches!(err, EditorError::InvalidEdit(_)));
    }

    #[test]
    fn apply_maps_the_selection_and_bumps_the_version() {
        let b = Builder::new();
        let state = fresh(&b, b.doc(vec![b.p("ab")]));
        let mut tr = state.tr();
        tr.insert_text("xy", 1, 1, None).unwrap();
        let next = state.apply(tr).unwrap();
        assert_eq!(next.doc(), &b.doc(vec![b.p("xyab")]));
        assert_eq!(next.selection(), &Selection::caret(3));
        assert_eq!(next.version(), 1);
        // the previous version is untouched
        assert_eq!(state.doc(), &b.doc(vec![b.p("ab")]));
    }

    #[test]
    fn set_selection_follows_later_steps() {
        let b = Builder::new();
        let state = fresh(&b, b.doc(vec![b.p("abc")]));
        let mut tr = state.tr();
        tr.set_selection(Selection::text(2, 4)).unwrap();
        tr.insert_text("xy", 1, 1, None).unwrap();
        assert_eq!(tr.selection(), Selection::text(4, 6));

        tr.set_selection(Selection::caret(1)).unwrap();
        assert_eq!(tr.selection(), Selection::caret(1));
        tr.delete(3, 5).unwrap();
        let next = state.apply(tr).unwrap();
        assert_eq!(next.doc(), &b.doc(vec![b.p("xyc")]));
        assert_eq!(next.selection(), &Selection::caret(1));
    }

    #[test]
    fn stale_transaction_is_rejected() {
        let b = Builder::new();
        let state = fresh(&b, b.doc(vec![b.p("ab")]));
        let stale = state.tr();
        let next = state.apply(state.tr()).unwrap();
        assert!(matches!(next.apply(stale), Err(EditorError::InvalidEdit(_))));
    }

    #[test]
    fn pending_query_follows_typing_and_closes_on_a_bad_character() {
        let b = Builder::new();
        let state = fresh(&b, b.doc(vec![b.p("a %")]));
        let mut tr = state.tr();
        tr.set_selection(Selection::caret(4)).unwrap();
        tr.set_autocomplete(AutocompleteMeta::Open { from: 3, to: 4 });
        let open = state.apply(tr).unwrap();
        assert_eq!(open.autocomplete().query(open.doc()).as_deref(), Some(""));
        assert_eq!(open.candidates().len(), 2);

        let mut tr = open.tr();
        tr.insert_text("cl", 4, 4, None).unwrap();
        let typed = open.apply(tr).unwrap();
        let pending = typed.autocomplete().pending().copied().unwrap();
        assert_eq!((pending.from, pending.to), (3, 6));
        let keys: Vec<String> = typed.candidates().into_iter().map(|k| k.key).collect();
        assert_eq!(keys, vec!["class"]);

        let mut tr = typed.tr();
        tr.insert_text("!", 6, 6, None).unwrap();
        let broken = typed.apply(tr).unwrap();
        assert_eq!(broken.autocomplete(), &AutocompleteState::Idle);
    }

    #[test]
    fn moving_the_caret_away_closes_the_menu() {
        let b = Builder::new();
        let state = fresh(&b, b.doc(vec![b.p("a %")]));
        let mut tr = state.tr();
        tr.set_selection(Selection::caret(4)).unwrap();
        tr.set_autocomplete(AutocompleteMeta::Open { from: 3, to: 4 });
        let open = state.apply(tr).unwrap();
        let mut tr = open.tr();
        tr.set_selection(Selection::caret(1)).unwrap();
        assert!(!open.apply(tr).unwrap().autocomplete().is_pending());
    }
}
