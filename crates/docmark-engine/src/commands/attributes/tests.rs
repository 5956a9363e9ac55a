use std::sync::Arc;

use pretty_assertions::assert_eq;

use super::*;
use crate::editor::EditorOptions;
use crate::selection::{AttributeCursor, NodeSelection};
use crate::test_support::Builder;

fn state_with(b: &Builder, doc: Node, selection: Selection) -> EditorState {
    let state = EditorState::new(b.schema.clone(), doc, Arc::new(EditorOptions::default())).unwrap();
    let mut tr = state.tr();
    tr.set_selection(selection).unwrap();
    state.apply(tr).unwrap()
}

fn run(state: &EditorState, key: &str) -> EditorState {
    match add_attribute(state, key).unwrap() {
        CommandOutcome::Applied(tr) => state.apply(tr).unwrap(),
        CommandOutcome::Inapplicable => panic!("add_attribute({key}) was inapplicable"),
    }
}

fn count_keys(doc: &Node, key: &str) -> usize {
    let mut count = 0;
    doc.descendants(&mut |node: &Node, _pos: usize, _parent: Option<&Node>, _index: usize| {
        if node.type_name() == "attribute" && node.attr("key").and_then(|k| k.as_str()) == Some(key) {
            count += 1;
        }
        true
    });
    count
}

#[test]
fn cursor_before_a_paragraph_wraps_it() {
    let b = Builder::new();
    let doc = b.doc(vec![b.p("hello")]);
    let cursor = Selection::AttributeCursor(AttributeCursor::at(&doc.resolve(0).unwrap()).unwrap());
    let state = state_with(&b, doc, cursor);
    let next = run(&state, "id");
    assert_eq!(
        next.doc(),
        &b.doc(vec![b.container(vec![b.attr_str("id", "")], b.p("hello"))])
    );
    // inside the new, empty attribute string
    assert_eq!(next.selection(), &Selection::caret(4));
}

#[test]
fn caret_in_a_nested_paragraph_wraps_only_that_paragraph() {
    let b = Builder::new();
    let doc = b.doc(vec![b.quote(vec![b.p("ab")])]);
    let state = state_with(&b, doc, Selection::caret(2));
    let next = run(&state, "id");
    assert_eq!(
        next.doc(),
        &b.doc(vec![b.quote(vec![b.container(vec![b.attr_str("id", "")], b.p("ab"))])])
    );
    assert_eq!(next.selection(), &Selection::caret(5));
}

#[test]
fn existing_key_is_selected_instead_of_duplicated() {
    let b = Builder::new();
    // attributes 1..8 holding id="x" ("x" at 4..5), paragraph 8..15
    let doc = b.doc(vec![b.container(vec![b.attr_str("id", "x")], b.p("hello"))]);
    let state = state_with(&b, doc.clone(), Selection::caret(9));
    let next = run(&state, "id");
    assert_eq!(next.doc(), &doc);
    assert_eq!(count_keys(next.doc(), "id"), 1);
    assert_eq!(next.selection(), &Selection::text(4, 5));
}

#[test]
fn two_calls_leave_exactly_one_entry() {
    let b = Builder::new();
    let doc = b.doc(vec![b.p("hello")]);
    let cursor = Selection::AttributeCursor(AttributeCursor::at(&doc.resolve(0).unwrap()).unwrap());
    let first = run(&state_with(&b, doc, cursor), "x");
    // back into the wrapped paragraph, then again
    let mut tr = first.tr();
    tr.set_selection(Selection::caret(8)).unwrap();
    let back = first.apply(tr).unwrap();
    let second = run(&back, "x");
    assert_eq!(count_keys(second.doc(), "x"), 1);
    assert_eq!(second.doc(), first.doc());
    assert_eq!(second.selection(), &Selection::caret(4));
}

#[test]
fn new_key_goes_after_the_existing_ones() {
    let b = Builder::new();
    let doc = b.doc(vec![b.container(vec![b.attr_str("id", "x")], b.p("hello"))]);
    let state = state_with(&b, doc, Selection::caret(9));
    let next = run(&state, "class");
    assert_eq!(
        next.doc(),
        &b.doc(vec![b.container(
            vec![b.attr_str("id", "x"), b.attr_str("class", "")],
            b.p("hello"),
        )])
    );
    assert_eq!(next.selection(), &Selection::caret(9));
}

#[test]
fn selection_sharing_only_the_document_targets_where_it_starts() {
    let b = Builder::new();
    let doc = b.doc(vec![b.p("ab"), b.p("cd")]);

    let node = Selection::Node(NodeSelection::create(&doc, 4).unwrap());
    let next = run(&state_with(&b, doc.clone(), node), "id");
    assert_eq!(
        next.doc(),
        &b.doc(vec![b.p("ab"), b.container(vec![b.attr_str("id", "")], b.p("cd"))])
    );

    let across = Selection::text(1, 7);
    let next = run(&state_with(&b, doc, across), "id");
    assert_eq!(
        next.doc(),
        &b.doc(vec![b.container(vec![b.attr_str("id", "")], b.p("ab")), b.p("cd")])
    );
}

#[test]
fn no_eligible_block_is_inapplicable() {
    let b = Builder::new();
    let doc = b.doc(vec![b.divider(), b.p("a")]);
    let state = EditorState::new(b.schema.clone(), doc, Arc::new(EditorOptions::default())).unwrap();
    assert!(matches!(state.selection(), Selection::Node(_)));
    let outcome = add_attribute(&state, "id").unwrap();
    assert!(!outcome.is_applied());
}

#[test]
fn target_lookup() {
    let b = Builder::new();
    let doc = b.doc(vec![
        b.p("ab"),
        b.container(vec![b.attr_str("id", "x")], b.p("cd")),
    ]);
    assert_eq!(
        find_attribute_target(&doc, 0).unwrap(),
        Some(AttributeTarget::NeedsContainer { pos: 0 })
    );
    assert_eq!(
        find_attribute_target(&doc, 2).unwrap(),
        Some(AttributeTarget::NeedsContainer { pos: 0 })
    );
    // the wrapped paragraph starts at 4 + 1 + 7
    assert_eq!(
        find_attribute_target(&doc, 12).unwrap(),
        Some(AttributeTarget::CanAddAttributes { attributes_pos: 5 })
    );
    assert_eq!(find_attribute_target(&doc, 4).unwrap(), None);
    assert!(find_attribute_target(&doc, 99).is_err());
}
