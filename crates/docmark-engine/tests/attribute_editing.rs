use std::sync::Arc;

use docmark_engine::decoration::DecorationKind;
use docmark_engine::transform::{Assoc, Transform};
use docmark_engine::{
    Editor, EditorOptions, Key, Schema, Selection, markdoc_schema, parse, serialize,
};
use pretty_assertions::assert_eq;

fn open(schema: &Arc<Schema>, md: &str) -> Editor {
    let doc = parse(schema, md).unwrap().doc;
    Editor::new(schema.clone(), doc, EditorOptions::default()).unwrap()
}

#[test]
fn add_an_id_from_the_attribute_cursor_and_save() {
    let schema = markdoc_schema().unwrap();
    let mut editor = open(&schema, "hello\n");

    assert!(editor.handle_click(0, None).unwrap().is_handled());
    assert!(matches!(editor.selection(), Selection::AttributeCursor(c) if c.pos() == 0));

    let outcome = editor.add_attribute("id").unwrap();
    assert!(outcome.update().unwrap().doc_changed);
    editor.handle_text_input("intro").unwrap();

    assert_eq!(serialize(editor.doc()).unwrap(), "hello {% id=\"intro\" %}\n");
}

#[test]
fn second_attribute_joins_the_existing_annotation() {
    let schema = markdoc_schema().unwrap();
    let mut editor = open(&schema, "## Title {% id=\"t\" %}\n");

    editor.set_selection(Selection::caret(editor.doc().content_size() - 2)).unwrap();
    assert!(editor.add_attribute("class").unwrap().is_handled());
    editor.handle_text_input("wide").unwrap();
    assert_eq!(
        serialize(editor.doc()).unwrap(),
        "## Title {% id=\"t\" class=\"wide\" %}\n"
    );

    // adding a key that is already there selects its value instead
    editor.set_selection(Selection::caret(editor.doc().content_size() - 2)).unwrap();
    assert!(editor.add_attribute("id").unwrap().is_handled());
    editor.handle_text_input("top").unwrap();
    assert_eq!(
        serialize(editor.doc()).unwrap(),
        "## Title {% id=\"top\" class=\"wide\" %}\n"
    );
}

#[test]
fn autocomplete_lifecycle_from_trigger_to_commit() {
    let schema = markdoc_schema().unwrap();
    let mut editor = open(&schema, "intro\n");
    editor.set_selection(Selection::caret(6)).unwrap();

    editor.handle_text_input(" %").unwrap();
    let pending = editor.decorations().pending().cloned().unwrap();
    assert_eq!((pending.from, pending.to), (7, 8));

    editor.handle_text_input("cl").unwrap();
    match editor.decorations().pending().map(|d| &d.kind) {
        Some(DecorationKind::PendingAutocomplete {
            query, candidates, ..
        }) => {
            assert_eq!(query, "cl");
            assert_eq!(candidates[0].key, "class");
        }
        other => panic!("expected a pending menu, got {other:?}"),
    }

    assert!(editor.handle_key(Key::Enter).unwrap().is_handled());
    assert!(editor.decorations().pending().is_none());
    editor.handle_text_input("lead").unwrap();
    assert_eq!(serialize(editor.doc()).unwrap(), "intro {% class=\"lead\" %}\n");
}

#[test]
fn cancelled_autocomplete_keeps_the_typed_text() {
    let schema = markdoc_schema().unwrap();
    let mut editor = open(&schema, "x\n");
    editor.set_selection(Selection::caret(2)).unwrap();
    editor.handle_text_input(" %").unwrap();
    editor.handle_text_input("i").unwrap();
    assert!(editor.decorations().pending().is_some());

    assert!(editor.handle_key(Key::Escape).unwrap().is_handled());
    assert!(editor.decorations().is_empty());
    assert_eq!(serialize(editor.doc()).unwrap(), "x %i\n");
}

#[test]
fn mappings_compose_across_transactions() {
    let schema = markdoc_schema().unwrap();
    let doc = parse(&schema, "ab\n\ncd\n").unwrap().doc;

    let mut tr = Transform::new(schema.clone(), doc.clone());
    tr.insert_text("XY", 1, 1, None).unwrap();
    tr.delete(7, 8).unwrap();

    let mapping = tr.mapping();
    // the document end moves right by the insert and back by the delete
    assert_eq!(mapping.map(8, Assoc::Right), 9);
    assert_eq!(mapping.map(1, Assoc::Left), 1);
    assert_eq!(mapping.map(1, Assoc::Right), 3);

    let inverted = mapping.invert();
    for pos in [0, 1, 4, 8] {
        let there = mapping.map(pos, Assoc::Right);
        assert_eq!(inverted.map(there, Assoc::Right), pos);
    }
}
