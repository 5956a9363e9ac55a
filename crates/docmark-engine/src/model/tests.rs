use pretty_assertions::assert_eq;
use rstest::rstest;

use super::*;
use crate::error::EditorError;
use crate::test_support::Builder;

fn two_paragraphs(b: &Builder) -> Node {
    b.doc(vec![b.p("ab"), b.p("cd")])
}

#[test]
fn sizes_count_boundaries_and_scalars() {
    let b = Builder::new();
    let doc = two_paragraphs(&b);
    assert_eq!(doc.content_size(), 8);
    assert_eq!(doc.child(0).node_size(), 4);
    assert_eq!(b.text("héé").node_size(), 3);
    assert_eq!(b.divider().node_size(), 1);
}

#[rstest]
#[case(0, 0, 0)]
#[case(1, 1, 0)]
#[case(2, 1, 1)]
#[case(3, 1, 2)]
#[case(4, 0, 4)]
#[case(6, 1, 1)]
#[case(8, 0, 8)]
fn resolve_reports_depth_and_parent_offset(
    #[case] pos: usize,
    #[case] depth: usize,
    #[case] parent_offset: usize,
) {
    let b = Builder::new();
    let doc = two_paragraphs(&b);
    let r = doc.resolve(pos).unwrap();
    assert_eq!((r.depth(), r.parent_offset()), (depth, parent_offset));
}

#[test]
fn resolve_rejects_positions_past_the_end() {
    let b = Builder::new();
    let doc = two_paragraphs(&b);
    let err = doc.resolve(9).unwrap_err();
    assert!(matches!(err, EditorError::OutOfRange { pos: 9, size: 8 }));
}

#[test]
fn resolved_position_navigation() {
    let b = Builder::new();
    let doc = two_paragraphs(&b);
    let r = doc.resolve(2).unwrap();
    assert_eq!(r.start(1), 1);
    assert_eq!(r.end(1), 3);
    assert_eq!(r.before(1), Some(0));
    assert_eq!(r.after(1), Some(4));
    assert_eq!(r.before(0), None);
    assert_eq!(r.text_offset(), 1);
    assert_eq!(r.node_before().unwrap().text(), Some("a"));
    assert_eq!(r.node_after().unwrap().text(), Some("b"));

    let between = doc.resolve(4).unwrap();
    assert_eq!(between.index(0), 1);
    assert_eq!(between.node_before().unwrap().type_name(), "paragraph");
    assert_eq!(between.node_after().unwrap().text_content(), "cd");
    assert_eq!(between.shared_depth(6), 0);
    assert_eq!(doc.resolve(6).unwrap().shared_depth(7), 1);
}

#[test]
fn node_at_finds_nodes_starting_at_a_position() {
    let b = Builder::new();
    let doc = two_paragraphs(&b);
    assert_eq!(doc.node_at(4).map(Node::text_content), Some("cd".to_string()));
    assert_eq!(doc.node_at(5).and_then(Node::text), Some("cd"));
    assert!(doc.node_at(8).is_none());
}

#[test]
fn text_between_joins_blocks() {
    let b = Builder::new();
    let doc = two_paragraphs(&b);
    assert_eq!(doc.text_between(2, 6, "|"), "b|c");
    assert_eq!(doc.text_content(), "abcd");
}

#[test]
fn fragments_merge_adjacent_text_with_equal_marks() {
    let b = Builder::new();
    let frag = Fragment::from_nodes(vec![b.text("a"), b.text(""), b.text("b"), b.em("c")]);
    assert_eq!(frag.child_count(), 2);
    assert_eq!(frag.child(0).text(), Some("ab"));
    assert_eq!(frag.size(), 3);
}

#[test]
fn slice_across_blocks_is_open_on_both_sides() {
    let b = Builder::new();
    let doc = two_paragraphs(&b);
    let slice = doc.slice(2, 6).unwrap();
    assert_eq!((slice.open_start, slice.open_end), (1, 1));
    assert_eq!(slice.content, Fragment::from_nodes(vec![b.p("b"), b.p("c")]));
    assert_eq!(slice.size(), 4);
}

#[test]
fn replace_joins_cut_blocks() {
    let b = Builder::new();
    let doc = two_paragraphs(&b);
    let out = doc.replace(2, 6, &Slice::empty()).unwrap();
    assert_eq!(out, b.doc(vec![b.p("ad")]));
    // input untouched
    assert_eq!(doc, two_paragraphs(&b));
}

#[test]
fn replace_with_open_slice_splits_and_rejoins() {
    let b = Builder::new();
    let doc = b.doc(vec![b.p("xy")]);
    let slice = two_paragraphs(&b).slice(2, 6).unwrap();
    let out = doc.replace(2, 2, &slice).unwrap();
    assert_eq!(out, b.doc(vec![b.p("xb"), b.p("cy")]));
}

#[test]
fn replace_rejects_content_the_schema_forbids() {
    let b = Builder::new();
    let doc = two_paragraphs(&b);
    let slice = Slice::closed(Fragment::from_node(b.p("x")));
    let err = doc.replace(2, 2, &slice).unwrap_err();
    assert!(matches!(err, EditorError::InvalidEdit(_)));
}

#[test]
fn replace_refuses_to_empty_a_required_sequence() {
    let b = Builder::new();
    let doc = b.doc(vec![b.p("ab")]);
    let err = doc.replace(0, 4, &Slice::empty()).unwrap_err();
    assert!(matches!(err, EditorError::InvalidEdit(_)));
}

#[test]
fn slice_remove_between_and_insert_at() {
    let b = Builder::new();
    let doc = b.doc(vec![b.quote(vec![b.p("ab"), b.p("cd")])]);
    let slice = doc.slice(0, doc.content_size()).unwrap();
    let removed = slice.remove_between(1, 5).unwrap();
    assert_eq!(removed.content, Fragment::from_node(b.quote(vec![b.p("cd")])));
    let inserted = removed
        .insert_at(1, &Fragment::from_node(b.p("new")))
        .unwrap();
    assert_eq!(
        inserted.content,
        Fragment::from_node(b.quote(vec![b.p("new"), b.p("cd")]))
    );
    assert!(removed.insert_at(2, &Fragment::from_node(b.p("x"))).is_none());
}

#[test]
fn marks_at_position_follow_inclusivity() {
    let b = Builder::new();
    let doc = b.doc(vec![b.node("paragraph", None, vec![b.em("ab"), b.text("c")])]);
    let end_of_em = doc.resolve(3).unwrap();
    assert_eq!(end_of_em.marks().len(), 1);
    assert!(doc.resolve(4).unwrap().marks().is_empty());
}

#[test]
fn json_round_trip_preserves_the_tree() {
    let b = Builder::new();
    let doc = b.doc(vec![
        b.container(vec![b.attr_str("id", "intro")], b.h(2, "Title")),
        b.node("paragraph", None, vec![b.text("a "), b.em("b")]),
    ]);
    let json = doc.to_json();
    assert_eq!(json["content"][0]["type"], "attributes_container");
    let back = Node::from_json(&b.schema, &json).unwrap();
    assert_eq!(back, doc);
}

#[test]
fn json_with_invalid_content_is_rejected() {
    let b = Builder::new();
    let json = serde_json::json!({"type": "doc", "content": [{"type": "text", "text": "loose"}]});
    assert!(matches!(
        Node::from_json(&b.schema, &json),
        Err(EditorError::InvalidEdit(_))
    ));
}

#[test]
fn display_shows_structure() {
    let b = Builder::new();
    let doc = b.doc(vec![b.node("paragraph", None, vec![b.text("a"), b.em("b")])]);
    insta::assert_snapshot!(doc.to_string(), @r#"doc(paragraph("a", em("b")))"#);
}
