use docmark_engine::{markdoc_schema, parse, parse_strict, serialize};
use pretty_assertions::assert_eq;

#[test]
fn fixture_notes() {
    assert_stable("notes");
}

#[test]
fn fixture_values() {
    assert_stable("values");
}

#[test]
fn fixture_normalize() {
    let expected = read("normalize.expected");
    assert_eq!(round_trip(&read("normalize")), expected);
    assert_eq!(round_trip(&expected), expected);
}

/// Canonical markup survives a parse and serialize unchanged.
fn assert_stable(name: &str) {
    let md = read(name);
    let schema = markdoc_schema().unwrap();
    let doc = parse_strict(&schema, &md).unwrap();
    assert_eq!(serialize(&doc).unwrap(), md);
}

fn round_trip(md: &str) -> String {
    let schema = markdoc_schema().unwrap();
    let parsed = parse(&schema, md).unwrap();
    assert!(parsed.is_clean(), "{:?}", parsed.diagnostics);
    serialize(&parsed.doc).unwrap()
}

fn read(name: &str) -> String {
    std::fs::read_to_string(format!(
        "{}/tests/fixtures/{name}.md",
        env!("CARGO_MANIFEST_DIR")
    ))
    .unwrap()
}

#[test]
fn parsing_twice_gives_the_same_tree() {
    let schema = markdoc_schema().unwrap();
    let md = "# Heading\nSome *text*.\n\n* a\n* b\n\n> quote {% id=\"q\" %}";
    let first = parse(&schema, md).unwrap().doc;
    let second = parse(&schema, &serialize(&first).unwrap()).unwrap().doc;
    assert_eq!(first, second);
    assert_eq!(first.to_json(), second.to_json());
}

#[test]
fn heading_and_paragraph_normalize_with_a_blank_line() {
    let schema = markdoc_schema().unwrap();
    let doc = parse(&schema, "# Heading\nSome *text*.").unwrap().doc;
    assert_eq!(doc.child(0).type_name(), "heading");
    assert_eq!(doc.child(1).type_name(), "paragraph");
    assert_eq!(serialize(&doc).unwrap(), "# Heading\n\nSome *text*.\n");
}
