//! # Markup
//!
//! Reads and writes the text form of a document: CommonMark-style blocks
//! and inline marks, plus Markdoc annotations (`{% key=value %}`) at the
//! end of a block that become attribute containers around it.
//!
//! Parsing always produces a document. Problems are recovered from and
//! reported as [`Diagnostic`]s; [`parse_strict`] turns any of them into an
//! error instead.

mod annotation;
mod blocks;
mod convert;
mod cursor;
mod inline;
mod rope;
mod serialize;

use std::fmt;

use log::{debug, warn};
use serde::Serialize;
use thiserror::Error;
use xi_rope::Rope;

use crate::error::{EditorError, Result};
use crate::model::Node;
use crate::schema::Schema;

use self::blocks::{BlockParser, Line};
use self::convert::Converter;
use self::rope::{lines_with_spans, slice_to_string};

pub use self::rope::Span;
pub use self::serialize::serialize;

/// Source text of a paragraph with no content.
const EMPTY_PARAGRAPH: &str = "\\";

/// Something wrong with the markup that parsing recovered from.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum MarkupProblem {
    /// The code fence runs to the end of its container.
    #[error("code fence is never closed")]
    UnclosedFence,
    #[error("annotation has no closing `%}}`")]
    UnterminatedAnnotation,
    /// The annotation is kept as literal text.
    #[error("invalid annotation: {0}")]
    InvalidAnnotation(String),
    /// Tags other than attribute annotations (`{% if %}`, `{% partial %}`).
    #[error("unsupported tag `{0}`")]
    UnsupportedTag(String),
    /// The last value is kept.
    #[error("attribute `{0}` is given more than once")]
    DuplicateAttribute(String),
    #[error("document is empty")]
    EmptyDocument,
}

/// A problem and the source bytes it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub span: Span,
    pub problem: MarkupProblem,
}

impl Diagnostic {
    pub fn new(span: Span, problem: MarkupProblem) -> Self {
        Self { span, problem }
    }

    /// One-based line of the span start within `source`.
    pub fn line_in(&self, source: &str) -> usize {
        let start = self.span.start.min(source.len());
        source.as_bytes()[..start].iter().filter(|b| **b == b'\n').count() + 1
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}: {}", self.span.start, self.span.end, self.problem)
    }
}

/// A parsed document and what was recovered from along the way.
#[derive(Debug, Clone)]
pub struct Parsed {
    pub doc: Node,
    pub diagnostics: Vec<Diagnostic>,
}

impl Parsed {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Parses markup into a document of `schema`, which must define the node
/// and mark types of [`markdoc_schema`](crate::schema::markdoc_schema).
pub fn parse(schema: &Schema, text: &str) -> Result<Parsed> {
    let rope = Rope::from(text);
    let refs: Vec<_> = lines_with_spans(&rope).collect();
    let lines: Vec<Line<'_>> = refs
        .iter()
        .map(|r| Line::new(r.content(), r.span.start))
        .collect();

    let mut diagnostics = vec![];
    let blocks = BlockParser::new(&mut diagnostics).parse(&lines);
    let converter = Converter::new(schema);
    let mut content = converter.blocks(blocks)?;
    if content.is_empty() {
        content.push(converter.empty_paragraph()?);
        diagnostics.push(Diagnostic::new(
            Span::new(0, text.len()),
            MarkupProblem::EmptyDocument,
        ));
    }
    let doc = schema.node(schema.top_node_type().name(), None, content)?;

    for diagnostic in &diagnostics {
        warn!(
            "line {}: {} in {:?}",
            diagnostic.line_in(text),
            diagnostic.problem,
            slice_to_string(&rope, diagnostic.span)
        );
    }
    debug!(
        "Parsed {} bytes into {} blocks ({} diagnostics)",
        text.len(),
        doc.child_count(),
        diagnostics.len()
    );
    Ok(Parsed { doc, diagnostics })
}

/// Like [`parse`], but any diagnostic is an error.
pub fn parse_strict(schema: &Schema, text: &str) -> Result<Node> {
    let parsed = parse(schema, text)?;
    if parsed.is_clean() {
        Ok(parsed.doc)
    } else {
        Err(EditorError::MalformedMarkup(parsed.diagnostics))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::model::AttrValue;
    use crate::schema::markdoc_schema;

    fn round_trip(src: &str) -> String {
        let schema = markdoc_schema().unwrap();
        let parsed = parse(&schema, src).unwrap();
        serialize(&parsed.doc).unwrap()
    }

    #[rstest]
    #[case::heading_and_paragraph("# Heading\n\nSome *text*.\n")]
    #[case::marks("**bold _both_** and ~~gone~~ with `code` and [a link](https://x.y \"T\")\n")]
    #[case::annotated_paragraph("hello {% id=\"intro\" class=\"a b\" %}\n")]
    #[case::annotated_heading("## Title {% level=2 flag=true gone=null %}\n")]
    #[case::annotated_code("```rust {% data-lang=\"rust\" %}\nfn main() {}\n```\n")]
    #[case::nested("> - one\n>\n>   two\n> - three\n")]
    #[case::ordered("3. a\n4. b\n")]
    #[case::objects("p {% meta={a: 1, b: $page.title} %}\n")]
    #[case::hard_break("line\\\nbreak\n")]
    #[case::escapes("\\# not \\*a\\* heading \\{% x %}\n")]
    #[case::edge_whitespace("## &#32;title\n\na \\\n&#32;&#32;b&#32;\n")]
    #[case::empty_paragraphs("a\n\n\\\n\n> \\\n")]
    #[case::newline_in_text("x&#10;y\n")]
    #[case::em_then_strong("*a***b**\n")]
    fn normalized_markup_round_trips(#[case] src: &str) {
        assert_eq!(round_trip(src), src);
    }

    #[rstest]
    #[case::blank_lines("# Heading\nSome *text*.", "# Heading\n\nSome *text*.\n")]
    #[case::plus_bullets("+ a\n+ b", "- a\n- b\n")]
    #[case::star_divider("***", "---\n")]
    #[case::soft_breaks("one\ntwo", "one two\n")]
    #[case::tilde_fence("~~~\nx\n~~~", "```\nx\n```\n")]
    #[case::class_shorthand("hi {% .a .b #top %}", "hi {% class=\"a b\" id=\"top\" %}\n")]
    #[case::char_references("&#x41;&#65; &#0; &#xZZ;", "AA \\&#0; \\&#xZZ;\n")]
    #[case::shared_closer("**a***b*", "**a**_b_\n")]
    #[case::shared_opener_em_outside("***a** b*", "_**a** b_\n")]
    #[case::shared_opener_strong_outside("***a* b**", "**_a_ b**\n")]
    fn markup_is_normalized(#[case] src: &str, #[case] expected: &str) {
        assert_eq!(round_trip(src), expected);
        assert_eq!(round_trip(expected), expected);
    }

    #[test]
    fn annotation_wraps_the_block() {
        let schema = markdoc_schema().unwrap();
        let parsed = parse(&schema, "hello {% id=\"intro\" %}").unwrap();
        assert!(parsed.is_clean());
        let container = parsed.doc.child(0);
        assert_eq!(container.type_name(), "attributes_container");
        let attribute = container.child(0).child(0);
        assert_eq!(attribute.attr("key"), Some(&AttrValue::from("id")));
        assert_eq!(attribute.text_content(), "intro");
        assert_eq!(container.child(1).text_content(), "hello");
    }

    #[test]
    fn empty_source_is_one_empty_paragraph() {
        let schema = markdoc_schema().unwrap();
        let parsed = parse(&schema, "\n\n").unwrap();
        assert_eq!(parsed.doc.child_count(), 1);
        assert_eq!(parsed.doc.child(0).type_name(), "paragraph");
        assert_eq!(
            parsed.diagnostics,
            vec![Diagnostic::new(Span::new(0, 2), MarkupProblem::EmptyDocument)]
        );
    }

    #[test]
    fn recovered_problems_are_reported_with_lines() {
        let schema = markdoc_schema().unwrap();
        let src = "ok\n\n{% if x %} text\n\n```\nnever closed";
        let parsed = parse(&schema, src).unwrap();
        let problems: Vec<_> = parsed.diagnostics.iter().map(|d| &d.problem).collect();
        assert_eq!(
            problems,
            vec![
                &MarkupProblem::UnsupportedTag("if".into()),
                &MarkupProblem::UnclosedFence
            ]
        );
        assert_eq!(parsed.diagnostics[0].line_in(src), 3);
        assert_eq!(parsed.diagnostics[1].line_in(src), 5);
    }

    #[test]
    fn strict_parsing_rejects_diagnostics() {
        let schema = markdoc_schema().unwrap();
        assert!(parse_strict(&schema, "fine").is_ok());
        match parse_strict(&schema, "a {% id=\"x\" id=\"y\" %}") {
            Err(EditorError::MalformedMarkup(diagnostics)) => assert_eq!(
                diagnostics[0].problem,
                MarkupProblem::DuplicateAttribute("id".into())
            ),
            other => panic!("expected malformed markup, got {other:?}"),
        }
    }

    #[test]
    fn diagnostics_serialize_for_tools() {
        let diagnostic = Diagnostic::new(Span::new(1, 4), MarkupProblem::UnsupportedTag("if".into()));
        assert_eq!(
            serde_json::to_value(&diagnostic).unwrap(),
            serde_json::json!({
                "span": {"start": 1, "end": 4},
                "problem": {"kind": "unsupported_tag", "detail": "if"}
            })
        );
    }
}
