//! Writes a document back as markup.
//!
//! Blocks are written as lists of lines and joined by their parents, which
//! add quote and list prefixes. Sibling blocks are separated by one blank
//! line. Adjacent lists of the same type alternate their markers so they
//! do not merge when read back.
//!
//! Whitespace at either edge of a line would be trimmed when read back, so
//! it is written as character references (`&#32;`). An empty paragraph is
//! written as a lone `\` unless it is the whole document.

use std::cmp::Reverse;

use crate::error::{EditorError, Result};
use crate::model::{AttrValue, Mark, Node};

use super::EMPTY_PARAGRAPH;
use super::annotation::{CLOSE, OPEN, is_ident, is_number, is_variable_path, quote};

/// Serializes `doc` as markup, ending in a single newline unless empty.
pub fn serialize(doc: &Node) -> Result<String> {
    if doc.child_count() == 1 && is_empty_paragraph(doc.child(0)) {
        return Ok(String::new());
    }
    let mut out = blocks(doc)?.join("\n");
    out.truncate(out.trim_end_matches('\n').len());
    if !out.is_empty() {
        out.push('\n');
    }
    Ok(out)
}

fn blocks(parent: &Node) -> Result<Vec<String>> {
    let mut out = vec![];
    let mut prev: Option<&Node> = None;
    let mut alternate = false;
    for child in parent.content() {
        if let Some(prev) = prev {
            out.push(String::new());
            alternate = is_list(child) && prev.type_name() == child.type_name() && !alternate;
        }
        out.extend(block(child, alternate)?);
        prev = Some(child);
    }
    Ok(out)
}

fn is_empty_paragraph(node: &Node) -> bool {
    node.type_name() == "paragraph" && node.child_count() == 0
}

fn is_list(node: &Node) -> bool {
    matches!(node.type_name(), "bullet_list" | "ordered_list")
}

fn block(node: &Node, alternate: bool) -> Result<Vec<String>> {
    match node.type_name() {
        "paragraph" if node.child_count() == 0 => Ok(vec![EMPTY_PARAGRAPH.to_string()]),
        "paragraph" => Ok(inline(node, true).split('\n').map(protect_edges).collect()),
        "heading" => {
            let level = node.attr("level").and_then(AttrValue::as_int).unwrap_or(1).clamp(1, 6);
            let hashes = "#".repeat(level as usize);
            let text = protect_edges(&inline(node, false));
            Ok(vec![if text.is_empty() {
                hashes
            } else {
                format!("{hashes} {text}")
            }])
        }
        "code_block" => Ok(code_block(node)),
        "blockquote" => Ok(blocks(node)?
            .into_iter()
            .map(|line| {
                if line.is_empty() {
                    ">".to_string()
                } else {
                    format!("> {line}")
                }
            })
            .collect()),
        "bullet_list" => {
            let marker = if alternate { "*" } else { "-" };
            list(node, |_| marker.to_string())
        }
        "ordered_list" => {
            let start = node.attr("start").and_then(AttrValue::as_int).unwrap_or(1).max(0);
            let delimiter = if alternate { ')' } else { '.' };
            list(node, |i| format!("{}{delimiter}", start + i as i64))
        }
        "divider" => Ok(vec!["---".to_string()]),
        "attributes_container" => container(node, alternate),
        other => Err(EditorError::invalid_edit(format!(
            "{other} has no markup representation"
        ))),
    }
}

fn list(node: &Node, marker: impl Fn(usize) -> String) -> Result<Vec<String>> {
    let mut out = vec![];
    for (i, item) in node.content().iter().enumerate() {
        let marker = marker(i);
        let pad = " ".repeat(marker.len() + 1);
        for (j, line) in blocks(item)?.into_iter().enumerate() {
            out.push(match (j, line.is_empty()) {
                (0, true) => marker.clone(),
                (0, false) => format!("{marker} {line}"),
                (_, true) => line,
                (_, false) => format!("{pad}{line}"),
            });
        }
    }
    Ok(out)
}

fn code_block(node: &Node) -> Vec<String> {
    let text = node.text_content();
    let language = node.attr("language").and_then(AttrValue::as_str).unwrap_or("");
    let ch = if language.contains('`') { '~' } else { '`' };
    let fence = ch.to_string().repeat(longest_run(&text, ch).max(2) + 1);
    let mut lines = vec![format!("{fence}{language}")];
    if !text.is_empty() {
        lines.extend(text.split('\n').map(str::to_string));
    }
    lines.push(fence);
    lines
}

fn longest_run(s: &str, ch: char) -> usize {
    let mut longest = 0;
    let mut run = 0;
    for c in s.chars() {
        run = if c == ch { run + 1 } else { 0 };
        longest = longest.max(run);
    }
    longest
}

/// The wrapped block with its annotation appended: on the opening fence
/// line of code, on the last line of anything else.
fn container(node: &Node, alternate: bool) -> Result<Vec<String>> {
    let (Some(attributes), Some(wrapped)) = (node.maybe_child(0), node.maybe_child(1)) else {
        return Err(EditorError::invalid_edit("attributes container without content"));
    };
    let annotation = annotation(attributes)?;
    let mut lines = if is_empty_paragraph(wrapped) {
        vec![String::new()]
    } else {
        block(wrapped, alternate)?
    };
    let target = if wrapped.type_name() == "code_block" {
        0
    } else {
        lines.len().saturating_sub(1)
    };
    match lines.get_mut(target) {
        Some(line) if line.is_empty() => *line = annotation,
        Some(line) => {
            line.push(' ');
            line.push_str(&annotation);
        }
        None => lines.push(annotation),
    }
    Ok(lines)
}

fn annotation(attributes: &Node) -> Result<String> {
    let entries = attributes
        .content()
        .iter()
        .map(|attribute| entry(attribute, "="))
        .collect::<Result<Vec<_>>>()?;
    Ok(format!("{OPEN} {} {CLOSE}", entries.join(" ")))
}

fn entry(attribute: &Node, separator: &str) -> Result<String> {
    let key = attribute
        .attr("key")
        .and_then(AttrValue::as_str)
        .ok_or_else(|| EditorError::invalid_edit("attribute without a key"))?;
    let value = attribute
        .first_child()
        .ok_or_else(|| EditorError::invalid_edit(format!("attribute {key} has no value")))?;
    let key = if is_ident(key) {
        key.to_string()
    } else {
        quote(key)
    };
    Ok(format!("{key}{separator}{}", expression(value)?))
}

fn expression(value: &Node) -> Result<String> {
    let text = value.text_content();
    Ok(match value.type_name() {
        "attribute_string" => quote(&text),
        // typed-in text that no longer reads as a number is kept as a string
        "attribute_number" if is_number(&text) => text,
        "attribute_number" => quote(&text),
        "attribute_variable" if is_variable_path(&text) => format!("${text}"),
        "attribute_variable" => quote(&text),
        "attribute_true" => "true".to_string(),
        "attribute_false" => "false".to_string(),
        "attribute_null" => "null".to_string(),
        "attribute_object" => {
            let fields = value
                .content()
                .iter()
                .map(|field| entry(field, ": "))
                .collect::<Result<Vec<_>>>()?;
            format!("{{{}}}", fields.join(", "))
        }
        other => {
            return Err(EditorError::invalid_edit(format!(
                "{other} is not an attribute value"
            )));
        }
    })
}

enum PieceKind {
    Text(String),
    Break,
}

/// A run of inline content with the marks it is written under. Code is
/// tracked apart from the other marks because it is written as a span
/// rather than opened and closed.
struct Piece {
    kind: PieceKind,
    marks: Vec<Mark>,
    code: bool,
}

fn intersect(a: &[Mark], b: &[Mark]) -> Vec<Mark> {
    a.iter().filter(|m| b.contains(m)).cloned().collect()
}

fn split_code(marks: &[Mark]) -> (Vec<Mark>, bool) {
    let code = marks.iter().any(|m| m.name() == "code");
    (marks.iter().filter(|m| m.name() != "code").cloned().collect(), code)
}

/// Splits inline children into pieces. Whitespace at the edges of marked
/// text moves out of the marks that open or close there, since delimiters
/// may not touch whitespace on their inner side.
fn pieces(node: &Node) -> Vec<Piece> {
    let children = node.content().children();
    let marks_at = |i: Option<usize>| -> Vec<Mark> {
        i.and_then(|i| children.get(i))
            .map(|c| split_code(c.marks()).0)
            .unwrap_or_default()
    };
    let mut out = vec![];
    for (i, child) in children.iter().enumerate() {
        let (marks, code) = split_code(child.marks());
        let Some(text) = child.text() else {
            out.push(Piece {
                kind: PieceKind::Break,
                marks,
                code: false,
            });
            continue;
        };
        if code || marks.is_empty() {
            out.push(Piece {
                kind: PieceKind::Text(text.to_string()),
                marks,
                code,
            });
            continue;
        }
        let prev = marks_at(i.checked_sub(1));
        let next = marks_at(Some(i + 1));
        let core_start = text.len() - text.trim_start().len();
        let core_end = text.trim_end().len().max(core_start);
        let parts = [
            (&text[..core_start], intersect(&marks, &prev)),
            (&text[core_start..core_end], marks.clone()),
            (&text[core_end..], intersect(&marks, &next)),
        ];
        for (part, marks) in parts {
            if !part.is_empty() {
                out.push(Piece {
                    kind: PieceKind::Text(part.to_string()),
                    marks,
                    code: false,
                });
            }
        }
    }
    out
}

fn inline(node: &Node, breaks: bool) -> String {
    let pieces = pieces(node);
    let mut writer = InlineWriter::default();
    for i in 0..pieces.len() {
        writer.piece(&pieces, i, breaks);
    }
    writer.close_from(0);
    writer.out
}

#[derive(Default)]
struct InlineWriter {
    out: String,
    /// Open marks, outermost first, with the text that closes each.
    active: Vec<(Mark, String)>,
}

impl InlineWriter {
    fn piece(&mut self, pieces: &[Piece], i: usize, breaks: bool) {
        let piece = &pieces[i];
        // marks that are already open stay outermost, in their open order
        let mut target: Vec<Mark> = self
            .active
            .iter()
            .map(|(m, _)| m)
            .filter(|m| piece.marks.contains(m))
            .cloned()
            .collect();
        // new marks that run further open first so they close last
        let mut opening: Vec<Mark> = piece
            .marks
            .iter()
            .filter(|m| !target.contains(m))
            .cloned()
            .collect();
        opening.sort_by_key(|m| Reverse(pieces[i..].iter().take_while(|p| p.marks.contains(m)).count()));
        target.extend(opening);

        let keep = self
            .active
            .iter()
            .zip(&target)
            .take_while(|((open, _), want)| open == *want)
            .count();
        self.close_from(keep);
        for mark in &target[keep..] {
            self.open(mark, pieces, i);
        }

        match &piece.kind {
            PieceKind::Break if breaks => self.out.push_str("\\\n"),
            PieceKind::Break => self.out.push(' '),
            PieceKind::Text(text) if piece.code => self.out.push_str(&code_span(text)),
            PieceKind::Text(text) => escape_into(&mut self.out, text),
        }
    }

    fn close_from(&mut self, keep: usize) {
        while self.active.len() > keep {
            if let Some((_, closer)) = self.active.pop() {
                self.out.push_str(&closer);
            }
        }
    }

    fn open(&mut self, mark: &Mark, pieces: &[Piece], i: usize) {
        let (opener, closer) = match mark.name() {
            "em" => {
                let delimiter = em_delimiter(&self.out, mark, pieces, i);
                (delimiter, delimiter.to_string())
            }
            "strong" => ("**", "**".to_string()),
            "strike" => ("~~", "~~".to_string()),
            "link" => ("[", format!("]({})", link_destination(mark))),
            _ => ("", String::new()),
        };
        self.out.push_str(opener);
        self.active.push((mark.clone(), closer));
    }
}

fn has_strong(piece: Option<&Piece>) -> bool {
    piece.is_some_and(|p| p.marks.iter().any(|m| m.name() == "strong"))
}

/// `*` unless the emphasis starts or ends where strong emphasis does,
/// which would merge the delimiter runs. `_` cannot touch a word.
fn em_delimiter(out: &str, em: &Mark, pieces: &[Piece], start: usize) -> &'static str {
    let end = (start..pieces.len())
        .find(|&j| !pieces[j].marks.contains(em))
        .unwrap_or(pieces.len());
    let strong_at_start = has_strong(pieces.get(start)) != has_strong(start.checked_sub(1).and_then(|j| pieces.get(j)));
    let strong_at_end = has_strong(pieces.get(end - 1)) != has_strong(pieces.get(end));
    if !(strong_at_start || strong_at_end) {
        return "*";
    }
    let before = out.chars().next_back();
    let after = match pieces.get(end).map(|p| &p.kind) {
        Some(PieceKind::Text(text)) => text.chars().next(),
        _ => None,
    };
    if before.is_some_and(char::is_alphanumeric) || after.is_some_and(char::is_alphanumeric) {
        "*"
    } else {
        "_"
    }
}

fn link_destination(mark: &Mark) -> String {
    let href = mark.attrs().get("href").and_then(AttrValue::as_str).unwrap_or("");
    let needs_brackets =
        href.is_empty() || href.chars().any(|c| c.is_whitespace() || matches!(c, '(' | ')' | '<' | '>'));
    let mut out = String::new();
    if needs_brackets {
        out.push('<');
    }
    for c in href.chars() {
        if matches!(c, '\\' | '<' | '>') {
            out.push('\\');
        }
        out.push(c);
    }
    if needs_brackets {
        out.push('>');
    }
    if let Some(title) = mark.attrs().get("title").and_then(AttrValue::as_str) {
        out.push_str(" \"");
        for c in title.chars() {
            if matches!(c, '\\' | '"') {
                out.push('\\');
            }
            out.push(c);
        }
        out.push('"');
    }
    out
}

fn code_span(text: &str) -> String {
    let fence = "`".repeat(longest_run(text, '`') + 1);
    let pad = text.starts_with('`')
        || text.ends_with('`')
        || (text.starts_with(' ') && text.ends_with(' ') && !text.trim().is_empty());
    if pad {
        format!("{fence} {text} {fence}")
    } else {
        format!("{fence}{text}{fence}")
    }
}

/// Escapes `text` so it reads back as literal text, including chars that
/// would open a block at the start of a line.
fn escape_into(out: &mut String, text: &str) {
    if out.is_empty() || out.ends_with('\n') {
        if text.starts_with(['#', '>', '-', '+']) {
            out.push('\\');
        }
        let digits = text.bytes().take_while(u8::is_ascii_digit).count();
        if digits > 0 && text[digits..].starts_with(['.', ')']) {
            out.push_str(&text[..digits]);
            out.push('\\');
            escape_rest(out, &text[digits..]);
            return;
        }
    }
    escape_rest(out, text);
}

fn escape_rest(out: &mut String, text: &str) {
    for (i, c) in text.char_indices() {
        match c {
            '\\' | '*' | '_' | '~' | '`' | '[' | ']' => {
                out.push('\\');
                out.push(c);
            }
            '{' if text[i + 1..].starts_with('%') => out.push_str("\\{"),
            '&' if text[i + 1..].starts_with('#') => out.push_str("\\&"),
            '\n' => out.push_str(&char_reference('\n')),
            c => out.push(c),
        }
    }
}

fn char_reference(c: char) -> String {
    format!("&#{};", u32::from(c))
}

/// Writes the leading and trailing whitespace of `line` as references.
fn protect_edges(line: &str) -> String {
    let start = line.len() - line.trim_start().len();
    let end = line.trim_end().len().max(start);
    let mut out: String = line[..start].chars().map(char_reference).collect();
    out.push_str(&line[start..end]);
    out.extend(line[end..].chars().map(char_reference));
    out
}
