//! # Block Parsing
//!
//! Lines are classified one at a time and grouped into blocks. Container
//! blocks (block quotes and list items) strip their prefix from each of
//! their lines and parse the remainder recursively, so nesting depth is
//! unbounded.
//!
//! Fenced code is a raw zone: no block, inline or annotation parsing
//! happens inside it except on the opening line's info string.

use std::sync::OnceLock;

use log::trace;
use regex::Regex;

use super::annotation::{Annotation, scan_line};
use super::rope::Span;
use super::{Diagnostic, EMPTY_PARAGRAPH, MarkupProblem};

/// A line of source with the prefixes of its enclosing containers removed.
#[derive(Debug, Clone, Copy)]
pub struct Line<'a> {
    pub text: &'a str,
    /// Byte offset of `text` in the source.
    pub offset: usize,
}

impl<'a> Line<'a> {
    pub fn new(text: &'a str, offset: usize) -> Self {
        Self { text, offset }
    }

    fn span(&self) -> Span {
        Span::new(self.offset, self.offset + self.text.len())
    }

    fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Drops the first `n` bytes (an ASCII prefix).
    fn skip(&self, n: usize) -> Line<'a> {
        let n = n.min(self.text.len());
        Line::new(&self.text[n..], self.offset + n)
    }

    /// Drops up to `n` leading spaces.
    fn dedent(&self, n: usize) -> Line<'a> {
        self.skip(leading_spaces(self.text).min(n))
    }

    fn trimmed(&self) -> Line<'a> {
        let start = self.text.len() - self.text.trim_start().len();
        let line = self.skip(start);
        Line::new(line.text.trim_end(), line.offset)
    }
}

fn leading_spaces(s: &str) -> usize {
    s.bytes().take_while(|b| *b == b' ').count()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Bullet { marker: char },
    Ordered { delimiter: char },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph {
        /// Content lines joined with `\n`, each trimmed.
        text: String,
        annotation: Option<Annotation>,
    },
    Heading {
        level: u8,
        text: String,
        annotation: Option<Annotation>,
    },
    Code {
        language: String,
        text: String,
        annotation: Option<Annotation>,
    },
    Quote(Vec<Block>),
    List {
        kind: ListKind,
        start: i64,
        items: Vec<Vec<Block>>,
    },
    Divider,
}

/// How a line opens a block.
#[derive(Debug, Clone, Copy)]
enum Opener<'a> {
    Fence { fence: u8, len: usize, info: Line<'a> },
    Heading { level: u8, content: Line<'a> },
    Divider,
    Quote,
    ListItem { kind: ListKind, number: i64, indent: usize },
}

fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^ {0,3}(`{3,}|~{3,})(.*)$").expect("Invalid fence regex"))
}

fn heading_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^ {0,3}(#{1,6})(?:[ \t]+(.*?))?[ \t]*$").expect("Invalid heading regex")
    })
}

fn divider_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^ {0,3}(?:(?:\*[ \t]*){3,}|(?:-[ \t]*){3,}|(?:_[ \t]*){3,})$")
            .expect("Invalid divider regex")
    })
}

fn quote_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^ {0,3}> ?").expect("Invalid quote regex"))
}

fn list_item_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^( {0,3})(?:([-*+])|([0-9]{1,9})([.)]))([ \t]+|$)").expect("Invalid list item regex")
    })
}

/// Classifies a non-blank line. `None` means paragraph text.
fn classify<'a>(line: &Line<'a>) -> Option<Opener<'a>> {
    let text = line.text;
    if let Some(caps) = fence_regex().captures(text) {
        let fence = caps.get(1)?;
        let info = caps.get(2)?;
        let ch = fence.as_str().as_bytes()[0];
        if !(ch == b'`' && info.as_str().contains('`')) {
            return Some(Opener::Fence {
                fence: ch,
                len: fence.len(),
                info: line.skip(info.start()),
            });
        }
    }
    if let Some(caps) = heading_regex().captures(text) {
        let level = caps.get(1)?.len() as u8;
        let content = match caps.get(2) {
            Some(m) => Line::new(m.as_str(), line.offset + m.start()),
            None => Line::new("", line.offset + text.len()),
        };
        return Some(Opener::Heading { level, content });
    }
    if divider_regex().is_match(text) {
        return Some(Opener::Divider);
    }
    if quote_regex().is_match(text) {
        return Some(Opener::Quote);
    }
    if let Some(caps) = list_item_regex().captures(text) {
        let lead = caps.get(1)?.len();
        let (kind, number, marker_len) = match (caps.get(2), caps.get(3), caps.get(4)) {
            (Some(bullet), _, _) => (
                ListKind::Bullet {
                    marker: bullet.as_str().chars().next()?,
                },
                1,
                1,
            ),
            (None, Some(digits), Some(delimiter)) => (
                ListKind::Ordered {
                    delimiter: delimiter.as_str().chars().next()?,
                },
                digits.as_str().parse().ok()?,
                digits.len() + 1,
            ),
            _ => return None,
        };
        let spaces = caps.get(5)?.len();
        // an empty item or one starting with indented content keeps a
        // one-space gap
        let gap = if spaces == 0 || spaces > 4 { 1 } else { spaces };
        return Some(Opener::ListItem {
            kind,
            number,
            indent: lead + marker_len + gap,
        });
    }
    None
}

/// Groups lines into blocks, recording recovered problems.
pub struct BlockParser<'d> {
    diagnostics: &'d mut Vec<Diagnostic>,
}

impl<'d> BlockParser<'d> {
    pub fn new(diagnostics: &'d mut Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }

    pub fn parse(&mut self, lines: &[Line<'_>]) -> Vec<Block> {
        let mut out = vec![];
        let mut i = 0;
        while i < lines.len() {
            let line = &lines[i];
            if line.is_blank() {
                i += 1;
                continue;
            }
            i = match classify(line) {
                Some(Opener::Fence { fence, len, info }) => self.fence(lines, i, fence, len, info, &mut out),
                Some(Opener::Heading { level, content }) => {
                    let (text, annotation) = self.strip_annotation(content.trimmed(), true);
                    out.push(Block::Heading {
                        level,
                        text,
                        annotation,
                    });
                    i + 1
                }
                Some(Opener::Divider) => {
                    out.push(Block::Divider);
                    i + 1
                }
                Some(Opener::Quote) => self.quote(lines, i, &mut out),
                Some(Opener::ListItem { kind, number, .. }) => self.list(lines, i, kind, number, &mut out),
                None => self.paragraph(lines, i, &mut out),
            };
        }
        out
    }

    fn report(&mut self, span: Span, problem: MarkupProblem) {
        self.diagnostics.push(Diagnostic::new(span, problem));
    }

    /// Splits a trailing annotation off `line`, reporting any other tags.
    fn strip_annotation(&mut self, line: Line<'_>, allow_trailing: bool) -> (String, Option<Annotation>) {
        let scan = scan_line(line.text, allow_trailing);
        for (start, end, problem) in scan.problems {
            self.report(Span::new(line.offset + start, line.offset + end), problem);
        }
        match scan.trailing {
            Some(trailing) => (
                line.text[..trailing.start].trim_end().to_string(),
                Some(trailing.annotation),
            ),
            None => (line.text.to_string(), None),
        }
    }

    fn paragraph(&mut self, lines: &[Line<'_>], start: usize, out: &mut Vec<Block>) -> usize {
        let mut end = start + 1;
        while end < lines.len() && !lines[end].is_blank() && classify(&lines[end]).is_none() {
            end += 1;
        }
        let mut text_lines = Vec::with_capacity(end - start);
        let mut annotation = None;
        for (i, line) in lines[start..end].iter().enumerate() {
            let last = start + i + 1 == end;
            let (text, found) = self.strip_annotation(line.trimmed(), last);
            if found.is_some() {
                annotation = found;
            }
            text_lines.push(text);
        }
        let mut text = text_lines.join("\n");
        if text == EMPTY_PARAGRAPH {
            text.clear();
        }
        out.push(Block::Paragraph { text, annotation });
        end
    }

    fn fence(
        &mut self,
        lines: &[Line<'_>],
        start: usize,
        fence: u8,
        len: usize,
        info: Line<'_>,
        out: &mut Vec<Block>,
    ) -> usize {
        let (language, annotation) = self.strip_annotation(info.trimmed(), true);
        let mut end = start + 1;
        let mut closed = false;
        while end < lines.len() {
            if closes_fence(lines[end].text, fence, len) {
                closed = true;
                break;
            }
            end += 1;
        }
        let body: Vec<&str> = lines[start + 1..end].iter().map(|l| l.text).collect();
        if !closed {
            self.report(
                Span::new(lines[start].offset, lines[end - 1].span().end),
                MarkupProblem::UnclosedFence,
            );
        }
        out.push(Block::Code {
            language: language.trim().to_string(),
            text: body.join("\n"),
            annotation,
        });
        if closed { end + 1 } else { end }
    }

    fn quote(&mut self, lines: &[Line<'_>], start: usize, out: &mut Vec<Block>) -> usize {
        let mut inner = vec![];
        let mut end = start;
        while let Some(line) = lines.get(end) {
            let Some(m) = quote_regex().find(line.text) else {
                break;
            };
            inner.push(line.skip(m.end()));
            end += 1;
        }
        trace!("block quote over lines {start}..{end}");
        out.push(Block::Quote(self.parse(&inner)));
        end
    }

    fn list(&mut self, lines: &[Line<'_>], start: usize, kind: ListKind, number: i64, out: &mut Vec<Block>) -> usize {
        let mut items = vec![];
        let mut i = start;
        let mut end = start;
        while let Some(Opener::ListItem {
            kind: item_kind,
            indent,
            ..
        }) = lines.get(i).and_then(|l| classify(l))
        {
            if item_kind != kind {
                break;
            }
            let line = &lines[i];
            let mut item_lines = vec![line.skip(indent)];
            let mut j = i + 1;
            while j < lines.len() {
                if lines[j].is_blank() {
                    let next = (j..lines.len()).find(|&k| !lines[k].is_blank());
                    match next {
                        Some(k) if leading_spaces(lines[k].text) >= indent => {
                            item_lines.extend(lines[j..k].iter().map(|l| l.dedent(indent)));
                            j = k;
                        }
                        _ => break,
                    }
                } else if leading_spaces(lines[j].text) >= indent {
                    item_lines.push(lines[j].dedent(indent));
                    j += 1;
                } else {
                    break;
                }
            }
            items.push(self.parse(&item_lines));
            end = j;
            // blank lines between items do not end the list
            i = (j..lines.len()).find(|&k| !lines[k].is_blank()).unwrap_or(lines.len());
        }
        trace!("list of {} items over lines {start}..{end}", items.len());
        out.push(Block::List {
            kind,
            start: number,
            items,
        });
        end
    }
}

fn closes_fence(text: &str, fence: u8, len: usize) -> bool {
    let lead = leading_spaces(text);
    if lead > 3 {
        return false;
    }
    let rest = &text[lead..];
    let run = rest.bytes().take_while(|b| *b == fence).count();
    run >= len && rest[run..].trim().is_empty()
}
