//! Attribute annotations: the trailing `{% key="value" #id .class %}` on a
//! block's line.
//!
//! The tag body is lexed with Logos and read by a small recursive descent
//! parser. Scanning a line for annotations never fails: anything that does
//! not read as a well-formed trailing annotation stays literal text and is
//! reported as a [`MarkupProblem`].

use logos::Logos;

use super::MarkupProblem;

pub const OPEN: &str = "{%";
pub const CLOSE: &str = "%}";

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t]+")]
enum TokenKind {
    #[token("{%")]
    Open,

    #[token("%}")]
    Close,

    #[token("=")]
    Eq,

    #[token(":")]
    Colon,

    #[token(",")]
    Comma,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("true")]
    True,

    #[token("false")]
    False,

    #[token("null")]
    Null,

    /// `#intro`
    #[regex(r"#[A-Za-z_][-A-Za-z0-9_]*")]
    IdShorthand,

    /// `.wide`
    #[regex(r"\.[A-Za-z_][-A-Za-z0-9_]*")]
    ClassShorthand,

    #[regex(r"[A-Za-z_][-A-Za-z0-9_]*")]
    Ident,

    #[regex(r"-?[0-9]+(\.[0-9]+)?")]
    Number,

    #[regex(r#""([^"\\]|\\.)*""#)]
    Str,

    /// `$page.title`
    #[regex(r"\$[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*")]
    Variable,
}

/// An attribute value as written in markup.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    /// Kept as written so `1.50` survives a round trip.
    Number(String),
    Bool(bool),
    Null,
    /// Variable path without the leading `$`.
    Variable(String),
    Object(Vec<Entry>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: String,
    pub value: Value,
}

/// A parsed annotation. Keys are unique; `duplicates` lists the keys that
/// were given more than once (the last value is kept).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Annotation {
    pub entries: Vec<Entry>,
    pub duplicates: Vec<String>,
}

/// An annotation found at the end of a line.
#[derive(Debug, Clone, PartialEq)]
pub struct Trailing {
    /// Byte offset of `{%` in the line.
    pub start: usize,
    pub annotation: Annotation,
}

/// Result of scanning one line.
#[derive(Debug, Default)]
pub struct LineScan {
    pub trailing: Option<Trailing>,
    /// Problems with line-relative byte ranges.
    pub problems: Vec<(usize, usize, MarkupProblem)>,
}

/// Scans `line` for `{%` tags outside code spans and escapes.
///
/// With `allow_trailing`, a well-formed annotation that runs to the end of
/// the line is returned; every other tag is reported and left alone.
pub fn scan_line(line: &str, allow_trailing: bool) -> LineScan {
    let mut scan = LineScan::default();
    let code = code_span_ranges(line);
    let mut from = 0;
    while let Some(found) = line[from..].find(OPEN) {
        let start = from + found;
        from = start + OPEN.len();
        if is_escaped(line, start) || code.iter().any(|(s, e)| (*s..*e).contains(&start)) {
            continue;
        }
        match parse_tag(&line[start..]) {
            Ok((annotation, consumed)) => {
                let end = start + consumed;
                if allow_trailing && line[end..].trim().is_empty() {
                    for key in &annotation.duplicates {
                        scan.problems.push((
                            start,
                            end,
                            MarkupProblem::DuplicateAttribute(key.clone()),
                        ));
                    }
                    scan.trailing = Some(Trailing { start, annotation });
                    break;
                }
                scan.problems.push((
                    start,
                    end,
                    MarkupProblem::InvalidAnnotation("annotation is not at the end of its block".into()),
                ));
                from = end;
            }
            Err(problem) => {
                let end = line[start..]
                    .find(CLOSE)
                    .map_or(line.len(), |i| start + i + CLOSE.len());
                scan.problems.push((start, end, problem));
            }
        }
    }
    scan
}

fn is_escaped(line: &str, at: usize) -> bool {
    let backslashes = line[..at].bytes().rev().take_while(|b| *b == b'\\').count();
    backslashes % 2 == 1
}

/// Byte ranges of the backtick code spans on a single line.
fn code_span_ranges(line: &str) -> Vec<(usize, usize)> {
    let bytes = line.as_bytes();
    let mut out = vec![];
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 2;
            continue;
        }
        if bytes[i] != b'`' {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && bytes[i] == b'`' {
            i += 1;
        }
        let run = i - start;
        let mut j = i;
        let mut closed = None;
        while j < bytes.len() {
            if bytes[j] == b'`' {
                let close_start = j;
                while j < bytes.len() && bytes[j] == b'`' {
                    j += 1;
                }
                if j - close_start == run {
                    closed = Some(j);
                    break;
                }
            } else {
                j += 1;
            }
        }
        if let Some(end) = closed {
            out.push((start, end));
            i = end;
        }
    }
    out
}

/// Reads one `{% ... %}` tag at the start of `s`. Returns the annotation and
/// the number of bytes consumed.
pub fn parse_tag(s: &str) -> Result<(Annotation, usize), MarkupProblem> {
    let mut lexer = TokenKind::lexer(s);
    let mut tokens = vec![];
    let mut consumed = None;
    while let Some(result) = lexer.next() {
        match result {
            Ok(TokenKind::Close) => {
                consumed = Some(lexer.span().end);
                break;
            }
            Ok(kind) => tokens.push((kind, lexer.slice())),
            Err(()) => {
                let rest = &s[lexer.span().start..];
                if !rest.contains(CLOSE) {
                    return Err(MarkupProblem::UnterminatedAnnotation);
                }
                return Err(MarkupProblem::InvalidAnnotation(format!(
                    "unexpected `{}`",
                    lexer.slice()
                )));
            }
        }
    }
    let consumed = consumed.ok_or(MarkupProblem::UnterminatedAnnotation)?;
    let mut parser = Parser {
        tokens,
        at: 0,
        duplicates: vec![],
    };
    let entries = parser.annotation()?;
    Ok((
        Annotation {
            entries,
            duplicates: parser.duplicates,
        },
        consumed,
    ))
}

struct Parser<'a> {
    tokens: Vec<(TokenKind, &'a str)>,
    at: usize,
    duplicates: Vec<String>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<TokenKind> {
        self.tokens.get(self.at).map(|(kind, _)| *kind)
    }

    fn next(&mut self) -> Option<(TokenKind, &'a str)> {
        let token = self.tokens.get(self.at).copied();
        self.at += 1;
        token
    }

    fn expect(&mut self, want: TokenKind) -> Result<(), MarkupProblem> {
        match self.next() {
            Some((kind, _)) if kind == want => Ok(()),
            Some((_, text)) => Err(invalid(format!("expected {want:?}, found `{text}`"))),
            None => Err(invalid(format!("expected {want:?}"))),
        }
    }

    fn annotation(&mut self) -> Result<Vec<Entry>, MarkupProblem> {
        self.expect(TokenKind::Open)?;
        // `{% name %}` and `{% name attr=1 %}` are Markdoc tags, not annotations.
        if let Some((TokenKind::Ident, name)) = self.tokens.get(self.at).copied()
            && self.tokens.get(self.at + 1).map(|(kind, _)| *kind) != Some(TokenKind::Eq)
        {
            return Err(MarkupProblem::UnsupportedTag(name.to_string()));
        }
        let mut entries = vec![];
        while let Some((kind, text)) = self.next() {
            match kind {
                TokenKind::IdShorthand => {
                    self.insert(&mut entries, "id", Value::String(text[1..].to_string()));
                }
                TokenKind::ClassShorthand => self.add_class(&mut entries, &text[1..]),
                TokenKind::Ident | TokenKind::Str => {
                    let key = key_text(kind, text);
                    self.expect(TokenKind::Eq)?;
                    let value = self.value()?;
                    self.insert(&mut entries, &key, value);
                }
                _ => return Err(invalid(format!("unexpected `{text}`"))),
            }
        }
        if entries.is_empty() {
            return Err(invalid("annotation has no attributes".into()));
        }
        Ok(entries)
    }

    fn value(&mut self) -> Result<Value, MarkupProblem> {
        let Some((kind, text)) = self.next() else {
            return Err(invalid("missing value".into()));
        };
        Ok(match kind {
            TokenKind::Str => Value::String(unescape(text)),
            TokenKind::Number => Value::Number(text.to_string()),
            TokenKind::True => Value::Bool(true),
            TokenKind::False => Value::Bool(false),
            TokenKind::Null => Value::Null,
            TokenKind::Variable => Value::Variable(text[1..].to_string()),
            TokenKind::LBrace => self.object()?,
            _ => return Err(invalid(format!("`{text}` is not a value"))),
        })
    }

    fn object(&mut self) -> Result<Value, MarkupProblem> {
        let mut fields = vec![];
        loop {
            match self.next() {
                Some((TokenKind::RBrace, _)) => break,
                Some((kind @ (TokenKind::Ident | TokenKind::Str), text)) => {
                    let key = key_text(kind, text);
                    self.expect(TokenKind::Colon)?;
                    let value = self.value()?;
                    self.insert(&mut fields, &key, value);
                    if self.peek() == Some(TokenKind::Comma) {
                        self.next();
                    }
                }
                Some((_, text)) => return Err(invalid(format!("unexpected `{text}` in object"))),
                None => return Err(invalid("object is not closed".into())),
            }
        }
        Ok(Value::Object(fields))
    }

    /// Adds `key`, replacing the value of an earlier entry with that key.
    fn insert(&mut self, entries: &mut Vec<Entry>, key: &str, value: Value) {
        if let Some(existing) = entries.iter_mut().find(|e| e.key == key) {
            existing.value = value;
            self.duplicates.push(key.to_string());
        } else {
            entries.push(Entry {
                key: key.to_string(),
                value,
            });
        }
    }

    /// `.a .b` reads as `class="a b"`.
    fn add_class(&mut self, entries: &mut Vec<Entry>, class: &str) {
        match entries.iter_mut().find(|e| e.key == "class") {
            Some(Entry {
                value: Value::String(existing),
                ..
            }) => {
                existing.push(' ');
                existing.push_str(class);
            }
            _ => self.insert(entries, "class", Value::String(class.to_string())),
        }
    }
}

fn invalid(msg: String) -> MarkupProblem {
    MarkupProblem::InvalidAnnotation(msg)
}

fn key_text(kind: TokenKind, text: &str) -> String {
    if kind == TokenKind::Str {
        unescape(text)
    } else {
        text.to_string()
    }
}

/// Strips the quotes of a string token and resolves its escapes.
fn unescape(token: &str) -> String {
    let inner = &token[1..token.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Quotes `s` as an annotation string.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Whether `s` lexes as a single identifier token.
pub fn is_ident(s: &str) -> bool {
    let mut lexer = TokenKind::lexer(s);
    matches!(lexer.next(), Some(Ok(TokenKind::Ident))) && lexer.span() == (0..s.len())
}

/// Whether `s` lexes as a single number token.
pub fn is_number(s: &str) -> bool {
    let mut lexer = TokenKind::lexer(s);
    matches!(lexer.next(), Some(Ok(TokenKind::Number))) && lexer.span() == (0..s.len())
}

/// Whether `$` followed by `s` lexes as a single variable token.
pub fn is_variable_path(s: &str) -> bool {
    let source = format!("${s}");
    let mut lexer = TokenKind::lexer(&source);
    matches!(lexer.next(), Some(Ok(TokenKind::Variable))) && lexer.span() == (0..source.len())
}
