//! Inline grammar: escapes, character references, breaks, code spans,
//! emphasis, strike and links.
//!
//! Code spans are raw zones and are matched before anything else. Emphasis
//! uses a simplified flanking rule: an opener must be followed by a
//! non-space char and its closer preceded by one; `_` additionally may not
//! sit inside a word. A closer is the next run of the same delimiter with
//! exactly the opener's length.

use super::cursor::Cursor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineMark {
    Link { href: String, title: Option<String> },
    Em,
    Strong,
    Strike,
    Code,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text { text: String, marks: Vec<InlineMark> },
    HardBreak { marks: Vec<InlineMark> },
}

/// Parses the content of a paragraph or heading. Lines are separated by
/// `\n`; a line ending in an unescaped `\` is a hard break, any other line
/// end reads as a space.
pub fn parse_inline(s: &str) -> Vec<Inline> {
    let mut out = vec![];
    run(s, &[], false, &mut out);
    out
}

fn run(s: &str, marks: &[InlineMark], in_link: bool, out: &mut Vec<Inline>) {
    let mut cur = Cursor::new(s);
    let mut text = String::new();

    fn flush(out: &mut Vec<Inline>, text: &mut String, marks: &[InlineMark]) {
        if !text.is_empty() {
            out.push(Inline::Text {
                text: std::mem::take(text),
                marks: marks.to_vec(),
            });
        }
    }

    while let Some(b) = cur.peek() {
        match b {
            b'\\' => match cur.peek_at(1) {
                Some(b'\n') => {
                    flush(out, &mut text, marks);
                    out.push(Inline::HardBreak {
                        marks: marks.to_vec(),
                    });
                    cur.bump_n(2);
                }
                Some(c) if c.is_ascii_punctuation() => {
                    text.push(c as char);
                    cur.bump_n(2);
                }
                _ => {
                    text.push('\\');
                    cur.bump();
                }
            },
            b'\n' => {
                text.push(' ');
                cur.bump();
            }
            b'&' => match char_reference(&s[cur.i..]) {
                Some((c, len)) => {
                    text.push(c);
                    cur.bump_n(len);
                }
                None => {
                    text.push('&');
                    cur.bump();
                }
            },
            b'`' => {
                if let Some((code, end)) = code_span(&cur) {
                    flush(out, &mut text, marks);
                    out.push(Inline::Text {
                        text: code,
                        marks: with(marks, InlineMark::Code),
                    });
                    cur.i = end;
                } else {
                    let n = cur.run_len(b'`');
                    text.push_str(&s[cur.i..cur.i + n]);
                    cur.bump_n(n);
                }
            }
            b'*' | b'_' | b'~' => {
                let n = cur.run_len(b);
                match delimited(&cur, b, n) {
                    Some((open, inner_end, added)) => {
                        flush(out, &mut text, marks);
                        let mut inner_marks = marks.to_vec();
                        inner_marks.extend(added);
                        run(&s[cur.i + open..inner_end], &inner_marks, in_link, out);
                        cur.i = inner_end + open;
                    }
                    None => {
                        text.push_str(&s[cur.i..cur.i + n]);
                        cur.bump_n(n);
                    }
                }
            }
            b'[' if !in_link => match link(&cur) {
                Some(found) => {
                    flush(out, &mut text, marks);
                    let link_marks = with(
                        marks,
                        InlineMark::Link {
                            href: found.href,
                            title: found.title,
                        },
                    );
                    run(&s[found.text.0..found.text.1], &link_marks, true, out);
                    cur.i = found.end;
                }
                None => {
                    text.push('[');
                    cur.bump();
                }
            },
            _ => {
                if let Some(c) = cur.bump_char() {
                    text.push(c);
                }
            }
        }
    }
    flush(out, &mut text, marks);
}

/// Decodes a numeric character reference (`&#32;` or `&#x20;`) at the
/// start of `s`. Returns the char and the number of bytes it spans.
fn char_reference(s: &str) -> Option<(char, usize)> {
    let body = s.strip_prefix("&#")?;
    let (digits, radix, max, prefix) = match body.strip_prefix(['x', 'X']) {
        Some(hex) => (hex, 16, 6, 3),
        None => (body, 10, 7, 2),
    };
    let len = digits.bytes().take_while(|b| (*b as char).is_digit(radix)).count();
    if len == 0 || len > max || digits.as_bytes().get(len) != Some(&b';') {
        return None;
    }
    let code = u32::from_str_radix(&digits[..len], radix).ok()?;
    let c = char::from_u32(code).filter(|c| *c != '\0')?;
    Some((c, prefix + len + 1))
}

fn with(marks: &[InlineMark], mark: InlineMark) -> Vec<InlineMark> {
    let mut out = marks.to_vec();
    out.push(mark);
    out
}

/// Matches a code span at the cursor: returns its content and the byte
/// index after the closing run.
fn code_span(cur: &Cursor<'_>) -> Option<(String, usize)> {
    let n = cur.run_len(b'`');
    let mut scan = Cursor::at(cur.s, cur.i + n);
    while !scan.eof() {
        if scan.peek() == Some(b'`') {
            let m = scan.run_len(b'`');
            if m == n {
                let raw = &cur.s[cur.i + n..scan.i];
                return Some((strip_code_padding(&raw.replace('\n', " ")), scan.i + m));
            }
            scan.bump_n(m);
        } else {
            scan.bump();
        }
    }
    None
}

/// One leading and one trailing space are dropped when both are present
/// and the content is not all spaces.
fn strip_code_padding(s: &str) -> String {
    if s.len() >= 2 && s.starts_with(' ') && s.ends_with(' ') && s.bytes().any(|b| b != b' ') {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

/// Looks for the closer of the delimiter run of `n` times `b` at the
/// cursor. Returns how much of the run opens, where the inner text ends
/// and the marks it adds. The closer has the same length as the opener.
fn delimited(cur: &Cursor<'_>, b: u8, n: usize) -> Option<(usize, usize, Vec<InlineMark>)> {
    let after = cur.char_after(n)?;
    if after.is_whitespace() {
        return None;
    }
    if b == b'_' && cur.prev_char().is_some_and(char::is_alphanumeric) {
        return None;
    }
    if let Some(end) = find_closer(cur, b, n, |m| m == n) {
        return Some((n, end, delimiter_marks(b, n)?));
    }
    if b == b'~' || n != 3 {
        return None;
    }
    // `***a** b*` and `***a* b**`: the part of the run that closes first
    // nests inside the part that closes last
    let first = find_closer(cur, b, n, |m| m < 3)?;
    let outer = 3 - Cursor::at(cur.s, first).run_len(b).min(2);
    let end = find_closer(cur, b, outer, |m| m == outer)?;
    Some((outer, end, delimiter_marks(b, outer)?))
}

fn delimiter_marks(b: u8, n: usize) -> Option<Vec<InlineMark>> {
    match (b, n) {
        (b'~', 2) => Some(vec![InlineMark::Strike]),
        (b'~', _) => None,
        (_, 1) => Some(vec![InlineMark::Em]),
        (_, 2) => Some(vec![InlineMark::Strong]),
        (_, 3) => Some(vec![InlineMark::Strong, InlineMark::Em]),
        _ => None,
    }
}

/// Scans from `open` bytes past the cursor for a run of `b` that can
/// close and whose length `fits`. A run of three that is also followed by
/// text closes a shorter opener with its first chars (`**a***b*`).
fn find_closer(cur: &Cursor<'_>, b: u8, open: usize, fits: impl Fn(usize) -> bool) -> Option<usize> {
    let mut scan = Cursor::at(cur.s, cur.i + open);
    while let Some(c) = scan.peek() {
        match c {
            b'\\' => {
                scan.bump();
                scan.bump_char();
            }
            b'`' => match code_span(&scan) {
                Some((_, end)) => scan.i = end,
                None => scan.bump_n(scan.run_len(b'`')),
            },
            c if c == b => {
                let m = scan.run_len(b);
                let shared = m == 3
                    && open < 3
                    && b != b'~'
                    && scan.char_after(m).is_some_and(|a| !a.is_whitespace());
                let closes = (fits(m) || shared)
                    && scan.i > cur.i + open
                    && scan.prev_char().is_some_and(|p| !p.is_whitespace())
                    && !(b == b'_' && scan.char_after(m).is_some_and(char::is_alphanumeric));
                if closes {
                    return Some(scan.i);
                }
                scan.bump_n(m);
            }
            _ => {
                scan.bump_char();
            }
        }
    }
    None
}

struct LinkMatch {
    /// Byte range of the link text.
    text: (usize, usize),
    href: String,
    title: Option<String>,
    end: usize,
}

/// Matches `[text](href "title")` at the cursor.
fn link(cur: &Cursor<'_>) -> Option<LinkMatch> {
    let mut scan = Cursor::at(cur.s, cur.i + 1);
    let mut depth = 0usize;
    let close = loop {
        match scan.peek()? {
            b'\\' => {
                scan.bump();
                scan.bump_char();
            }
            b'`' => match code_span(&scan) {
                Some((_, end)) => scan.i = end,
                None => scan.bump_n(scan.run_len(b'`')),
            },
            b'[' => {
                depth += 1;
                scan.bump();
            }
            b']' if depth == 0 => break scan.i,
            b']' => {
                depth -= 1;
                scan.bump();
            }
            _ => {
                scan.bump_char();
            }
        }
    };
    scan.bump();
    if scan.bump() != Some(b'(') {
        return None;
    }
    skip_spaces(&mut scan);

    let href = if scan.peek() == Some(b'<') {
        scan.bump();
        let mut href = String::new();
        loop {
            match scan.peek()? {
                b'>' => {
                    scan.bump();
                    break;
                }
                b'<' | b'\n' => return None,
                b'\\' if scan.peek_at(1).is_some_and(|c| c.is_ascii_punctuation()) => {
                    scan.bump();
                    href.push(scan.bump()? as char);
                }
                _ => href.push(scan.bump_char()?),
            }
        }
        href
    } else {
        let mut href = String::new();
        let mut parens = 0usize;
        while let Some(c) = scan.peek() {
            match c {
                b' ' | b'\t' | b'\n' => break,
                b')' if parens == 0 => break,
                b')' => {
                    parens -= 1;
                    href.push(')');
                    scan.bump();
                }
                b'(' => {
                    parens += 1;
                    href.push('(');
                    scan.bump();
                }
                b'\\' if scan.peek_at(1).is_some_and(|c| c.is_ascii_punctuation()) => {
                    scan.bump();
                    href.push(scan.bump()? as char);
                }
                _ => href.push(scan.bump_char()?),
            }
        }
        href
    };

    skip_spaces(&mut scan);
    let mut title = None;
    if scan.peek() == Some(b'"') {
        scan.bump();
        let mut t = String::new();
        loop {
            match scan.peek()? {
                b'"' => {
                    scan.bump();
                    break;
                }
                b'\\' if scan.peek_at(1).is_some_and(|c| c.is_ascii_punctuation()) => {
                    scan.bump();
                    t.push(scan.bump()? as char);
                }
                _ => t.push(scan.bump_char()?),
            }
        }
        title = Some(t);
        skip_spaces(&mut scan);
    }
    if scan.bump() != Some(b')') {
        return None;
    }
    Some(LinkMatch {
        text: (cur.i + 1, close),
        href,
        title,
        end: scan.i,
    })
}

fn skip_spaces(cur: &mut Cursor<'_>) {
    while matches!(cur.peek(), Some(b' ' | b'\t' | b'\n')) {
        cur.bump();
    }
}
