//! Byte spans and line iteration over the source rope.

use serde::Serialize;
use xi_rope::Rope;

/// A half-open byte range `[start, end)` in the markup source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Returns the length of the span in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns true if the span is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// A reference to a single line in the rope with its byte span.
#[derive(Debug, Clone)]
pub struct LineRef {
    /// Byte span of this line (includes the newline if present).
    pub span: Span,
    pub text: String,
}

impl LineRef {
    /// The line without its line ending.
    pub fn content(&self) -> &str {
        self.text.trim_end_matches(['\r', '\n'])
    }
}

/// Returns an iterator over lines with their byte spans.
///
/// Uses `lines_raw` to keep newline characters so spans add up to the
/// full length of the rope.
pub fn lines_with_spans(rope: &Rope) -> impl Iterator<Item = LineRef> + '_ {
    let mut offset = 0usize;
    rope.lines_raw(..).map(move |line| {
        let start = offset;
        offset += line.len();
        LineRef {
            span: Span { start, end: offset },
            text: line.into_owned(),
        }
    })
}

/// Extracts the text covered by `sp`, clamped to the rope.
pub fn slice_to_string(rope: &Rope, sp: Span) -> String {
    let end = sp.end.min(rope.len());
    let start = sp.start.min(end);
    rope.slice_to_cow(start..end).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_keep_their_offsets() {
        let rope = Rope::from("# a\n\nb\n");
        let lines: Vec<_> = lines_with_spans(&rope).collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].span, Span::new(0, 4));
        assert_eq!(lines[1].content(), "");
        assert_eq!(lines[2].span, Span::new(5, 7));
        assert_eq!(lines[2].content(), "b");
    }

    #[test]
    fn crlf_is_stripped_from_content() {
        let rope = Rope::from("a\r\nb");
        let lines: Vec<_> = lines_with_spans(&rope).collect();
        assert_eq!(lines[0].content(), "a");
        assert_eq!(lines[0].span.len(), 3);
        assert_eq!(lines[1].content(), "b");
    }

    #[test]
    fn slice_is_clamped() {
        let rope = Rope::from("hello");
        assert_eq!(slice_to_string(&rope, Span::new(1, 3)), "el");
        assert_eq!(slice_to_string(&rope, Span::new(3, 99)), "lo");
        assert!(Span::new(4, 2).is_empty());
        assert_eq!(Span::new(4, 2).len(), 0);
    }
}
