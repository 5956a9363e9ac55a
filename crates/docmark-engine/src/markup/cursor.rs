/// A byte cursor for inline parsing.
///
/// Every delimiter the inline grammar reacts to is ASCII, so the cursor
/// only ever stops on char boundaries when it splits `s`.
#[derive(Clone)]
pub struct Cursor<'a> {
    pub s: &'a str,
    /// Current byte index into `s`.
    pub i: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(s: &'a str) -> Self {
        Self { s, i: 0 }
    }

    pub fn at(s: &'a str, i: usize) -> Self {
        Self { s, i }
    }

    pub fn eof(&self) -> bool {
        self.i >= self.s.len()
    }

    /// Peeks at the current byte without advancing.
    pub fn peek(&self) -> Option<u8> {
        self.s.as_bytes().get(self.i).copied()
    }

    /// Peeks `n` bytes ahead.
    pub fn peek_at(&self, n: usize) -> Option<u8> {
        self.s.as_bytes().get(self.i + n).copied()
    }

    pub fn starts_with(&self, pat: &[u8]) -> bool {
        self.s.as_bytes().get(self.i..).is_some_and(|rest| rest.starts_with(pat))
    }

    pub fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.i += 1;
        Some(b)
    }

    pub fn bump_n(&mut self, n: usize) {
        self.i += n;
    }

    /// Consumes one whole char.
    pub fn bump_char(&mut self) -> Option<char> {
        let c = self.s.get(self.i..)?.chars().next()?;
        self.i += c.len_utf8();
        Some(c)
    }

    /// Length of the run of `b` starting at the cursor.
    pub fn run_len(&self, b: u8) -> usize {
        self.s.as_bytes()[self.i.min(self.s.len())..]
            .iter()
            .take_while(|&&c| c == b)
            .count()
    }

    /// The char just before the cursor.
    pub fn prev_char(&self) -> Option<char> {
        self.s.get(..self.i)?.chars().next_back()
    }

    /// The char `n` bytes after the cursor.
    pub fn char_after(&self, n: usize) -> Option<char> {
        self.s.get(self.i + n..)?.chars().next()
    }
}
