use crate::error::{EditorError, Result};

/// One term of a content expression: a set of allowed node types with a
/// repetition range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentTerm {
    alternatives: Vec<usize>,
    min: usize,
    max: Option<usize>,
}

impl ContentTerm {
    /// Node type ids accepted by this term, in declaration order.
    pub fn alternatives(&self) -> &[usize] {
        &self.alternatives
    }

    pub fn min(&self) -> usize {
        self.min
    }

    pub fn max(&self) -> Option<usize> {
        self.max
    }

    fn accepts(&self, id: usize) -> bool {
        self.alternatives.contains(&id)
    }
}

/// A compiled content expression such as `"block+"` or
/// `"attributes (paragraph | heading)"`.
///
/// Grammar: a sequence of terms; a term is a node name, a group name or a
/// parenthesized `|` alternation, optionally followed by `*`, `+` or `?`.
#[derive(Debug, Clone, Default)]
pub struct ContentExpr {
    source: String,
    terms: Vec<ContentTerm>,
}

impl PartialEq for ContentExpr {
    fn eq(&self, other: &Self) -> bool {
        self.terms == other.terms
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tok<'a> {
    Name(&'a str),
    Open,
    Close,
    Pipe,
    Star,
    Plus,
    Question,
}

fn tokenize(source: &str) -> Result<Vec<Tok<'_>>> {
    let mut out = Vec::new();
    let mut chars = source.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        let tok = match c {
            c if c.is_whitespace() => continue,
            '(' => Tok::Open,
            ')' => Tok::Close,
            '|' => Tok::Pipe,
            '*' => Tok::Star,
            '+' => Tok::Plus,
            '?' => Tok::Question,
            c if c.is_ascii_alphanumeric() || c == '_' => {
                let mut end = i + c.len_utf8();
                while let Some(&(j, n)) = chars.peek() {
                    if n.is_ascii_alphanumeric() || n == '_' {
                        end = j + n.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                Tok::Name(&source[i..end])
            }
            other => {
                return Err(EditorError::Configuration(format!(
                    "unexpected {other:?} in content expression {source:?}"
                )));
            }
        };
        out.push(tok);
    }
    Ok(out)
}

impl ContentExpr {
    /// Compiles `source`, resolving names through `resolve` (node name or
    /// group name to node type ids).
    pub(crate) fn parse<F>(source: &str, resolve: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<Vec<usize>>,
    {
        let err = |msg: &str| {
            EditorError::Configuration(format!("{msg} in content expression {source:?}"))
        };
        let lookup = |name: &str| {
            resolve(name).ok_or_else(|| {
                EditorError::Configuration(format!(
                    "unknown node type or group {name:?} in content expression {source:?}"
                ))
            })
        };

        let toks = tokenize(source)?;
        let mut it = toks.into_iter().peekable();
        let mut terms = Vec::new();
        while let Some(tok) = it.next() {
            let mut alternatives = match tok {
                Tok::Name(name) => lookup(name)?,
                Tok::Open => {
                    let mut alts = Vec::new();
                    loop {
                        match it.next() {
                            Some(Tok::Name(name)) => alts.extend(lookup(name)?),
                            _ => return Err(err("expected a name")),
                        }
                        match it.next() {
                            Some(Tok::Pipe) => continue,
                            Some(Tok::Close) => break,
                            _ => return Err(err("expected '|' or ')'")),
                        }
                    }
                    alts
                }
                _ => return Err(err("unexpected operator")),
            };
            let mut seen = Vec::new();
            alternatives.retain(|id| {
                if seen.contains(id) {
                    false
                } else {
                    seen.push(*id);
                    true
                }
            });
            let (min, max) = match it.peek() {
                Some(Tok::Star) => (0, None),
                Some(Tok::Plus) => (1, None),
                Some(Tok::Question) => (0, Some(1)),
                _ => (1, Some(1)),
            };
            if matches!(it.peek(), Some(Tok::Star | Tok::Plus | Tok::Question)) {
                it.next();
            }
            terms.push(ContentTerm {
                alternatives,
                min,
                max,
            });
        }
        Ok(Self {
            source: source.to_string(),
            terms,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn terms(&self) -> &[ContentTerm] {
        &self.terms
    }

    /// An empty expression describes a leaf.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Whether a node of type `id` may appear anywhere in this content.
    pub fn allows(&self, id: usize) -> bool {
        self.terms.iter().any(|t| t.accepts(id))
    }

    /// Whether the sequence of child type ids satisfies the expression.
    pub fn matches(&self, ids: &[usize]) -> bool {
        match_from(&self.terms, ids)
    }
}

fn match_from(terms: &[ContentTerm], ids: &[usize]) -> bool {
    let Some((term, rest)) = terms.split_first() else {
        return ids.is_empty();
    };
    // Longest run this term can take, then backtrack.
    let mut run = 0;
    while run < ids.len() && term.max.is_none_or(|max| run < max) && term.accepts(ids[run]) {
        run += 1;
    }
    if run < term.min {
        return false;
    }
    (term.min..=run).rev().any(|n| match_from(rest, &ids[n..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn resolve(name: &str) -> Option<Vec<usize>> {
        match name {
            "a" => Some(vec![0]),
            "b" => Some(vec![1]),
            "c" => Some(vec![2]),
            "ab" => Some(vec![0, 1]),
            _ => None,
        }
    }

    #[rstest]
    #[case("a+", &[0, 0], true)]
    #[case("a+", &[], false)]
    #[case("a*", &[], true)]
    #[case("a b?", &[0], true)]
    #[case("a b?", &[0, 1, 1], false)]
    #[case("(a | b)* c", &[1, 0, 2], true)]
    #[case("ab+ b", &[0, 1], true)]
    #[case("ab+ b", &[1], false)]
    #[case("a (b | c)", &[0, 2], true)]
    #[case("", &[], true)]
    #[case("", &[0], false)]
    fn content_matching(#[case] source: &str, #[case] ids: &[usize], #[case] expected: bool) {
        let expr = ContentExpr::parse(source, resolve).unwrap();
        assert_eq!(expr.matches(ids), expected, "{source} vs {ids:?}");
    }

    #[test]
    fn unknown_names_are_configuration_errors() {
        let err = ContentExpr::parse("a zzz", resolve).unwrap_err();
        assert!(matches!(err, EditorError::Configuration(_)));
    }

    #[test]
    fn unbalanced_groups_are_rejected() {
        assert!(ContentExpr::parse("(a | b", resolve).is_err());
        assert!(ContentExpr::parse("* a", resolve).is_err());
    }

    #[test]
    fn group_alternatives_are_deduplicated() {
        let expr = ContentExpr::parse("(a | ab)", resolve).unwrap();
        assert_eq!(expr.terms()[0].alternatives(), &[0, 1]);
    }
}
