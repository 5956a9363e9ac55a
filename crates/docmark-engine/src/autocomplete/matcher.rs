use nucleo_matcher::pattern::{CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Config, Matcher, Utf32Str};

use super::catalog::AttributeKey;

/// Ranks `keys` against `query` by fuzzy score, best first, keeping at
/// most `limit`. Keys matching neither by name nor by shorthand are
/// dropped. An empty query keeps the catalog order.
pub fn rank(query: &str, keys: Vec<AttributeKey>, limit: usize) -> Vec<AttributeKey> {
    if query.is_empty() {
        return keys.into_iter().take(limit).collect();
    }
    let pattern = Pattern::parse(query, CaseMatching::Ignore, Normalization::Smart);
    let mut matcher = Matcher::new(Config::DEFAULT);
    let mut buf = Vec::new();
    let mut scored: Vec<(u32, AttributeKey)> = keys
        .into_iter()
        .filter_map(|key| {
            let by_name = pattern.score(Utf32Str::new(&key.key, &mut buf), &mut matcher);
            let by_extra = key
                .extra
                .and_then(|extra| pattern.score(Utf32Str::new(extra, &mut buf), &mut matcher));
            by_name.max(by_extra).map(|score| (score, key))
        })
        .collect();
    // stable: equal scores keep catalog order
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().take(limit).map(|(_, key)| key).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn keys(names: &[&str]) -> Vec<AttributeKey> {
        names.iter().map(|n| AttributeKey::new(*n)).collect()
    }

    fn names(ranked: Vec<AttributeKey>) -> Vec<String> {
        ranked.into_iter().map(|k| k.key).collect()
    }

    #[test]
    fn empty_query_keeps_everything_in_order() {
        let ranked = rank("", keys(&["id", "class", "level"]), 10);
        assert_eq!(names(ranked), vec!["id", "class", "level"]);
    }

    #[test]
    fn non_matching_keys_are_dropped() {
        let ranked = rank("cls", keys(&["id", "class", "level"]), 10);
        assert_eq!(names(ranked), vec!["class"]);
    }

    #[test]
    fn matching_ignores_case() {
        let ranked = rank("ID", keys(&["class", "id"]), 10);
        assert_eq!(names(ranked), vec!["id"]);
    }

    #[test]
    fn results_are_capped() {
        let ranked = rank("", keys(&["a", "b", "c"]), 2);
        assert_eq!(names(ranked), vec!["a", "b"]);
    }

    #[test]
    fn exact_prefix_beats_scattered_match() {
        let ranked = rank("ti", keys(&["width", "title"]), 10);
        assert_eq!(names(ranked)[0], "title");
    }
}
