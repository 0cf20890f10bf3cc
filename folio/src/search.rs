//! Query term parsing and literal substring matching
//!
//! Terms are plain lowercase substrings. No stemming, no fuzzy matching, no
//! query syntax: `"c++"` or `"a.b*"` match exactly those characters.

/// Split a raw search text into lowercase terms.
///
/// Whitespace runs collapse, the text is trimmed and lowercased, and repeated
/// terms are kept so they count twice when ranking. Blank input yields no
/// terms.
pub fn parse_terms(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect()
}

/// Case-insensitive substring test against an already lowercase term
pub(crate) fn contains_term(haystack: &str, term: &str) -> bool {
    haystack.to_lowercase().contains(term)
}

/// Non-overlapping, left-to-right occurrences of `term` in a lowercase haystack.
/// An empty term never matches.
pub(crate) fn count_occurrences(haystack_lower: &str, term: &str) -> usize {
    if term.is_empty() {
        return 0;
    }
    haystack_lower.matches(term).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_terms_basic() {
        assert_eq!(parse_terms("Title1 Title2"), vec!["title1", "title2"]);
    }

    #[test]
    fn test_parse_terms_collapses_whitespace() {
        assert_eq!(parse_terms("  rust \t\n  search   "), vec!["rust", "search"]);
    }

    #[test]
    fn test_parse_terms_blank() {
        assert!(parse_terms("").is_empty());
        assert!(parse_terms(" \t\n ").is_empty());
    }

    #[test]
    fn test_parse_terms_keeps_duplicates() {
        assert_eq!(parse_terms("rust RUST Rust"), vec!["rust", "rust", "rust"]);
    }

    #[test]
    fn test_parse_terms_unicode_lowercase() {
        assert_eq!(parse_terms("ÉCOLE Straße"), vec!["école", "straße"]);
    }

    #[test]
    fn test_contains_term_ignores_case() {
        assert!(contains_term("Hello World", "world"));
        assert!(!contains_term("Hello World", "planet"));
    }

    #[test]
    fn test_count_occurrences_literal() {
        assert_eq!(count_occurrences("a.b a.b axb", "a.b"), 2);
        assert_eq!(count_occurrences("c++ and c++", "c++"), 2);
        assert_eq!(count_occurrences("(x)", "("), 1);
    }

    #[test]
    fn test_count_occurrences_non_overlapping() {
        assert_eq!(count_occurrences("aaaa", "aa"), 2);
        assert_eq!(count_occurrences("aaa", "aa"), 1);
    }

    #[test]
    fn test_count_occurrences_empty_term() {
        assert_eq!(count_occurrences("anything", ""), 0);
    }

    proptest! {
        #[test]
        fn prop_terms_are_non_empty_and_trimmed(raw in "[ a-zA-Z0-9\t\n]{0,40}") {
            for term in parse_terms(&raw) {
                prop_assert!(!term.is_empty());
                prop_assert!(!term.chars().any(char::is_whitespace));
                prop_assert_eq!(term.to_lowercase(), term.clone());
            }
        }

        #[test]
        fn prop_parse_is_idempotent(raw in "[ a-zA-Z0-9\t]{0,40}") {
            let once = parse_terms(&raw);
            let twice = parse_terms(&once.join(" "));
            prop_assert_eq!(once, twice);
        }
    }
}
