//! Glob Pattern Module
//!
//! Compiles `*`/`?` patterns into an explicit matcher for cache key scans.
//!
//! Patterns are anchored at both ends: `*` matches any run of characters
//! (including an empty one), `?` matches exactly one character, and every
//! other character matches itself literally. Cache keys routinely contain
//! regex metacharacters (`:`|`{`|`"` from serialized params), so this is a
//! purpose-built matcher rather than a regex assembled from the pattern.

// == Pattern Token ==
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    /// Matches one specific character
    Literal(char),
    /// `?` - matches exactly one character
    AnyChar,
    /// `*` - matches any run of characters, including none
    AnyRun,
}

// == Glob Pattern ==
/// A compiled glob pattern.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    tokens: Vec<Token>,
}

impl GlobPattern {
    // == Constructor ==
    /// Compiles a pattern string into a matcher.
    ///
    /// Consecutive `*` collapse into one, since they match the same inputs.
    pub fn new(pattern: &str) -> Self {
        let mut tokens = Vec::with_capacity(pattern.len());
        for ch in pattern.chars() {
            match ch {
                '*' => {
                    if tokens.last() != Some(&Token::AnyRun) {
                        tokens.push(Token::AnyRun);
                    }
                }
                '?' => tokens.push(Token::AnyChar),
                other => tokens.push(Token::Literal(other)),
            }
        }
        Self { tokens }
    }

    // == Matches ==
    /// Tests whether the full input matches the pattern.
    ///
    /// Iterative two-pointer matching with backtracking to the most recent
    /// `*`: linear in practice for the short keys this cache holds.
    pub fn matches(&self, input: &str) -> bool {
        let chars: Vec<char> = input.chars().collect();
        let mut t = 0; // token index
        let mut c = 0; // char index
        // Position to resume from when a match past a `*` fails
        let mut star_token: Option<usize> = None;
        let mut star_char = 0;

        while c < chars.len() {
            match self.tokens.get(t) {
                Some(Token::Literal(l)) if *l == chars[c] => {
                    t += 1;
                    c += 1;
                }
                Some(Token::AnyChar) => {
                    t += 1;
                    c += 1;
                }
                Some(Token::AnyRun) => {
                    // Tentatively match zero characters; remember where to
                    // backtrack if the rest of the pattern fails.
                    star_token = Some(t);
                    star_char = c;
                    t += 1;
                }
                _ => {
                    // Mismatch: give the last `*` one more character.
                    match star_token {
                        Some(st) => {
                            star_char += 1;
                            t = st + 1;
                            c = star_char;
                        }
                        None => return false,
                    }
                }
            }
        }

        // Input consumed; remaining tokens must all be `*`.
        self.tokens[t..].iter().all(|tok| *tok == Token::AnyRun)
    }
}

/// One-shot convenience wrapper around [`GlobPattern`].
pub fn glob_match(pattern: &str, input: &str) -> bool {
    GlobPattern::new(pattern).matches(input)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_match() {
        assert!(glob_match("abc", "abc"));
        assert!(!glob_match("abc", "abd"));
        assert!(!glob_match("abc", "ab"));
        assert!(!glob_match("abc", "abcd"));
    }

    #[test]
    fn test_star_matches_any_run() {
        assert!(glob_match("a:*", "a:1"));
        assert!(glob_match("a:*", "a:"));
        assert!(glob_match("a:*", "a:long:suffix"));
        assert!(!glob_match("a:*", "b:1"));
    }

    #[test]
    fn test_star_in_middle() {
        assert!(glob_match("GET:*/jobs", "GET:http://x/jobs"));
        assert!(!glob_match("GET:*/jobs", "GET:http://x/candidates"));
    }

    #[test]
    fn test_question_mark_exactly_one() {
        assert!(glob_match("a:?", "a:1"));
        assert!(!glob_match("a:?", "a:"));
        assert!(!glob_match("a:?", "a:12"));
    }

    #[test]
    fn test_anchored_both_ends() {
        assert!(!glob_match("jobs", "all_jobs_list"));
        assert!(glob_match("*jobs*", "all_jobs_list"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        assert!(glob_match("tags:GET:{\"a\":1}", "tags:GET:{\"a\":1}"));
        assert!(glob_match("a.b+c", "a.b+c"));
        assert!(!glob_match("a.b", "axb"));
    }

    #[test]
    fn test_multiple_stars() {
        assert!(glob_match("*:*", "GET:/jobs"));
        assert!(glob_match("a**b", "ab"));
        assert!(glob_match("a**b", "axxxb"));
    }

    #[test]
    fn test_trailing_star_after_consumed_input() {
        assert!(glob_match("abc*", "abc"));
        assert!(glob_match("abc**", "abc"));
        assert!(!glob_match("abc?", "abc"));
    }

    #[test]
    fn test_empty_pattern_and_input() {
        assert!(glob_match("", ""));
        assert!(!glob_match("", "a"));
        assert!(glob_match("*", ""));
    }

    #[test]
    fn test_backtracking() {
        // The `*` must re-expand after a failed literal match downstream
        assert!(glob_match("*:1", "a:2:1"));
        assert!(glob_match("*end", "end_not_end"));
        assert!(!glob_match("*end", "end_not_quite"));
    }
}
