//! Path pattern compilation and matching.
//!
//! # Responsibilities
//! - Compile a route pattern into a segment matcher
//! - Match a request path and capture named segments
//! - Percent-decode every captured value
//!
//! # Pattern Language
//! - `/users/:id`: `:id` captures one non-empty segment
//! - `/files/:name?`: optional segment
//! - `/assets/*` or `/assets/*rest`: final wildcard capturing the remainder
//! - anything else is a literal segment
//!
//! # Design Decisions
//! - Literals compare after decoding, case-insensitive unless configured
//! - One trailing slash on the request path is ignored unless `strict`
//! - No regex: matching is a backtracking walk over segments
//! - A capture that is not valid UTF-8 after decoding is a no-match

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

/// Name under which an anonymous wildcard (`*`) is captured.
pub const WILDCARD_PARAM: &str = "*";

/// Error type for pattern compilation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("missing parameter name in pattern '{pattern}'")]
    MissingName { pattern: String },

    #[error("wildcard must be the last segment in pattern '{pattern}'")]
    WildcardNotLast { pattern: String },

    #[error("duplicate parameter '{name}' in pattern '{pattern}'")]
    DuplicateName { pattern: String, name: String },
}

/// Values captured by a successful match, keyed by parameter name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, String>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn remove(&mut self, name: &str) {
        self.0.remove(name);
    }
}

/// Matching behaviour switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOptions {
    /// Compare literal segments case-sensitively.
    pub case_sensitive: bool,
    /// Treat a trailing slash on the request path as significant.
    pub strict: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Param { name: String, optional: bool },
    Wildcard { name: String },
}

/// A compiled path pattern.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    pattern: String,
    tokens: Vec<Token>,
    options: MatchOptions,
}

impl PathMatcher {
    /// Compile a pattern with default options.
    pub fn compile(pattern: &str) -> Result<Self, PatternError> {
        Self::with_options(pattern, MatchOptions::default())
    }

    /// Compile a pattern with explicit options.
    pub fn with_options(pattern: &str, options: MatchOptions) -> Result<Self, PatternError> {
        let segments = split_segments(pattern, false);
        let mut tokens = Vec::with_capacity(segments.len());

        for (index, segment) in segments.iter().enumerate() {
            let token = if let Some(rest) = segment.strip_prefix(':') {
                let (name, optional) = match rest.strip_suffix('?') {
                    Some(name) => (name, true),
                    None => (rest, false),
                };
                if name.is_empty() {
                    return Err(PatternError::MissingName {
                        pattern: pattern.to_string(),
                    });
                }
                Token::Param {
                    name: name.to_string(),
                    optional,
                }
            } else if let Some(rest) = segment.strip_prefix('*') {
                if index + 1 != segments.len() {
                    return Err(PatternError::WildcardNotLast {
                        pattern: pattern.to_string(),
                    });
                }
                let name = if rest.is_empty() { WILDCARD_PARAM } else { rest };
                Token::Wildcard {
                    name: name.to_string(),
                }
            } else if options.case_sensitive {
                Token::Literal(segment.to_string())
            } else {
                Token::Literal(segment.to_lowercase())
            };

            if let Some(name) = token_name(&token) {
                if tokens.iter().filter_map(token_name).any(|seen| seen == name) {
                    return Err(PatternError::DuplicateName {
                        pattern: pattern.to_string(),
                        name: name.to_string(),
                    });
                }
            }
            tokens.push(token);
        }

        Ok(Self {
            pattern: pattern.to_string(),
            tokens,
            options,
        })
    }

    /// The source pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Match a request path, returning captured params on success.
    pub fn matches(&self, path: &str) -> Option<Params> {
        let segments = split_segments(path, !self.options.strict);
        let mut params = Params::new();
        self.walk(0, &segments, 0, &mut params).then_some(params)
    }

    fn walk(&self, token: usize, segments: &[&str], at: usize, params: &mut Params) -> bool {
        match self.tokens.get(token) {
            None => at == segments.len(),
            Some(Token::Literal(literal)) => {
                let Some(decoded) = segments.get(at).and_then(|s| decode(s)) else {
                    return false;
                };
                let equal = if self.options.case_sensitive {
                    decoded == *literal
                } else {
                    decoded.to_lowercase() == *literal
                };
                equal && self.walk(token + 1, segments, at + 1, params)
            }
            Some(Token::Param { name, optional }) => {
                let captured = segments
                    .get(at)
                    .filter(|segment| !segment.is_empty())
                    .and_then(|segment| decode(segment));

                if let Some(value) = captured {
                    params.insert(name.as_str(), value);
                    if self.walk(token + 1, segments, at + 1, params) {
                        return true;
                    }
                    params.remove(name);
                }
                *optional && self.walk(token + 1, segments, at, params)
            }
            Some(Token::Wildcard { name }) => match decode(&segments[at..].join("/")) {
                Some(value) => {
                    params.insert(name.as_str(), value);
                    true
                }
                None => false,
            },
        }
    }
}

fn token_name(token: &Token) -> Option<&str> {
    match token {
        Token::Literal(_) => None,
        Token::Param { name, .. } | Token::Wildcard { name } => Some(name),
    }
}

fn split_segments(path: &str, lenient: bool) -> Vec<&str> {
    let mut trimmed = path.strip_prefix('/').unwrap_or(path);
    if lenient {
        trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    }
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    }
}

fn decode(raw: &str) -> Option<String> {
    urlencoding::decode(raw).ok().map(|value| value.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_pattern() {
        let matcher = PathMatcher::compile("/").unwrap();
        assert!(matcher.matches("/").is_some());
        assert!(matcher.matches("").is_some());
        assert!(matcher.matches("/hello").is_none());
    }

    #[test]
    fn test_named_segment() {
        let matcher = PathMatcher::compile("/simple-get/:name").unwrap();

        let params = matcher.matches("/simple-get/foo").unwrap();
        assert_eq!(params.get("name"), Some("foo"));

        assert!(matcher.matches("/simple-get").is_none());
        assert!(matcher.matches("/simple-get/foo/bar").is_none());
    }

    #[test]
    fn test_captures_are_decoded() {
        let matcher = PathMatcher::compile("/users/:name").unwrap();

        let params = matcher.matches("/users/J%C3%BCrgen%20K").unwrap();
        assert_eq!(params.get("name"), Some("Jürgen K"));

        // An encoded slash stays inside its segment
        let params = matcher.matches("/users/a%2Fb").unwrap();
        assert_eq!(params.get("name"), Some("a/b"));
    }

    #[test]
    fn test_invalid_utf8_is_no_match() {
        let matcher = PathMatcher::compile("/users/:name").unwrap();
        assert!(matcher.matches("/users/%FF").is_none());
    }

    #[test]
    fn test_trailing_slash_and_case() {
        let matcher = PathMatcher::compile("/about").unwrap();
        assert!(matcher.matches("/about/").is_some());
        assert!(matcher.matches("/About").is_some());

        let strict = PathMatcher::with_options(
            "/about",
            MatchOptions {
                case_sensitive: true,
                strict: true,
            },
        )
        .unwrap();
        assert!(strict.matches("/about").is_some());
        assert!(strict.matches("/about/").is_none());
        assert!(strict.matches("/About").is_none());
    }

    #[test]
    fn test_optional_segment() {
        let matcher = PathMatcher::compile("/files/:name?").unwrap();
        assert_eq!(matcher.matches("/files").unwrap().len(), 0);
        assert_eq!(matcher.matches("/files/a.txt").unwrap().get("name"), Some("a.txt"));
    }

    #[test]
    fn test_optional_segment_backtracks() {
        let matcher = PathMatcher::compile("/:lang?/docs").unwrap();
        assert_eq!(matcher.matches("/en/docs").unwrap().get("lang"), Some("en"));

        let params = matcher.matches("/docs").unwrap();
        assert_eq!(params.get("lang"), None);
    }

    #[test]
    fn test_wildcard() {
        let matcher = PathMatcher::compile("/greet/*").unwrap();
        assert_eq!(matcher.matches("/greet/a/b").unwrap().get(WILDCARD_PARAM), Some("a/b"));
        assert_eq!(matcher.matches("/greet").unwrap().get(WILDCARD_PARAM), Some(""));
        assert!(matcher.matches("/greeting").is_none());

        let named = PathMatcher::compile("/assets/*path").unwrap();
        assert_eq!(named.matches("/assets/css/a%20b.css").unwrap().get("path"), Some("css/a b.css"));
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(matches!(
            PathMatcher::compile("/users/:"),
            Err(PatternError::MissingName { .. })
        ));
        assert!(matches!(
            PathMatcher::compile("/*/tail"),
            Err(PatternError::WildcardNotLast { .. })
        ));
        assert!(matches!(
            PathMatcher::compile("/:id/:id"),
            Err(PatternError::DuplicateName { .. })
        ));
    }
}
