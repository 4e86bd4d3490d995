//! Path pattern matching for policy scopes.
//!
//! # Responsibilities
//! - Match request paths by prefix (`/api/messages/`)
//! - Match request paths by suffix (`*/send/`)
//! - Combine patterns with OR semantics into a scope
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Empty scope = never matches (policies are opt-in per route)
//! - No regex to guarantee O(n) matching

use std::fmt;

/// A single path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    Prefix(String),
    Suffix(String),
}

impl PathPattern {
    /// Parse a configured pattern.
    ///
    /// A leading `*` makes a suffix pattern; a trailing `*` is dropped, so
    /// `/api/messages*` is the prefix `/api/messages`.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.strip_prefix('*') {
            Some(suffix) => PathPattern::Suffix(suffix.trim_end_matches('*').to_string()),
            None => PathPattern::Prefix(raw.trim_end_matches('*').to_string()),
        }
    }

    /// Returns true if the path matches this pattern.
    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Prefix(prefix) => path.starts_with(prefix.as_str()),
            PathPattern::Suffix(suffix) => path.ends_with(suffix.as_str()),
        }
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathPattern::Prefix(p) => write!(f, "{}*", p),
            PathPattern::Suffix(s) => write!(f, "*{}", s),
        }
    }
}

/// A set of patterns; a path is in scope if any pattern matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathScope {
    patterns: Vec<PathPattern>,
}

impl PathScope {
    pub fn new(patterns: Vec<PathPattern>) -> Self {
        Self { patterns }
    }

    /// Build a scope from configured pattern strings.
    pub fn from_config<S: AsRef<str>>(raw: &[S]) -> Self {
        Self::new(raw.iter().map(|p| PathPattern::parse(p.as_ref())).collect())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(path))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn patterns(&self) -> &[PathPattern] {
        &self.patterns
    }
}
