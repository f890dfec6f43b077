//! Path matching shared by every change-detection tier.
//!
//! Directory regexes, shared-dependency globs and per-unit `changesPaths`
//! all resolve to a [`PathMatcher`], so every tier answers "does this path
//! matter" the same way.

use crate::error::{CiError, Result};
use glob::{MatchOptions, Pattern};
use regex::Regex;

/// Prefix marking a configuration entry as a regular expression instead of
/// a glob.
pub const REGEX_RULE_PREFIX: &str = "re:";

/// `*` stays inside one path component, `**` crosses them.
const PATH_GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A single path rule.
#[derive(Debug, Clone)]
pub enum PathRule {
    Any,
    Regex(Regex),
    Glob(Pattern),
    Exact(String),
}

impl PathRule {
    /// Parse a rule from configuration text: `re:<regex>` or a glob.
    ///
    /// Globs without any wildcard become [`PathRule::Exact`].
    pub fn parse(rule: &str) -> Result<Self> {
        if let Some(expr) = rule.strip_prefix(REGEX_RULE_PREFIX) {
            return Self::regex(expr);
        }
        Self::glob(rule)
    }

    pub fn regex(expr: &str) -> Result<Self> {
        Regex::new(expr)
            .map(PathRule::Regex)
            .map_err(|e| CiError::pattern(format!("invalid regex '{}': {}", expr, e)))
    }

    pub fn glob(pattern: &str) -> Result<Self> {
        if !pattern.contains(['*', '?', '[']) {
            return Ok(PathRule::Exact(pattern.to_string()));
        }
        Pattern::new(pattern)
            .map(PathRule::Glob)
            .map_err(|e| CiError::pattern(format!("invalid glob '{}': {}", pattern, e)))
    }

    pub fn is_match(&self, path: &str) -> bool {
        match self {
            PathRule::Any => true,
            PathRule::Regex(re) => re.is_match(path),
            PathRule::Glob(pattern) => pattern.matches_with(path, PATH_GLOB_OPTIONS),
            PathRule::Exact(exact) => exact == path,
        }
    }
}

/// A list of rules; a path matches when any rule matches.
#[derive(Debug, Clone, Default)]
pub struct PathMatcher {
    rules: Vec<PathRule>,
}

impl PathMatcher {
    pub fn new(rules: Vec<PathRule>) -> Self {
        PathMatcher { rules }
    }

    /// Matcher that accepts every path.
    pub fn any() -> Self {
        PathMatcher {
            rules: vec![PathRule::Any],
        }
    }

    pub fn from_regex(expr: &str) -> Result<Self> {
        Ok(PathMatcher::new(vec![PathRule::regex(expr)?]))
    }

    /// Build from configuration entries (globs, or `re:` regexes).
    pub fn from_rules<S: AsRef<str>>(rules: &[S]) -> Result<Self> {
        rules
            .iter()
            .map(|rule| PathRule::parse(rule.as_ref()))
            .collect::<Result<Vec<_>>>()
            .map(PathMatcher::new)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.rules.iter().any(|rule| rule.is_match(path))
    }

    /// True if at least one of `paths` matches.
    pub fn matches_any<'a, I>(&self, paths: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        paths.into_iter().any(|path| self.is_match(path))
    }
}
