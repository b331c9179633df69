//! Wildcard key patterns
//!
//! A pattern is a cache key in which `*` stands for any run of characters,
//! including the empty one. Every other character matches itself: regex
//! metacharacters in keys (`.`, `+`, `(`, `|`, ...) are escaped before the
//! pattern is compiled, and the compiled expression is anchored at both ends
//! so `residence:42*` never matches `xresidence:42`.

use query_core::{CacheError, Result};
use regex::Regex;

/// The wildcard character recognised in patterns
pub const WILDCARD: char = '*';

/// Longest pattern accepted for compilation
pub const MAX_PATTERN_LEN: usize = 4096;

/// Compiled glob-style key pattern
#[derive(Debug, Clone)]
pub struct KeyPattern {
    source: String,
    regex: Regex,
}

impl KeyPattern {
    /// Compile a pattern
    pub fn new(pattern: &str) -> Result<Self> {
        let body = pattern
            .split(WILDCARD)
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        Self::compile(pattern.to_string(), &body)
    }

    /// Pattern matching every key below `key` in the `key:...` hierarchy.
    ///
    /// `key` is taken literally, so a `*` inside an id only matches itself.
    pub fn below(key: &str) -> Result<Self> {
        let source = format!("{}:{}", key, WILDCARD);
        let body = format!("{}:.*", regex::escape(key));
        Self::compile(source, &body)
    }

    fn compile(source: String, body: &str) -> Result<Self> {
        if source.len() > MAX_PATTERN_LEN {
            return Err(CacheError::InvalidPattern {
                pattern: source.chars().take(64).collect(),
                reason: format!("longer than {} bytes", MAX_PATTERN_LEN),
            });
        }

        let regex = Regex::new(&format!("(?s)^{}$", body)).map_err(|e| CacheError::InvalidPattern {
            pattern: source.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self { source, regex })
    }

    /// Whether `key` matches the whole pattern
    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }

    /// The pattern as written
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// True if the pattern contains no wildcard and so names a single key
    pub fn is_exact(&self) -> bool {
        !self.source.contains(WILDCARD)
    }
}
