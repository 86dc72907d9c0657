//! Glob patterns for index membership
//!
//! `*` matches any run of characters (including none), `?` matches exactly one
//! character, everything else matches literally. There is no escaping and no
//! character classes; `/` is an ordinary character.
//!
//! Patterns are compiled once with `globset`, with backslash escapes off.
//! Characters globset would read as syntax (`[`, `]`, `{`, `}`, `,`) are
//! wrapped in one-element classes so they stay literal.

use crate::error::{Error, Result};
use globset::{GlobBuilder, GlobMatcher};
use std::fmt;

/// Pattern that matches every key
pub const MATCH_ALL: &str = "*";

/// A compiled key pattern
#[derive(Clone)]
pub struct KeyPattern {
    source: String,
    /// `None` for the catch-all
    matcher: Option<GlobMatcher>,
}

impl KeyPattern {
    /// Compile `pattern`
    pub fn new(pattern: &str) -> Result<Self> {
        if pattern == MATCH_ALL {
            return Ok(Self::all());
        }
        let glob = GlobBuilder::new(&translate(pattern))
            .literal_separator(false)
            .backslash_escape(false)
            .build()
            .map_err(|e| Error::InvalidArgument(format!("pattern {:?}: {}", pattern, e)))?;
        Ok(KeyPattern {
            source: pattern.to_string(),
            matcher: Some(glob.compile_matcher()),
        })
    }

    /// The catch-all pattern
    pub fn all() -> Self {
        KeyPattern {
            source: MATCH_ALL.to_string(),
            matcher: None,
        }
    }

    /// Pattern text as given
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// True for the catch-all `*`
    pub fn is_match_all(&self) -> bool {
        self.matcher.is_none()
    }

    /// Test `text` against this pattern
    pub fn is_match(&self, text: &str) -> bool {
        match &self.matcher {
            None => true,
            Some(matcher) => matcher.is_match(text),
        }
    }
}

impl fmt::Debug for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("KeyPattern").field(&self.source).finish()
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl PartialEq for KeyPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for KeyPattern {}

/// Test `text` against a glob `pattern`, compiling it on the spot
pub fn glob_match(pattern: &str, text: &str) -> bool {
    KeyPattern::new(pattern).map_or(false, |p| p.is_match(text))
}

/// Rewrite into globset syntax: literal metacharacters become one-element
/// classes and runs of `*` collapse (globset rejects a bare `**` mid-pattern).
fn translate(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut prev_star = false;
    for c in pattern.chars() {
        match c {
            '*' if prev_star => continue,
            '*' | '?' => out.push(c),
            '[' | ']' | '{' | '}' | ',' => {
                out.push('[');
                out.push(c);
                out.push(']');
            }
            _ => out.push(c),
        }
        prev_star = c == '*';
    }
    out
}
