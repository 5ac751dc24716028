//! Key matching against user supplied (and possibly wildcarded) patterns.
//!
//! A pattern is split at its first wildcard glyph. The literal part before
//! it is sent to S3 as the listing prefix, and the remainder is evaluated
//! locally against whatever follows the prefix in each returned key.
use glob::{Pattern, PatternError};

use crate::types::{UtilError, UtilResult};

/// Glyphs which start the wildcard portion of a pattern.
const WILDCARDS: [char; 3] = ['*', '?', '['];

/// Computed match information for a single pattern.
#[derive(Debug)]
pub struct MatchSpec {
    prefix: String,
    wild_suffix: String,
    wild_pattern: Option<Pattern>,
}

impl MatchSpec {
    /// Splits a pattern at the earliest wildcard glyph.
    pub fn new(pattern: &str) -> UtilResult<MatchSpec> {
        let split = pattern.find(|c: char| WILDCARDS.contains(&c)).unwrap_or(pattern.len());
        let (prefix, wild_suffix) = pattern.split_at(split);

        let wild_pattern = if wild_suffix.is_empty() {
            None
        } else {
            let compiled = compile(wild_suffix).map_err(|err| {
                UtilError::config(format!("invalid pattern {}: {}", pattern, err))
            })?;
            Some(compiled)
        };

        Ok(MatchSpec {
            prefix: prefix.to_string(),
            wild_suffix: wild_suffix.to_string(),
            wild_pattern,
        })
    }

    /// Retrieves the literal prefix of the pattern.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Retrieves the length of the literal prefix, in bytes.
    pub fn prefix_length(&self) -> usize {
        self.prefix.len()
    }

    /// Retrieves the wildcard suffix of the pattern (possibly empty).
    pub fn wild_suffix(&self) -> &str {
        &self.wild_suffix
    }
}

/// Decides whether listed keys belong to a listing request.
///
/// A matcher without a pattern matches every key.
#[derive(Debug, Default)]
pub struct KeyMatcher {
    spec: Option<MatchSpec>,
}

impl KeyMatcher {
    /// Constructs a new `KeyMatcher` for an optional pattern.
    pub fn configure(pattern: Option<&str>) -> UtilResult<KeyMatcher> {
        let spec = match pattern {
            Some(pattern) => Some(MatchSpec::new(pattern)?),
            None => None,
        };
        Ok(KeyMatcher { spec })
    }

    /// Retrieves the computed `MatchSpec`, if a pattern was provided.
    pub fn spec(&self) -> Option<&MatchSpec> {
        self.spec.as_ref()
    }

    /// Retrieves the literal prefix to request from S3, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.spec.as_ref().map(MatchSpec::prefix)
    }

    /// Determines whether a key matches the configured pattern.
    ///
    /// Pure prefix patterns name either an exact key or a directory; keys
    /// below that directory match when they are direct children, or at any
    /// depth when `recursive` is set. Wildcard patterns never match across
    /// a delimiter.
    pub fn matches(&self, key: &str, delimiter: char, recursive: bool) -> bool {
        let spec = match self.spec {
            Some(ref spec) => spec,
            None => return true,
        };

        // S3 may still hand back keys outside of the prefix
        if !key.starts_with(spec.prefix()) {
            return false;
        }
        let tail = &key[spec.prefix_length()..];

        let wild_pattern = match spec.wild_pattern {
            Some(ref pattern) => pattern,
            None => return prefix_matches(&spec.prefix, tail, delimiter, recursive),
        };

        !tail.contains(delimiter) && wild_pattern.matches(tail)
    }
}

/// Matching rules for a pattern without wildcards.
fn prefix_matches(prefix: &str, tail: &str, delimiter: char, recursive: bool) -> bool {
    // exactly the named key
    if tail.is_empty() {
        return true;
    }

    // an empty prefix refers to the bucket root
    let directory = prefix.is_empty() || prefix.ends_with(delimiter) || tail.starts_with(delimiter);

    // stuff must not match stuffEXTRA
    if !directory {
        return false;
    }

    let child = tail.strip_prefix(delimiter).unwrap_or(tail);
    recursive || !child.contains(delimiter)
}

/// Compiles the wildcard suffix of a pattern into a `Pattern`.
///
/// Runs of `*` are collapsed first; they mean the same as a single `*` in a
/// shell glob, but `glob` reserves `**` for recursive path components.
fn compile(wild_suffix: &str) -> Result<Pattern, PatternError> {
    let mut collapsed = String::with_capacity(wild_suffix.len());
    for c in wild_suffix.chars() {
        if c != '*' || !collapsed.ends_with('*') {
            collapsed.push(c);
        }
    }
    Pattern::new(&collapsed)
}
