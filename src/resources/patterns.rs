//! Pattern matching for resource ownership
//!
//! A `PatternSet` describes which resource ids a deployment manages. A
//! pattern ending in `*` matches any id beginning with the literal text
//! before the star; any other pattern is compiled as a fully anchored
//! regex. The match-all set is spelled `*`.
//!
//! Sets are kept minimal: a star or literal pattern prefix-covered by an
//! existing star pattern is never stored, and adding a star pattern drops
//! the star and literal patterns it covers. Non-literal regexes are left
//! alone; a textual prefix proves nothing about what an alternation
//! matches. Membership therefore never depends on insertion order.

use regex::Regex;
use serde::de::{Deserializer, Error as DeError};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

use crate::error::{ResourceError, ResourceResult};

/// Compiled set of ownership patterns
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<CompiledPattern>,
}

#[derive(Debug, Clone)]
struct CompiledPattern {
    source: String,
    matcher: Matcher,
}

#[derive(Debug, Clone)]
enum Matcher {
    /// Source ended in `*`; holds the literal stem before it
    Prefix(String),
    /// Anchored regex compiled from the full source
    Regex(Regex),
}

impl CompiledPattern {
    fn compile(pattern: &str) -> ResourceResult<Self> {
        if pattern.is_empty() {
            return Err(ResourceError::EmptyPattern);
        }

        let matcher = if let Some(stem) = pattern.strip_suffix('*') {
            Matcher::Prefix(stem.to_string())
        } else {
            let regex = Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
                ResourceError::InvalidPattern {
                    pattern: pattern.to_string(),
                    reason: e.to_string(),
                }
            })?;
            Matcher::Regex(regex)
        };

        Ok(Self {
            source: pattern.to_string(),
            matcher,
        })
    }

    fn matches(&self, id: &str) -> bool {
        match &self.matcher {
            Matcher::Prefix(stem) => id.starts_with(stem),
            Matcher::Regex(regex) => regex.is_match(id),
        }
    }

    /// True when every id this pattern matches is also matched by `self`.
    ///
    /// Only star patterns subsume anything beyond their own source, and
    /// only star and literal sources are decidable by text prefix: an
    /// alternation like `a|b` starts with `a` textually while still
    /// matching ids outside `a*`, so non-literal regexes are never evicted.
    fn subsumes(&self, other: &CompiledPattern) -> bool {
        if self.source == other.source {
            return true;
        }
        match &self.matcher {
            Matcher::Prefix(stem) => match &other.matcher {
                Matcher::Prefix(_) => other.source.starts_with(stem.as_str()),
                Matcher::Regex(_) => {
                    is_regex_literal(&other.source) && other.source.starts_with(stem.as_str())
                }
            },
            Matcher::Regex(_) => false,
        }
    }

    /// Conservative reachability test: could some id starting with `prefix`
    /// match this pattern? Answers false only when provably impossible.
    fn may_match_with_prefix(&self, prefix: &str) -> bool {
        match &self.matcher {
            Matcher::Prefix(stem) => stem.starts_with(prefix) || prefix.starts_with(stem.as_str()),
            Matcher::Regex(_) => {
                if is_regex_literal(&self.source) {
                    self.source.starts_with(prefix)
                } else {
                    true
                }
            }
        }
    }
}

fn is_regex_literal(source: &str) -> bool {
    !source
        .chars()
        .any(|c| matches!(c, '\\' | '.' | '*' | '+' | '?' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '^' | '$'))
}

impl PatternSet {
    /// Build a set from pattern sources, minimizing as it goes
    pub fn new<I, S>(patterns: I) -> ResourceResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::empty();
        for pattern in patterns {
            set.add(pattern.as_ref())?;
        }
        Ok(set)
    }

    /// Create an empty set (matches nothing)
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Add one pattern, keeping the set minimal.
    ///
    /// A pattern already covered by the set is a no-op; a star pattern
    /// evicts the existing patterns it covers.
    pub fn add(&mut self, pattern: &str) -> ResourceResult<()> {
        let compiled = CompiledPattern::compile(pattern)?;

        if self.patterns.iter().any(|p| p.subsumes(&compiled)) {
            return Ok(());
        }

        self.patterns.retain(|p| !compiled.subsumes(p));
        self.patterns.push(compiled);
        Ok(())
    }

    /// Add every pattern from another set
    pub fn extend(&mut self, other: &PatternSet) -> ResourceResult<()> {
        for source in other.sources() {
            self.add(source)?;
        }
        Ok(())
    }

    /// Check whether an id is matched by any pattern
    pub fn matches(&self, id: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(id))
    }

    /// Check whether some id starting with `prefix` could be matched.
    ///
    /// Used to skip whole id namespaces (hook groups) during fetch. Errs on
    /// the side of true: a false return is a proof of no overlap.
    pub fn matches_prefix(&self, prefix: &str) -> bool {
        self.patterns.iter().any(|p| p.may_match_with_prefix(prefix))
    }

    /// Pattern sources in insertion order
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|p| p.source.as_str())
    }

    /// Pattern sources sorted lexically (stable external form)
    pub fn sorted_sources(&self) -> Vec<&str> {
        let mut sources: Vec<&str> = self.sources().collect();
        sources.sort_unstable();
        sources
    }

    /// Check if this set has any patterns
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Get the number of patterns
    pub fn len(&self) -> usize {
        self.patterns.len()
    }
}

impl PartialEq for PatternSet {
    fn eq(&self, other: &Self) -> bool {
        self.sorted_sources() == other.sorted_sources()
    }
}

impl Eq for PatternSet {}

impl Serialize for PatternSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let sources = self.sorted_sources();
        let mut seq = serializer.serialize_seq(Some(sources.len()))?;
        for source in sources {
            seq.serialize_element(source)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for PatternSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let sources = Vec::<String>::deserialize(deserializer)?;
        PatternSet::new(sources).map_err(D::Error::custom)
    }
}
