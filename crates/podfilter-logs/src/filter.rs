use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use regex::Regex;

use podfilter_types::{FilterError, Rule};

/// Default number of distinct patterns a `PatternCache` holds
const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Compiled rule, ready to test log text
#[derive(Clone)]
pub struct CompiledFilter {
    /// Compiled pattern
    regex: Regex,

    /// Original pattern string
    pattern: String,

    /// Whether to keep non-matching text instead of matching text
    invert: bool,
}

impl CompiledFilter {
    /// Compile a pattern. Matching is unanchored: a hit anywhere in the text counts.
    pub fn new(pattern: &str) -> Result<Self, FilterError> {
        let regex = Regex::new(pattern).map_err(|source| FilterError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        Ok(Self {
            regex,
            pattern: pattern.to_string(),
            invert: false,
        })
    }

    /// Compile a resolved rule, going through `cache` when one is given
    pub fn from_rule(rule: &Rule, cache: Option<&PatternCache>) -> Result<Self, FilterError> {
        let regex = match cache {
            Some(cache) => cache.get_or_compile(&rule.pattern)?,
            None => return Self::new(&rule.pattern).map(|f| f.with_invert(rule.invert)),
        };

        Ok(Self {
            regex,
            pattern: rule.pattern.clone(),
            invert: rule.invert,
        })
    }

    /// Invert the match
    pub fn inverted(self) -> Self {
        self.with_invert(true)
    }

    fn with_invert(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    /// Whether a record with this log text should be kept
    pub fn keeps(&self, text: &str) -> bool {
        let text_match = self.regex.is_match(text);
        if self.invert { !text_match } else { text_match }
    }

    /// Get the original pattern
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_inverted(&self) -> bool {
        self.invert
    }
}

impl std::fmt::Debug for CompiledFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledFilter")
            .field("pattern", &self.pattern)
            .field("invert", &self.invert)
            .finish()
    }
}

/// Test log text against a pattern, keeping the record if the pattern does not compile
pub fn evaluate(pattern: &str, invert: bool, text: &str) -> bool {
    match CompiledFilter::new(pattern) {
        Ok(filter) => filter.with_invert(invert).keeps(text),
        Err(err) => {
            tracing::debug!(%err, "keeping record");
            true
        }
    }
}

/// Compiled patterns shared between the clones of one filter instance.
///
/// Lookups take a read lock and inserts a write lock, so concurrent callers
/// only ever observe fully compiled entries. Invalid patterns are not stored.
/// When full, the cache is emptied before the next insert.
#[derive(Clone)]
pub struct PatternCache {
    compiled: Arc<RwLock<HashMap<String, Regex>>>,
    capacity: usize,
}

impl PatternCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            compiled: Arc::new(RwLock::new(HashMap::with_capacity(capacity.min(64)))),
            capacity: capacity.max(1),
        }
    }

    pub fn get_or_compile(&self, pattern: &str) -> Result<Regex, FilterError> {
        if let Some(regex) = self.compiled.read().get(pattern) {
            return Ok(regex.clone());
        }

        let regex = Regex::new(pattern).map_err(|source| FilterError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        let mut compiled = self.compiled.write();
        if compiled.len() >= self.capacity {
            compiled.clear();
        }
        compiled.insert(pattern.to_string(), regex.clone());
        Ok(regex)
    }

    pub fn len(&self) -> usize {
        self.compiled.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.read().is_empty()
    }
}

impl Default for PatternCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl std::fmt::Debug for PatternCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
