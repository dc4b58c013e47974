//! Shared types for podfilter
//!
//! This crate contains the vocabulary used across the podfilter crates:
//! record field names, rule entries, filtering options and decisions.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// Record Fields
// ============================================================================

/// Record key carrying the serialized rule table
pub const CONFIG_KEY: &str = "fluent_bit_wasm_filter_config";

pub const FIELD_CONTAINER: &str = "container_name";
pub const FIELD_NAMESPACE: &str = "namespace_name";
pub const FIELD_POD: &str = "pod_name";
pub const FIELD_LOG: &str = "log";

/// Rule table key matching any container, namespace or pod group
pub const WILDCARD: &str = "*";

// ============================================================================
// Rule Types
// ============================================================================

/// A rule table leaf as written in the configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuleEntry {
    /// Bare pattern string, never inverted
    Simple(String),
    /// `{"pattern": ..., "invert": ...}` object
    Detailed { pattern: String, invert: bool },
}

impl RuleEntry {
    /// Read a rule entry from a rule table leaf.
    ///
    /// Returns `None` when the value is neither a string nor an object with a
    /// string `pattern`. A non-boolean `invert` is read as `false`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(pattern) => Some(Self::Simple(pattern.clone())),
            Value::Object(obj) => {
                let pattern = obj.get("pattern")?.as_str()?;
                let invert = obj.get("invert").and_then(Value::as_bool).unwrap_or(false);
                Some(Self::Detailed {
                    pattern: pattern.to_string(),
                    invert,
                })
            }
            _ => None,
        }
    }

    /// Normalize into a `Rule`, or `None` if the pattern is empty
    pub fn into_rule(self) -> Option<Rule> {
        let (pattern, invert) = match self {
            Self::Simple(pattern) => (pattern, false),
            Self::Detailed { pattern, invert } => (pattern, invert),
        };
        if pattern.is_empty() {
            return None;
        }
        Some(Rule { pattern, invert })
    }
}

/// A usable filtering rule
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Rule {
    pub pattern: String,
    pub invert: bool,
}

impl Rule {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            invert: false,
        }
    }

    pub fn inverted(mut self) -> Self {
        self.invert = true;
        self
    }
}

/// Lookup key for the rule table
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuleKey<'a> {
    pub container: &'a str,
    pub namespace: &'a str,
    /// Normalized pod group, not the raw pod name
    pub pod_group: &'a str,
}

impl<'a> RuleKey<'a> {
    pub fn new(container: &'a str, namespace: &'a str, pod_group: &'a str) -> Self {
        Self {
            container,
            namespace,
            pod_group,
        }
    }
}

// ============================================================================
// Options
// ============================================================================

/// Bytes of the log text that get rewritten as `\xHH` before re-encoding
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ControlRange {
    /// 0x00-0x1F and 0x7F
    #[default]
    Full,
    /// 0x00-0x08 and 0x7F, leaving tab, newline and the rest untouched
    LowOnly,
}

impl ControlRange {
    pub fn contains(&self, byte: u8) -> bool {
        match self {
            Self::Full => byte <= 0x1F || byte == 0x7F,
            Self::LowOnly => byte <= 0x08 || byte == 0x7F,
        }
    }
}

/// Options for a record filter
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterOptions {
    /// Record key holding the embedded rule table; always stripped on keep
    pub config_key: String,
    pub control_range: ControlRange,
}

impl FilterOptions {
    pub fn with_control_range(mut self, control_range: ControlRange) -> Self {
        self.control_range = control_range;
        self
    }

    pub fn with_config_key(mut self, config_key: impl Into<String>) -> Self {
        self.config_key = config_key.into();
        self
    }
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            config_key: CONFIG_KEY.to_string(),
            control_range: ControlRange::default(),
        }
    }
}

// ============================================================================
// Host Types
// ============================================================================

/// Metadata the host passes along with each record; never used for filtering
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordMeta {
    pub tag: String,
    pub time: DateTime<Utc>,
}

impl RecordMeta {
    pub fn new(tag: String, time_sec: u32, time_nsec: u32) -> Self {
        let time = DateTime::from_timestamp(i64::from(time_sec), time_nsec).unwrap_or_default();
        Self { tag, time }
    }
}

/// Outcome of filtering one record
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Keep the record, re-serialized
    Keep(Vec<u8>),
    /// Drop the record
    Skip,
}

impl Decision {
    pub fn is_keep(&self) -> bool {
        matches!(self, Self::Keep(_))
    }

    /// Host framing: kept bytes followed by a 0 terminator, or nothing
    pub fn into_wire(self) -> Option<Vec<u8>> {
        match self {
            Self::Keep(mut bytes) => {
                bytes.push(0);
                Some(bytes)
            }
            Self::Skip => None,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Everything that can go wrong while filtering a record.
///
/// None of these reach the host: the filter keeps the record instead.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("record is not valid JSON: {0}")]
    MalformedRecord(#[source] serde_json::Error),

    #[error("record is not a JSON object")]
    RecordNotObject,

    #[error("embedded rule table is not valid JSON: {0}")]
    MalformedConfig(#[source] serde_json::Error),

    #[error("embedded rule table is not a JSON object")]
    ConfigNotObject,

    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("record field '{0}' is missing or empty")]
    MissingField(&'static str),
}
