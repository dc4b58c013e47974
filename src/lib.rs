//! podfilter - per-record Kubernetes log filtering for fluent-bit
//!
//! Built as a `cdylib`, this crate exports [`host::pod_log_filter`] for the
//! fluent-bit WASM filter plugin. The decision logic lives in the
//! `podfilter-rules` and `podfilter-logs` crates.

pub mod cli;
pub mod host;

pub use host::filter_host_record;
pub use podfilter_logs::{
    escape_control_bytes, evaluate, filter_record, CompiledFilter, PatternCache, RecordFilter,
};
pub use podfilter_rules::{pod_group, resolve, resolve_with_tier, Resolution, RuleTable, Tier};
pub use podfilter_types::{
    ControlRange, Decision, FilterError, FilterOptions, RecordMeta, Rule, RuleEntry, RuleKey,
    CONFIG_KEY,
};
