//! Rule resolution for podfilter
//!
//! This crate turns a raw pod name into its workload group, parses the
//! embedded rule table and picks the most specific rule for a record.

mod pod;
mod resolver;
mod table;

pub use pod::pod_group;
pub use resolver::{resolve, resolve_with_tier, Resolution, Scope, Tier, TIERS};
pub use table::RuleTable;

// Re-export types used in our public API
pub use podfilter_types::{FilterError, Rule, RuleEntry, RuleKey, WILDCARD};
