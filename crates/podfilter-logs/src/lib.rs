//! Log record filtering for podfilter
//!
//! This crate evaluates resolved rules against log text, escapes control
//! bytes on kept records and drives the keep/skip decision per record.

mod filter;
mod record;
mod sanitize;

pub use filter::{evaluate, CompiledFilter, PatternCache};
pub use record::{filter_record, RecordFilter};
pub use sanitize::{escape_control_bytes, sanitize_record};

// Re-export types used in our public API
pub use podfilter_types::{ControlRange, Decision, FilterError, FilterOptions, RecordMeta};
