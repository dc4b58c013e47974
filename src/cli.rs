//! Helpers behind the `podfilter` command line tool

use serde_json::Value;

use podfilter_rules::{pod_group, resolve_with_tier, RuleTable};
use podfilter_types::RuleKey;

/// Embed the rule table into a record that has none, the way a record
/// modifier in front of the filter would.
///
/// Lines that are not JSON objects, or already carry `config_key`, are
/// returned unchanged.
pub fn with_rules(line: String, config_key: &str, config: &str) -> Vec<u8> {
    let Ok(Value::Object(mut record)) = serde_json::from_str::<Value>(&line) else {
        return line.into_bytes();
    };
    if record.contains_key(config_key) {
        return line.into_bytes();
    }
    record.insert(config_key.to_string(), Value::String(config.to_string()));
    serde_json::to_vec(&record).unwrap_or_else(|_| line.into_bytes())
}

/// Report which rule applies to a container, namespace and raw pod name
pub fn explain(table: &RuleTable, container: &str, namespace: &str, pod: &str) -> String {
    let group = pod_group(pod);
    let outcome = match resolve_with_tier(table, &RuleKey::new(container, namespace, group)) {
        Some(resolution) => format!(
            "{}: pattern {:?}{}",
            resolution.tier,
            resolution.rule.pattern,
            if resolution.rule.invert { " (inverted)" } else { "" }
        ),
        None => "no rule: records are kept".to_string(),
    };
    format!("pod group: {group}\n{outcome}")
}
