use serde_json::{Map, Value};
use tracing::{debug, trace};

use podfilter_rules::{pod_group, resolve_with_tier, RuleTable};
use podfilter_types::{
    Decision, FilterError, FilterOptions, RecordMeta, RuleKey, FIELD_CONTAINER, FIELD_LOG,
    FIELD_NAMESPACE, FIELD_POD,
};

use crate::filter::{CompiledFilter, PatternCache};
use crate::sanitize::sanitize_record;

/// The four record fields a decision depends on
#[derive(Clone, Copy, Debug)]
struct RecordFields<'a> {
    container: &'a str,
    namespace: &'a str,
    pod: &'a str,
    log: &'a str,
}

impl<'a> RecordFields<'a> {
    fn extract(record: &'a Map<String, Value>) -> Result<Self, FilterError> {
        Ok(Self {
            container: required(record, FIELD_CONTAINER)?,
            namespace: required(record, FIELD_NAMESPACE)?,
            pod: required(record, FIELD_POD)?,
            log: required(record, FIELD_LOG)?,
        })
    }
}

fn required<'a>(record: &'a Map<String, Value>, key: &'static str) -> Result<&'a str, FilterError> {
    record
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .ok_or(FilterError::MissingField(key))
}

/// Decides keep or skip for structured log records.
///
/// Rules travel inside each record under `FilterOptions::config_key`; nothing
/// about one record influences the next, apart from compiled patterns when a
/// `PatternCache` is attached. Every error keeps the record.
#[derive(Clone, Debug, Default)]
pub struct RecordFilter {
    options: FilterOptions,
    cache: Option<PatternCache>,
}

impl RecordFilter {
    pub fn new(options: FilterOptions) -> Self {
        Self {
            options,
            cache: None,
        }
    }

    /// Reuse compiled patterns across records
    pub fn with_cache(mut self, cache: PatternCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn options(&self) -> &FilterOptions {
        &self.options
    }

    /// Filter one record, logging the host metadata alongside the outcome
    pub fn filter_with_meta(&self, meta: &RecordMeta, raw: &[u8]) -> Decision {
        let decision = self.filter(raw);
        trace!(
            tag = %meta.tag,
            time = %meta.time,
            keep = decision.is_keep(),
            "record filtered"
        );
        decision
    }

    /// Filter one raw JSON record
    pub fn filter(&self, raw: &[u8]) -> Decision {
        let mut record = match parse_record(raw) {
            Ok(record) => record,
            Err(err) => {
                debug!(%err, "keeping record as received");
                return Decision::Keep(raw.to_vec());
            }
        };

        let keep = self.should_keep(&record).unwrap_or_else(|err| {
            debug!(%err, "keeping record");
            true
        });
        if !keep {
            return Decision::Skip;
        }

        self.finish(&mut record)
            .map(Decision::Keep)
            .unwrap_or_else(|err| {
                debug!(%err, "keeping record as received");
                Decision::Keep(raw.to_vec())
            })
    }

    /// Whether the record passes its resolved rule. `Ok(true)` when no rule applies.
    fn should_keep(&self, record: &Map<String, Value>) -> Result<bool, FilterError> {
        let fields = RecordFields::extract(record)?;
        let Some(table) = self.rule_table(record)? else {
            trace!("no rule table in record");
            return Ok(true);
        };
        if table.is_empty() {
            trace!("empty rule table in record");
            return Ok(true);
        }

        let group = pod_group(fields.pod);
        let key = RuleKey::new(fields.container, fields.namespace, group);
        let Some(resolution) = resolve_with_tier(&table, &key) else {
            trace!(?key, "no rule found");
            return Ok(true);
        };

        let filter = CompiledFilter::from_rule(&resolution.rule, self.cache.as_ref())?;
        let keep = filter.keeps(fields.log);
        trace!(
            tier = %resolution.tier,
            pattern = filter.pattern(),
            inverted = filter.is_inverted(),
            keep,
            "rule applied"
        );
        Ok(keep)
    }

    /// Rule table embedded in the record, either as a JSON string or inline
    fn rule_table(&self, record: &Map<String, Value>) -> Result<Option<RuleTable>, FilterError> {
        match record.get(&self.options.config_key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(config)) => RuleTable::parse(config).map(Some),
            Some(inline @ Value::Object(_)) => RuleTable::from_value(inline.clone()).map(Some),
            Some(_) => Err(FilterError::ConfigNotObject),
        }
    }

    /// Strip the embedded rules, escape the log text and re-serialize
    fn finish(&self, record: &mut Map<String, Value>) -> Result<Vec<u8>, FilterError> {
        record.shift_remove(&self.options.config_key);
        sanitize_record(record, self.options.control_range);
        serde_json::to_vec(&*record).map_err(FilterError::MalformedRecord)
    }
}

fn parse_record(raw: &[u8]) -> Result<Map<String, Value>, FilterError> {
    match serde_json::from_slice(raw).map_err(FilterError::MalformedRecord)? {
        Value::Object(record) => Ok(record),
        _ => Err(FilterError::RecordNotObject),
    }
}

/// Filter one record with default options and no cache
pub fn filter_record(raw: &[u8]) -> Decision {
    RecordFilter::default().filter(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use podfilter_types::ControlRange;
    use serde_json::json;

    const RULES: &str = r#"{
        "*": {
            "*": {
                "*": "abc",
                "argocd-application-controller": {"pattern": "xyz"},
                "document-generation": {"pattern": "xyz"}
            }
        },
        "a": {
            "b": {
                "c": {"pattern": "def", "invert": false},
                "d": {"pattern": "def", "invert": true}
            }
        }
    }"#;

    fn record(container: &str, namespace: &str, pod: &str, log: &str) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "container_name": container,
            "namespace_name": namespace,
            "pod_name": pod,
            "log": log,
            "fluent_bit_wasm_filter_config": RULES,
        }))
        .unwrap()
    }

    fn keeps(container: &str, namespace: &str, pod: &str, log: &str) -> bool {
        filter_record(&record(container, namespace, pod, log)).is_keep()
    }

    #[test]
    fn test_wildcard_rule() {
        assert!(!keeps("container1", "namespace1", "pod1", "test"));
        assert!(keeps("container1", "namespace1", "pod1", "abc"));
    }

    #[test]
    fn test_exact_rule() {
        assert!(!keeps("a", "b", "c", "test"));
        assert!(keeps("a", "b", "c", "def"));
        assert!(keeps("a", "b", "c", "adefg"));
        assert!(!keeps("a", "b", "c", "xyz"));
    }

    #[test]
    fn test_inverted_rule() {
        assert!(!keeps("a", "b", "d", "def"));
        assert!(keeps("a", "b", "d", "xyz"));
    }

    #[test]
    fn test_rules_keyed_by_pod_group() {
        assert!(keeps("a", "b", "document-generation-6499cbb75b-65lmt", "xyz"));
        assert!(keeps("a", "b", "argocd-application-controller-0", "xyz"));
        assert!(!keeps("a", "b", "argocd-application-controller-d", "xyz"));
    }

    #[test]
    fn test_missing_fields_keep() {
        let full = json!({
            "container_name": "a",
            "namespace_name": "b",
            "pod_name": "c",
            "log": "xyz",
            "fluent_bit_wasm_filter_config": RULES,
        });
        assert!(!filter_record(&serde_json::to_vec(&full).unwrap()).is_keep());

        for field in [FIELD_CONTAINER, FIELD_NAMESPACE, FIELD_POD, FIELD_LOG] {
            let mut missing = full.clone();
            missing.as_object_mut().unwrap().remove(field);
            assert!(filter_record(&serde_json::to_vec(&missing).unwrap()).is_keep());

            let mut empty = full.clone();
            empty[field] = json!("");
            assert!(filter_record(&serde_json::to_vec(&empty).unwrap()).is_keep());
        }
    }

    #[test]
    fn test_bad_config_keeps() {
        for config in [json!("{not json"), json!("[]"), json!(17), json!("")] {
            let raw = serde_json::to_vec(&json!({
                "container_name": "a",
                "namespace_name": "b",
                "pod_name": "c",
                "log": "xyz",
                "fluent_bit_wasm_filter_config": config,
            }))
            .unwrap();
            assert_eq!(filter_record(&raw), Decision::Keep(br#"{"container_name":"a","namespace_name":"b","pod_name":"c","log":"xyz"}"#.to_vec()));
        }
    }

    #[test]
    fn test_inline_config_object() {
        let raw = serde_json::to_vec(&json!({
            "container_name": "a",
            "namespace_name": "b",
            "pod_name": "c",
            "log": "xyz",
            "fluent_bit_wasm_filter_config": {"a": {"b": {"c": "def"}}},
        }))
        .unwrap();
        assert_eq!(filter_record(&raw), Decision::Skip);
    }

    #[test]
    fn test_invalid_pattern_keeps() {
        let raw = serde_json::to_vec(&json!({
            "container_name": "a",
            "namespace_name": "b",
            "pod_name": "c",
            "log": "xyz",
            "fluent_bit_wasm_filter_config": r#"{"*":{"*":{"*":"(unclosed"}}}"#,
        }))
        .unwrap();
        assert!(filter_record(&raw).is_keep());
    }

    #[test]
    fn test_malformed_record_kept_as_received() {
        let raw = b"not json at all";
        assert_eq!(filter_record(raw), Decision::Keep(raw.to_vec()));

        let raw = b"[1,2,3]";
        assert_eq!(filter_record(raw), Decision::Keep(raw.to_vec()));
    }

    #[test]
    fn test_keep_strips_config_and_sanitizes() {
        let raw = serde_json::to_vec(&json!({
            "log": "abc\u{7}\t",
            "stream": "stdout",
            "fluent_bit_wasm_filter_config": RULES,
        }))
        .unwrap();

        let full = RecordFilter::default().filter(&raw);
        assert_eq!(
            full,
            Decision::Keep(br#"{"log":"abc\\x07\\x09","stream":"stdout"}"#.to_vec())
        );

        let low = RecordFilter::new(FilterOptions::default().with_control_range(ControlRange::LowOnly))
            .filter(&raw);
        assert_eq!(
            low,
            Decision::Keep(br#"{"log":"abc\\x07\t","stream":"stdout"}"#.to_vec())
        );
    }

    #[test]
    fn test_match_sees_unescaped_text() {
        let raw = serde_json::to_vec(&json!({
            "container_name": "a",
            "namespace_name": "b",
            "pod_name": "c",
            "log": "bell\u{7}",
            "fluent_bit_wasm_filter_config": r#"{"a":{"b":{"c":"bell\\x07$"}}}"#,
        }))
        .unwrap();
        assert!(filter_record(&raw).is_keep());

        let raw = serde_json::to_vec(&json!({
            "container_name": "a",
            "namespace_name": "b",
            "pod_name": "c",
            "log": "bell\u{7}",
            "fluent_bit_wasm_filter_config": r#"{"a":{"b":{"c":"x07"}}}"#,
        }))
        .unwrap();
        assert_eq!(filter_record(&raw), Decision::Skip);
    }

    #[test]
    fn test_custom_config_key() {
        let raw = serde_json::to_vec(&json!({
            "container_name": "a",
            "namespace_name": "b",
            "pod_name": "c",
            "log": "xyz",
            "rules": r#"{"a":{"b":{"c":"def"}}}"#,
        }))
        .unwrap();
        let filter = RecordFilter::new(FilterOptions::default().with_config_key("rules"));
        assert_eq!(filter.filter(&raw), Decision::Skip);
        assert!(filter_record(&raw).is_keep());
    }

    #[test]
    fn test_cached_filter_matches_uncached() {
        let cached = RecordFilter::default().with_cache(PatternCache::default());
        for (pod, log) in [("c", "def"), ("c", "xyz"), ("d", "def"), ("d", "xyz")] {
            let raw = record("a", "b", pod, log);
            assert_eq!(cached.filter(&raw), filter_record(&raw), "{pod}/{log}");
        }
    }

    #[test]
    fn test_empty_rule_table_keeps() {
        let raw = serde_json::to_vec(&json!({
            "container_name": "a",
            "namespace_name": "b",
            "pod_name": "c",
            "log": "xyz",
            "fluent_bit_wasm_filter_config": "{}",
        }))
        .unwrap();
        assert_eq!(
            filter_record(&raw),
            Decision::Keep(br#"{"container_name":"a","namespace_name":"b","pod_name":"c","log":"xyz"}"#.to_vec())
        );
    }
}
