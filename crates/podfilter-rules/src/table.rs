use serde_json::{Map, Value};

use podfilter_types::FilterError;

/// Rule table: `container -> namespace -> pod group -> rule entry`.
///
/// Any level may use `*` as a key. Leaves are left as raw JSON and only
/// interpreted when a lookup reaches them, so one malformed leaf does not
/// spoil the rest of the table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RuleTable {
    root: Map<String, Value>,
}

impl RuleTable {
    /// Parse a serialized rule table
    pub fn parse(config: &str) -> Result<Self, FilterError> {
        let value: Value = serde_json::from_str(config).map_err(FilterError::MalformedConfig)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, FilterError> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            _ => Err(FilterError::ConfigNotObject),
        }
    }

    /// Raw leaf at `container/namespace/pod_group`, if every level exists
    pub fn get(&self, container: &str, namespace: &str, pod_group: &str) -> Option<&Value> {
        self.root.get(container)?.get(namespace)?.get(pod_group)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}
