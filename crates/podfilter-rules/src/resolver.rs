use std::fmt;

use podfilter_types::{Rule, RuleEntry, RuleKey, WILDCARD};

use crate::table::RuleTable;

/// Whether a tier looks a key level up by name or by `*`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    Exact,
    Any,
}

impl Scope {
    fn select<'a>(&self, name: &'a str) -> &'a str {
        match self {
            Self::Exact => name,
            Self::Any => WILDCARD,
        }
    }
}

/// One step of the lookup order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tier {
    /// 1 is the most specific tier
    pub rank: u8,
    pub container: Scope,
    pub namespace: Scope,
    pub pod_group: Scope,
}

impl Tier {
    const fn new(rank: u8, container: Scope, namespace: Scope, pod_group: Scope) -> Self {
        Self {
            rank,
            container,
            namespace,
            pod_group,
        }
    }

    fn lookup<'t>(&self, table: &'t RuleTable, key: &RuleKey<'_>) -> Option<&'t serde_json::Value> {
        table.get(
            self.container.select(key.container),
            self.namespace.select(key.namespace),
            self.pod_group.select(key.pod_group),
        )
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |scope: Scope, name: &'static str| match scope {
            Scope::Exact => name,
            Scope::Any => WILDCARD,
        };
        write!(
            f,
            "tier {} ({}, {}, {})",
            self.rank,
            show(self.container, "container"),
            show(self.namespace, "namespace"),
            show(self.pod_group, "pod_group"),
        )
    }
}

use Scope::{Any, Exact};

/// Lookup order. Container beats pod group, pod group beats namespace.
pub const TIERS: [Tier; 8] = [
    Tier::new(1, Exact, Exact, Exact),
    Tier::new(2, Exact, Exact, Any),
    Tier::new(3, Exact, Any, Exact),
    Tier::new(4, Exact, Any, Any),
    Tier::new(5, Any, Exact, Exact),
    Tier::new(6, Any, Any, Exact),
    Tier::new(7, Any, Exact, Any),
    Tier::new(8, Any, Any, Any),
];

/// A resolved rule and the tier it came from
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub tier: Tier,
    pub rule: Rule,
}

/// Find the most specific usable rule for a key.
///
/// Entries that exist but carry no usable pattern (empty, wrong type) are
/// passed over and the next tier is tried.
pub fn resolve_with_tier(table: &RuleTable, key: &RuleKey<'_>) -> Option<Resolution> {
    TIERS.iter().find_map(|tier| {
        let value = tier.lookup(table, key)?;
        let rule = RuleEntry::from_value(value).and_then(RuleEntry::into_rule);
        if rule.is_none() {
            tracing::trace!(%tier, "entry present but has no usable pattern");
        }
        rule.map(|rule| Resolution { tier: *tier, rule })
    })
}

pub fn resolve(table: &RuleTable, key: &RuleKey<'_>) -> Option<Rule> {
    resolve_with_tier(table, key).map(|resolution| resolution.rule)
}
