use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single time-bucketed cross-provider rollup. All aggregations in a
/// response share one currency (§3 invariant), enforced by the Engine
/// before an `Aggregation` is ever constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Aggregation {
    pub period: String,
    pub total: f64,
    pub currency: String,
    /// Keyed by provider, iterated lexicographically (`BTreeMap`).
    pub providers: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RollupGroupBy {
    Daily,
    Monthly,
}

impl RollupGroupBy {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "daily" => Some(RollupGroupBy::Daily),
            "monthly" => Some(RollupGroupBy::Monthly),
            _ => None,
        }
    }
}

impl std::fmt::Display for RollupGroupBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RollupGroupBy::Daily => write!(f, "daily"),
            RollupGroupBy::Monthly => write!(f, "monthly"),
        }
    }
}

/// Grouping keys for `GetActualCost` post-processing (§4.6 step 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    Resource,
    Type,
    Provider,
    Daily,
    Monthly,
}

impl GroupBy {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "resource" => Some(GroupBy::Resource),
            "type" => Some(GroupBy::Type),
            "provider" => Some(GroupBy::Provider),
            "daily" => Some(GroupBy::Daily),
            "monthly" => Some(GroupBy::Monthly),
            _ => None,
        }
    }
}
