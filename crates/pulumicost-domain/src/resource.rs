use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// The central in-memory shape produced by Ingest and consumed by
/// everything downstream (Adapter, Spec Store, Engine). Immutable once
/// built; dropped after result rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// Opaque type token, e.g. `aws:ec2/instance:Instance`.
    pub resource_type: String,
    /// Stable unique identifier (a URN).
    pub id: String,
    /// Short provider key, derived at construction time (see `provider_of`).
    pub provider: String,
    /// Recursively-typed property bag.
    pub properties: BTreeMap<String, Value>,
}

/// Reserved property keys Ingest injects for state-export timestamps/flags.
pub mod reserved_keys {
    pub const CREATED: &str = "pulumi:created";
    pub const MODIFIED: &str = "pulumi:modified";
    pub const EXTERNAL: &str = "pulumi:external";
}

impl ResourceDescriptor {
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        let resource_type = resource_type.into();
        let provider = provider_of(&resource_type, None);
        Self {
            resource_type,
            id: id.into(),
            provider,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_properties(mut self, properties: BTreeMap<String, Value>) -> Self {
        self.properties = properties;
        self
    }

    /// Override the provider derived at construction time — used by Ingest
    /// when a URN is available for the fallback rule in `provider_of` but
    /// wasn't known when `new` was first called.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Look up the first present key among a priority list — the pattern
    /// used throughout §4.5 (Adapter) for SKU/region extraction.
    pub fn first_present<'a>(&self, keys: &[&'a str]) -> Option<(&'a str, &Value)> {
        keys.iter()
            .find_map(|k| self.properties.get(*k).map(|v| (*k, v)))
    }
}

/// Provider extraction rule shared by Ingest (§4.1) and the Spec Store:
/// the leftmost `:`-delimited segment of `type`, else the leftmost
/// `:`-segment of a provider URN's third `::`-segment, else `unknown`.
pub fn provider_of(resource_type: &str, urn: Option<&str>) -> String {
    if let Some(seg) = resource_type.split(':').next() {
        if !seg.is_empty() {
            return seg.to_string();
        }
    }
    if let Some(urn) = urn {
        if let Some(third) = urn.split("::").nth(2) {
            if let Some(seg) = third.split(':').next() {
                if !seg.is_empty() {
                    return seg.to_string();
                }
            }
        }
    }
    "unknown".to_string()
}

/// Extract the resource type from a URN's third `::`-segment, used when a
/// plan step's `type` field is empty (§4.1).
pub fn type_from_urn(urn: &str) -> Option<String> {
    urn.split("::").nth(2).map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_of_splits_on_first_colon() {
        assert_eq!(provider_of("aws:ec2/instance:Instance", None), "aws");
    }

    #[test]
    fn provider_of_falls_back_to_urn_segment() {
        let urn = "urn:pulumi:dev::app::aws:ec2/instance:Instance::web";
        assert_eq!(provider_of("", Some(urn)), "aws");
    }

    #[test]
    fn provider_of_defaults_to_unknown() {
        assert_eq!(provider_of("", None), "unknown");
    }

    #[test]
    fn type_from_urn_extracts_third_segment() {
        let urn = "urn:pulumi:dev::app::aws:ec2/instance:Instance::web";
        assert_eq!(
            type_from_urn(urn).as_deref(),
            Some("aws:ec2/instance:Instance")
        );
    }
}
