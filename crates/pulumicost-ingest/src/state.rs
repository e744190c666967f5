use std::collections::BTreeMap;

use pulumicost_domain::{provider_of, reserved_keys, ResourceDescriptor, Value};
use tracing::warn;

use crate::error::IngestError;

/// Extract resources from a parsed state-export document.
///
/// Expected shape: `{"version": N, "deployment": {"resources": [...]}}`.
/// Only `custom=true` entries are kept — providers and component resources
/// are skipped (§4.1). `created`/`modified` timestamps (RFC3339, when
/// present) are injected into `properties` under the reserved keys; an
/// `external=true` flag injects `pulumi:external="true"`.
pub fn ingest_state(doc: &serde_json::Value) -> Result<Vec<ResourceDescriptor>, IngestError> {
    let resources = doc
        .get("deployment")
        .and_then(|d| d.get("resources"))
        .and_then(|r| r.as_array())
        .ok_or_else(|| IngestError::UnrecognizedShape {
            path: "<in-memory>".to_string(),
        })?;

    let mut out = Vec::with_capacity(resources.len());
    for res in resources {
        let is_custom = res.get("custom").and_then(|v| v.as_bool()).unwrap_or(false);
        if !is_custom {
            continue;
        }

        match map_resource(res) {
            Some(descriptor) => out.push(descriptor),
            None => {
                let urn = res.get("urn").and_then(|v| v.as_str()).unwrap_or("<no-urn>");
                warn!(urn, "state resource could not be mapped; skipping");
            }
        }
    }

    Ok(out)
}

fn map_resource(res: &serde_json::Value) -> Option<ResourceDescriptor> {
    let urn = res.get("urn").and_then(|v| v.as_str())?;
    let resource_type = res
        .get("type")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| pulumicost_domain::type_from_urn(urn))?;

    let properties_json = res
        .get("outputs")
        .filter(|v| !v.is_null())
        .or_else(|| res.get("inputs"))
        .cloned()
        .unwrap_or(serde_json::Value::Object(serde_json::Map::new()));

    let mut properties = match Value::from_json(properties_json) {
        Value::Object(map) => map,
        _ => BTreeMap::new(),
    };

    if let Some(created) = res.get("created").and_then(|v| v.as_str()) {
        properties.insert(reserved_keys::CREATED.to_string(), Value::String(created.to_string()));
    }
    if let Some(modified) = res.get("modified").and_then(|v| v.as_str()) {
        properties.insert(reserved_keys::MODIFIED.to_string(), Value::String(modified.to_string()));
    }
    if res.get("external").and_then(|v| v.as_bool()).unwrap_or(false) {
        properties.insert(reserved_keys::EXTERNAL.to_string(), Value::String("true".to_string()));
    }

    let provider = provider_of(&resource_type, Some(urn));

    Some(
        ResourceDescriptor::new(resource_type, urn.to_string())
            .with_properties(properties)
            .with_provider(provider),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keeps_only_custom_resources() {
        let doc = json!({
            "version": 3,
            "deployment": {
                "resources": [
                    {"urn": "urn:pulumi:dev::app::pulumi:providers:aws::default", "type": "pulumi:providers:aws", "custom": true, "outputs": {}},
                    {"urn": "urn:pulumi:dev::app::aws:ec2/instance:Instance::web", "type": "aws:ec2/instance:Instance", "custom": true, "outputs": {"instanceType": "t3.micro"}},
                    {"urn": "urn:pulumi:dev::app::pkg:index:Component::comp", "type": "pkg:index:Component", "custom": false, "outputs": {}},
                ]
            }
        });
        let resources = ingest_state(&doc).unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].resource_type, "aws:ec2/instance:Instance");
    }

    #[test]
    fn injects_timestamps_and_external_flag() {
        let doc = json!({
            "version": 3,
            "deployment": {
                "resources": [{
                    "urn": "urn:pulumi:dev::app::aws:ec2/instance:Instance::web",
                    "type": "aws:ec2/instance:Instance",
                    "custom": true,
                    "outputs": {},
                    "created": "2026-01-01T00:00:00Z",
                    "modified": "2026-01-02T00:00:00Z",
                    "external": true
                }]
            }
        });
        let resources = ingest_state(&doc).unwrap();
        let r = &resources[0];
        assert_eq!(
            r.property(reserved_keys::CREATED).and_then(|v| v.as_str()),
            Some("2026-01-01T00:00:00Z")
        );
        assert_eq!(
            r.property(reserved_keys::MODIFIED).and_then(|v| v.as_str()),
            Some("2026-01-02T00:00:00Z")
        );
        assert_eq!(
            r.property(reserved_keys::EXTERNAL).and_then(|v| v.as_str()),
            Some("true")
        );
    }

    #[test]
    fn preserves_urns_across_round_trip() {
        let doc = json!({
            "version": 3,
            "deployment": {
                "resources": [{
                    "urn": "urn:pulumi:dev::app::aws:ec2/instance:Instance::web",
                    "type": "aws:ec2/instance:Instance",
                    "custom": true,
                    "outputs": {"instanceType": "t3.micro"}
                }]
            }
        });
        let resources = ingest_state(&doc).unwrap();
        let reserialized = serde_json::to_value(&resources).unwrap();
        let urn = reserialized[0]["id"].as_str().unwrap();
        assert_eq!(urn, "urn:pulumi:dev::app::aws:ec2/instance:Instance::web");
    }
}
