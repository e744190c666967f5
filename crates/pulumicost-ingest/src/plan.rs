use std::collections::BTreeMap;

use pulumicost_domain::{provider_of, type_from_urn, ResourceDescriptor, Value};
use tracing::warn;

use crate::error::IngestError;

/// Plan-step operations that become resources (§4.1). Per the Open
/// Question in spec §9(b), `replace` is folded into `update` for the
/// purpose of projected-cost extraction.
fn counts_as_resource(op: &str) -> bool {
    matches!(op, "create" | "update" | "same" | "replace")
}

/// Extract resources from a parsed plan document.
///
/// Expected shape: `{"steps": [{"op", "urn", "type"?, "inputs"?, "newState"?}, ...]}`.
/// A step whose op isn't create/update/same/replace is dropped. A step that
/// cannot be mapped (no URN, or no type recoverable from any source) is
/// skipped with a warning — the batch continues (§4.1).
pub fn ingest_plan(doc: &serde_json::Value) -> Result<Vec<ResourceDescriptor>, IngestError> {
    let steps = doc
        .get("steps")
        .and_then(|s| s.as_array())
        .ok_or_else(|| IngestError::UnrecognizedShape {
            path: "<in-memory>".to_string(),
        })?;

    let mut resources = Vec::with_capacity(steps.len());
    for step in steps {
        let op = step.get("op").and_then(|v| v.as_str()).unwrap_or("");
        if !counts_as_resource(op) {
            continue;
        }

        let urn = match step.get("urn").and_then(|v| v.as_str()) {
            Some(u) => u,
            None => {
                warn!("plan step with op={op} has no urn; skipping");
                continue;
            }
        };

        match map_step(step, urn) {
            Some(descriptor) => resources.push(descriptor),
            None => warn!(urn, op, "plan step could not be mapped to a resource type; skipping"),
        }
    }

    Ok(resources)
}

/// Recover `type`/`inputs` for one step, recursing into `newState` when the
/// top-level fields are absent (§4.1).
fn map_step(step: &serde_json::Value, urn: &str) -> Option<ResourceDescriptor> {
    let new_state = step.get("newState");

    let resource_type = step
        .get("type")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .or_else(|| new_state.and_then(|s| s.get("type")).and_then(|v| v.as_str()))
        .map(str::to_string)
        .or_else(|| type_from_urn(urn))?;

    let inputs = step
        .get("inputs")
        .filter(|v| !v.is_null())
        .or_else(|| new_state.and_then(|s| s.get("inputs")))
        .cloned()
        .unwrap_or(serde_json::Value::Object(serde_json::Map::new()));

    let properties = match Value::from_json(inputs) {
        Value::Object(map) => map,
        _ => BTreeMap::new(),
    };

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
    fn keeps_create_update_same_replace_drops_delete_and_read() {
        let doc = json!({
            "steps": [
                {"op": "create", "urn": "urn:pulumi:dev::app::aws:ec2/instance:Instance::a", "type": "aws:ec2/instance:Instance", "inputs": {}},
                {"op": "update", "urn": "urn:pulumi:dev::app::aws:ec2/instance:Instance::b", "type": "aws:ec2/instance:Instance", "inputs": {}},
                {"op": "same", "urn": "urn:pulumi:dev::app::aws:ec2/instance:Instance::c", "type": "aws:ec2/instance:Instance", "inputs": {}},
                {"op": "replace", "urn": "urn:pulumi:dev::app::aws:ec2/instance:Instance::d", "type": "aws:ec2/instance:Instance", "inputs": {}},
                {"op": "delete", "urn": "urn:pulumi:dev::app::aws:ec2/instance:Instance::e", "type": "aws:ec2/instance:Instance", "inputs": {}},
                {"op": "read", "urn": "urn:pulumi:dev::app::aws:ec2/instance:Instance::f", "type": "aws:ec2/instance:Instance", "inputs": {}},
            ]
        });
        let resources = ingest_plan(&doc).unwrap();
        assert_eq!(resources.len(), 4);
    }

    #[test]
    fn recovers_type_and_inputs_from_new_state_envelope() {
        let doc = json!({
            "steps": [{
                "op": "create",
                "urn": "urn:pulumi:dev::app::aws:ec2/instance:Instance::web",
                "newState": {
                    "type": "aws:ec2/instance:Instance",
                    "inputs": {"instanceType": "t3.micro"}
                }
            }]
        });
        let resources = ingest_plan(&doc).unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].resource_type, "aws:ec2/instance:Instance");
        assert_eq!(
            resources[0].property("instanceType").and_then(|v| v.as_str()),
            Some("t3.micro")
        );
    }

    #[test]
    fn falls_back_to_urn_segment_when_type_missing_everywhere() {
        let doc = json!({
            "steps": [{
                "op": "create",
                "urn": "urn:pulumi:dev::app::aws:ec2/instance:Instance::web",
                "inputs": {}
            }]
        });
        let resources = ingest_plan(&doc).unwrap();
        assert_eq!(resources[0].resource_type, "aws:ec2/instance:Instance");
    }

    #[test]
    fn unmappable_step_is_skipped_not_fatal() {
        let doc = json!({
            "steps": [
                {"op": "create", "urn": "not-a-pulumi-urn-at-all"},
                {"op": "create", "urn": "urn:pulumi:dev::app::aws:ec2/instance:Instance::web", "inputs": {}},
            ]
        });
        let resources = ingest_plan(&doc).unwrap();
        assert_eq!(resources.len(), 1);
    }

    #[test]
    fn resource_count_matches_eligible_step_count() {
        let doc = json!({
            "steps": [
                {"op": "create", "urn": "urn:pulumi:dev::app::aws:ec2/instance:Instance::a", "inputs": {}},
                {"op": "delete", "urn": "urn:pulumi:dev::app::aws:ec2/instance:Instance::b", "inputs": {}},
            ]
        });
        let resources = ingest_plan(&doc).unwrap();
        assert_eq!(resources.len(), 1);
    }
}
