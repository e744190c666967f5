//! Descriptor ↔ RPC message translation (§4.5, C5 Adapter).

use std::collections::BTreeMap;

use pulumicost_domain::ResourceDescriptor;
use pulumicost_proto::costsource::{ActualCostRequest, ProjectedCostRequest, RecommendationsRequest, Resource};

/// Property keys checked in priority order to recover a resource's SKU.
const SKU_KEYS: &[&str] = &["instanceType", "vmSize", "machineType", "dbInstanceClass", "sku"];

/// Property keys checked in priority order to recover a resource's region.
const REGION_KEYS: &[&str] = &["region", "availabilityZone", "location", "zone"];

pub fn derive_sku(descriptor: &ResourceDescriptor) -> String {
    descriptor
        .first_present(SKU_KEYS)
        .and_then(|(_, v)| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

pub fn derive_region(descriptor: &ResourceDescriptor) -> String {
    descriptor
        .first_present(REGION_KEYS)
        .and_then(|(_, v)| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

/// Flatten a descriptor's property bag to the string-valued map the wire
/// format carries (§9 Design Notes: "the adapter flattens to string-valued
/// keys for RPC").
fn stringify_properties(descriptor: &ResourceDescriptor) -> BTreeMap<String, String> {
    descriptor
        .properties
        .iter()
        .map(|(k, v)| (k.clone(), v.stringify()))
        .collect()
}

pub fn to_rpc_resource(descriptor: &ResourceDescriptor) -> Resource {
    Resource {
        provider: descriptor.provider.clone(),
        resource_type: descriptor.resource_type.clone(),
        sku: derive_sku(descriptor),
        region: derive_region(descriptor),
        properties: stringify_properties(descriptor).into_iter().collect(),
    }
}

pub fn build_projected_cost_request(descriptor: &ResourceDescriptor) -> ProjectedCostRequest {
    ProjectedCostRequest { resource: Some(to_rpc_resource(descriptor)) }
}

pub fn build_actual_cost_request(
    descriptor: &ResourceDescriptor,
    from: &str,
    to: &str,
    tags: &BTreeMap<String, String>,
) -> ActualCostRequest {
    ActualCostRequest {
        resource: Some(to_rpc_resource(descriptor)),
        from: from.to_string(),
        to: to.to_string(),
        tags: tags.clone().into_iter().collect(),
    }
}

pub fn build_recommendations_request(descriptor: &ResourceDescriptor, action_types: &[String]) -> RecommendationsRequest {
    RecommendationsRequest {
        resource: Some(to_rpc_resource(descriptor)),
        action_types: action_types.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulumicost_domain::Value;
    use std::collections::BTreeMap as Map;

    #[test]
    fn derive_sku_prefers_instance_type() {
        let mut props = Map::new();
        props.insert("instanceType".to_string(), Value::String("t3.micro".into()));
        props.insert("sku".to_string(), Value::String("ignored".into()));
        let d = ResourceDescriptor::new("aws:ec2/instance:Instance", "urn:x").with_properties(props);
        assert_eq!(derive_sku(&d), "t3.micro");
    }

    #[test]
    fn derive_region_checks_priority_list() {
        let mut props = Map::new();
        props.insert("zone".to_string(), Value::String("us-east-1a".into()));
        let d = ResourceDescriptor::new("aws:ec2/instance:Instance", "urn:x").with_properties(props);
        assert_eq!(derive_region(&d), "us-east-1a");
    }

    #[test]
    fn stringify_properties_flattens_numbers() {
        let mut props = Map::new();
        props.insert("sizeGb".to_string(), Value::Number(100.0));
        let d = ResourceDescriptor::new("aws:ebs/volume:Volume", "urn:x").with_properties(props);
        let resource = to_rpc_resource(&d);
        assert_eq!(resource.properties.get("sizeGb").map(String::as_str), Some("100"));
    }
}
