//! Post-query filter for `GetActualCost` (§4.6 step 3: "post-query filter
//! expression (tag/property predicates)"). Spec.md doesn't enumerate a
//! grammar, so this is kept to the narrowest thing that satisfies the
//! wording: equality predicates over a resource's tags and properties,
//! plus the provider/type the result already carries — evaluated against
//! the originating `ResourceDescriptor`, not the `CostResult` itself,
//! since cost results don't retain the property bag (see DESIGN.md).

use std::collections::BTreeMap;

use pulumicost_domain::ResourceDescriptor;

#[derive(Debug, Clone, Default)]
pub struct FilterExpr {
    pub provider: Option<String>,
    pub resource_type: Option<String>,
    /// Property-key equality predicates, checked via `Value::stringify`.
    pub property_equals: BTreeMap<String, String>,
}

impl FilterExpr {
    pub fn is_empty(&self) -> bool {
        self.provider.is_none() && self.resource_type.is_none() && self.property_equals.is_empty()
    }

    pub fn matches(&self, descriptor: &ResourceDescriptor) -> bool {
        if let Some(provider) = &self.provider {
            if &descriptor.provider != provider {
                return false;
            }
        }
        if let Some(resource_type) = &self.resource_type {
            if &descriptor.resource_type != resource_type {
                return false;
            }
        }
        for (key, expected) in &self.property_equals {
            match descriptor.property(key) {
                Some(value) if &value.stringify() == expected => {}
                _ => return false,
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulumicost_domain::Value;
    use std::collections::BTreeMap as Map;

    fn descriptor() -> ResourceDescriptor {
        let mut props = Map::new();
        props.insert("environment".to_string(), Value::String("prod".to_string()));
        ResourceDescriptor::new("aws:ec2/instance:Instance", "urn:x").with_properties(props)
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(FilterExpr::default().matches(&descriptor()));
    }

    #[test]
    fn property_predicate_must_match_exactly() {
        let mut f = FilterExpr::default();
        f.property_equals.insert("environment".to_string(), "prod".to_string());
        assert!(f.matches(&descriptor()));

        f.property_equals.insert("environment".to_string(), "dev".to_string());
        assert!(!f.matches(&descriptor()));
    }

    #[test]
    fn provider_predicate_filters_out_mismatches() {
        let mut f = FilterExpr::default();
        f.provider = Some("azure".to_string());
        assert!(!f.matches(&descriptor()));
    }
}
