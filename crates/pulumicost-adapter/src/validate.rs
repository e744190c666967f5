//! Pre-flight validation (§4.5): a pure function over the constructed RPC
//! request, run BEFORE dialing the plugin — the same "validate before I/O"
//! shape as `nclav_graph::validate` running ahead of `nclav_reconciler`'s
//! provisioning.

use chrono::{DateTime, NaiveDate, Utc};
use pulumicost_proto::costsource::Resource;

use crate::error::ValidationError;

/// The recommendation action-type enumeration (§6).
pub const ACTION_TYPES: &[&str] = &[
    "RIGHTSIZE",
    "TERMINATE",
    "PURCHASE_COMMITMENT",
    "ADJUST_REQUESTS",
    "MODIFY",
    "DELETE_UNUSED",
    "MIGRATE",
    "CONSOLIDATE",
    "SCHEDULE",
    "REFACTOR",
    "OTHER",
];

pub fn validate_resource(resource: &Resource) -> Result<(), ValidationError> {
    if resource.resource_type.is_empty() {
        return Err(ValidationError::new("resource_type is required"));
    }
    if resource.provider.is_empty() {
        return Err(ValidationError::new("provider is required"));
    }
    Ok(())
}

pub fn validate_projected_cost_request(resource: &Resource) -> Result<(), ValidationError> {
    validate_resource(resource)
}

/// Parse a date accepting `YYYY-MM-DD` or RFC3339 (§4.6 step 1).
pub fn parse_date(s: &str) -> Result<DateTime<Utc>, ValidationError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(DateTime::from_naive_utc_and_offset(date.and_hms_opt(0, 0, 0).unwrap(), Utc));
    }
    Err(ValidationError::new(format!("unparseable date: {:?} (expected YYYY-MM-DD or RFC3339)", s)))
}

pub fn validate_actual_cost_request(resource: &Resource, from: &str, to: &str) -> Result<(), ValidationError> {
    validate_resource(resource)?;
    let from_dt = parse_date(from)?;
    let to_dt = parse_date(to)?;
    if from_dt >= to_dt {
        return Err(ValidationError::new(format!("time range ordering violated: from {} >= to {}", from, to)));
    }
    Ok(())
}

pub fn validate_recommendations_request(resource: &Resource, action_types: &[String]) -> Result<(), ValidationError> {
    validate_resource(resource)?;
    for action in action_types {
        if !ACTION_TYPES.contains(&action.as_str()) {
            return Err(ValidationError::new(format!("unknown action type: {:?}", action)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource() -> Resource {
        Resource {
            provider: "aws".to_string(),
            resource_type: "aws:ec2/instance:Instance".to_string(),
            sku: "t3.micro".to_string(),
            region: "us-east-1".to_string(),
            properties: Default::default(),
        }
    }

    #[test]
    fn missing_resource_type_fails_validation() {
        let mut r = resource();
        r.resource_type.clear();
        assert!(validate_projected_cost_request(&r).is_err());
    }

    #[test]
    fn parses_plain_date_and_rfc3339() {
        assert!(parse_date("2026-01-01").is_ok());
        assert!(parse_date("2026-01-01T00:00:00Z").is_ok());
        assert!(parse_date("not-a-date").is_err());
    }

    #[test]
    fn rejects_inverted_time_range() {
        let r = resource();
        let err = validate_actual_cost_request(&r, "2026-02-01", "2026-01-01").unwrap_err();
        assert!(err.0.contains("ordering"));
    }

    #[test]
    fn accepts_valid_time_range() {
        let r = resource();
        assert!(validate_actual_cost_request(&r, "2026-01-01", "2026-02-01").is_ok());
    }

    #[test]
    fn rejects_unknown_action_type() {
        let r = resource();
        let err = validate_recommendations_request(&r, &["NOT_A_REAL_ACTION".to_string()]).unwrap_err();
        assert!(err.0.contains("unknown action type"));
    }

    #[test]
    fn accepts_known_action_types() {
        let r = resource();
        assert!(validate_recommendations_request(&r, &["RIGHTSIZE".to_string(), "TERMINATE".to_string()]).is_ok());
    }
}
