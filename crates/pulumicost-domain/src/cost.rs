use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
    Unknown,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
            Confidence::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// The adapter label on a `CostResult` — which data source produced it.
pub mod adapter_labels {
    pub const NONE: &str = "none";
    pub const LOCAL_SPEC: &str = "local-spec";
    pub const VALIDATION: &str = "validation";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostResult {
    pub resource_type: String,
    pub resource_id: String,
    /// Plugin name, `local-spec`, `none`, or `validation`.
    pub adapter: String,
    pub currency: String,
    pub monthly: f64,
    pub hourly: f64,
    pub total_cost: Option<f64>,
    pub cost_period: Option<CostPeriod>,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub breakdown: BTreeMap<String, f64>,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostPeriod {
    pub from: chrono::DateTime<chrono::Utc>,
    pub to: chrono::DateTime<chrono::Utc>,
}

impl CostResult {
    /// Build the placeholder emitted when no data source could answer
    /// (§4.6 step 4): `adapter="none"`, zero cost.
    pub fn none(resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        CostResult {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            adapter: adapter_labels::NONE.to_string(),
            currency: "USD".to_string(),
            monthly: 0.0,
            hourly: 0.0,
            total_cost: None,
            cost_period: None,
            notes: vec!["No pricing information available".to_string()],
            breakdown: BTreeMap::new(),
            confidence: Confidence::Unknown,
        }
    }

    /// Build the placeholder emitted on pre-flight validation failure
    /// (§4.5): `adapter="validation"`, zero cost, `VALIDATION:`-prefixed note.
    pub fn validation_failure(
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        reason: impl std::fmt::Display,
    ) -> Self {
        CostResult {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            adapter: adapter_labels::VALIDATION.to_string(),
            currency: "USD".to_string(),
            monthly: 0.0,
            hourly: 0.0,
            total_cost: None,
            cost_period: None,
            notes: vec![format!("VALIDATION: {}", reason)],
            breakdown: BTreeMap::new(),
            confidence: Confidence::Unknown,
        }
    }

    /// Build the placeholder emitted on plugin RPC failure (§4.5):
    /// `ERROR:`-prefixed note, siblings continue.
    pub fn rpc_error(
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        adapter: impl Into<String>,
        reason: impl std::fmt::Display,
    ) -> Self {
        CostResult {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            adapter: adapter.into(),
            currency: "USD".to_string(),
            monthly: 0.0,
            hourly: 0.0,
            total_cost: None,
            cost_period: None,
            notes: vec![format!("ERROR: {}", reason)],
            breakdown: BTreeMap::new(),
            confidence: Confidence::Unknown,
        }
    }

    /// Validate the non-negativity and monthly≈hourly×730 invariants
    /// (§3, §8 invariant 3).
    pub fn check_invariants(&self) -> Result<(), crate::error::DomainError> {
        if self.monthly < 0.0 {
            return Err(crate::error::DomainError::NegativeCost {
                field: "monthly".to_string(),
                value: self.monthly,
            });
        }
        if self.hourly < 0.0 {
            return Err(crate::error::DomainError::NegativeCost {
                field: "hourly".to_string(),
                value: self.hourly,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_adapter_has_zero_cost_and_explanatory_note() {
        let r = CostResult::none("aws:ec2/instance:Instance", "urn:x");
        assert_eq!(r.adapter, "none");
        assert_eq!(r.monthly, 0.0);
        assert!(r.notes[0].contains("No pricing information"));
    }

    #[test]
    fn validation_failure_note_is_prefixed() {
        let r = CostResult::validation_failure("t", "id", "missing sku");
        assert!(r.notes[0].starts_with("VALIDATION:"));
    }

    #[test]
    fn negative_monthly_fails_invariant_check() {
        let mut r = CostResult::none("t", "id");
        r.monthly = -1.0;
        assert!(r.check_invariants().is_err());
    }
}
