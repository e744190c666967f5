//! Contract translator between `ResourceDescriptor` (Engine) and RPC
//! messages (Plugin Host) — §4.5, C5 Adapter.

pub mod error;
pub mod translate;
pub mod validate;

pub use error::ValidationError;
pub use translate::{
    build_actual_cost_request, build_projected_cost_request, build_recommendations_request,
    derive_region, derive_sku, to_rpc_resource,
};
pub use validate::{
    parse_date, validate_actual_cost_request, validate_projected_cost_request,
    validate_recommendations_request, ACTION_TYPES,
};

use pulumicost_domain::{Confidence, CostResult};
use pulumicost_proto::costsource::{ActualCostResponse, ProjectedCostResponse};

/// Map a plugin's `GetProjectedCost` response into the Engine's domain
/// `CostResult`, tagged with that plugin's adapter name (§4.6 step 2).
pub fn projected_cost_result(
    resource_type: &str,
    resource_id: &str,
    adapter: &str,
    response: ProjectedCostResponse,
) -> CostResult {
    CostResult {
        resource_type: resource_type.to_string(),
        resource_id: resource_id.to_string(),
        adapter: adapter.to_string(),
        currency: response.currency,
        monthly: response.cost_per_month,
        hourly: response.cost_per_month / 730.0,
        total_cost: None,
        cost_period: None,
        notes: Vec::new(),
        breakdown: Default::default(),
        confidence: Confidence::High,
    }
}

/// Map a plugin's `GetActualCost` response into the Engine's domain
/// `CostResult`. Surfaces a `WARNING:` note when `dailyCosts` has fewer
/// entries than the requested window implies — Open Question (a) in
/// spec §9: surface the gap rather than guessing the missing values.
pub fn actual_cost_result(
    resource_type: &str,
    resource_id: &str,
    adapter: &str,
    response: ActualCostResponse,
    expected_days: Option<i64>,
) -> CostResult {
    let mut notes = Vec::new();
    if let Some(expected) = expected_days {
        let missing = expected - response.daily_costs.len() as i64;
        if missing > 0 {
            notes.push(format!("WARNING: {} of {} expected daily cost entries missing", missing, expected));
        }
    }

    let breakdown = response
        .daily_costs
        .iter()
        .map(|d| (d.date.clone(), d.amount))
        .collect();

    CostResult {
        resource_type: resource_type.to_string(),
        resource_id: resource_id.to_string(),
        adapter: adapter.to_string(),
        currency: response.currency,
        monthly: 0.0,
        hourly: 0.0,
        total_cost: Some(response.total_cost),
        cost_period: None,
        notes,
        breakdown,
        confidence: Confidence::High,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulumicost_proto::costsource::DailyCost;

    #[test]
    fn projected_cost_result_derives_hourly_from_monthly() {
        let resp = ProjectedCostResponse { cost_per_month: 73.0, currency: "USD".to_string() };
        let r = projected_cost_result("aws:ec2/instance:Instance", "urn:x", "aws", resp);
        assert!((r.hourly - 0.1).abs() < 1e-9);
    }

    #[test]
    fn actual_cost_result_warns_on_missing_daily_entries() {
        let resp = ActualCostResponse {
            total_cost: 10.0,
            currency: "USD".to_string(),
            daily_costs: vec![DailyCost { date: "2026-01-01".to_string(), amount: 10.0 }],
            start_time: "2026-01-01".to_string(),
            end_time: "2026-01-05".to_string(),
        };
        let r = actual_cost_result("aws:ec2/instance:Instance", "urn:x", "aws", resp, Some(5));
        assert!(r.notes[0].starts_with("WARNING:"));
    }
}
