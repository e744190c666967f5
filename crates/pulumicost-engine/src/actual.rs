//! `GetActualCost` orchestration (§4.6). Unlike projected cost, the first
//! plugin that answers wins — there is no spec-store fallback, since
//! historical spend has no YAML equivalent.

use std::collections::BTreeMap;

use pulumicost_adapter::{build_actual_cost_request, actual_cost_result, parse_date, validate_actual_cost_request};
use pulumicost_domain::{CostResult, Plugin, ResourceDescriptor};
use pulumicost_pluginhost::PluginHost;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::filter::FilterExpr;
use crate::sessions::{launch_matching, shutdown_all};
use crate::{plugin_matches_resource, race_cancel, EngineConfig, EngineError};

/// Average hours in a month used to annualize a windowed total into a
/// monthly rate (§4.6 step 5): `30.44 * 24`.
const HOURS_PER_MONTH: f64 = 30.44 * 24.0;

pub struct ActualCostRequest<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub tags: BTreeMap<String, String>,
    pub filter: FilterExpr,
}

pub async fn get_actual_cost(
    host: &PluginHost,
    plugins: &[Plugin],
    resources: &[ResourceDescriptor],
    request: ActualCostRequest<'_>,
    trace_id: &str,
    cancel: CancellationToken,
    config: &EngineConfig,
) -> Result<Vec<CostResult>, EngineError> {
    let from_dt = parse_date(request.from).map_err(|e| EngineError::InvalidDateRange(e.to_string()))?;
    let to_dt = parse_date(request.to).map_err(|e| EngineError::InvalidDateRange(e.to_string()))?;
    if from_dt >= to_dt {
        return Err(EngineError::InvalidDateRange(format!(
            "from {} >= to {}",
            request.from, request.to
        )));
    }
    let hours = (to_dt - from_dt).num_seconds() as f64 / 3600.0;
    let expected_days = (to_dt - from_dt).num_days();

    let used_providers: std::collections::HashSet<&str> =
        resources.iter().map(|r| r.provider.as_str()).collect();
    let sessions = launch_matching(host, plugins, trace_id, |p| {
        p.supports_actual() && used_providers.contains(p.name.as_str())
    })
    .await;

    let mut out = Vec::new();
    for resource in resources {
        if !request.filter.is_empty() && !request.filter.matches(resource) {
            continue;
        }

        let rpc_request = build_actual_cost_request(resource, request.from, request.to, &request.tags);
        let rpc_resource = rpc_request.resource.clone().unwrap_or_default();
        if let Err(e) = validate_actual_cost_request(&rpc_resource, request.from, request.to) {
            out.push(CostResult::validation_failure(&resource.resource_type, &resource.id, e));
            continue;
        }

        let mut answered = false;
        for plugin in plugins.iter().filter(|p| p.supports_actual() && plugin_matches_resource(p, resource)) {
            let Some(session) = sessions.get(&plugin.name) else { continue };
            let call = session.call_actual_cost(rpc_request.clone(), trace_id, config.rpc_deadline);
            match race_cancel(&cancel, call).await {
                Ok(response) => {
                    let mut result = actual_cost_result(
                        &resource.resource_type,
                        &resource.id,
                        &plugin.name,
                        response,
                        Some(expected_days),
                    );
                    if let Some(total) = result.total_cost {
                        result.monthly = total * (HOURS_PER_MONTH / hours);
                        result.hourly = result.monthly / 730.0;
                    }
                    out.push(result);
                    answered = true;
                    break;
                }
                Err(e) => {
                    debug!(plugin = %plugin.name, resource_id = %resource.id, error = %e, "actual cost rpc failed, trying next plugin");
                }
            }
        }

        if !answered {
            warn!(resource_id = %resource.id, "no plugin answered actual-cost query; no fallback for actual costs");
            out.push(CostResult::none(&resource.resource_type, &resource.id));
        }
    }

    shutdown_all(sessions, config.shutdown_grace).await;
    Ok(out)
}

/// Post-processing grouping for `GetActualCost` (§4.6 step 4): bucket by
/// one of `{resource, type, provider, daily, monthly}`. Buckets are kept
/// separate per currency so totals are never silently mixed (§9
/// "Currency").
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CostGroup {
    pub key: String,
    pub currency: String,
    pub total: f64,
}

pub fn group_actual_costs(
    results: &[CostResult],
    resources: &[ResourceDescriptor],
    group_by: pulumicost_domain::GroupBy,
) -> Vec<CostGroup> {
    use pulumicost_domain::GroupBy;

    let resource_types: BTreeMap<&str, &str> =
        resources.iter().map(|r| (r.id.as_str(), r.resource_type.as_str())).collect();
    let providers: BTreeMap<&str, &str> = resources.iter().map(|r| (r.id.as_str(), r.provider.as_str())).collect();

    let mut buckets: BTreeMap<(String, String), f64> = BTreeMap::new();

    match group_by {
        GroupBy::Resource => {
            for r in results {
                *buckets.entry((r.resource_id.clone(), r.currency.clone())).or_default() +=
                    r.total_cost.unwrap_or(0.0);
            }
        }
        GroupBy::Type => {
            for r in results {
                let key = resource_types.get(r.resource_id.as_str()).copied().unwrap_or(&r.resource_type);
                *buckets.entry((key.to_string(), r.currency.clone())).or_default() += r.total_cost.unwrap_or(0.0);
            }
        }
        GroupBy::Provider => {
            for r in results {
                let key = match providers.get(r.resource_id.as_str()) {
                    Some(p) => p.to_string(),
                    None => pulumicost_domain::provider_of(&r.resource_type, None),
                };
                *buckets.entry((key, r.currency.clone())).or_default() += r.total_cost.unwrap_or(0.0);
            }
        }
        GroupBy::Daily => {
            for r in results {
                for (date, amount) in &r.breakdown {
                    *buckets.entry((date.clone(), r.currency.clone())).or_default() += amount;
                }
            }
        }
        GroupBy::Monthly => {
            for r in results {
                for (date, amount) in &r.breakdown {
                    let month = date.get(0..7).unwrap_or(date).to_string();
                    *buckets.entry((month, r.currency.clone())).or_default() += amount;
                }
            }
        }
    }

    buckets
        .into_iter()
        .map(|((key, currency), total)| CostGroup { key, currency, total })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulumicost_pluginhost::{PluginHostConfig, PluginHost};

    fn request<'a>(from: &'a str, to: &'a str) -> ActualCostRequest<'a> {
        ActualCostRequest { from, to, tags: BTreeMap::new(), filter: FilterExpr::default() }
    }

    #[tokio::test]
    async fn rejects_inverted_date_range_before_launching_anything() {
        let host = PluginHost::new(PluginHostConfig::default());
        let resources = vec![ResourceDescriptor::new("aws:ec2/instance:Instance", "urn:x")];
        let err = get_actual_cost(
            &host,
            &[],
            &resources,
            request("2026-02-01", "2026-01-01"),
            "trace-1",
            CancellationToken::new(),
            &EngineConfig::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidDateRange(_)));
    }

    #[tokio::test]
    async fn emits_none_placeholder_when_no_plugin_answers() {
        let host = PluginHost::new(PluginHostConfig::default());
        let resources = vec![ResourceDescriptor::new("aws:ec2/instance:Instance", "urn:x")];
        let results = get_actual_cost(
            &host,
            &[],
            &resources,
            request("2026-01-01", "2026-01-05"),
            "trace-1",
            CancellationToken::new(),
            &EngineConfig::default(),
        )
        .await
        .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].adapter, "none");
    }

    #[tokio::test]
    async fn filter_excludes_non_matching_resources() {
        let host = PluginHost::new(PluginHostConfig::default());
        let resources = vec![
            ResourceDescriptor::new("aws:ec2/instance:Instance", "urn:a"),
            ResourceDescriptor::new("azure:compute/vm:VirtualMachine", "urn:b"),
        ];
        let mut req = request("2026-01-01", "2026-01-05");
        req.filter.provider = Some("aws".to_string());
        let results = get_actual_cost(&host, &[], &resources, req, "trace-1", CancellationToken::new(), &EngineConfig::default())
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].resource_id, "urn:a");
    }

    #[test]
    fn group_by_provider_sums_across_currencies_separately() {
        let resources = vec![ResourceDescriptor::new("aws:ec2/instance:Instance", "urn:a")];
        let results = vec![CostResult {
            resource_type: "aws:ec2/instance:Instance".to_string(),
            resource_id: "urn:a".to_string(),
            adapter: "aws".to_string(),
            currency: "USD".to_string(),
            monthly: 0.0,
            hourly: 0.0,
            total_cost: Some(12.0),
            cost_period: None,
            notes: Vec::new(),
            breakdown: BTreeMap::new(),
            confidence: pulumicost_domain::Confidence::High,
        }];
        let groups = group_actual_costs(&results, &resources, pulumicost_domain::GroupBy::Provider);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key, "aws");
        assert_eq!(groups[0].total, 12.0);
    }
}
