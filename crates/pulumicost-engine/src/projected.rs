//! `GetProjectedCost` orchestration (§4.6, C6 Engine). Fans plugins out
//! per resource with bounded per-plugin concurrency, falls back to the
//! Spec Store when no plugin answered, and finally to the `none` adapter —
//! mirroring `nclav_reconciler::reconcile`'s load → validate → diff → act
//! shape, generalized to fan-out/fallback instead of diff/apply.

use std::collections::BTreeMap;
use std::sync::Arc;

use pulumicost_adapter::{build_projected_cost_request, projected_cost_result, validate_projected_cost_request};
use pulumicost_domain::{CostResult, Plugin, ResourceDescriptor};
use pulumicost_pluginhost::PluginHost;
use pulumicost_specstore::SpecStore;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::sessions::{launch_matching, shutdown_all};
use crate::{plugin_matches_resource, race_cancel, EngineConfig};

pub async fn get_projected_cost(
    host: &PluginHost,
    spec_store: &SpecStore,
    plugins: &[Plugin],
    resources: &[ResourceDescriptor],
    trace_id: &str,
    cancel: CancellationToken,
    config: &EngineConfig,
) -> Vec<CostResult> {
    let used_providers: std::collections::HashSet<&str> =
        resources.iter().map(|r| r.provider.as_str()).collect();
    let sessions = launch_matching(host, plugins, trace_id, |p| {
        p.supports_projected() && used_providers.contains(p.name.as_str())
    })
    .await;

    // plugin_order preserves registry order for deterministic tie-breaking
    // among multiple responding plugins for the same resource (§4.6 step 5).
    let plugin_order: BTreeMap<&str, usize> =
        plugins.iter().enumerate().map(|(i, p)| (p.name.as_str(), i)).collect();

    let mut join_set = tokio::task::JoinSet::new();
    let mut per_plugin_semaphore: BTreeMap<String, Arc<Semaphore>> = BTreeMap::new();
    for name in sessions.keys() {
        per_plugin_semaphore.insert(name.clone(), Arc::new(Semaphore::new(config.per_plugin_concurrency)));
    }

    for (resource_idx, resource) in resources.iter().enumerate() {
        let request = build_projected_cost_request(resource);
        let rpc_resource = request.resource.clone().unwrap_or_default();
        if let Err(e) = validate_projected_cost_request(&rpc_resource) {
            debug!(resource_id = %resource.id, error = %e, "projected cost request failed pre-flight validation");
            continue; // handled in the assembly pass below via `validation_errors`
        }

        for (name, session) in &sessions {
            let plugin = match plugins.iter().find(|p| &p.name == name) {
                Some(p) if p.supports_projected() && plugin_matches_resource(p, resource) => p,
                _ => continue,
            };
            let session = Arc::clone(session);
            let permit = Arc::clone(per_plugin_semaphore.get(name).expect("semaphore registered for session"));
            let deadline = config.rpc_deadline;
            let trace_id = trace_id.to_string();
            let request = request.clone();
            let resource_type = resource.resource_type.clone();
            let resource_id = resource.id.clone();
            let plugin_name = plugin.name.clone();
            let order = *plugin_order.get(name.as_str()).unwrap_or(&usize::MAX);
            let cancel = cancel.clone();

            join_set.spawn(async move {
                let _permit = permit.acquire_owned().await.expect("semaphore not closed");
                let call = session.call_projected_cost(request, &trace_id, deadline);
                let result = match race_cancel(&cancel, call).await {
                    Ok(response) => projected_cost_result(&resource_type, &resource_id, &plugin_name, response),
                    Err(e) => {
                        warn!(plugin = %plugin_name, resource_id = %resource_id, error = %e, "projected cost rpc failed");
                        CostResult::rpc_error(&resource_type, &resource_id, &plugin_name, e)
                    }
                };
                (resource_idx, order, result)
            });
        }
    }

    let mut responses: Vec<(usize, usize, CostResult)> = Vec::new();
    while let Some(joined) = join_set.join_next().await {
        if let Ok(triple) = joined {
            responses.push(triple);
        }
    }
    responses.sort_by_key(|(idx, order, _)| (*idx, *order));

    let mut by_resource: BTreeMap<usize, Vec<CostResult>> = BTreeMap::new();
    for (idx, _, result) in responses {
        by_resource.entry(idx).or_default().push(result);
    }

    let mut out = Vec::with_capacity(resources.len());
    for (idx, resource) in resources.iter().enumerate() {
        let request = build_projected_cost_request(resource);
        let rpc_resource = request.resource.clone().unwrap_or_default();
        if let Err(e) = validate_projected_cost_request(&rpc_resource) {
            out.push(CostResult::validation_failure(&resource.resource_type, &resource.id, e));
            continue;
        }

        match by_resource.remove(&idx) {
            Some(results) if !results.is_empty() => out.extend(results),
            _ => match spec_store.estimate(resource) {
                Some(estimate) => out.push(CostResult {
                    resource_type: resource.resource_type.clone(),
                    resource_id: resource.id.clone(),
                    adapter: pulumicost_domain::adapter_labels::LOCAL_SPEC.to_string(),
                    currency: estimate.currency,
                    monthly: estimate.monthly,
                    hourly: estimate.hourly,
                    total_cost: None,
                    cost_period: None,
                    notes: Vec::new(),
                    breakdown: BTreeMap::new(),
                    confidence: pulumicost_domain::Confidence::Medium,
                }),
                None => out.push(CostResult::none(&resource.resource_type, &resource.id)),
            },
        }
    }

    shutdown_all(sessions, config.shutdown_grace).await;
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulumicost_pluginhost::{PluginHostConfig, PluginHost};

    #[tokio::test]
    async fn falls_back_to_spec_store_when_no_plugins_registered() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("aws-ec2-t3.micro.yaml"),
            "provider: aws\nservice: ec2\nsku: t3.micro\ncurrency: USD\npricing:\n  onDemandHourly: 0.0104\n",
        )
        .unwrap();
        let spec_store = SpecStore::load(dir.path()).unwrap();
        let host = PluginHost::new(PluginHostConfig::default());

        let mut props = BTreeMap::new();
        props.insert("instanceType".to_string(), pulumicost_domain::Value::String("t3.micro".into()));
        let resource = ResourceDescriptor::new("aws:ec2/instance:Instance", "urn:pulumi:dev::app::aws:ec2/instance:Instance::web")
            .with_properties(props);

        let results = get_projected_cost(
            &host,
            &spec_store,
            &[],
            &[resource],
            "trace-1",
            CancellationToken::new(),
            &EngineConfig::default(),
        )
        .await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].adapter, "local-spec");
        assert!((results[0].monthly - 7.592).abs() < 1e-6);
    }

    #[tokio::test]
    async fn emits_none_adapter_when_nothing_can_answer() {
        let dir = tempfile::tempdir().unwrap();
        let spec_store = SpecStore::load(dir.path()).unwrap();
        let host = PluginHost::new(PluginHostConfig::default());
        let resource = ResourceDescriptor::new("aws:ec2/instance:Instance", "urn:x");

        let results = get_projected_cost(
            &host,
            &spec_store,
            &[],
            &[resource],
            "trace-1",
            CancellationToken::new(),
            &EngineConfig::default(),
        )
        .await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].adapter, "none");
    }

    #[tokio::test]
    async fn result_order_mirrors_input_resource_order() {
        let dir = tempfile::tempdir().unwrap();
        let spec_store = SpecStore::load(dir.path()).unwrap();
        let host = PluginHost::new(PluginHostConfig::default());
        let resources = vec![
            ResourceDescriptor::new("aws:ec2/instance:Instance", "urn:a"),
            ResourceDescriptor::new("aws:s3/bucket:Bucket", "urn:b"),
        ];

        let results = get_projected_cost(
            &host,
            &spec_store,
            &[],
            &resources,
            "trace-1",
            CancellationToken::new(),
            &EngineConfig::default(),
        )
        .await;

        assert_eq!(results[0].resource_id, "urn:a");
        assert_eq!(results[1].resource_id, "urn:b");
    }
}
