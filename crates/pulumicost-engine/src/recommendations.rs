//! `GetRecommendations` orchestration — a supplemented entry point (not
//! named by the outbound/inbound message pair in §6, but declared as a
//! plugin capability (`PluginSupports.recommendations`) and wired through
//! the same fan-out/fallback shape as the other two queries, minus the
//! Spec Store fallback: recommendations only make sense coming from a
//! provider's live billing data.

use pulumicost_adapter::{build_recommendations_request, validate_recommendations_request};
use pulumicost_domain::{Plugin, ResourceDescriptor};
use pulumicost_pluginhost::PluginHost;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::sessions::{launch_matching, shutdown_all};
use crate::{plugin_matches_resource, race_cancel, EngineConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationItem {
    pub action_type: String,
    pub description: String,
    pub estimated_monthly_savings: f64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub resource_type: String,
    pub resource_id: String,
    pub adapter: String,
    pub recommendations: Vec<RecommendationItem>,
    #[serde(default)]
    pub notes: Vec<String>,
}

pub async fn get_recommendations(
    host: &PluginHost,
    plugins: &[Plugin],
    resources: &[ResourceDescriptor],
    action_types: &[String],
    trace_id: &str,
    cancel: CancellationToken,
    config: &EngineConfig,
) -> Vec<RecommendationResult> {
    let used_providers: std::collections::HashSet<&str> =
        resources.iter().map(|r| r.provider.as_str()).collect();
    let sessions = launch_matching(host, plugins, trace_id, |p| {
        p.supports_recommendations() && used_providers.contains(p.name.as_str())
    })
    .await;

    let mut out = Vec::with_capacity(resources.len());
    for resource in resources {
        let request = build_recommendations_request(resource, action_types);
        let rpc_resource = request.resource.clone().unwrap_or_default();
        if let Err(e) = validate_recommendations_request(&rpc_resource, action_types) {
            out.push(RecommendationResult {
                resource_type: resource.resource_type.clone(),
                resource_id: resource.id.clone(),
                adapter: "validation".to_string(),
                recommendations: Vec::new(),
                notes: vec![format!("VALIDATION: {}", e)],
            });
            continue;
        }

        let mut answered = false;
        for plugin in plugins.iter().filter(|p| p.supports_recommendations() && plugin_matches_resource(p, resource)) {
            let Some(session) = sessions.get(&plugin.name) else { continue };
            let call = session.call_recommendations(request.clone(), trace_id, config.rpc_deadline);
            match race_cancel(&cancel, call).await {
                Ok(response) => {
                    let recommendations = response
                        .recommendations
                        .into_iter()
                        .map(|r| RecommendationItem {
                            action_type: r.action_type,
                            description: r.description,
                            estimated_monthly_savings: r.estimated_monthly_savings,
                            currency: r.currency,
                        })
                        .collect();
                    out.push(RecommendationResult {
                        resource_type: resource.resource_type.clone(),
                        resource_id: resource.id.clone(),
                        adapter: plugin.name.clone(),
                        recommendations,
                        notes: Vec::new(),
                    });
                    answered = true;
                    break;
                }
                Err(e) => {
                    debug!(plugin = %plugin.name, resource_id = %resource.id, error = %e, "recommendations rpc failed, trying next plugin");
                }
            }
        }

        if !answered {
            warn!(resource_id = %resource.id, "no plugin could produce recommendations for this resource");
            out.push(RecommendationResult {
                resource_type: resource.resource_type.clone(),
                resource_id: resource.id.clone(),
                adapter: "none".to_string(),
                recommendations: Vec::new(),
                notes: vec!["No recommendation source available".to_string()],
            });
        }
    }

    shutdown_all(sessions, config.shutdown_grace).await;
    out
}
