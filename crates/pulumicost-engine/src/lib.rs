//! Cost orchestration kernel (spec §4.6, C6 Engine): fan-out to plugins
//! plus fallback to local specs, aggregation by dimension, cross-provider
//! time-bucketed rollups, currency invariants. Grounded in
//! `nclav_reconciler::reconcile` (load → validate → diff → act, with a
//! report accumulator) generalized to fan-out/fallback instead of
//! diff/apply.

pub mod aggregation;
pub mod actual;
pub mod error;
pub mod filter;
pub mod projected;
pub mod recommendations;
mod sessions;

pub use error::EngineError;
pub use filter::FilterExpr;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use pulumicost_domain::{Plugin, ResourceDescriptor};
use pulumicost_pluginhost::{PluginHost, PluginHostError};
use pulumicost_specstore::SpecStore;
use tokio_util::sync::CancellationToken;

/// Tunables for a single command's fan-out (§5 "Concurrency & Resource
/// Model"). Defaults match spec.md §4.4/§5 exactly.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Per-plugin in-flight RPC cap (§5 "Back-pressure": "a small constant,
    /// e.g. 8").
    pub per_plugin_concurrency: usize,
    /// Per-call deadline (§5 "Timeouts", default 10s, overridable).
    pub rpc_deadline: Duration,
    /// Grace period given to a plugin session before force-kill at the end
    /// of a command.
    pub shutdown_grace: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            per_plugin_concurrency: 8,
            rpc_deadline: Duration::from_secs(10),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

/// The orchestration kernel. Holds no per-command state — each call borrows
/// the registry/resources it needs and launches/tears down its own plugin
/// sessions (§5 "Shared resources": "Plugin client handles: owned by Engine
/// for the command").
pub struct Engine {
    host: Arc<PluginHost>,
    spec_store: Arc<SpecStore>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(host: Arc<PluginHost>, spec_store: Arc<SpecStore>, config: EngineConfig) -> Self {
        Engine { host, spec_store, config }
    }

    pub async fn get_projected_cost(
        &self,
        plugins: &[Plugin],
        resources: &[ResourceDescriptor],
        trace_id: &str,
        cancel: CancellationToken,
    ) -> Vec<pulumicost_domain::CostResult> {
        projected::get_projected_cost(&self.host, &self.spec_store, plugins, resources, trace_id, cancel, &self.config)
            .await
    }

    pub async fn get_actual_cost(
        &self,
        plugins: &[Plugin],
        resources: &[ResourceDescriptor],
        request: actual::ActualCostRequest<'_>,
        trace_id: &str,
        cancel: CancellationToken,
    ) -> Result<Vec<pulumicost_domain::CostResult>, EngineError> {
        actual::get_actual_cost(&self.host, plugins, resources, request, trace_id, cancel, &self.config).await
    }

    pub async fn get_recommendations(
        &self,
        plugins: &[Plugin],
        resources: &[ResourceDescriptor],
        action_types: &[String],
        trace_id: &str,
        cancel: CancellationToken,
    ) -> Vec<recommendations::RecommendationResult> {
        recommendations::get_recommendations(&self.host, plugins, resources, action_types, trace_id, cancel, &self.config)
            .await
    }

    pub fn cross_provider_aggregation(
        &self,
        results: &[pulumicost_domain::CostResult],
        group_by: pulumicost_domain::RollupGroupBy,
    ) -> Result<Vec<pulumicost_domain::Aggregation>, EngineError> {
        aggregation::cross_provider_aggregation(results, group_by)
    }
}

/// Whether `plugin`'s name matches a descriptor's provider key — the
/// matcher referenced throughout §4.6 as "whose provider matcher accepts
/// the descriptor". Plugins are discovered under `<root>/<name>/...`
/// (§4.3), and `name` is the provider they speak for.
pub fn plugin_matches_resource(plugin: &Plugin, resource: &ResourceDescriptor) -> bool {
    plugin.name.eq_ignore_ascii_case(&resource.provider)
}

/// Race an RPC call against a command-level cancellation token so that
/// token cancellation propagates as an RPC cancel within one scheduler
/// tick (§5, §8 invariant 7), independent of the session's own internal
/// cancellation token (which governs shutdown, not per-call cancellation).
pub(crate) async fn race_cancel<T>(
    cancel: &CancellationToken,
    call: impl Future<Output = Result<T, PluginHostError>>,
) -> Result<T, PluginHostError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PluginHostError::Rpc {
            plugin: String::new(),
            status: tonic::Status::cancelled("canceled"),
        }),
        result = call => result,
    }
}
