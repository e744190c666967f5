//! Inbound analyzer server (spec §4.7, C7 Analyzer Server): a tonic service
//! implementing the IaC engine's advisory-diagnostics protocol, grounded in
//! `pulumi_rs_yaml_language::component_provider`'s tonic `#[async_trait]`
//! service-impl shape — the *shape* of shared state (one struct owning an
//! `Arc<…>` engine handle, guarded mutable run context) follows
//! `nclav-api::state::AppState`.

use std::collections::BTreeMap;
use std::sync::Arc;

use pulumicost_domain::{AnalyzerContext, Diagnostic, ResourceDescriptor, Value};
use pulumicost_engine::Engine;
use pulumicost_pluginhost::PluginHost;
use pulumicost_proto::analyzer::{
    analyzer_service_server::AnalyzerService, AnalyzeRequest, AnalyzeResponse,
    AnalyzerInfo, ConfigureStackRequest, Empty, HandshakeRequest, HandshakeResponse, PluginInfo,
};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status};
use tracing::{debug, info};

pub const ANALYZER_NAME: &str = "pulumicost";
pub const ANALYZER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Resources under this type prefix belong to the engine's internal
/// namespace and never carry a cloud cost (§4.7).
const INTERNAL_TYPE_PREFIX: &str = "pulumi:";

/// Per-run state: the stack context established by `ConfigureStack`, and the
/// per-resource cost cache keyed by URN, consumed by `AnalyzeStack` (§4.7,
/// §5 "the per-stack cost cache is accessed under exclusive lock").
#[derive(Default)]
struct RunState {
    context: Option<AnalyzerContext>,
    cache: BTreeMap<String, (f64, String)>,
}

pub struct PulumicostAnalyzer {
    engine: Arc<Engine>,
    plugins: Arc<Vec<pulumicost_domain::Plugin>>,
    state: Mutex<RunState>,
}

impl PulumicostAnalyzer {
    pub fn new(engine: Arc<Engine>, plugins: Arc<Vec<pulumicost_domain::Plugin>>) -> Self {
        PulumicostAnalyzer { engine, plugins, state: Mutex::new(RunState::default()) }
    }
}

/// Build a `ResourceDescriptor` from the flattened `{urn, resource_type,
/// properties}` shape `Analyze` receives over the wire — the properties
/// here have already been reduced to strings by the IaC engine, unlike
/// Ingest's richer JSON tree.
fn descriptor_from_analyze_request(req: &AnalyzeRequest) -> ResourceDescriptor {
    let properties = req
        .properties
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    ResourceDescriptor::new(req.resource_type.clone(), req.urn.clone()).with_properties(properties)
}

#[tonic::async_trait]
impl AnalyzerService for PulumicostAnalyzer {
    async fn handshake(
        &self,
        _request: Request<HandshakeRequest>,
    ) -> Result<Response<HandshakeResponse>, Status> {
        Ok(Response::new(HandshakeResponse {}))
    }

    async fn get_analyzer_info(&self, _request: Request<Empty>) -> Result<Response<AnalyzerInfo>, Status> {
        Ok(Response::new(AnalyzerInfo {
            name: ANALYZER_NAME.to_string(),
            version: ANALYZER_VERSION.to_string(),
            policies: vec!["cost-estimate".to_string()],
        }))
    }

    async fn get_plugin_info(&self, _request: Request<Empty>) -> Result<Response<PluginInfo>, Status> {
        Ok(Response::new(PluginInfo { version: ANALYZER_VERSION.to_string() }))
    }

    async fn configure_stack(
        &self,
        request: Request<ConfigureStackRequest>,
    ) -> Result<Response<Empty>, Status> {
        let req = request.into_inner();
        let mut state = self.state.lock().await;
        info!(stack = %req.stack, project = %req.project, "configuring analyzer run context; clearing cache");
        state.context = Some(AnalyzerContext { stack: req.stack, project: req.project, tags: req.tags.into_iter().collect() });
        state.cache.clear();
        Ok(Response::new(Empty {}))
    }

    async fn analyze(&self, request: Request<AnalyzeRequest>) -> Result<Response<AnalyzeResponse>, Status> {
        let req = request.into_inner();

        if req.resource_type.starts_with(INTERNAL_TYPE_PREFIX) {
            let mut state = self.state.lock().await;
            state.cache.insert(req.urn.clone(), (0.0, String::new()));
            return Ok(Response::new(AnalyzeResponse {
                diagnostics: vec![proto_diagnostic(Diagnostic::advisory("Internal Pulumi resource (no cloud cost)"))],
            }));
        }

        let descriptor = descriptor_from_analyze_request(&req);
        let trace_id = ulid::Ulid::new().to_string();
        let results = self
            .engine
            .get_projected_cost(&self.plugins, std::slice::from_ref(&descriptor), &trace_id, CancellationToken::new())
            .await;

        let (monthly, currency) = results
            .iter()
            .fold((0.0, String::from("USD")), |(total, _), r| (total + r.monthly, r.currency.clone()));

        let mut state = self.state.lock().await;
        state.cache.insert(req.urn.clone(), (monthly, currency.clone()));
        debug!(urn = %req.urn, monthly, "cached projected cost for stack summary");

        let message = format!("Estimated monthly cost: {:.2} {}", monthly, currency);
        Ok(Response::new(AnalyzeResponse { diagnostics: vec![proto_diagnostic(Diagnostic::advisory(message))] }))
    }

    async fn analyze_stack(&self, _request: Request<Empty>) -> Result<Response<AnalyzeResponse>, Status> {
        let state = self.state.lock().await;
        let total: f64 = state.cache.values().map(|(monthly, _)| monthly).sum();
        let currency = state
            .cache
            .values()
            .map(|(_, c)| c.as_str())
            .find(|c| !c.is_empty())
            .unwrap_or("USD")
            .to_string();
        let message = format!("Stack estimated monthly cost: {:.2} {}", total, currency);
        Ok(Response::new(AnalyzeResponse { diagnostics: vec![proto_diagnostic(Diagnostic::advisory(message))] }))
    }

    async fn cancel(&self, _request: Request<Empty>) -> Result<Response<Empty>, Status> {
        let mut state = self.state.lock().await;
        state.context = None;
        state.cache.clear();
        Ok(Response::new(Empty {}))
    }
}

fn proto_diagnostic(d: Diagnostic) -> pulumicost_proto::analyzer::Diagnostic {
    pulumicost_proto::analyzer::Diagnostic { severity: "ADVISORY".to_string(), message: d.message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulumicost_specstore::SpecStore;

    fn test_analyzer() -> PulumicostAnalyzer {
        let host = Arc::new(PluginHost::new(Default::default()));
        let spec_store = Arc::new(SpecStore::load(std::path::Path::new("/no/such/dir")).unwrap());
        let engine = Arc::new(Engine::new(host, spec_store, Default::default()));
        PulumicostAnalyzer::new(engine, Arc::new(Vec::new()))
    }

    #[tokio::test]
    async fn internal_pulumi_resources_cost_nothing() {
        let analyzer = test_analyzer();
        let resp = analyzer
            .analyze(Request::new(AnalyzeRequest {
                urn: "urn:pulumi:dev::app::pulumi:pulumi:Stack::app-dev".to_string(),
                resource_type: "pulumi:pulumi:Stack".to_string(),
                properties: Default::default(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(resp.diagnostics.len(), 1);
        assert!(resp.diagnostics[0].message.contains("no cloud cost"));
        assert_eq!(resp.diagnostics[0].severity, "ADVISORY");
    }

    #[tokio::test]
    async fn configure_stack_clears_cache() {
        let analyzer = test_analyzer();
        analyzer
            .analyze(Request::new(AnalyzeRequest {
                urn: "urn:x".to_string(),
                resource_type: "aws:s3/bucket:Bucket".to_string(),
                properties: Default::default(),
            }))
            .await
            .unwrap();
        analyzer
            .configure_stack(Request::new(ConfigureStackRequest {
                stack: "dev".to_string(),
                project: "app".to_string(),
                tags: Default::default(),
            }))
            .await
            .unwrap();
        let resp = analyzer.analyze_stack(Request::new(Empty {})).await.unwrap().into_inner();
        assert!(resp.diagnostics[0].message.starts_with("Stack estimated monthly cost: 0.00"));
    }

    #[tokio::test]
    async fn cancel_clears_context_and_cache() {
        let analyzer = test_analyzer();
        analyzer
            .configure_stack(Request::new(ConfigureStackRequest {
                stack: "dev".to_string(),
                project: "app".to_string(),
                tags: Default::default(),
            }))
            .await
            .unwrap();
        analyzer.cancel(Request::new(Empty {})).await.unwrap();
        let state = analyzer.state.lock().await;
        assert!(state.context.is_none());
        assert!(state.cache.is_empty());
    }
}
