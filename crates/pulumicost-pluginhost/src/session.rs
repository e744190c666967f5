//! Subprocess ownership (spec §9 Design Notes): one `PluginSession` owns
//! the child handle, the RPC channel, and the cancellation token for the
//! lifetime of a launched plugin. Drop order is cancel → close channel →
//! terminate → wait, exactly as prescribed.

use std::time::Duration;

use pulumicost_proto::costsource::cost_source_service_client::CostSourceServiceClient;
use pulumicost_proto::costsource::{
    ActualCostRequest, ActualCostResponse, NameRequest, NameResponse, ProjectedCostRequest,
    ProjectedCostResponse, RecommendationsRequest, RecommendationsResponse,
};
use tokio::process::Child;
use tokio_util::sync::CancellationToken;
use tonic::transport::Channel;
use tracing::{debug, warn};

use crate::error::PluginHostError;

/// The default per-RPC deadline (§5 "Timeouts"), overridable per call.
pub const DEFAULT_RPC_DEADLINE: Duration = Duration::from_secs(10);

/// An owned, running plugin subprocess plus its dialed RPC channel. The
/// Engine borrows `client()`/`cancellation_token()` for the duration of a
/// command; the Plugin Host exclusively owns `child` (§3 "Ownership").
pub struct PluginSession {
    pub(crate) plugin_name: String,
    pub(crate) child: Child,
    pub(crate) client: CostSourceServiceClient<Channel>,
    pub(crate) cancel: CancellationToken,
}

impl PluginSession {
    pub fn name(&self) -> &str {
        &self.plugin_name
    }

    pub fn client(&self) -> CostSourceServiceClient<Channel> {
        self.client.clone()
    }

    /// Cancellation token for this session. Cancelling it causes any
    /// in-flight call made through this session's `call_*` helpers to
    /// return `PluginHostError::Rpc` with `tonic::Code::Cancelled` within
    /// one scheduler tick (§5, §8 invariant 7).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn call_name(&self, trace_id: &str) -> Result<NameResponse, PluginHostError> {
        self.call(trace_id, DEFAULT_RPC_DEADLINE, NameRequest {}, |mut c, r| async move {
            c.name(r).await
        })
        .await
    }

    pub async fn call_projected_cost(
        &self,
        req: ProjectedCostRequest,
        trace_id: &str,
        deadline: Duration,
    ) -> Result<ProjectedCostResponse, PluginHostError> {
        self.call(trace_id, deadline, req, |mut c, r| async move { c.get_projected_cost(r).await })
            .await
    }

    pub async fn call_actual_cost(
        &self,
        req: ActualCostRequest,
        trace_id: &str,
        deadline: Duration,
    ) -> Result<ActualCostResponse, PluginHostError> {
        self.call(trace_id, deadline, req, |mut c, r| async move { c.get_actual_cost(r).await })
            .await
    }

    pub async fn call_recommendations(
        &self,
        req: RecommendationsRequest,
        trace_id: &str,
        deadline: Duration,
    ) -> Result<RecommendationsResponse, PluginHostError> {
        self.call(trace_id, deadline, req, |mut c, r| async move { c.get_recommendations(r).await })
            .await
    }

    /// Shared call path: build the request, stamp the trace id into RPC
    /// metadata (§6 "forwarded environment" / §9's single-cancellation-path
    /// design), race it against this session's cancellation token and a
    /// per-call deadline, and normalize the transport result.
    async fn call<Req, Resp, F, Fut>(
        &self,
        trace_id: &str,
        deadline: Duration,
        body: Req,
        f: F,
    ) -> Result<Resp, PluginHostError>
    where
        F: FnOnce(CostSourceServiceClient<Channel>, tonic::Request<Req>) -> Fut,
        Fut: std::future::Future<Output = Result<tonic::Response<Resp>, tonic::Status>>,
    {
        let mut request = tonic::Request::new(body);
        if let Ok(value) = trace_id.parse() {
            request.metadata_mut().insert("pulumicost-trace-id", value);
        }
        request.set_timeout(deadline);

        let call = f(self.client(), request);
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                Err(PluginHostError::Rpc {
                    plugin: self.plugin_name.clone(),
                    status: tonic::Status::cancelled("canceled"),
                })
            }
            result = call => {
                result
                    .map(tonic::Response::into_inner)
                    .map_err(|status| PluginHostError::Rpc { plugin: self.plugin_name.clone(), status })
            }
        }
    }

    /// Shutdown (§4.4): cancel in-flight RPC deadlines, drop the channel,
    /// wait for the child to exit on its own within `grace`, then
    /// force-kill. Always reaps the child to avoid zombies.
    pub async fn shutdown(mut self, grace: Duration) {
        self.cancel.cancel();
        debug!(plugin = %self.plugin_name, "shutting down plugin session");

        let waited = tokio::time::timeout(grace, self.child.wait()).await;
        match waited {
            Ok(Ok(status)) => debug!(plugin = %self.plugin_name, ?status, "plugin exited cleanly"),
            Ok(Err(e)) => warn!(plugin = %self.plugin_name, error = %e, "error waiting for plugin exit"),
            Err(_) => {
                warn!(plugin = %self.plugin_name, "plugin did not exit within grace period; force-killing");
                if let Err(e) = self.child.start_kill() {
                    warn!(plugin = %self.plugin_name, error = %e, "force-kill failed");
                }
                // Always reap after kill (§4.4 "host always reaps the child").
                let _ = self.child.wait().await;
            }
        }
    }
}

impl Drop for PluginSession {
    /// Best-effort synchronous fallback if `shutdown` was never called:
    /// cancel the token and force-kill. This never blocks, so it cannot
    /// guarantee the reap — callers should prefer `shutdown`.
    fn drop(&mut self) {
        self.cancel.cancel();
        let _ = self.child.start_kill();
    }
}
