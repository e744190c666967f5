//! Subprocess launch + handshake (spec §4.4, C4 Plugin Host), grounded in
//! `nclav_driver::terraform::TerraformBackend::run_tf` — the teacher's only
//! subprocess-spawning code — generalized with the gRPC dial step from
//! `pulumi-rs-yaml-proto`'s tonic client usage (see SPEC_FULL.md §4.4).

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use pulumicost_domain::{Plugin, PluginState};
use pulumicost_proto::costsource::cost_source_service_client::CostSourceServiceClient;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::PluginHostError;
use crate::session::PluginSession;

/// Environment variables forwarded from the host process to every plugin
/// child (§4.4 "forwarded environment").
const FORWARDED_ENV_VARS: &[&str] =
    &["PULUMICOST_LOG_LEVEL", "PULUMICOST_LOG_FORMAT", "PULUMICOST_TRACE_ID"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginTransport {
    /// Host listens for the child to dial out a chosen TCP port (default).
    Tcp,
    /// Child's stdin/stdout is framed as the RPC stream directly.
    Stdio,
}

#[derive(Debug, Clone)]
pub struct PluginHostConfig {
    pub transport: PluginTransport,
    /// Bounded handshake wait (§4.4), default 10s.
    pub handshake_timeout: Duration,
    /// Retry interval while waiting for the port line, default 100ms.
    pub handshake_poll_interval: Duration,
    /// Grace period given to a plugin to exit on its own during shutdown
    /// before it is force-killed.
    pub shutdown_grace: Duration,
    /// Whether to also pass `--port=<n>` as a CLI argument (§4.4
    /// "Alternatively, child accepts `--port=<n>` arg").
    pub pass_port_arg: bool,
}

impl Default for PluginHostConfig {
    fn default() -> Self {
        PluginHostConfig {
            transport: PluginTransport::Tcp,
            handshake_timeout: Duration::from_secs(10),
            handshake_poll_interval: Duration::from_millis(100),
            shutdown_grace: Duration::from_secs(5),
            pass_port_arg: false,
        }
    }
}

/// Launches plugin subprocesses, performs the handshake, and hands back an
/// owned `PluginSession`. Does not itself track plugin state across calls —
/// callers update `Plugin.state` using the return value (§3 state machine).
pub struct PluginHost {
    config: PluginHostConfig,
}

impl PluginHost {
    pub fn new(config: PluginHostConfig) -> Self {
        PluginHost { config }
    }

    /// Launch `plugin`, perform the handshake, and dial the RPC channel.
    /// On any failure before `ready`, the caller should mark the plugin
    /// `Failed` (§3). `trace_id` is forwarded as `PULUMICOST_TRACE_ID`.
    pub async fn launch(
        &self,
        plugin: &Plugin,
        trace_id: &str,
    ) -> Result<PluginSession, PluginHostError> {
        match self.config.transport {
            PluginTransport::Tcp => self.launch_tcp(plugin, trace_id).await,
            PluginTransport::Stdio => self.launch_stdio(plugin, trace_id).await,
        }
    }

    async fn launch_tcp(&self, plugin: &Plugin, trace_id: &str) -> Result<PluginSession, PluginHostError> {
        let port = pick_free_port(&plugin.path)?;

        let mut cmd = Command::new(&plugin.path);
        cmd.env("PULUMICOST_PLUGIN_PORT", port.to_string())
            .env("PORT", port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        apply_forwarded_env(&mut cmd, trace_id);
        if self.config.pass_port_arg {
            cmd.arg(format!("--port={}", port));
        }

        info!(plugin = %plugin.name, port, "launching plugin subprocess (tcp)");
        let mut child = cmd.spawn().map_err(|e| PluginHostError::Spawn {
            binary: plugin.path.display().to_string(),
            source: e,
        })?;

        let stdout = child.stdout.take().expect("stdout piped");
        let stderr = child.stderr.take().expect("stderr piped");
        spawn_stderr_forwarder(plugin.name.clone(), stderr);

        let announced_port = self.read_announced_port(&plugin.name, stdout).await?;
        let addr = format!("http://127.0.0.1:{}", announced_port);

        let channel = tonic::transport::Endpoint::from_shared(addr.clone())
            .map_err(|e| PluginHostError::Dial { addr: addr.clone(), source: e })?
            .connect()
            .await
            .map_err(|e| PluginHostError::Dial { addr, source: e })?;

        Ok(PluginSession {
            plugin_name: plugin.name.clone(),
            child,
            client: CostSourceServiceClient::new(channel),
            cancel: CancellationToken::new(),
        })
    }

    async fn launch_stdio(&self, plugin: &Plugin, trace_id: &str) -> Result<PluginSession, PluginHostError> {
        let mut cmd = Command::new(&plugin.path);
        cmd.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::piped());
        apply_forwarded_env(&mut cmd, trace_id);

        info!(plugin = %plugin.name, "launching plugin subprocess (stdio)");
        let mut child = cmd.spawn().map_err(|e| PluginHostError::Spawn {
            binary: plugin.path.display().to_string(),
            source: e,
        })?;

        let stdin = child.stdin.take().expect("stdin piped");
        let stdout = child.stdout.take().expect("stdout piped");
        let stderr = child.stderr.take().expect("stderr piped");
        spawn_stderr_forwarder(plugin.name.clone(), stderr);

        let io = crate::stdio::ChildStdio::new(stdout, stdin);
        let channel = crate::stdio::connect(io)
            .await
            .map_err(|e| PluginHostError::Dial { addr: "stdio".to_string(), source: e })?;

        Ok(PluginSession {
            plugin_name: plugin.name.clone(),
            child,
            client: CostSourceServiceClient::new(channel),
            cancel: CancellationToken::new(),
        })
    }

    /// Read the single port line a child must print on stdout before
    /// accepting connections (§6 "Subprocess handshake"), bounded by the
    /// configured handshake timeout.
    async fn read_announced_port(
        &self,
        plugin_name: &str,
        stdout: tokio::process::ChildStdout,
    ) -> Result<u16, PluginHostError> {
        let mut lines = BufReader::new(stdout).lines();
        let read = tokio::time::timeout(self.config.handshake_timeout, lines.next_line());
        match read.await {
            Ok(Ok(Some(line))) => {
                let port = pulumicost_proto::read_port_line(&line)?;
                debug!(plugin = plugin_name, port, "plugin announced port");
                Ok(port)
            }
            Ok(Ok(None)) => Err(PluginHostError::HandshakeTimeout { binary: plugin_name.to_string() }),
            Ok(Err(e)) => Err(PluginHostError::HandshakeIo(e)),
            Err(_) => Err(PluginHostError::HandshakeTimeout { binary: plugin_name.to_string() }),
        }
    }
}

fn apply_forwarded_env(cmd: &mut Command, trace_id: &str) {
    for key in FORWARDED_ENV_VARS {
        if *key == "PULUMICOST_TRACE_ID" {
            continue;
        }
        if let Ok(value) = std::env::var(key) {
            cmd.env(key, value);
        }
    }
    cmd.env("PULUMICOST_TRACE_ID", trace_id);
}

fn spawn_stderr_forwarder(plugin_name: String, stderr: tokio::process::ChildStderr) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            warn!(target: "pulumicost::plugin_stderr", plugin = %plugin_name, "{}", line);
        }
    });
}

fn pick_free_port(binary: &PathBuf) -> Result<u16, PluginHostError> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").map_err(|e| PluginHostError::Spawn {
        binary: binary.display().to_string(),
        source: e,
    })?;
    listener
        .local_addr()
        .map(|addr| addr.port())
        .map_err(|e| PluginHostError::Spawn { binary: binary.display().to_string(), source: e })
}

/// Current lifecycle transition helper for callers tracking `Plugin.state`
/// through launch attempts (§3 state machine). A failed plugin may only be
/// relaunched from a fresh `Discovered` instance.
pub fn can_relaunch(state: PluginState) -> bool {
    matches!(state, PluginState::Discovered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_defaults() {
        let cfg = PluginHostConfig::default();
        assert_eq!(cfg.handshake_timeout, Duration::from_secs(10));
        assert_eq!(cfg.handshake_poll_interval, Duration::from_millis(100));
        assert_eq!(cfg.transport, PluginTransport::Tcp);
    }

    #[test]
    fn relaunch_only_allowed_from_discovered() {
        assert!(can_relaunch(PluginState::Discovered));
        assert!(!can_relaunch(PluginState::Failed));
        assert!(!can_relaunch(PluginState::Ready));
        assert!(!can_relaunch(PluginState::Terminated));
    }
}
