//! `pulumi-analyzer-policy-pulumicost` — the analyzer server binary (§4.7).
//! Binary-naming contract: must be named `pulumi-analyzer-policy-<runtime>`
//! for the IaC engine to discover it. Handshake is identical to the plugin
//! host's (§6): print the chosen port on stdout, log everything else to
//! stderr, then accept connections.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use pulumicost_analyzer::PulumicostAnalyzer;
use pulumicost_engine::{Engine, EngineConfig};
use pulumicost_pluginhost::{discover, PluginHost, PluginHostConfig};
use pulumicost_proto::analyzer::analyzer_service_server::AnalyzerServiceServer;
use pulumicost_specstore::SpecStore;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Args {
    /// Root directory to discover cost-source plugins under (§4.3).
    #[arg(long, env = "PULUMICOST_PLUGIN_ROOT")]
    plugin_root: Option<PathBuf>,

    /// Directory of YAML pricing specs, used when no plugin answers (§4.2).
    #[arg(long, env = "PULUMICOST_SPEC_DIR")]
    spec_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let plugin_root = args.plugin_root.unwrap_or_else(|| PathBuf::from("./plugins"));
    let spec_dir = args.spec_dir.unwrap_or_else(|| PathBuf::from("./specs"));

    let plugins = discover(&plugin_root).context("discovering cost-source plugins")?;
    let spec_store = SpecStore::load(&spec_dir).context("loading pricing specs")?;
    let host = PluginHost::new(PluginHostConfig::default());
    let engine = Engine::new(Arc::new(host), Arc::new(spec_store), EngineConfig::default());

    let listener = std::net::TcpListener::bind("127.0.0.1:0").context("binding analyzer port")?;
    let port = listener.local_addr()?.port();
    listener.set_nonblocking(true)?;
    let listener = tokio::net::TcpListener::from_std(listener)?;

    // §6 "Subprocess handshake": exactly the chosen port, `\n`, nothing else
    // on stdout. Everything else (the line above) goes to stderr.
    print!("{}", pulumicost_proto::write_port_line(port));
    use std::io::Write;
    std::io::stdout().flush()?;

    let analyzer = PulumicostAnalyzer::new(Arc::new(engine), Arc::new(plugins));

    tonic::transport::Server::builder()
        .add_service(AnalyzerServiceServer::new(analyzer))
        .serve_with_incoming(tokio_stream::wrappers::TcpListenerStream::new(listener))
        .await
        .context("analyzer server exited")?;

    Ok(())
}
