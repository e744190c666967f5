mod cli;
mod commands;
mod config;
mod error;

use clap::Parser;
use cli::{Cli, Command};
use commands::Context;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| dirs_home().join("config.yaml"));
    let loaded = config::load(&config_path).unwrap_or_else(|e| {
        eprintln!("warning: {e}, falling back to defaults");
        config::Config::default()
    });

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(loaded.logging.level.as_str()));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if loaded.logging.format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let ctx = Context {
        plugin_root: cli.plugin_root,
        spec_dir: cli.spec_dir,
        default_format: default_output_format(&loaded.output.default_format),
    };

    let result = match cli.command {
        Command::Projected { input, kind, format } => commands::projected(&ctx, input, kind, format).await,
        Command::Actual { input, kind, from, to, tags, filter_provider, filter_type, group_by, format } => {
            commands::actual(&ctx, input, kind, from, to, tags, filter_provider, filter_type, group_by, format).await
        }
        Command::Recommendations { input, kind, action_types, format } => {
            commands::recommendations(&ctx, input, kind, action_types, format).await
        }
        Command::Aggregate { input, kind, from, to, group_by, format } => {
            commands::aggregate(&ctx, input, kind, from, to, group_by, format).await
        }
        Command::Conformance { plugin_path, name, case_filter, expected_protocol, report_format } => {
            commands::conformance(plugin_path, name, case_filter, expected_protocol, report_format).await
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }
}

fn dirs_home() -> std::path::PathBuf {
    std::env::var_os("HOME").map(std::path::PathBuf::from).unwrap_or_else(|| std::path::PathBuf::from("."))
}

fn default_output_format(name: &str) -> cli::OutputFormat {
    match name {
        "json" => cli::OutputFormat::Json,
        "ndjson" => cli::OutputFormat::Ndjson,
        _ => cli::OutputFormat::Table,
    }
}
