use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "pulumicost", about = "Cost estimation and analysis for Pulumi stacks", version)]
pub struct Cli {
    /// Root directory to discover cost-source plugins under (§4.3).
    #[arg(long, env = "PULUMICOST_PLUGIN_ROOT", default_value = "./plugins", global = true)]
    pub plugin_root: PathBuf,

    /// Directory of YAML pricing specs, used when no plugin answers (§4.2).
    #[arg(long, env = "PULUMICOST_SPEC_DIR", default_value = "./specs", global = true)]
    pub spec_dir: PathBuf,

    /// Config file path; defaults to `<home>/config.yaml`.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Estimate monthly/hourly cost from a plan or state-export file.
    Projected {
        /// Path to a Pulumi plan or state-export JSON file.
        input: PathBuf,
        /// Whether `input` is a `plan` or a `state` export.
        #[arg(long, default_value = "plan")]
        kind: InputKind,
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Fetch historical spend over a time window.
    Actual {
        input: PathBuf,
        #[arg(long, default_value = "plan")]
        kind: InputKind,
        /// Inclusive window start, e.g. `2026-01-01`.
        #[arg(long)]
        from: String,
        /// Exclusive window end, e.g. `2026-02-01`.
        #[arg(long)]
        to: String,
        /// `key=value` tags forwarded to the plugin, repeatable.
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Post-query provider filter.
        #[arg(long)]
        filter_provider: Option<String>,
        /// Post-query resource-type filter.
        #[arg(long)]
        filter_type: Option<String>,
        /// Post-processing grouping dimension.
        #[arg(long)]
        group_by: Option<String>,
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Fetch cost-optimization recommendations.
    Recommendations {
        input: PathBuf,
        #[arg(long, default_value = "plan")]
        kind: InputKind,
        /// Action types to request; empty means all (§6 action-type enumeration).
        #[arg(long = "action-type")]
        action_types: Vec<String>,
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Cross-provider, time-bucketed cost rollup over an actual-cost window.
    Aggregate {
        input: PathBuf,
        #[arg(long, default_value = "plan")]
        kind: InputKind,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long, default_value = "daily")]
        group_by: RollupGroupByArg,
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Run the conformance battery against one plugin binary.
    Conformance {
        /// Path to the plugin binary under test.
        plugin_path: PathBuf,
        /// Display name for the plugin in the report.
        #[arg(long, default_value = "under-test")]
        name: String,
        /// Only run cases whose name matches this regex.
        #[arg(long)]
        case_filter: Option<String>,
        /// `(major, minor)` expected protocol version, e.g. `1.0`.
        #[arg(long, default_value = "1.0")]
        expected_protocol: String,
        #[arg(long, value_enum, default_value = "table")]
        report_format: ConformanceReportFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum InputKind {
    Plan,
    State,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Ndjson,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RollupGroupByArg {
    Daily,
    Monthly,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ConformanceReportFormat {
    Table,
    Json,
    Junit,
}
