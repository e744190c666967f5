//! One function per subcommand (§4, C10 CLI), each wiring Ingest →
//! Plugin Registry/Spec Store → Engine → Render the way
//! `nclav_reconciler::reconcile` wires load → validate → diff → act.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use comfy_table::{presets::UTF8_FULL, Cell, Table};
use pulumicost_domain::{GroupBy, ResourceDescriptor, RollupGroupBy};
use pulumicost_engine::actual::{group_actual_costs, ActualCostRequest, CostGroup};
use pulumicost_engine::filter::FilterExpr;
use pulumicost_engine::recommendations::RecommendationResult;
use pulumicost_engine::{Engine, EngineConfig};
use pulumicost_pluginhost::{PluginHost, PluginHostConfig};
use pulumicost_specstore::SpecStore;
use regex::Regex;
use tokio_util::sync::CancellationToken;

use crate::cli::{ConformanceReportFormat, InputKind, OutputFormat, RollupGroupByArg};
use crate::error::CliError;

pub struct Context {
    pub plugin_root: PathBuf,
    pub spec_dir: PathBuf,
    pub default_format: OutputFormat,
}

fn ingest(input: &Path, kind: InputKind) -> Result<Vec<ResourceDescriptor>, CliError> {
    let resources = match kind {
        InputKind::Plan => pulumicost_ingest::ingest_plan_file(input)?,
        InputKind::State => pulumicost_ingest::ingest_state_file(input)?,
    };
    Ok(resources)
}

fn new_trace_id() -> String {
    ulid::Ulid::new().to_string()
}

/// Discover plugins and load the local spec store, failing fast with exit
/// code 3 when neither can answer anything (§6 "no plugins and no pricing
/// specs are available").
fn discover_sources(ctx: &Context) -> Result<(Vec<pulumicost_domain::Plugin>, SpecStore), CliError> {
    let plugins = pulumicost_pluginhost::discover(&ctx.plugin_root)?;
    let spec_store = SpecStore::load(&ctx.spec_dir)?;
    if plugins.is_empty() && spec_store.is_empty() {
        return Err(CliError::NoDataSources);
    }
    Ok((plugins, spec_store))
}

fn resolve_format(ctx: &Context, requested: Option<OutputFormat>) -> OutputFormat {
    requested.unwrap_or(ctx.default_format)
}

pub async fn projected(ctx: &Context, input: PathBuf, kind: InputKind, format: Option<OutputFormat>) -> Result<(), CliError> {
    let resources = ingest(&input, kind)?;
    let (plugins, spec_store) = discover_sources(ctx)?;
    let host = Arc::new(PluginHost::new(PluginHostConfig::default()));
    let engine = Engine::new(host, Arc::new(spec_store), EngineConfig::default());
    let trace_id = new_trace_id();

    let results = engine
        .get_projected_cost(&plugins, &resources, &trace_id, CancellationToken::new())
        .await;

    print_cost_results(&results, resolve_format(ctx, format))
}

pub async fn actual(
    ctx: &Context,
    input: PathBuf,
    kind: InputKind,
    from: String,
    to: String,
    tags: Vec<String>,
    filter_provider: Option<String>,
    filter_type: Option<String>,
    group_by: Option<String>,
    format: Option<OutputFormat>,
) -> Result<(), CliError> {
    let resources = ingest(&input, kind)?;
    let (plugins, _spec_store) = discover_sources(ctx)?;
    let host = PluginHost::new(PluginHostConfig::default());
    let trace_id = new_trace_id();

    let mut tag_map = std::collections::BTreeMap::new();
    for tag in &tags {
        if let Some((k, v)) = tag.split_once('=') {
            tag_map.insert(k.to_string(), v.to_string());
        }
    }

    let request = ActualCostRequest {
        from: &from,
        to: &to,
        tags: tag_map,
        filter: FilterExpr { provider: filter_provider, resource_type: filter_type, property_equals: Default::default() },
    };

    let results = pulumicost_engine::actual::get_actual_cost(
        &host,
        &plugins,
        &resources,
        request,
        &trace_id,
        CancellationToken::new(),
        &EngineConfig::default(),
    )
    .await?;

    if let Some(group_by) = group_by {
        let parsed = GroupBy::parse(&group_by)
            .ok_or_else(|| pulumicost_engine::EngineError::InvalidGroupBy(group_by.clone()))?;
        let groups = group_actual_costs(&results, &resources, parsed);
        print_cost_groups(&groups, resolve_format(ctx, format))
    } else {
        print_cost_results(&results, resolve_format(ctx, format))
    }
}

pub async fn recommendations(
    ctx: &Context,
    input: PathBuf,
    kind: InputKind,
    action_types: Vec<String>,
    format: Option<OutputFormat>,
) -> Result<(), CliError> {
    let resources = ingest(&input, kind)?;
    let (plugins, _spec_store) = discover_sources(ctx)?;
    let host = PluginHost::new(PluginHostConfig::default());
    let trace_id = new_trace_id();

    let results = pulumicost_engine::recommendations::get_recommendations(
        &host,
        &plugins,
        &resources,
        &action_types,
        &trace_id,
        CancellationToken::new(),
        &EngineConfig::default(),
    )
    .await;

    print_recommendations(&results, resolve_format(ctx, format))
}

pub async fn aggregate(
    ctx: &Context,
    input: PathBuf,
    kind: InputKind,
    from: String,
    to: String,
    group_by: RollupGroupByArg,
    format: Option<OutputFormat>,
) -> Result<(), CliError> {
    let resources = ingest(&input, kind)?;
    let (plugins, _spec_store) = discover_sources(ctx)?;
    let host = PluginHost::new(PluginHostConfig::default());
    let trace_id = new_trace_id();

    let request = ActualCostRequest {
        from: &from,
        to: &to,
        tags: Default::default(),
        filter: FilterExpr::default(),
    };
    let results = pulumicost_engine::actual::get_actual_cost(
        &host,
        &plugins,
        &resources,
        request,
        &trace_id,
        CancellationToken::new(),
        &EngineConfig::default(),
    )
    .await?;

    let group_by = match group_by {
        RollupGroupByArg::Daily => RollupGroupBy::Daily,
        RollupGroupByArg::Monthly => RollupGroupBy::Monthly,
    };
    let aggregations = pulumicost_engine::aggregation::cross_provider_aggregation(&results, group_by)?;
    print_aggregations(&aggregations, resolve_format(ctx, format))
}

pub async fn conformance(
    plugin_path: PathBuf,
    name: String,
    case_filter: Option<String>,
    expected_protocol: String,
    report_format: ConformanceReportFormat,
) -> Result<(), CliError> {
    let (major, minor) = expected_protocol
        .split_once('.')
        .and_then(|(a, b)| Some((a.parse::<u32>().ok()?, b.parse::<u32>().ok()?)))
        .ok_or_else(|| CliError::Internal(format!("malformed protocol version {expected_protocol:?}, expected MAJOR.MINOR")))?;

    let plugin = pulumicost_domain::Plugin::discovered(name, "0.0.0", plugin_path);
    let host = PluginHost::new(PluginHostConfig::default());
    let runner = pulumicost_conformance::ConformanceRunner::new(host, plugin, new_trace_id(), (major, minor));
    let cases = pulumicost_conformance::standard_test_suite();

    let selector = case_filter
        .as_deref()
        .map(Regex::new)
        .transpose()
        .map_err(|e| CliError::Internal(format!("invalid --case-filter regex: {e}")))?;

    let report = runner.run(&cases, selector.as_ref()).await;

    match report_format {
        ConformanceReportFormat::Table => println!("{}", pulumicost_conformance::render_table(&report)),
        ConformanceReportFormat::Json => println!("{}", pulumicost_conformance::render_json(&report)?),
        ConformanceReportFormat::Junit => println!("{}", pulumicost_conformance::render_junit_xml(&report)),
    }

    if !report.certified() {
        return Err(CliError::Internal(format!("{} did not pass conformance", report.plugin_name)));
    }
    Ok(())
}

fn print_cost_results(results: &[pulumicost_domain::CostResult], format: OutputFormat) -> Result<(), CliError> {
    match format {
        OutputFormat::Table => println!("{}", pulumicost_render::render_table(results)),
        OutputFormat::Json => println!("{}", pulumicost_render::render_json(results)?),
        OutputFormat::Ndjson => print!("{}", pulumicost_render::render_ndjson(results)?),
    }
    Ok(())
}

fn print_cost_groups(groups: &[CostGroup], format: OutputFormat) -> Result<(), CliError> {
    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table.load_preset(UTF8_FULL).set_header(vec!["key", "currency", "total"]);
            for g in groups {
                table.add_row(vec![Cell::new(&g.key), Cell::new(&g.currency), Cell::new(format!("{:.2}", g.total))]);
            }
            println!("{table}");
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(groups)?),
        OutputFormat::Ndjson => {
            for g in groups {
                println!("{}", serde_json::to_string(g)?);
            }
        }
    }
    Ok(())
}

fn print_aggregations(aggregations: &[pulumicost_domain::Aggregation], format: OutputFormat) -> Result<(), CliError> {
    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table.load_preset(UTF8_FULL).set_header(vec!["period", "total", "currency", "providers"]);
            for a in aggregations {
                let providers = a.providers.iter().map(|(k, v)| format!("{k}={v:.2}")).collect::<Vec<_>>().join(", ");
                table.add_row(vec![
                    Cell::new(&a.period),
                    Cell::new(format!("{:.2}", a.total)),
                    Cell::new(&a.currency),
                    Cell::new(providers),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(aggregations)?),
        OutputFormat::Ndjson => {
            for a in aggregations {
                println!("{}", serde_json::to_string(a)?);
            }
        }
    }
    Ok(())
}

fn print_recommendations(results: &[RecommendationResult], format: OutputFormat) -> Result<(), CliError> {
    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_header(vec!["resource", "adapter", "action", "description", "savings/mo"]);
            for r in results {
                if r.recommendations.is_empty() {
                    table.add_row(vec![
                        Cell::new(&r.resource_id),
                        Cell::new(&r.adapter),
                        Cell::new(""),
                        Cell::new(r.notes.join("; ")),
                        Cell::new(""),
                    ]);
                    continue;
                }
                for rec in &r.recommendations {
                    table.add_row(vec![
                        Cell::new(&r.resource_id),
                        Cell::new(&r.adapter),
                        Cell::new(&rec.action_type),
                        Cell::new(&rec.description),
                        Cell::new(format!("{:.2} {}", rec.estimated_monthly_savings, rec.currency)),
                    ]);
                }
            }
            println!("{table}");
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(results)?),
        OutputFormat::Ndjson => {
            for r in results {
                println!("{}", serde_json::to_string(r)?);
            }
        }
    }
    Ok(())
}
