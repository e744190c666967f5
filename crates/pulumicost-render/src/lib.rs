//! Output rendering (spec §4.9, C9 Rendering): three renderers over one
//! shared domain shape, grounded in `nclav-cli::output`'s
//! `render_changes`/`render_graph_text`/`render_dot` pattern (several
//! presentations of one `Vec<Change>`/`Vec<Enclave>`) generalized to
//! `CostResult`/`Aggregation`.

use std::collections::BTreeMap;

use pulumicost_domain::CostResult;
use serde::Serialize;

const MAX_RESOURCE_ID_WIDTH: usize = 40;

fn truncate_id(id: &str) -> String {
    if id.chars().count() <= MAX_RESOURCE_ID_WIDTH {
        return id.to_string();
    }
    let keep = MAX_RESOURCE_ID_WIDTH.saturating_sub(1);
    let mut truncated: String = id.chars().take(keep).collect();
    truncated.push('…');
    truncated
}

/// The middle `:`-segment of a resource type, split again on `/` — e.g.
/// `ec2` out of `aws:ec2/instance:Instance`. Falls back to the whole type
/// when the shape doesn't match.
fn service_of(resource_type: &str) -> &str {
    resource_type
        .split(':')
        .nth(1)
        .and_then(|seg| seg.split('/').next())
        .filter(|s| !s.is_empty())
        .unwrap_or(resource_type)
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub total_monthly: f64,
    pub total_hourly: f64,
    pub currency: String,
    pub by_provider: BTreeMap<String, f64>,
    pub by_service: BTreeMap<String, f64>,
    pub by_adapter: BTreeMap<String, f64>,
}

pub fn summarize(results: &[CostResult]) -> Summary {
    let currency = results.first().map(|r| r.currency.clone()).unwrap_or_else(|| "USD".to_string());
    let mut by_provider = BTreeMap::new();
    let mut by_service = BTreeMap::new();
    let mut by_adapter = BTreeMap::new();
    let mut total_monthly = 0.0;
    let mut total_hourly = 0.0;

    for r in results {
        total_monthly += r.monthly;
        total_hourly += r.hourly;
        let provider = pulumicost_domain::provider_of(&r.resource_type, None);
        *by_provider.entry(provider).or_insert(0.0) += r.monthly;
        *by_service.entry(service_of(&r.resource_type).to_string()).or_insert(0.0) += r.monthly;
        *by_adapter.entry(r.adapter.clone()).or_insert(0.0) += r.monthly;
    }

    Summary { total_monthly, total_hourly, currency, by_provider, by_service, by_adapter }
}

pub fn render_table(results: &[CostResult]) -> String {
    use comfy_table::{presets::UTF8_FULL, Cell, Table};

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "resource", "type", "adapter", "monthly", "hourly", "currency", "confidence",
    ]);

    for r in results {
        table.add_row(vec![
            Cell::new(truncate_id(&r.resource_id)),
            Cell::new(&r.resource_type),
            Cell::new(&r.adapter),
            Cell::new(format!("{:.2}", r.monthly)),
            Cell::new(format!("{:.4}", r.hourly)),
            Cell::new(&r.currency),
            Cell::new(r.confidence.to_string()),
        ]);
    }

    let summary = summarize(results);
    let mut out = table.to_string();
    out.push_str("\n\n");
    out.push_str(&format!(
        "total: {:.2} {}/mo ({:.4}/hr)\n",
        summary.total_monthly, summary.currency, summary.total_hourly
    ));
    out.push_str(&render_breakdown("by provider", &summary.by_provider));
    out.push_str(&render_breakdown("by service", &summary.by_service));
    out.push_str(&render_breakdown("by adapter", &summary.by_adapter));
    out
}

fn render_breakdown(label: &str, breakdown: &BTreeMap<String, f64>) -> String {
    if breakdown.is_empty() {
        return String::new();
    }
    let mut out = format!("{label}:\n");
    for (key, amount) in breakdown {
        out.push_str(&format!("  {key}: {amount:.2}\n"));
    }
    out
}

#[derive(Serialize)]
struct JsonWrapper<'a> {
    summary: Summary,
    resources: &'a [CostResult],
}

pub fn render_json(results: &[CostResult]) -> serde_json::Result<String> {
    let wrapper = JsonWrapper { summary: summarize(results), resources: results };
    serde_json::to_string_pretty(&wrapper)
}

/// One `CostResult` per line, no array wrapper — streaming-friendly for
/// large result sets (§4.9).
pub fn render_ndjson(results: &[CostResult]) -> serde_json::Result<String> {
    let mut out = String::new();
    for r in results {
        out.push_str(&serde_json::to_string(r)?);
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulumicost_domain::Confidence;

    fn sample() -> Vec<CostResult> {
        vec![
            CostResult {
                resource_type: "aws:ec2/instance:Instance".to_string(),
                resource_id: "urn:a".to_string(),
                adapter: "aws".to_string(),
                currency: "USD".to_string(),
                monthly: 10.0,
                hourly: 0.0137,
                total_cost: None,
                cost_period: None,
                notes: Vec::new(),
                breakdown: BTreeMap::new(),
                confidence: Confidence::High,
            },
            CostResult {
                resource_type: "azure:compute/vm:VirtualMachine".to_string(),
                resource_id: "urn:b".to_string(),
                adapter: "local-spec".to_string(),
                currency: "USD".to_string(),
                monthly: 5.0,
                hourly: 0.0068,
                total_cost: None,
                cost_period: None,
                notes: Vec::new(),
                breakdown: BTreeMap::new(),
                confidence: Confidence::Medium,
            },
        ]
    }

    #[test]
    fn summary_totals_and_buckets_are_correct() {
        let summary = summarize(&sample());
        assert_eq!(summary.total_monthly, 15.0);
        assert_eq!(summary.by_provider.get("aws"), Some(&10.0));
        assert_eq!(summary.by_provider.get("azure"), Some(&5.0));
        assert_eq!(summary.by_service.get("ec2"), Some(&10.0));
    }

    #[test]
    fn ndjson_has_one_object_per_line_and_no_wrapper() {
        let ndjson = render_ndjson(&sample()).unwrap();
        let lines: Vec<&str> = ndjson.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(!ndjson.trim_start().starts_with('['));
        for line in lines {
            let parsed: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(parsed.get("resource_id").is_some());
        }
    }

    #[test]
    fn json_wrapper_contains_summary_and_resources() {
        let json = render_json(&sample()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed.get("summary").is_some());
        assert_eq!(parsed["resources"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn long_resource_ids_are_truncated_with_ellipsis() {
        let long_id = "a".repeat(60);
        let truncated = truncate_id(&long_id);
        assert_eq!(truncated.chars().count(), MAX_RESOURCE_ID_WIDTH);
        assert!(truncated.ends_with('…'));
    }
}
