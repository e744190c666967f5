//! Conformance reporting (§4.8): a certification verdict plus renderers for
//! the three output forms a CI pipeline cares about. Table rendering is
//! grounded in `nclav-cli::output`'s `comfy_table` usage; the JSON shape is
//! kept flat and stable since it is meant to be diffed across runs.

use std::time::Duration;

use comfy_table::{presets::UTF8_FULL, Cell, Table};
use pulumicost_domain::{TestResult, TestStatus};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct Report {
    pub plugin_name: String,
    pub results: Vec<TestResult>,
    /// Number of times a transport-loss case forced a plugin relaunch
    /// (§4.4 "process-lost condition flags a plugin for restart").
    pub restarted: usize,
}

impl Report {
    pub fn new(plugin_name: impl Into<String>, results: Vec<TestResult>, restarted: usize) -> Self {
        Report { plugin_name: plugin_name.into(), results, restarted }
    }

    pub fn passed(&self) -> usize {
        self.count(TestStatus::Pass)
    }

    pub fn failed(&self) -> usize {
        self.count(TestStatus::Fail)
    }

    pub fn skipped(&self) -> usize {
        self.count(TestStatus::Skip)
    }

    pub fn errors(&self) -> usize {
        self.count(TestStatus::Error)
    }

    fn count(&self, status: TestStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    /// A plugin is certified only if nothing failed and nothing errored —
    /// skips do not block certification (§4.8 "skipped cases are excluded
    /// from the pass/fail calculus, not counted against it").
    pub fn certified(&self) -> bool {
        self.failed() == 0 && self.errors() == 0
    }

    /// Every result that isn't a clean pass, in execution order.
    pub fn issues(&self) -> Vec<&TestResult> {
        self.results.iter().filter(|r| r.status != TestStatus::Pass).collect()
    }

    pub fn total_duration(&self) -> Duration {
        self.results.iter().map(|r| r.duration).sum()
    }
}

pub fn render_table(report: &Report) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["case", "category", "status", "duration", "detail"]);

    for result in &report.results {
        table.add_row(vec![
            Cell::new(&result.name),
            Cell::new(result.category.to_string()),
            Cell::new(result.status.to_string()),
            Cell::new(format!("{:.0}ms", result.duration.as_secs_f64() * 1000.0)),
            Cell::new(result.error.as_deref().unwrap_or("")),
        ]);
    }

    let verdict = if report.certified() { "CERTIFIED" } else { "NOT CERTIFIED" };
    format!(
        "{table}\n\n{} — {} passed, {} failed, {} error, {} skipped ({} restart(s)) — {}\n",
        report.plugin_name,
        report.passed(),
        report.failed(),
        report.errors(),
        report.skipped(),
        report.restarted,
        verdict,
    )
}

#[derive(Serialize)]
struct JsonResult<'a> {
    name: &'a str,
    category: String,
    status: String,
    duration_ms: f64,
    error: Option<&'a str>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    plugin: &'a str,
    certified: bool,
    passed: usize,
    failed: usize,
    errors: usize,
    skipped: usize,
    restarted: usize,
    results: Vec<JsonResult<'a>>,
}

pub fn render_json(report: &Report) -> serde_json::Result<String> {
    let doc = JsonReport {
        plugin: &report.plugin_name,
        certified: report.certified(),
        passed: report.passed(),
        failed: report.failed(),
        errors: report.errors(),
        skipped: report.skipped(),
        restarted: report.restarted,
        results: report
            .results
            .iter()
            .map(|r| JsonResult {
                name: &r.name,
                category: r.category.to_string(),
                status: r.status.to_string(),
                duration_ms: r.duration.as_secs_f64() * 1000.0,
                error: r.error.as_deref(),
            })
            .collect(),
    };
    serde_json::to_string_pretty(&doc)
}

/// Minimal, spec-stable JUnit XML: one `<testsuite>` with one `<testcase>`
/// per case. `skip` maps to `<skipped/>`, `fail`/`error` map to their own
/// elements so CI tools distinguish assertion failures from crashes.
pub fn render_junit_xml(report: &Report) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str(&format!(
        "<testsuite name=\"{}\" tests=\"{}\" failures=\"{}\" errors=\"{}\" skipped=\"{}\" time=\"{:.3}\">\n",
        xml_escape(&report.plugin_name),
        report.results.len(),
        report.failed(),
        report.errors(),
        report.skipped(),
        report.total_duration().as_secs_f64(),
    ));
    for result in &report.results {
        out.push_str(&format!(
            "  <testcase name=\"{}\" classname=\"{}\" time=\"{:.3}\">\n",
            xml_escape(&result.name),
            xml_escape(&result.category.to_string()),
            result.duration.as_secs_f64(),
        ));
        match result.status {
            TestStatus::Pass => {}
            TestStatus::Skip => out.push_str(&format!(
                "    <skipped message=\"{}\"/>\n",
                xml_escape(result.error.as_deref().unwrap_or(""))
            )),
            TestStatus::Fail => out.push_str(&format!(
                "    <failure message=\"{}\"/>\n",
                xml_escape(result.error.as_deref().unwrap_or(""))
            )),
            TestStatus::Error => out.push_str(&format!(
                "    <error message=\"{}\"/>\n",
                xml_escape(result.error.as_deref().unwrap_or(""))
            )),
        }
        out.push_str("  </testcase>\n");
    }
    out.push_str("</testsuite>\n");
    out
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulumicost_domain::TestCategory;

    fn sample_report() -> Report {
        Report::new(
            "aws",
            vec![
                TestResult::pass("name_returns_plugin_identifier", TestCategory::Protocol, Duration::from_millis(5)),
                TestResult::fail("invalid_argument_on_malformed_request", TestCategory::Error, Duration::from_millis(3), "got success"),
            ],
            0,
        )
    }

    #[test]
    fn not_certified_when_anything_failed() {
        let report = sample_report();
        assert!(!report.certified());
        assert_eq!(report.issues().len(), 1);
    }

    #[test]
    fn json_report_round_trips_through_serde_json() {
        let report = sample_report();
        let json = render_json(&report).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["certified"], false);
        assert_eq!(parsed["failed"], 1);
    }

    #[test]
    fn junit_xml_escapes_failure_messages() {
        let report = Report::new(
            "aws",
            vec![TestResult::fail("x", TestCategory::Error, Duration::ZERO, "a < b & c > d")],
            0,
        );
        let xml = render_junit_xml(&report);
        assert!(xml.contains("a &lt; b &amp; c &gt; d"));
    }
}
