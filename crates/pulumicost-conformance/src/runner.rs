//! Conformance runner (§4.8, C8): launches one plugin, drives the case
//! battery sequentially against a shared client, and relaunches on
//! transport loss via the same `PluginHost::launch` factory the engine
//! uses — a torn-down `PluginSession` is never reused (§4.4, §9 "Plugin
//! restart policy in conformance").

use std::time::Duration;

use pulumicost_domain::{ConformanceTestCase, Plugin, TestResult};
use pulumicost_pluginhost::PluginHost;
use regex::Regex;
use tracing::warn;

use crate::cases::{execute_case, SUPPORTED_METHODS};
use crate::report::Report;

pub struct ConformanceRunner {
    host: PluginHost,
    plugin: Plugin,
    trace_id: String,
    /// `(major, minor)` protocol version this harness expects, checked by
    /// the `protocol_version_compatible` case (§4.8 "major must match
    /// exactly, plugin minor must be at least the expected minor").
    expected_protocol: (u32, u32),
}

impl ConformanceRunner {
    pub fn new(host: PluginHost, plugin: Plugin, trace_id: impl Into<String>, expected_protocol: (u32, u32)) -> Self {
        ConformanceRunner { host, plugin, trace_id: trace_id.into(), expected_protocol }
    }

    pub async fn run(&self, cases: &[ConformanceTestCase], selector: Option<&Regex>) -> Report {
        // Selection/support skips are decided before anything is launched,
        // so a plugin that never launches still reports the cases a
        // selector excluded as `skip` rather than `error` (they were never
        // going to run regardless of whether the plugin came up).
        let mut results: Vec<Option<TestResult>> = vec![None; cases.len()];
        for (idx, case) in cases.iter().enumerate() {
            if let Some(pattern) = selector {
                if !case.matches_filter(pattern) {
                    results[idx] =
                        Some(TestResult::skip(case.name.clone(), case.category, "excluded by selection filter"));
                    continue;
                }
            }
            if case.required_methods.iter().any(|m| !SUPPORTED_METHODS.contains(&m.as_str())) {
                results[idx] = Some(TestResult::skip(
                    case.name.clone(),
                    case.category,
                    "case names an RPC method this harness does not exercise",
                ));
            }
        }

        let mut restarted = 0usize;
        let mut session = None;

        if results.iter().any(Option::is_none) {
            session = match self.host.launch(&self.plugin, &self.trace_id).await {
                Ok(session) => Some(session),
                Err(e) => {
                    warn!(plugin = %self.plugin.name, error = %e, "plugin failed to launch; every remaining case errors");
                    for (idx, case) in cases.iter().enumerate() {
                        if results[idx].is_none() {
                            results[idx] = Some(TestResult::error(
                                case.name.clone(),
                                case.category,
                                Duration::ZERO,
                                format!("plugin failed to launch: {e}"),
                            ));
                        }
                    }
                    None
                }
            };
        }

        for (idx, case) in cases.iter().enumerate() {
            if results[idx].is_some() {
                continue;
            }

            let Some(active) = session.as_ref() else {
                results[idx] =
                    Some(TestResult::error(case.name.clone(), case.category, Duration::ZERO, "no active plugin session"));
                continue;
            };

            let client = active.client();
            let case_owned = case.clone();
            let timeout = case.timeout;
            let expected_protocol = self.expected_protocol;

            // Run in its own task so a panicking assertion never takes the
            // whole conformance run down with it (§4.8 "panic isolation").
            let handle = tokio::spawn(async move { execute_case(case_owned, client, expected_protocol).await });

            let (result, transport_loss) = match tokio::time::timeout(timeout, handle).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(join_err)) => (
                    TestResult::error(case.name.clone(), case.category, timeout, panic_reason(join_err)),
                    false,
                ),
                Err(_) => (
                    TestResult::fail(case.name.clone(), case.category, timeout, format!("timed out after {timeout:?}")),
                    false,
                ),
            };

            results[idx] = Some(result);

            if transport_loss {
                warn!(plugin = %self.plugin.name, case = %case.name, "plugin transport lost; relaunching");
                match self.host.launch(&self.plugin, &self.trace_id).await {
                    Ok(new_session) => {
                        session = Some(new_session);
                        restarted += 1;
                    }
                    Err(e) => {
                        for remaining_idx in (idx + 1)..cases.len() {
                            if results[remaining_idx].is_none() {
                                let remaining = &cases[remaining_idx];
                                results[remaining_idx] = Some(TestResult::error(
                                    remaining.name.clone(),
                                    remaining.category,
                                    Duration::ZERO,
                                    format!("unrecoverable plugin relaunch failure: {e}"),
                                ));
                            }
                        }
                        session = None;
                        break;
                    }
                }
            }
        }

        if let Some(active) = session {
            active.shutdown(Duration::from_secs(5)).await;
        }

        let results: Vec<TestResult> =
            results.into_iter().map(|r| r.expect("every case assigned a result")).collect();
        Report::new(self.plugin.name.clone(), results, restarted)
    }
}

fn panic_reason(err: tokio::task::JoinError) -> String {
    if err.is_panic() {
        let payload = err.into_panic();
        if let Some(s) = payload.downcast_ref::<&str>() {
            format!("panic: {s}")
        } else if let Some(s) = payload.downcast_ref::<String>() {
            format!("panic: {s}")
        } else {
            "panic: non-string payload".to_string()
        }
    } else {
        format!("task cancelled: {err}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulumicost_pluginhost::PluginHostConfig;
    use std::path::PathBuf;

    fn missing_plugin() -> Plugin {
        Plugin::discovered("nonexistent", "0.0.0", PathBuf::from("/no/such/binary"))
    }

    #[tokio::test]
    async fn every_case_errors_when_the_plugin_cannot_launch() {
        let runner = ConformanceRunner::new(
            PluginHost::new(PluginHostConfig::default()),
            missing_plugin(),
            "trace-1",
            (1, 0),
        );
        let cases = crate::cases::standard_test_suite();
        let report = runner.run(&cases, None).await;
        assert_eq!(report.errors(), cases.len());
        assert!(!report.certified());
    }

    #[tokio::test]
    async fn selection_filter_skips_non_matching_cases() {
        let runner = ConformanceRunner::new(
            PluginHost::new(PluginHostConfig::default()),
            missing_plugin(),
            "trace-1",
            (1, 0),
        );
        let cases = crate::cases::standard_test_suite();
        let pattern = Regex::new("^name_").unwrap();
        let report = runner.run(&cases, Some(&pattern)).await;
        assert_eq!(report.skipped(), cases.len() - 1);
    }
}
