//! The built-in conformance battery (§4.8): a fixed table of named cases
//! covering the four categories the harness certifies against. Each case's
//! behavior is wired up in `execute_case` by name, mirroring how the
//! domain's `ConformanceTestCase` only carries metadata, never code.

use std::time::{Duration, Instant};

use pulumicost_domain::{ConformanceTestCase, TestCategory, TestResult};
use pulumicost_proto::costsource::cost_source_service_client::CostSourceServiceClient;
use pulumicost_proto::costsource::{NameRequest, ProjectedCostRequest, Resource};
use tonic::transport::Channel;

/// RPC methods this harness knows how to exercise; a case naming anything
/// else is skipped rather than silently treated as a pass (§4.8 "unknown
/// required methods are not asserted, they are reported as skipped").
pub const SUPPORTED_METHODS: &[&str] =
    &["Name", "GetProjectedCost", "GetActualCost", "GetRecommendations"];

pub fn standard_test_suite() -> Vec<ConformanceTestCase> {
    vec![
        ConformanceTestCase::new("name_returns_plugin_identifier", TestCategory::Protocol)
            .with_required_methods(&["Name"]),
        ConformanceTestCase::new("protocol_version_compatible", TestCategory::Protocol)
            .with_required_methods(&["Name"]),
        ConformanceTestCase::new("get_projected_cost_smoke", TestCategory::Protocol)
            .with_required_methods(&["GetProjectedCost"]),
        ConformanceTestCase::new("invalid_argument_on_malformed_request", TestCategory::Error)
            .with_required_methods(&["GetProjectedCost"]),
        ConformanceTestCase::new(
            "cancellation_returns_canceled_or_deadline_exceeded",
            TestCategory::Context,
        )
        .with_required_methods(&["GetProjectedCost"])
        .with_timeout(Duration::from_secs(2)),
        ConformanceTestCase::new(
            "concurrent_requests_complete_within_timeout",
            TestCategory::Performance,
        )
        .with_required_methods(&["Name"])
        .with_timeout(Duration::from_secs(5)),
    ]
}

fn sample_resource() -> Resource {
    Resource {
        provider: "aws".to_string(),
        resource_type: "aws:ec2/instance:Instance".to_string(),
        sku: "t3.micro".to_string(),
        region: "us-east-1".to_string(),
        properties: Default::default(),
    }
}

fn parse_major_minor(version: &str) -> Option<(u32, u32)> {
    let mut parts = version.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    Some((major, minor))
}

/// Classify an RPC failure: transport-level codes (`Unavailable`,
/// `Internal`, `Aborted`) mean the plugin process is gone or wedged and the
/// case errors with a restart signal; anything else is an ordinary
/// assertion failure.
fn classify_rpc_failure(
    case: &ConformanceTestCase,
    start: Instant,
    status: tonic::Status,
) -> (TestResult, bool) {
    let transport_loss = matches!(
        status.code(),
        tonic::Code::Unavailable | tonic::Code::Internal | tonic::Code::Aborted
    );
    let result = if transport_loss {
        TestResult::error(case.name.clone(), case.category, start.elapsed(), format!("transport lost: {status}"))
    } else {
        TestResult::fail(case.name.clone(), case.category, start.elapsed(), format!("rpc failed: {status}"))
    };
    (result, transport_loss)
}

/// Run one case's behavior against an already-dialed client. Returns the
/// `TestResult` plus whether the failure (if any) indicates transport loss,
/// so the caller can decide whether to relaunch the plugin.
pub async fn execute_case(
    case: ConformanceTestCase,
    mut client: CostSourceServiceClient<Channel>,
    expected_protocol: (u32, u32),
) -> (TestResult, bool) {
    let start = Instant::now();

    match case.name.as_str() {
        "name_returns_plugin_identifier" => match client.name(NameRequest {}).await {
            Ok(resp) => {
                let resp = resp.into_inner();
                if resp.name.trim().is_empty() {
                    (
                        TestResult::fail(case.name, case.category, start.elapsed(), "Name() returned an empty plugin name"),
                        false,
                    )
                } else {
                    (TestResult::pass(case.name, case.category, start.elapsed()), false)
                }
            }
            Err(status) => classify_rpc_failure(&case, start, status),
        },

        "protocol_version_compatible" => match client.name(NameRequest {}).await {
            Ok(resp) => {
                let version = resp.into_inner().version;
                match parse_major_minor(&version) {
                    Some((major, minor)) if major == expected_protocol.0 && minor >= expected_protocol.1 => {
                        (TestResult::pass(case.name, case.category, start.elapsed()), false)
                    }
                    Some((major, minor)) => (
                        TestResult::fail(
                            case.name,
                            case.category,
                            start.elapsed(),
                            format!(
                                "plugin protocol {major}.{minor} incompatible with expected {}.{}",
                                expected_protocol.0, expected_protocol.1
                            ),
                        ),
                        false,
                    ),
                    None => (
                        TestResult::fail(case.name, case.category, start.elapsed(), format!("unparseable protocol version: {version:?}")),
                        false,
                    ),
                }
            }
            Err(status) => classify_rpc_failure(&case, start, status),
        },

        "get_projected_cost_smoke" => {
            let req = ProjectedCostRequest { resource: Some(sample_resource()) };
            match client.get_projected_cost(req).await {
                Ok(resp) => {
                    let resp = resp.into_inner();
                    if resp.currency.trim().is_empty() {
                        (
                            TestResult::fail(case.name, case.category, start.elapsed(), "GetProjectedCost response carried an empty currency"),
                            false,
                        )
                    } else {
                        (TestResult::pass(case.name, case.category, start.elapsed()), false)
                    }
                }
                Err(status) => classify_rpc_failure(&case, start, status),
            }
        }

        "invalid_argument_on_malformed_request" => {
            let req = ProjectedCostRequest { resource: None };
            match client.get_projected_cost(req).await {
                Ok(_) => (
                    TestResult::fail(case.name, case.category, start.elapsed(), "expected InvalidArgument for a request with no resource, got success"),
                    false,
                ),
                Err(status) if status.code() == tonic::Code::InvalidArgument => {
                    (TestResult::pass(case.name, case.category, start.elapsed()), false)
                }
                Err(status) => classify_rpc_failure(&case, start, status),
            }
        }

        "cancellation_returns_canceled_or_deadline_exceeded" => {
            let mut req = tonic::Request::new(ProjectedCostRequest { resource: Some(sample_resource()) });
            req.set_timeout(Duration::from_millis(1));
            match client.get_projected_cost(req).await {
                Ok(_) => (
                    TestResult::fail(case.name, case.category, start.elapsed(), "expected Cancelled/DeadlineExceeded under a 1ms deadline, got success"),
                    false,
                ),
                Err(status)
                    if matches!(status.code(), tonic::Code::Cancelled | tonic::Code::DeadlineExceeded) =>
                {
                    (TestResult::pass(case.name, case.category, start.elapsed()), false)
                }
                Err(status) => classify_rpc_failure(&case, start, status),
            }
        }

        "concurrent_requests_complete_within_timeout" => {
            let mut set = tokio::task::JoinSet::new();
            for _ in 0..8 {
                let mut c = client.clone();
                set.spawn(async move { c.name(NameRequest {}).await });
            }
            let mut all_ok = true;
            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok(Ok(_)) => {}
                    Ok(Err(status)) => {
                        all_ok = false;
                        if matches!(status.code(), tonic::Code::Unavailable | tonic::Code::Internal | tonic::Code::Aborted) {
                            return (
                                TestResult::error(case.name, case.category, start.elapsed(), format!("transport lost under concurrency: {status}")),
                                true,
                            );
                        }
                    }
                    Err(join_err) => {
                        all_ok = false;
                        return (
                            TestResult::error(case.name, case.category, start.elapsed(), format!("concurrent call task failed: {join_err}")),
                            false,
                        );
                    }
                }
            }
            if all_ok {
                (TestResult::pass(case.name, case.category, start.elapsed()), false)
            } else {
                (TestResult::fail(case.name, case.category, start.elapsed(), "one or more concurrent Name() calls failed"), false)
            }
        }

        other => (
            TestResult::skip(case.name.clone(), case.category, format!("no built-in behavior registered for case {other:?}")),
            false,
        ),
    }
}
