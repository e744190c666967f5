//! Plugin conformance harness (spec §4.8, C8 Conformance): a fixed battery
//! of protocol/error/context/performance cases run sequentially against one
//! launched plugin, producing a certification verdict and a report in
//! table, JSON, or JUnit XML form.

mod cases;
mod report;
mod runner;

pub use cases::standard_test_suite;
pub use report::{render_json, render_junit_xml, render_table, Report};
pub use runner::ConformanceRunner;
