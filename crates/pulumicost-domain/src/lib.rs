pub mod aggregation;
pub mod analyzer;
pub mod conformance;
pub mod cost;
pub mod error;
pub mod pricing;
pub mod plugin;
pub mod resource;
pub mod value;

pub use aggregation::{Aggregation, GroupBy, RollupGroupBy};
pub use analyzer::{AnalyzerContext, Diagnostic, DiagnosticSeverity};
pub use conformance::{ConformanceTestCase, TestCategory, TestResult, TestStatus};
pub use cost::{adapter_labels, Confidence, CostPeriod, CostResult};
pub use error::DomainError;
pub use pricing::{PricingDetail, PricingSpec};
pub use plugin::{Plugin, PluginManifest, PluginState, PluginSupports};
pub use resource::{provider_of, reserved_keys, type_from_urn, ResourceDescriptor};
pub use value::Value;
