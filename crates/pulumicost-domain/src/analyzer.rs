use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Established once per IaC run via `ConfigureStack`; cleared between runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzerContext {
    pub stack: String,
    pub project: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DiagnosticSeverity {
    /// The only severity the analyzer may ever emit — diagnostics are
    /// strictly advisory and never block deployment (§4.7).
    Advisory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub message: String,
}

impl Diagnostic {
    pub fn advisory(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: DiagnosticSeverity::Advisory,
            message: message.into(),
        }
    }
}
