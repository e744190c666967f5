//! Normalizes the two heterogeneous JSON shapes Ingest accepts — a plan and
//! a state export — into a provider-agnostic sequence of `ResourceDescriptor`
//! (spec §4.1). Parsing follows the same raw-then-convert two-step the
//! teacher uses for YAML config (`RawEnclave` → `Enclave`): read into an
//! untyped `serde_json::Value` shape first, then map field by field.

pub mod error;
pub mod plan;
pub mod state;

pub use error::IngestError;
pub use plan::ingest_plan;
pub use state::ingest_state;

use std::path::Path;

use pulumicost_domain::ResourceDescriptor;

/// Read a plan file from disk and extract its resources.
///
/// File-level parse errors are fatal; per-step mapping failures are logged
/// and skipped (§4.1).
pub fn ingest_plan_file(path: &Path) -> Result<Vec<ResourceDescriptor>, IngestError> {
    let text = std::fs::read_to_string(path).map_err(|e| IngestError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let value: serde_json::Value =
        serde_json::from_str(&text).map_err(|e| IngestError::JsonParse {
            path: path.display().to_string(),
            source: e,
        })?;
    ingest_plan(&value)
}

/// Read a state export file from disk and extract its resources.
pub fn ingest_state_file(path: &Path) -> Result<Vec<ResourceDescriptor>, IngestError> {
    let text = std::fs::read_to_string(path).map_err(|e| IngestError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let value: serde_json::Value =
        serde_json::from_str(&text).map_err(|e| IngestError::JsonParse {
            path: path.display().to_string(),
            source: e,
        })?;
    ingest_state(&value)
}
