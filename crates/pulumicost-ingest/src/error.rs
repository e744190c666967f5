use thiserror::Error;

/// File-level parse errors are fatal (§4.1); per-resource mapping failures
/// are logged and skipped by the caller, never surfaced as this error.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed plan/state json in {path}: {source}")]
    JsonParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path} is neither a recognizable plan nor a state export")]
    UnrecognizedShape { path: String },
}
