use thiserror::Error;

/// A pre-flight validation failure (§4.5). Always surfaced as a
/// placeholder `CostResult` with a `VALIDATION:`-prefixed note — never
/// propagated as a batch-fatal error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(msg: impl Into<String>) -> Self {
        ValidationError(msg.into())
    }
}
