use thiserror::Error;

/// Batch-fatal errors (§4.6, §7 "Input errors"): the whole command aborts
/// before any per-resource placeholder could be produced.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("invalid group-by: {0}")]
    InvalidGroupBy(String),

    #[error("mixed currencies in aggregation: {0:?}")]
    MixedCurrencies(Vec<String>),

    #[error("no plugins and no pricing specs are available")]
    NoDataSources,
}
