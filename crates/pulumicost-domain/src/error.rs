use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid resource type: {0}")]
    InvalidResourceType(String),

    #[error("invalid urn: {0}")]
    InvalidUrn(String),

    #[error("mixed currencies in aggregation: {0:?}")]
    MixedCurrencies(Vec<String>),

    #[error("invalid group-by: {0}")]
    InvalidGroupBy(String),

    #[error("invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("negative cost value for {field}: {value}")]
    NegativeCost { field: String, value: f64 },
}
