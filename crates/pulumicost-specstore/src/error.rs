use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpecStoreError {
    #[error("io error reading spec directory {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
