//! Maps every error this binary can produce onto the exit-code table in
//! "Configuration" (§6): 0 success, 1 validation/date-range/group-by error,
//! 2 plan/state parse error, 3 no plugins and no specs available, 4 mixed
//! currency aggregation, other non-zero for anything internal.

use pulumicost_engine::EngineError;
use pulumicost_ingest::IngestError;
use pulumicost_pluginhost::PluginHostError;
use pulumicost_specstore::SpecStoreError;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    PluginHost(#[from] PluginHostError),

    #[error(transparent)]
    SpecStore(#[from] SpecStoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no plugins and no pricing specs are available")]
    NoDataSources,

    #[error("{0}")]
    Render(#[from] serde_json::Error),

    #[error("{0}")]
    Internal(String),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Engine(EngineError::InvalidDateRange(_)) => 1,
            CliError::Engine(EngineError::InvalidGroupBy(_)) => 1,
            CliError::Engine(EngineError::MixedCurrencies(_)) => 4,
            CliError::Engine(EngineError::NoDataSources) => 3,
            CliError::NoDataSources => 3,
            CliError::Ingest(IngestError::JsonParse { .. }) => 2,
            CliError::Ingest(IngestError::UnrecognizedShape { .. }) => 2,
            CliError::Ingest(IngestError::Io { .. }) => 2,
            _ => 10,
        }
    }
}
