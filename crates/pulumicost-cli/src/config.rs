//! `<home>/config.yaml` loading (§6 "Configuration"), following the same
//! raw-then-convert + `serde_yaml` shape as `nclav_config::load_enclaves`:
//! an untyped `Raw*` tree deserialized first, then converted into the
//! typed `Config` with defaults filled in.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("yaml parse error in {path}: {source}")]
    YamlParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Clone, Deserialize, Default)]
struct RawConfig {
    analyzer: Option<RawAnalyzer>,
    logging: Option<RawLogging>,
    output: Option<RawOutput>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct RawAnalyzer {
    timeout: Option<RawAnalyzerTimeout>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct RawAnalyzerTimeout {
    #[serde(rename = "perResource")]
    per_resource: Option<u64>,
    total: Option<u64>,
    #[serde(rename = "warnThreshold")]
    warn_threshold: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct RawLogging {
    level: Option<String>,
    format: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct RawOutput {
    #[serde(rename = "defaultFormat")]
    default_format: Option<String>,
    precision: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct AnalyzerTimeoutConfig {
    pub per_resource: Duration,
    pub total: Duration,
    /// Fraction of `total` at which a "run is taking a while" warning fires.
    pub warn_threshold: f64,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub default_format: String,
    pub precision: usize,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub analyzer_timeout: AnalyzerTimeoutConfig,
    pub logging: LoggingConfig,
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            analyzer_timeout: AnalyzerTimeoutConfig {
                per_resource: Duration::from_secs(10),
                total: Duration::from_secs(300),
                warn_threshold: 0.8,
            },
            logging: LoggingConfig { level: "info".to_string(), format: "console".to_string() },
            output: OutputConfig { default_format: "table".to_string(), precision: 2 },
        }
    }
}

/// Load `path` if it exists; a missing file is not an error and yields
/// defaults (mirrors the Spec Store's "missing directory → empty" rule).
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io { path: path.display().to_string(), source: e })?;
    let raw: RawConfig = serde_yaml::from_str(&content)
        .map_err(|e| ConfigError::YamlParse { path: path.display().to_string(), source: e })?;
    Ok(convert(raw))
}

fn convert(raw: RawConfig) -> Config {
    let defaults = Config::default();
    let raw_timeout = raw.analyzer.and_then(|a| a.timeout).unwrap_or_default();
    let raw_logging = raw.logging.unwrap_or_default();
    let raw_output = raw.output.unwrap_or_default();

    Config {
        analyzer_timeout: AnalyzerTimeoutConfig {
            per_resource: raw_timeout.per_resource.map(Duration::from_secs).unwrap_or(defaults.analyzer_timeout.per_resource),
            total: raw_timeout.total.map(Duration::from_secs).unwrap_or(defaults.analyzer_timeout.total),
            warn_threshold: raw_timeout.warn_threshold.unwrap_or(defaults.analyzer_timeout.warn_threshold),
        },
        logging: LoggingConfig {
            level: raw_logging.level.unwrap_or(defaults.logging.level),
            format: raw_logging.format.unwrap_or(defaults.logging.format),
        },
        output: OutputConfig {
            default_format: raw_output.default_format.unwrap_or(defaults.output.default_format),
            precision: raw_output.precision.unwrap_or(defaults.output.precision),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = load(Path::new("/no/such/config.yaml")).unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.output.default_format, "table");
    }

    #[test]
    fn partial_config_keeps_unset_keys_at_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "logging:\n  level: debug\n").unwrap();
        let config = load(&path).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "console");
        assert_eq!(config.output.precision, 2);
    }

    #[test]
    fn recognizes_all_documented_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "analyzer:\n  timeout:\n    perResource: 5\n    total: 60\n    warnThreshold: 0.5\nlogging:\n  level: warn\n  format: json\noutput:\n  defaultFormat: json\n  precision: 4\n",
        )
        .unwrap();
        let config = load(&path).unwrap();
        assert_eq!(config.analyzer_timeout.per_resource, Duration::from_secs(5));
        assert_eq!(config.analyzer_timeout.total, Duration::from_secs(60));
        assert_eq!(config.output.precision, 4);
    }
}
