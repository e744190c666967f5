use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginSupports {
    #[serde(default)]
    pub projected: bool,
    #[serde(default)]
    pub actual: bool,
    #[serde(default)]
    pub recommendations: bool,
}

/// Lifecycle state of a plugin instance.
///
/// Transitions monotonically until `Terminated` or `Failed`; a failed
/// plugin may be relaunched only from a fresh `Discovered` instance (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginState {
    Discovered,
    Launched,
    Ready,
    Failed,
    Terminated,
}

impl std::fmt::Display for PluginState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PluginState::Discovered => "discovered",
            PluginState::Launched => "launched",
            PluginState::Ready => "ready",
            PluginState::Failed => "failed",
            PluginState::Terminated => "terminated",
        };
        write!(f, "{}", s)
    }
}

/// Manifest declared alongside a plugin binary (`plugin.manifest.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub supports: Vec<String>,
    pub description: Option<String>,
}

/// A discovered (or running) cost-source plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plugin {
    pub name: String,
    pub version: String,
    pub path: PathBuf,
    pub manifest: Option<PluginManifest>,
    pub supports: PluginSupports,
    pub state: PluginState,
}

impl Plugin {
    pub fn discovered(name: impl Into<String>, version: impl Into<String>, path: PathBuf) -> Self {
        Plugin {
            name: name.into(),
            version: version.into(),
            path,
            manifest: None,
            supports: PluginSupports::default(),
            state: PluginState::Discovered,
        }
    }

    pub fn supports_projected(&self) -> bool {
        self.supports.projected
    }

    pub fn supports_actual(&self) -> bool {
        self.supports.actual
    }

    pub fn supports_recommendations(&self) -> bool {
        self.supports.recommendations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovered_plugin_starts_in_discovered_state() {
        let p = Plugin::discovered("aws", "1.0.0", PathBuf::from("/plugins/aws/1.0.0/bin"));
        assert_eq!(p.state, PluginState::Discovered);
        assert!(!p.supports_projected());
    }
}
