//! Plugin discovery (spec §4.3, C3 Plugin Registry), analogous to the
//! teacher's `nclav_driver::DriverRegistry` but keyed by plugin name and
//! backed by filesystem discovery rather than static registration.

use std::path::{Path, PathBuf};

use pulumicost_domain::{Plugin, PluginManifest, PluginSupports};
use tracing::{debug, warn};

use crate::error::PluginHostError;

/// Scan `<root>/<name>/<version>/<binary>` for plugin binaries whose
/// basename is prefix-matched by `pulumicost-<name>`. A missing root is
/// not an error — returns an empty list (§4.3).
pub fn discover(root: &Path) -> Result<Vec<Plugin>, PluginHostError> {
    if !root.exists() {
        debug!(root = %root.display(), "plugin root does not exist; no plugins discovered");
        return Ok(Vec::new());
    }

    let mut plugins = Vec::new();

    let name_dirs = std::fs::read_dir(root).map_err(|e| PluginHostError::Io {
        path: root.display().to_string(),
        source: e,
    })?;

    for name_entry in name_dirs {
        let name_entry = name_entry.map_err(|e| PluginHostError::Io {
            path: root.display().to_string(),
            source: e,
        })?;
        let name_path = name_entry.path();
        if !name_path.is_dir() {
            continue;
        }
        let name = name_entry.file_name().to_string_lossy().to_string();

        let version_dirs = match std::fs::read_dir(&name_path) {
            Ok(d) => d,
            Err(e) => {
                warn!(path = %name_path.display(), error = %e, "skipping unreadable plugin name directory");
                continue;
            }
        };

        for version_entry in version_dirs.flatten() {
            let version_path = version_entry.path();
            if !version_path.is_dir() {
                continue;
            }
            let version = version_entry.file_name().to_string_lossy().to_string();

            if let Some(plugin) = discover_one(&name, &version, &version_path) {
                plugins.push(plugin);
            }
        }
    }

    Ok(plugins)
}

fn discover_one(name: &str, version: &str, dir: &Path) -> Option<Plugin> {
    let expected_prefix = format!("pulumicost-{}", name);
    let binary = find_binary(dir, &expected_prefix)?;

    let manifest = read_manifest(dir);
    let supports = manifest
        .as_ref()
        .map(|m| supports_from_manifest(m))
        .unwrap_or_default();

    let mut plugin = Plugin::discovered(name, version, binary);
    plugin.manifest = manifest;
    plugin.supports = supports;
    Some(plugin)
}

fn find_binary(dir: &Path, expected_prefix: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        if !name_str.starts_with(expected_prefix) {
            continue;
        }
        if !is_executable(&path) {
            warn!(path = %path.display(), "skipping non-executable plugin candidate");
            continue;
        }
        return Some(path);
    }
    None
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    true
}

fn read_manifest(dir: &Path) -> Option<PluginManifest> {
    let path = dir.join("plugin.manifest.json");
    if !path.exists() {
        return None;
    }
    let content = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&content) {
        Ok(manifest) => Some(manifest),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "skipping malformed plugin manifest");
            None
        }
    }
}

fn supports_from_manifest(manifest: &PluginManifest) -> PluginSupports {
    PluginSupports {
        projected: manifest.supports.iter().any(|s| s == "projected"),
        actual: manifest.supports.iter().any(|s| s == "actual"),
        recommendations: manifest.supports.iter().any(|s| s == "recommendations"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    fn make_executable(path: &Path) {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(path, perms).unwrap();
    }

    #[test]
    fn missing_root_yields_empty_list() {
        let plugins = discover(Path::new("/no/such/plugin/root")).unwrap();
        assert!(plugins.is_empty());
    }

    #[test]
    #[cfg(unix)]
    fn discovers_plugin_with_manifest() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("aws").join("1.2.0");
        std::fs::create_dir_all(&dir).unwrap();
        let bin = dir.join("pulumicost-aws");
        std::fs::write(&bin, "#!/bin/sh\necho hi\n").unwrap();
        make_executable(&bin);
        std::fs::write(
            dir.join("plugin.manifest.json"),
            r#"{"name":"aws","version":"1.2.0","supports":["projected","actual"],"description":"AWS cost source"}"#,
        )
        .unwrap();

        let plugins = discover(root.path()).unwrap();
        assert_eq!(plugins.len(), 1);
        assert_eq!(plugins[0].name, "aws");
        assert_eq!(plugins[0].version, "1.2.0");
        assert!(plugins[0].supports.projected);
        assert!(plugins[0].supports.actual);
        assert!(!plugins[0].supports.recommendations);
    }

    #[test]
    #[cfg(unix)]
    fn skips_non_executable_candidate() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("aws").join("1.0.0");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("pulumicost-aws"), "not executable").unwrap();

        let plugins = discover(root.path()).unwrap();
        assert!(plugins.is_empty());
    }
}
