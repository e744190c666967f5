//! Per-command plugin session management: launch the plugins a command
//! will actually use, hand back owned sessions for the fan-out, and tear
//! them all down when the command finishes (§5 "Shared resources": plugin
//! client handles are owned by the Engine for the duration of a command).

use std::collections::BTreeMap;
use std::sync::Arc;

use pulumicost_domain::Plugin;
use pulumicost_pluginhost::{PluginHost, PluginSession};
use tracing::warn;

/// Launch every plugin in `plugins` matching `predicate`, skipping (with a
/// warning) any that fail to launch — a plugin that never comes up simply
/// doesn't respond, same as one that answers `Unavailable` (§4.6 step 3
/// falls back to the spec store either way).
pub async fn launch_matching(
    host: &PluginHost,
    plugins: &[Plugin],
    trace_id: &str,
    predicate: impl Fn(&Plugin) -> bool,
) -> BTreeMap<String, Arc<PluginSession>> {
    let mut sessions = BTreeMap::new();
    for plugin in plugins.iter().filter(|p| predicate(p)) {
        match host.launch(plugin, trace_id).await {
            Ok(session) => {
                sessions.insert(plugin.name.clone(), Arc::new(session));
            }
            Err(e) => {
                warn!(plugin = %plugin.name, error = %e, "plugin failed to launch; falling back");
            }
        }
    }
    sessions
}

/// Shut down every launched session, in no particular order — each
/// session's own shutdown is idempotent and serialized internally.
pub async fn shutdown_all(sessions: BTreeMap<String, Arc<PluginSession>>, grace: std::time::Duration) {
    for (name, session) in sessions {
        match Arc::try_unwrap(session) {
            Ok(session) => session.shutdown(grace).await,
            Err(_) => warn!(plugin = %name, "session still referenced at shutdown; relying on Drop"),
        }
    }
}
