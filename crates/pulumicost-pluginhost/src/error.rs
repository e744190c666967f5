use thiserror::Error;

#[derive(Debug, Error)]
pub enum PluginHostError {
    #[error("io error discovering plugins under {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn plugin subprocess {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("handshake timed out waiting for {binary} to report its port")]
    HandshakeTimeout { binary: String },

    #[error("io error during handshake: {0}")]
    HandshakeIo(#[from] std::io::Error),

    #[error("handshake framing error: {0}")]
    Handshake(#[from] pulumicost_proto::HandshakeError),

    #[error("failed to dial plugin at {addr}: {source}")]
    Dial {
        addr: String,
        #[source]
        source: tonic::transport::Error,
    },

    #[error("rpc call to plugin {plugin} failed: {status}")]
    Rpc { plugin: String, status: tonic::Status },

    #[error("plugin {plugin} process was lost (transport closed)")]
    ProcessCrashed { plugin: String },

    #[error("plugin manifest parse error in {path}: {source}")]
    ManifestParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl PluginHostError {
    /// Whether this error represents the process-lost condition that flags
    /// a plugin for restart in conformance mode (§4.4): transport
    /// `Unavailable`/`Internal` with transport-closing semantics.
    pub fn is_transport_loss(&self) -> bool {
        match self {
            PluginHostError::ProcessCrashed { .. } => true,
            PluginHostError::Rpc { status, .. } => matches!(
                status.code(),
                tonic::Code::Unavailable | tonic::Code::Internal | tonic::Code::Aborted
            ),
            _ => false,
        }
    }
}
