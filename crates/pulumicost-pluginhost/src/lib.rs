//! Plugin discovery and subprocess lifecycle (spec C3 Plugin Registry, C4
//! Plugin Host). Grounded in `nclav_driver::{registry, terraform}` — see
//! SPEC_FULL.md §4.3/§4.4 for the mapping.

pub mod error;
pub mod host;
pub mod registry;
pub mod session;
pub mod stdio;

pub use error::PluginHostError;
pub use host::{PluginHost, PluginHostConfig, PluginTransport};
pub use registry::discover;
pub use session::{PluginSession, DEFAULT_RPC_DEADLINE};
