//! Generated gRPC message/service definitions for the two fixed RPC
//! contracts in spec §6, plus the bit-exact subprocess handshake framing
//! (§6 "Subprocess handshake") shared by the Plugin Host (dialing out) and
//! the Analyzer Server (announcing in) — one implementation, not two.

pub mod costsource {
    tonic::include_proto!("pulumicost.costsource");
}

pub mod analyzer {
    tonic::include_proto!("pulumicost.analyzer");
}

pub mod handshake;

pub use handshake::{read_port_line, write_port_line, HandshakeError};
