#![deny(unsafe_code)]

//! tincinfo core: talk to a running tinc daemon over its control socket.
//!
//! The [`control`] module owns the socket protocol (cookie handshake, request
//! whitelist, timeout-framed reads, reconnect with backoff). The [`topology`]
//! module turns the daemon's dump output into typed nodes, edges, and
//! connections. [`Session`] ties the two together for one query session.

/// Control socket client: connection lifecycle, authentication, requests.
pub mod control;
/// Session facade bundling a channel with decoded topology.
pub mod session;
/// Dump response decoding into typed topology records.
pub mod topology;

pub use control::{ChannelOptions, ControlChannel, ControlError, DumpRequest};
pub use session::Session;
pub use topology::{Connection, DecodeError, Edge, Node, PeerInfo, Registry, UNKNOWN};

/// Errors surfaced by a [`Session`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Control(#[from] ControlError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}
