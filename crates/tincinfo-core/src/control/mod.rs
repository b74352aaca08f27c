//! tinc control socket client.
//!
//! tincd exposes a line-based control protocol on a Unix socket next to its
//! pid file. A client proves it may talk to the daemon by sending the cookie
//! from the pid file, then issues numbered dump requests.
//!
//! ## Protocol
//!
//! ```text
//! client                                  tincd
//!   │  connect                              │
//!   │◀──────────── greeting ────────────────│
//!   │── "0 ^<cookie> 0\n" ─────────────────▶│
//!   │◀──────────── ID / ACK lines ──────────│
//!   │── "18 3\n" (dump nodes) ─────────────▶│
//!   │◀──────────── one line per node ───────│
//! ```
//!
//! Responses carry no length or terminator the client relies on: a response
//! ends when a socket read times out.

mod channel;
mod cookie;
mod request;

use std::io;
use std::path::PathBuf;

pub use channel::{ChannelOptions, ControlChannel, Sleeper, ThreadSleeper, backoff_delay};
pub use cookie::{Cookie, PidFile};
pub use request::{COOKIE_LEN, DumpRequest};

/// Errors from the control channel.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    /// The request is neither a whitelisted dump request nor a well-formed
    /// handshake. The text itself is not kept since it may hold the cookie.
    #[error("request is neither a known dump request nor a handshake ({len} bytes)")]
    InvalidRequest { len: usize },

    #[error("not connected to the control socket")]
    NoConnection,

    #[error("failed to connect to control socket at {path}: {source}")]
    Connect {
        path: PathBuf,
        source: io::Error,
    },

    #[error("control socket I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to read pid file {path}: {source}")]
    PidFile {
        path: PathBuf,
        source: io::Error,
    },

    #[error("pid file {0} carries no control cookie")]
    MissingCookie(PathBuf),

    #[error("reconnect needs at least one attempt")]
    NoReconnectAttempts,

    /// The channel options cannot work, whatever the daemon does.
    #[error("invalid channel options: {0}")]
    InvalidOptions(&'static str),
}

impl ControlError {
    /// Whether this error comes from the transport and may clear up after a
    /// reconnect.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ControlError::NoConnection | ControlError::Connect { .. } | ControlError::Io(_)
        )
    }
}
