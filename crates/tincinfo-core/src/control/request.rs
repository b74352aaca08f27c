//! The request whitelist.
//!
//! Only two shapes of request ever reach the socket: one of the four dump
//! requests, named symbolically, or the cookie handshake.

use std::fmt;

use zeroize::Zeroizing;

use super::ControlError;
use super::cookie::Cookie;

/// Length of the cookie tincd generates and the handshake expects.
pub const COOKIE_LEN: usize = 64;

const HANDSHAKE_PREFIX: &str = "0 ^";
const HANDSHAKE_SUFFIX: &str = " 0\n";

/// A diagnostic dump request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DumpRequest {
    Nodes,
    Edges,
    Subnets,
    Connections,
}

impl DumpRequest {
    pub const ALL: [DumpRequest; 4] = [
        DumpRequest::Nodes,
        DumpRequest::Edges,
        DumpRequest::Subnets,
        DumpRequest::Connections,
    ];

    /// Symbolic name accepted by [`ControlChannel::communicate`](super::ControlChannel::communicate).
    pub fn name(self) -> &'static str {
        match self {
            DumpRequest::Nodes => "REQ_DUMP_NODES",
            DumpRequest::Edges => "REQ_DUMP_EDGES",
            DumpRequest::Subnets => "REQ_DUMP_SUBNETS",
            DumpRequest::Connections => "REQ_DUMP_CONNECTIONS",
        }
    }

    /// Bytes sent on the wire: `CONTROL` (18) followed by the dump type.
    pub fn wire(self) -> &'static str {
        match self {
            DumpRequest::Nodes => "18 3\n",
            DumpRequest::Edges => "18 4\n",
            DumpRequest::Subnets => "18 5\n",
            DumpRequest::Connections => "18 6\n",
        }
    }

    /// Look up a request by its symbolic name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.name() == name)
    }
}

impl fmt::Display for DumpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A request that passed the whitelist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Request<'a> {
    Dump(DumpRequest),
    Handshake(&'a str),
}

impl<'a> Request<'a> {
    /// Check `request` against the whitelist.
    pub(crate) fn parse(request: &'a str) -> Result<Self, ControlError> {
        if let Some(dump) = DumpRequest::from_name(request) {
            return Ok(Request::Dump(dump));
        }
        if is_handshake(request) {
            return Ok(Request::Handshake(request));
        }
        Err(ControlError::InvalidRequest { len: request.len() })
    }

    pub(crate) fn wire(&self) -> &'a str {
        match self {
            Request::Dump(dump) => dump.wire(),
            Request::Handshake(payload) => *payload,
        }
    }
}

impl fmt::Display for Request<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::Dump(dump) => f.write_str(dump.name()),
            Request::Handshake(_) => f.write_str("handshake"),
        }
    }
}

/// Build the handshake `"0 ^<cookie> 0\n"`: an `ID` request carrying the
/// cookie and control protocol version 0.
pub(crate) fn handshake(cookie: &Cookie) -> Zeroizing<String> {
    Zeroizing::new(format!(
        "{HANDSHAKE_PREFIX}{}{HANDSHAKE_SUFFIX}",
        cookie.expose()
    ))
}

/// `^0 \^.{64} 0\n$`: any 64 characters other than a newline between the
/// prefix and the suffix.
fn is_handshake(request: &str) -> bool {
    request
        .strip_prefix(HANDSHAKE_PREFIX)
        .and_then(|rest| rest.strip_suffix(HANDSHAKE_SUFFIX))
        .is_some_and(|cookie| !cookie.contains('\n') && cookie.chars().count() == COOKIE_LEN)
}
