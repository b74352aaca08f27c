//! Decoding of tincd dump responses.
//!
//! Every dump response is a run of lines of the form
//! `18 <type> <field> <field> ...`. The two leading tokens are dropped and
//! the rest map positionally onto a per-request [`Layout`](layout::Layout).
//! Subnet and node dumps merge into a shared [`Registry`]; edge and
//! connection dumps return plain lists.

mod decoder;
pub mod layout;
mod records;
pub mod stats;

use std::fmt;

use serde::Serialize;

use crate::control::DumpRequest;

pub use decoder::{decode_connections, decode_edges, decode_nodes, decode_subnets};
pub use records::{Connection, Edge, Node, PeerInfo, Registry, UNKNOWN};

/// Which dump a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Subnets,
    Edges,
    Connections,
    Nodes,
}

impl RecordKind {
    /// The request that produces this kind of record.
    pub fn request(self) -> DumpRequest {
        match self {
            RecordKind::Subnets => DumpRequest::Subnets,
            RecordKind::Edges => DumpRequest::Edges,
            RecordKind::Connections => DumpRequest::Connections,
            RecordKind::Nodes => DumpRequest::Nodes,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecordKind::Subnets => "subnets",
            RecordKind::Edges => "edges",
            RecordKind::Connections => "connections",
            RecordKind::Nodes => "nodes",
        })
    }
}

/// Errors from decoding a dump response.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("no data to decode {0}")]
    NoData(RecordKind),

    /// A line does not have the shape its dump requires, which points at a
    /// daemon speaking a different protocol version.
    #[error("malformed {kind} line {line}: expected {expected} fields, found {found}")]
    Malformed {
        kind: RecordKind,
        line: usize,
        expected: usize,
        found: usize,
    },
}
