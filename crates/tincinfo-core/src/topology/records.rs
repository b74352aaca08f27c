//! Typed topology records.

use std::collections::BTreeMap;
use std::collections::btree_map::{Entry, Iter};

use serde::Serialize;

use super::layout::Fields;

/// Sentinel for a numeric field that was present but not a number.
pub const UNKNOWN: i64 = -1;

/// `status` bit tincd sets on nodes it can currently reach.
const STATUS_REACHABLE: i64 = 0x10;

fn owned(text: Option<&str>) -> Option<String> {
    text.map(str::to_owned)
}

/// Per-node state from a nodes dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerInfo {
    pub node: String,
    pub id: Option<String>,
    pub host: Option<String>,
    pub port: Option<i64>,
    pub cipher: Option<i64>,
    pub digest: Option<i64>,
    pub maclength: Option<i64>,
    pub compression: Option<i64>,
    pub options: Option<i64>,
    pub status: Option<i64>,
    pub nexthop: Option<String>,
    pub via: Option<String>,
    pub distance: Option<i64>,
    pub pmtu: Option<i64>,
    pub minmtu: Option<i64>,
    pub maxmtu: Option<i64>,
    pub last_state_change: Option<i64>,
}

impl PeerInfo {
    pub(crate) fn from_fields(fields: &Fields<'_>) -> Self {
        Self {
            node: fields.key().to_owned(),
            id: owned(fields.text("id")),
            host: owned(fields.text("host")),
            port: fields.number("port"),
            cipher: fields.number("cipher"),
            digest: fields.number("digest"),
            maclength: fields.number("maclength"),
            compression: fields.number("compression"),
            options: fields.number("options"),
            status: fields.number("status"),
            nexthop: owned(fields.text("nexthop")),
            via: owned(fields.text("via")),
            distance: fields.number("distance"),
            pmtu: fields.number("pmtu"),
            minmtu: fields.number("minmtu"),
            maxmtu: fields.number("maxmtu"),
            last_state_change: fields.number("last_state_change"),
        }
    }

    /// Whether the daemon reports the node as reachable. `None` when the
    /// status field is missing or unparsable.
    pub fn is_reachable(&self) -> Option<bool> {
        match self.status {
            Some(status) if status != UNKNOWN => Some(status & STATUS_REACHABLE != 0),
            _ => None,
        }
    }
}

/// A directed link in the daemon's view of the mesh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub from: String,
    pub to: Option<String>,
    pub host: Option<String>,
    pub port: Option<i64>,
    pub local_host: Option<String>,
    pub local_port: Option<i64>,
    pub options: Option<i64>,
    pub weight: Option<i64>,
    /// Only reported by newer daemons.
    pub avg_rtt: Option<i64>,
}

impl Edge {
    pub(crate) fn from_fields(fields: &Fields<'_>) -> Self {
        Self {
            from: fields.key().to_owned(),
            to: owned(fields.text("to")),
            host: owned(fields.text("host")),
            port: fields.number("port"),
            local_host: owned(fields.text("local_host")),
            local_port: fields.number("local_port"),
            options: fields.number("options"),
            weight: fields.number("weight"),
            avg_rtt: fields.number("avg_rtt"),
        }
    }
}

/// A meta-connection of the local daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Connection {
    pub node: String,
    pub host: Option<String>,
    pub port: Option<i64>,
    pub options: Option<i64>,
    pub socket: Option<String>,
    pub status: Option<i64>,
}

impl Connection {
    pub(crate) fn from_fields(fields: &Fields<'_>) -> Self {
        Self {
            node: fields.key().to_owned(),
            host: owned(fields.text("host")),
            port: fields.number("port"),
            options: fields.number("options"),
            socket: owned(fields.text("socket")),
            status: fields.number("status"),
        }
    }
}

/// Everything known about one node: the subnets it claims and, once a
/// nodes dump has been decoded, its peer info.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    pub name: String,
    subnets: Vec<String>,
    peer: Option<PeerInfo>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subnets: Vec::new(),
            peer: None,
        }
    }

    /// Subnets in the order they were first seen.
    pub fn subnets(&self) -> &[String] {
        &self.subnets
    }

    pub fn peer(&self) -> Option<&PeerInfo> {
        self.peer.as_ref()
    }

    /// Add `subnet` unless already present. Returns whether it was added.
    pub fn add_subnet(&mut self, subnet: &str) -> bool {
        if self.subnets.iter().any(|s| s == subnet) {
            return false;
        }
        self.subnets.push(subnet.to_owned());
        true
    }

    /// Replace the peer info.
    pub fn set_peer_info(&mut self, peer: PeerInfo) {
        self.peer = Some(peer);
    }
}

/// Nodes by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Registry {
    nodes: BTreeMap<String, Node>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    /// The node called `name`, created empty if it does not exist yet.
    pub fn node_mut_or_insert(&mut self, name: &str) -> &mut Node {
        match self.nodes.entry(name.to_owned()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(Node::new(name)),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in name order.
    pub fn iter(&self) -> Iter<'_, String, Node> {
        self.nodes.iter()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = (&'a String, &'a Node);
    type IntoIter = Iter<'a, String, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
