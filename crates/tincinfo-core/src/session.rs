//! One query session against a running daemon.

use tracing::{debug, info};

use tincinfo_config::AppConfig;

use crate::Error;
use crate::control::{ChannelOptions, ControlChannel, DumpRequest};
use crate::topology::{self, Connection, Edge, Registry, stats};

/// An authenticated control channel plus the topology decoded through it.
///
/// Subnet and node refreshes merge into one [`Registry`]; edge and
/// connection refreshes replace their lists. The socket is closed when the
/// session is dropped.
#[derive(Debug)]
pub struct Session {
    channel: ControlChannel,
    registry: Registry,
    edges: Vec<Edge>,
    connections: Vec<Connection>,
}

impl Session {
    /// Read the cookie, connect, and authenticate using the paths and
    /// channel options in `config`.
    pub fn open(config: &AppConfig) -> Result<Self, Error> {
        let channel = ControlChannel::open(
            config.pid_file_path(),
            config.socket_path(),
            ChannelOptions::from(&config.control),
        )?;
        Self::start(channel)
    }

    /// Connect and authenticate an existing channel.
    pub fn start(mut channel: ControlChannel) -> Result<Self, Error> {
        if let Some(greeting) = channel.connect()? {
            debug!(greeting = greeting.trim_end(), "Daemon greeting");
        }
        channel.authenticate()?;
        info!(socket = %channel.socket_path().display(), "Control session started");

        Ok(Self {
            channel,
            registry: Registry::new(),
            edges: Vec::new(),
            connections: Vec::new(),
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn channel(&self) -> &ControlChannel {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut ControlChannel {
        &mut self.channel
    }

    /// Dump subnets and merge them into the registry.
    pub fn refresh_subnets(&mut self) -> Result<&Registry, Error> {
        let text = self.channel.dump(DumpRequest::Subnets)?;
        topology::decode_subnets(&text, &mut self.registry)?;
        Ok(&self.registry)
    }

    /// Dump nodes and merge their peer info into the registry.
    pub fn refresh_nodes(&mut self) -> Result<&Registry, Error> {
        let text = self.channel.dump(DumpRequest::Nodes)?;
        topology::decode_nodes(&text, &mut self.registry)?;
        Ok(&self.registry)
    }

    pub fn refresh_edges(&mut self) -> Result<&[Edge], Error> {
        let text = self.channel.dump(DumpRequest::Edges)?;
        self.edges = topology::decode_edges(&text)?;
        Ok(&self.edges)
    }

    pub fn refresh_connections(&mut self) -> Result<&[Connection], Error> {
        let text = self.channel.dump(DumpRequest::Connections)?;
        self.connections = topology::decode_connections(&text)?;
        Ok(&self.connections)
    }

    /// Refresh connections, edges, subnets and nodes, stopping at the
    /// first failure.
    pub fn refresh_all(&mut self) -> Result<(), Error> {
        self.refresh_connections()?;
        self.refresh_edges()?;
        self.refresh_subnets()?;
        self.refresh_nodes()?;
        info!(
            nodes = self.registry.len(),
            edges = self.edges.len(),
            connections = self.connections.len(),
            "Topology refreshed"
        );
        Ok(())
    }

    /// Largest known weight among the last decoded edges.
    pub fn max_weight(&self) -> Option<i64> {
        stats::max_weight(&self.edges)
    }

    /// Smallest known weight among the last decoded edges.
    pub fn min_weight(&self) -> Option<i64> {
        stats::min_weight(&self.edges)
    }

    /// Edges leaving `node` among the last decoded edges.
    pub fn edge_count(&self, node: &str) -> usize {
        stats::edge_count(&self.edges, node)
    }

    /// Close the socket now instead of on drop.
    pub fn close(mut self) {
        self.channel.disconnect();
    }
}
