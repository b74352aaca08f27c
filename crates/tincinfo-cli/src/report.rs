//! What a query produced, and how to print it.

use std::collections::BTreeMap;
use std::fmt::{self, Write};

use serde::Serialize;
use tincinfo_core::topology::stats;
use tincinfo_core::{Connection, Edge, Node, Registry, Session, UNKNOWN};

/// Edge weight summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeStats {
    pub edges: usize,
    pub max_weight: Option<i64>,
    pub min_weight: Option<i64>,
    /// Outgoing edge count per node.
    pub edge_counts: BTreeMap<String, usize>,
}

impl EdgeStats {
    /// Summarise `edges`. With `node`, only that node's edge count is kept.
    pub fn new(edges: &[Edge], node: Option<&str>) -> Self {
        let edge_counts = match node {
            Some(node) => BTreeMap::from([(node.to_owned(), stats::edge_count(edges, node))]),
            None => {
                let mut counts = BTreeMap::new();
                for edge in edges {
                    *counts.entry(edge.from.clone()).or_default() += 1;
                }
                counts
            }
        };

        Self {
            edges: edges.len(),
            max_weight: stats::max_weight(edges),
            min_weight: stats::min_weight(edges),
            edge_counts,
        }
    }
}

/// Everything a session refreshed.
#[derive(Debug, Clone, Serialize)]
pub struct Topology {
    pub nodes: Registry,
    pub edges: Vec<Edge>,
    pub connections: Vec<Connection>,
    pub stats: EdgeStats,
}

impl Topology {
    pub fn from_session(session: &Session) -> Self {
        Self {
            nodes: session.registry().clone(),
            edges: session.edges().to_vec(),
            connections: session.connections().to_vec(),
            stats: EdgeStats::new(session.edges(), None),
        }
    }
}

/// Output of one command.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Report {
    Nodes(Registry),
    Subnets(Registry),
    Edges(Vec<Edge>),
    Connections(Vec<Connection>),
    Stats(EdgeStats),
    All(Topology),
}

impl Report {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable tables.
    pub fn to_text(&self) -> Result<String, fmt::Error> {
        let mut out = String::new();
        match self {
            Report::Nodes(registry) => write_nodes(&mut out, registry)?,
            Report::Subnets(registry) => write_subnets(&mut out, registry)?,
            Report::Edges(edges) => write_edges(&mut out, edges)?,
            Report::Connections(connections) => write_connections(&mut out, connections)?,
            Report::Stats(stats) => write_stats(&mut out, stats)?,
            Report::All(topology) => {
                writeln!(out, "# nodes")?;
                write_nodes(&mut out, &topology.nodes)?;
                writeln!(out, "\n# subnets")?;
                write_subnets(&mut out, &topology.nodes)?;
                writeln!(out, "\n# edges")?;
                write_edges(&mut out, &topology.edges)?;
                writeln!(out, "\n# connections")?;
                write_connections(&mut out, &topology.connections)?;
                writeln!(out, "\n# stats")?;
                write_stats(&mut out, &topology.stats)?;
            }
        }
        Ok(out)
    }
}

fn text(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

fn dec(value: Option<i64>) -> String {
    match value {
        None => "-".to_string(),
        Some(UNKNOWN) => "?".to_string(),
        Some(n) => n.to_string(),
    }
}

fn hex(value: Option<i64>) -> String {
    match value {
        None => "-".to_string(),
        Some(UNKNOWN) => "?".to_string(),
        Some(n) => format!("{n:x}"),
    }
}

fn reachability(node: &Node) -> &'static str {
    match node.peer().and_then(|peer| peer.is_reachable()) {
        Some(true) => "reachable",
        Some(false) => "unreachable",
        None => "-",
    }
}

fn write_nodes(out: &mut impl Write, registry: &Registry) -> fmt::Result {
    writeln!(
        out,
        "{:<16} {:<24} {:>6} {:<12} {:<16} {:>4} {:>5}",
        "NODE", "HOST", "PORT", "STATE", "VIA", "DIST", "PMTU"
    )?;
    for node in registry.nodes() {
        let peer = node.peer();
        writeln!(
            out,
            "{:<16} {:<24} {:>6} {:<12} {:<16} {:>4} {:>5}",
            node.name,
            text(peer.and_then(|p| p.host.as_deref())),
            dec(peer.and_then(|p| p.port)),
            reachability(node),
            text(peer.and_then(|p| p.via.as_deref())),
            dec(peer.and_then(|p| p.distance)),
            dec(peer.and_then(|p| p.pmtu)),
        )?;
    }
    Ok(())
}

fn write_subnets(out: &mut impl Write, registry: &Registry) -> fmt::Result {
    writeln!(out, "{:<40} NODE", "SUBNET")?;
    for node in registry.nodes() {
        for subnet in node.subnets() {
            writeln!(out, "{subnet:<40} {}", node.name)?;
        }
    }
    Ok(())
}

fn write_edges(out: &mut impl Write, edges: &[Edge]) -> fmt::Result {
    writeln!(
        out,
        "{:<16} {:<16} {:<24} {:>6} {:>8} {:>6} {:>7}",
        "FROM", "TO", "HOST", "PORT", "OPTIONS", "WEIGHT", "AVG_RTT"
    )?;
    for edge in edges {
        writeln!(
            out,
            "{:<16} {:<16} {:<24} {:>6} {:>8} {:>6} {:>7}",
            edge.from,
            text(edge.to.as_deref()),
            text(edge.host.as_deref()),
            dec(edge.port),
            hex(edge.options),
            dec(edge.weight),
            dec(edge.avg_rtt),
        )?;
    }
    Ok(())
}

fn write_connections(out: &mut impl Write, connections: &[Connection]) -> fmt::Result {
    writeln!(
        out,
        "{:<16} {:<24} {:>6} {:>8} {:>6} {:>6}",
        "NODE", "HOST", "PORT", "OPTIONS", "SOCKET", "STATUS"
    )?;
    for connection in connections {
        writeln!(
            out,
            "{:<16} {:<24} {:>6} {:>8} {:>6} {:>6}",
            connection.node,
            text(connection.host.as_deref()),
            dec(connection.port),
            hex(connection.options),
            text(connection.socket.as_deref()),
            hex(connection.status),
        )?;
    }
    Ok(())
}

fn write_stats(out: &mut impl Write, stats: &EdgeStats) -> fmt::Result {
    writeln!(out, "edges:      {}", stats.edges)?;
    writeln!(out, "max weight: {}", dec(stats.max_weight))?;
    writeln!(out, "min weight: {}", dec(stats.min_weight))?;
    for (node, count) in &stats.edge_counts {
        writeln!(out, "edges from {node}: {count}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tincinfo_core::topology::{decode_connections, decode_edges, decode_nodes, decode_subnets};

    fn edges() -> Vec<Edge> {
        decode_edges(
            "18 4 alpha beta 192.0.2.7 port 655 10.0.0.1 port 40000 700c 12 3\n\
             18 4 beta alpha 10.0.0.1 port 655 192.0.2.7 port 655 700c 20\n\
             18 4 beta gamma 198.51.100.4 port 655 192.0.2.7 port 655 700c x\n",
        )
        .unwrap()
    }

    #[test]
    fn test_edge_stats_for_all_nodes() {
        let stats = EdgeStats::new(&edges(), None);
        assert_eq!(stats.edges, 3);
        assert_eq!(stats.max_weight, Some(20));
        assert_eq!(stats.min_weight, Some(12));
        assert_eq!(
            stats.edge_counts,
            BTreeMap::from([("alpha".to_string(), 1), ("beta".to_string(), 2)])
        );
    }

    #[test]
    fn test_edge_stats_for_one_node() {
        let stats = EdgeStats::new(&edges(), Some("gamma"));
        assert_eq!(
            stats.edge_counts,
            BTreeMap::from([("gamma".to_string(), 0)])
        );
    }

    #[test]
    fn test_edges_text_marks_unknown_values() {
        let text = Report::Edges(edges()).to_text().unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("FROM"));
        assert!(lines[1].contains("700c"));
        assert!(lines[3].split_whitespace().any(|field| field == "?"));
        // no avg_rtt on the last two edges
        assert!(lines[2].ends_with('-'));
    }

    #[test]
    fn test_nodes_and_subnets_text() {
        let mut registry = Registry::new();
        decode_subnets("18 5 10.1.0.0/16 alpha\n18 5 10.2.0.0/16 beta\n", &mut registry).unwrap();
        decode_nodes(
            "18 3 alpha 0a myself port 655 0 0 0 0 700c 1a alpha alpha 0 1518 1518 1518 0\n",
            &mut registry,
        )
        .unwrap();

        let nodes = Report::Nodes(registry.clone()).to_text().unwrap();
        assert!(nodes.lines().nth(1).unwrap().contains("reachable"));
        // beta has subnets but no peer info
        assert!(nodes.lines().nth(2).unwrap().starts_with("beta"));

        let subnets = Report::Subnets(registry).to_text().unwrap();
        assert_eq!(subnets.lines().count(), 3);
        assert!(subnets.contains("10.2.0.0/16"));
    }

    #[test]
    fn test_json_is_structured() {
        let connections = decode_connections("18 6 beta 192.0.2.7 port 655 700c 5 1a\n").unwrap();
        let json = Report::Connections(connections).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["node"], "beta");
        assert_eq!(value[0]["port"], 655);
        assert_eq!(value[0]["options"], 0x700c);
        assert_eq!(value[0]["socket"], "5");
    }

    #[test]
    fn test_stats_json() {
        let json = Report::Stats(EdgeStats::new(&[], None)).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["edges"], 0);
        assert!(value["max_weight"].is_null());
    }
}
