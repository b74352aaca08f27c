//! Aggregates over decoded edges.

use super::records::{Edge, UNKNOWN};

fn weights(edges: &[Edge]) -> impl Iterator<Item = i64> + '_ {
    edges
        .iter()
        .filter_map(|edge| edge.weight)
        .filter(|&weight| weight != UNKNOWN)
}

/// Largest known edge weight.
pub fn max_weight(edges: &[Edge]) -> Option<i64> {
    weights(edges).max()
}

/// Smallest known edge weight. `None` when no edge has one.
pub fn min_weight(edges: &[Edge]) -> Option<i64> {
    weights(edges).min()
}

/// Number of edges leaving `node`.
pub fn edge_count(edges: &[Edge], node: &str) -> usize {
    edges.iter().filter(|edge| edge.from == node).count()
}
