use tracing::{debug, trace};

use super::layout::{self, CONNECTIONS, EDGES, Fields, Layout, NODES, SUBNETS};
use super::records::{Connection, Edge, PeerInfo, Registry};
use super::{DecodeError, RecordKind};

/// Decode every data line of `text` against `layout`, skipping lines that
/// carry no fields. Line numbers in errors are 1-based.
fn decode_lines<'a>(
    text: &'a str,
    layout: &'static Layout,
) -> Result<Vec<(usize, Fields<'a>)>, DecodeError> {
    if text.is_empty() {
        return Err(DecodeError::NoData(layout.kind));
    }

    let records: Vec<_> = text
        .lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let tokens = layout::payload(line)?;
            layout::decode_fields(&tokens, layout).map(|fields| (index + 1, fields))
        })
        .collect();

    trace!(kind = %layout.kind, records = records.len(), "Decoded dump lines");
    Ok(records)
}

/// Merge a subnets dump into `registry`.
///
/// Every data line must carry exactly a subnet and a node name. The whole
/// response is checked before the registry is touched.
pub fn decode_subnets(text: &str, registry: &mut Registry) -> Result<(), DecodeError> {
    if text.is_empty() {
        return Err(DecodeError::NoData(RecordKind::Subnets));
    }

    let mut claims = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let Some(tokens) = layout::payload(line) else {
            continue;
        };
        let [subnet, node] = tokens[..] else {
            return Err(DecodeError::Malformed {
                kind: RecordKind::Subnets,
                line: index + 1,
                expected: SUBNETS.fields.len(),
                found: tokens.len(),
            });
        };
        claims.push((subnet, node));
    }

    let mut added = 0;
    for (subnet, node) in claims {
        if registry.node_mut_or_insert(node).add_subnet(subnet) {
            added += 1;
        }
    }
    debug!(added, nodes = registry.len(), "Merged subnets into registry");
    Ok(())
}

/// Merge a nodes dump into `registry`. A node's peer info is replaced by
/// the last line naming it.
pub fn decode_nodes(text: &str, registry: &mut Registry) -> Result<(), DecodeError> {
    let records = decode_lines(text, &NODES)?;
    let count = records.len();
    for (_, fields) in records {
        let peer = PeerInfo::from_fields(&fields);
        registry.node_mut_or_insert(fields.key()).set_peer_info(peer);
    }
    debug!(count, nodes = registry.len(), "Merged peer info into registry");
    Ok(())
}

/// Decode an edges dump.
pub fn decode_edges(text: &str) -> Result<Vec<Edge>, DecodeError> {
    let edges: Vec<_> = decode_lines(text, &EDGES)?
        .iter()
        .map(|(_, fields)| Edge::from_fields(fields))
        .collect();
    debug!(count = edges.len(), "Decoded edges");
    Ok(edges)
}

/// Decode a connections dump.
pub fn decode_connections(text: &str) -> Result<Vec<Connection>, DecodeError> {
    let connections: Vec<_> = decode_lines(text, &CONNECTIONS)?
        .iter()
        .map(|(_, fields)| Connection::from_fields(fields))
        .collect();
    debug!(count = connections.len(), "Decoded connections");
    Ok(connections)
}
