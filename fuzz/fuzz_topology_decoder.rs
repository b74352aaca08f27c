//! Fuzz target for the dump response decoders.
//!
//! Run with: cargo +nightly fuzz run fuzz_topology_decoder
//!
//! Daemon output is untrusted text. Every decoder must either decode it or
//! return a `DecodeError`, and subnet decoding must stay idempotent.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tincinfo_core::Registry;
use tincinfo_core::topology::{
    decode_connections, decode_edges, decode_nodes, decode_subnets, stats,
};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);

    let mut registry = Registry::new();
    let _ = decode_nodes(&text, &mut registry);
    if decode_subnets(&text, &mut registry).is_ok() {
        let before = registry.clone();
        let _ = decode_subnets(&text, &mut registry);
        assert_eq!(before, registry);
    }

    if let Ok(edges) = decode_edges(&text) {
        if let (Some(max), Some(min)) = (stats::max_weight(&edges), stats::min_weight(&edges)) {
            assert!(min <= max);
        }
        if let Some(first) = edges.first() {
            assert!(stats::edge_count(&edges, &first.from) >= 1);
        }
    }
    let _ = decode_connections(&text);
});
