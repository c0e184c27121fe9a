//! Multi-domain shortest-path computation (spec §4.6 "Dijkstra"), run once
//! per routing domain over this router's one-hop neighbors plus the TC
//! database's edges.
//!
//! Deterministic: ties in accumulated distance are broken by the lower
//! [`Address`], both in heap-pop order and in next-hop selection, so two
//! routers computing SPF over identical topology state always agree (spec
//! §8 "routing is a pure function of NHDP+TC state").

use crate::address::Address;
use crate::domain::{DomainId, Metric};
use crate::nhdp::NhdpEngine;
use crate::tc::TcDb;
use ahash::AHashMap;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

#[derive(Debug, Clone, Default)]
pub struct SpfResult {
    pub distance: AHashMap<Address, Metric>,
    /// The one-hop neighbor to forward through to reach this node; absent
    /// for `us` itself.
    pub next_hop: AHashMap<Address, Address>,
}

impl SpfResult {
    pub fn reachable(&self, addr: &Address) -> bool {
        self.distance.get(addr).is_some_and(Metric::is_finite)
    }
}

/// Builds the directed adjacency this domain's SPF runs over: our own
/// symmetric one-hop links (weighted by the neighbor's last-reported
/// metric) plus every edge the TC database has recorded for `domain`.
fn build_adjacency(us: Address, tc: &TcDb, nhdp: &NhdpEngine, domain: DomainId) -> AHashMap<Address, Vec<(Address, Metric)>> {
    let mut adjacency: AHashMap<Address, Vec<(Address, Metric)>> = AHashMap::default();

    for (_, neighbor) in nhdp.neighbors.symmetric_neighbors() {
        // A symmetric link with no reported per-domain metric still counts
        // as a unit-cost hop (mirrors the two-hop set's own default, see
        // `NhdpEngine::process_hello`) rather than being excluded.
        let metric = neighbor.metric(domain);
        let metric = if metric.is_finite() { metric } else { Metric::MIN };
        for &addr in &neighbor.addresses {
            adjacency.entry(us).or_default().push((addr, metric));
        }
    }

    for edge in tc.edges().filter(|e| e.domain == domain) {
        adjacency.entry(edge.from).or_default().push((edge.to, edge.metric));
    }

    adjacency
}

pub fn compute(us: Address, tc: &TcDb, nhdp: &NhdpEngine, domain: DomainId) -> SpfResult {
    let adjacency = build_adjacency(us, tc, nhdp, domain);
    let mut result = SpfResult::default();
    result.distance.insert(us, Metric(0));

    let mut heap = BinaryHeap::new();
    heap.push(Reverse((Metric(0), us)));
    let mut settled: AHashMap<Address, bool> = AHashMap::default();

    while let Some(Reverse((dist, node))) = heap.pop() {
        if settled.get(&node).copied().unwrap_or(false) {
            continue;
        }
        settled.insert(node, true);

        let Some(edges) = adjacency.get(&node) else { continue };
        let mut edges: Vec<_> = edges.clone();
        edges.sort_by_key(|&(addr, _)| addr);
        for (neighbor_addr, weight) in edges {
            if settled.get(&neighbor_addr).copied().unwrap_or(false) {
                continue;
            }
            let candidate = dist.saturating_add(weight);
            let better = match result.distance.get(&neighbor_addr) {
                Some(existing) => candidate < *existing,
                None => true,
            };
            if better {
                result.distance.insert(neighbor_addr, candidate);
                let next_hop = if node == us { neighbor_addr } else { result.next_hop[&node] };
                result.next_hop.insert(neighbor_addr, next_hop);
                heap.push(Reverse((candidate, neighbor_addr)));
            }
        }
    }

    result
}
