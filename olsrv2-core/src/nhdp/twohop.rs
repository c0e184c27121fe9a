//! Two-hop neighbor set (spec §4.3 "TwoHopSet"): addresses a symmetric
//! neighbor reports as *its* symmetric neighbors, the `N2` set MPR
//! selection covers against.

use crate::address::Address;
use crate::domain::{DomainId, Metric};
use crate::nhdp::neighbor::NeighborId;
use ahash::AHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Key {
    via: NeighborId,
    domain: DomainId,
    addr: Address,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    metric: Metric,
    expires_at_ms: u64,
}

#[derive(Debug, Default)]
pub struct TwoHopSet {
    entries: AHashMap<Key, Entry>,
}

impl TwoHopSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, via: NeighborId, domain: DomainId, addr: Address, metric: Metric, now_ms: u64, hold_ms: u64) {
        self.entries.insert(Key { via, domain, addr }, Entry { metric, expires_at_ms: now_ms + hold_ms });
    }

    pub fn evict_expired(&mut self, now_ms: u64) {
        self.entries.retain(|_, e| e.expires_at_ms > now_ms);
    }

    /// Removes every two-hop entry reached only via `neighbor`, called
    /// when that one-hop neighbor is lost.
    pub fn remove_via(&mut self, neighbor: NeighborId) {
        self.entries.retain(|k, _| k.via != neighbor);
    }

    /// Addresses reachable in exactly two hops through `neighbor` in
    /// `domain`, for MPR coverage calculation.
    pub fn addresses_via(&self, via: NeighborId, domain: DomainId) -> impl Iterator<Item = Address> + '_ {
        self.entries.iter().filter(move |(k, _)| k.via == via && k.domain == domain).map(|(k, _)| k.addr)
    }

    /// Every distinct two-hop address in `domain`, across all one-hop
    /// neighbors — the universe `N2` that MPR coverage must span.
    pub fn all_addresses(&self, domain: DomainId) -> impl Iterator<Item = Address> + '_ {
        let mut seen = ahash::AHashSet::default();
        self.entries.iter().filter(move |(k, _)| k.domain == domain).filter_map(move |(k, _)| {
            if seen.insert(k.addr) {
                Some(k.addr)
            } else {
                None
            }
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
