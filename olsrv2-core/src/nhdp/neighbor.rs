//! NHDP neighbor records (spec §4.3 "Neighbor"): the address set and
//! willingness of a one-hop neighbor, aggregated across every [`super::link::Link`]
//! that reaches it.

use crate::address::Address;
use crate::domain::{DomainId, Metric, Willingness};
use crate::nhdp::link::LinkId;
use ahash::AHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NeighborId(pub u32);

#[derive(Debug, Clone, Default)]
pub struct Neighbor {
    pub addresses: Vec<Address>,
    pub links: Vec<LinkId>,
    pub willingness: Willingness,
    pub symmetric: bool,
    /// Per-domain link metric this neighbor last reported toward us (the
    /// "outgoing" direction this router forwards through); used directly
    /// by MPR selection and by Dijkstra for the one-hop edge weight.
    pub metrics: AHashMap<DomainId, Metric>,
    /// Whether we selected this neighbor as our MPR for each domain.
    pub is_mpr: AHashMap<DomainId, bool>,
    /// Whether this neighbor has selected *us* as one of its MPRs —
    /// i.e. we are in its MPR selector set, learned from its HELLOs.
    pub selects_us_as_mpr: AHashMap<DomainId, bool>,
}

impl Neighbor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_address(&self, addr: &Address) -> bool {
        self.addresses.contains(addr)
    }

    pub fn metric(&self, domain: DomainId) -> Metric {
        self.metrics.get(&domain).copied().unwrap_or(Metric::INFINITE)
    }

    pub fn set_metric(&mut self, domain: DomainId, metric: Metric) {
        self.metrics.insert(domain, metric);
    }

    pub fn is_mpr(&self, domain: DomainId) -> bool {
        self.is_mpr.get(&domain).copied().unwrap_or(false)
    }

    pub fn selects_us(&self, domain: DomainId) -> bool {
        self.selects_us_as_mpr.get(&domain).copied().unwrap_or(false)
    }
}

#[derive(Debug, Default)]
pub struct NeighborTable {
    next_id: u32,
    neighbors: AHashMap<NeighborId, Neighbor>,
}

impl NeighborTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_new(&mut self) -> NeighborId {
        let id = NeighborId(self.next_id);
        self.next_id += 1;
        self.neighbors.insert(id, Neighbor::new());
        id
    }

    pub fn get(&self, id: NeighborId) -> Option<&Neighbor> {
        self.neighbors.get(&id)
    }

    pub fn get_mut(&mut self, id: NeighborId) -> Option<&mut Neighbor> {
        self.neighbors.get_mut(&id)
    }

    pub fn remove(&mut self, id: NeighborId) -> Option<Neighbor> {
        self.neighbors.remove(&id)
    }

    /// Finds the neighbor (if any) that already owns `addr`, the identity
    /// merge NHDP performs when a HELLO reveals that two previously
    /// distinct addresses belong to the same router (spec §4.3 "neighbor
    /// address merge").
    pub fn find_by_address(&self, addr: &Address) -> Option<NeighborId> {
        self.neighbors.iter().find(|(_, n)| n.has_address(addr)).map(|(id, _)| *id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NeighborId, &Neighbor)> {
        self.neighbors.iter().map(|(id, n)| (*id, n))
    }

    pub fn symmetric_neighbors(&self) -> impl Iterator<Item = (NeighborId, &Neighbor)> {
        self.neighbors.iter().filter(|(_, n)| n.symmetric).map(|(id, n)| (*id, n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn find_by_address_locates_owning_neighbor() {
        let mut table = NeighborTable::new();
        let id = table.insert_new();
        let addr = Address::Inet(Ipv4Addr::new(10, 0, 0, 5));
        table.get_mut(id).unwrap().addresses.push(addr);
        assert_eq!(table.find_by_address(&addr), Some(id));
    }

    #[test]
    fn unknown_metric_is_infinite() {
        let neighbor = Neighbor::new();
        assert_eq!(neighbor.metric(DomainId(0)), Metric::INFINITE);
    }
}
