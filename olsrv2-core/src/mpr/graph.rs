//! Builds the `N`/`N2` neighbor graph MPR selection runs over (spec §4.4
//! "MPR selection input"), from the live NHDP tables.

use crate::address::Address;
use crate::domain::{DomainId, Willingness};
use crate::nhdp::neighbor::NeighborId;
use crate::nhdp::NhdpEngine;
use ahash::AHashSet;

/// One candidate in `N`: a symmetric one-hop neighbor with non-zero
/// willingness, and the set of `N2` addresses it alone can reach.
#[derive(Debug, Clone)]
pub struct MprCandidate {
    pub id: NeighborId,
    pub willingness: Willingness,
    pub covers: AHashSet<Address>,
}

pub struct MprGraph {
    pub candidates: Vec<MprCandidate>,
    pub n2_universe: AHashSet<Address>,
}

/// Builds the MPR input graph for `domain`: candidates are symmetric
/// neighbors willing to relay (`Willingness::NEVER` excludes a neighbor
/// outright — RFC 7181 never selects it as MPR), and each candidate's
/// `covers` set is every two-hop address reachable only through it that
/// isn't also one of our own addresses.
pub fn build_graph(nhdp: &NhdpEngine, domain: DomainId, our_addresses: &AHashSet<Address>) -> MprGraph {
    let mut candidates = Vec::new();
    let mut n2_universe = AHashSet::default();

    for (id, neighbor) in nhdp.neighbors.symmetric_neighbors() {
        if neighbor.willingness.is_never() {
            continue;
        }
        let covers: AHashSet<Address> = nhdp
            .twohop
            .addresses_via(id, domain)
            .filter(|a| !our_addresses.contains(a) && !neighbor.has_address(a))
            .collect();
        n2_universe.extend(covers.iter().copied());
        candidates.push(MprCandidate { id, willingness: neighbor.willingness, covers });
    }

    MprGraph { candidates, n2_universe }
}
