//! RFC 7181 §18.4 greedy MPR selection, grounded on the reference
//! implementation's `mpr_calculate_mpr_rfc7181` (`selection-rfc7181.c`):
//! always-select willing-ALWAYS neighbors, then neighbors that are the
//! *sole* cover of some two-hop address, then repeatedly pick whichever
//! remaining neighbor covers the most still-uncovered two-hop addresses
//! until nothing is left to cover.

use super::graph::MprGraph;
use crate::nhdp::neighbor::NeighborId;
use ahash::AHashSet;
use std::cmp::Reverse;

/// Runs greedy MPR set-cover selection over `graph`. Deterministic: ties in
/// coverage count and willingness are broken by the lowest `NeighborId`, so
/// re-running selection against unchanged input always yields the same set
/// (spec §8 "MPR selection is a pure function of its NHDP input").
pub fn select_mprs(graph: &MprGraph) -> AHashSet<NeighborId> {
    let mut selected = AHashSet::default();
    let mut remaining = graph.n2_universe.clone();

    // _process_will_always
    for c in &graph.candidates {
        if c.willingness.is_always() {
            selected.insert(c.id);
            remaining.retain(|a| !c.covers.contains(a));
        }
    }

    // _process_unique_mprs: repeat since selecting one neighbor can make a
    // previously-ambiguous address newly unique for another.
    loop {
        let mut made_progress = false;
        for addr in remaining.clone() {
            let coverers: Vec<&super::graph::MprCandidate> =
                graph.candidates.iter().filter(|c| !selected.contains(&c.id) && c.covers.contains(&addr)).collect();
            if let [only] = coverers[..] {
                selected.insert(only.id);
                remaining.retain(|a| !only.covers.contains(a));
                made_progress = true;
            }
        }
        if !made_progress {
            break;
        }
    }

    // _select_greatest_by_property, looped until N2 is covered or nothing
    // further can be covered by any remaining candidate.
    while !remaining.is_empty() {
        let best = graph
            .candidates
            .iter()
            .filter(|c| !selected.contains(&c.id))
            .map(|c| (c, c.covers.intersection(&remaining).count()))
            .filter(|(_, count)| *count > 0)
            .max_by_key(|(c, count)| (*count, c.willingness.value(), Reverse(c.id.0)));

        match best {
            Some((c, _)) => {
                selected.insert(c.id);
                remaining.retain(|a| !c.covers.contains(a));
            }
            None => break, // remaining addresses are unreachable by any candidate
        }
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Willingness;
    use crate::mpr::graph::MprCandidate;
    use std::net::Ipv4Addr;

    fn addr(n: u8) -> crate::address::Address {
        crate::address::Address::Inet(Ipv4Addr::new(10, 0, 0, n))
    }

    #[test]
    fn always_willing_neighbor_is_always_selected_even_with_no_unique_coverage() {
        let n2 = [addr(1)].into_iter().collect::<AHashSet<_>>();
        let graph = MprGraph {
            candidates: vec![
                MprCandidate { id: NeighborId(1), willingness: Willingness::ALWAYS, covers: AHashSet::default() },
                MprCandidate { id: NeighborId(2), willingness: Willingness::DEFAULT, covers: n2.clone() },
            ],
            n2_universe: n2,
        };
        let selected = select_mprs(&graph);
        assert!(selected.contains(&NeighborId(1)));
    }

    #[test]
    fn sole_coverer_of_an_address_is_selected() {
        let n2 = [addr(1), addr(2)].into_iter().collect::<AHashSet<_>>();
        let graph = MprGraph {
            candidates: vec![
                MprCandidate { id: NeighborId(1), willingness: Willingness::DEFAULT, covers: [addr(1)].into_iter().collect() },
                MprCandidate { id: NeighborId(2), willingness: Willingness::DEFAULT, covers: [addr(2)].into_iter().collect() },
            ],
            n2_universe: n2,
        };
        let selected = select_mprs(&graph);
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn greedy_picks_best_coverage_when_no_unique_address_exists() {
        let n2 = [addr(1), addr(2), addr(3)].into_iter().collect::<AHashSet<_>>();
        let graph = MprGraph {
            candidates: vec![
                MprCandidate {
                    id: NeighborId(1),
                    willingness: Willingness::DEFAULT,
                    covers: [addr(1), addr(2), addr(3)].into_iter().collect(),
                },
                MprCandidate { id: NeighborId(2), willingness: Willingness::DEFAULT, covers: [addr(1), addr(2)].into_iter().collect() },
            ],
            n2_universe: n2,
        };
        let selected = select_mprs(&graph);
        assert_eq!(selected, [NeighborId(1)].into_iter().collect());
    }

    #[test]
    fn ties_broken_by_lowest_neighbor_id() {
        // Both candidates cover exactly the same two addresses, so
        // `_process_unique_mprs` never fires and the greedy tie-break
        // (equal coverage, equal willingness) must pick the lower id.
        let n2 = [addr(1), addr(2)].into_iter().collect::<AHashSet<_>>();
        let graph = MprGraph {
            candidates: vec![
                MprCandidate { id: NeighborId(5), willingness: Willingness::DEFAULT, covers: [addr(1), addr(2)].into_iter().collect() },
                MprCandidate { id: NeighborId(2), willingness: Willingness::DEFAULT, covers: [addr(1), addr(2)].into_iter().collect() },
            ],
            n2_universe: n2,
        };
        let selected = select_mprs(&graph);
        assert_eq!(selected, [NeighborId(2)].into_iter().collect());
    }

    #[test]
    fn unreachable_addresses_do_not_loop_forever() {
        let n2 = [addr(9)].into_iter().collect::<AHashSet<_>>(); // no candidate covers it
        let graph = MprGraph {
            candidates: vec![MprCandidate { id: NeighborId(1), willingness: Willingness::DEFAULT, covers: AHashSet::default() }],
            n2_universe: n2,
        };
        let selected = select_mprs(&graph);
        assert!(selected.is_empty());
    }
}
