//! MPR selection (spec §4.4): builds the per-domain neighbor graph and
//! runs greedy set-cover selection, then stamps the result back onto the
//! NHDP neighbor table so HELLO production can advertise it.

pub mod graph;
pub mod selection;

use crate::address::Address;
use crate::domain::DomainId;
use crate::nhdp::NhdpEngine;
use ahash::AHashSet;

/// Recomputes and stores MPR selection for every domain in `domains`,
/// mutating each selected/deselected neighbor's `is_mpr` flag in place.
/// Called from the daemon's "settle" phase after NHDP state changes
/// (spec §5 run loop).
pub fn recompute(nhdp: &mut NhdpEngine, domains: &[DomainId], our_addresses: &AHashSet<Address>) {
    for &domain in domains {
        let graph = graph::build_graph(nhdp, domain, our_addresses);
        let selected = selection::select_mprs(&graph);
        let neighbor_ids: Vec<_> = nhdp.neighbors.iter().map(|(id, _)| id).collect();
        for id in neighbor_ids {
            let is_selected = selected.contains(&id);
            if let Some(neighbor) = nhdp.neighbors.get_mut(id) {
                neighbor.is_mpr.insert(domain, is_selected);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Metric, Willingness};
    use crate::iface::InterfaceId;
    use crate::nhdp::hello::{HelloAddressEntry, HelloContent, WireLinkStatus};
    use crate::nhdp::NhdpConfig;
    use std::net::Ipv4Addr;

    #[test]
    fn recompute_marks_sole_coverer_as_mpr() {
        let mut nhdp = NhdpEngine::new(NhdpConfig::default());
        let sender = Address::Inet(Ipv4Addr::new(10, 0, 0, 2));
        let us = Address::Inet(Ipv4Addr::new(10, 0, 0, 1));
        let two_hop = Address::Inet(Ipv4Addr::new(10, 0, 0, 3));
        let content = HelloContent {
            validity_ms: 20_000,
            interval_ms: 2_000,
            willingness: Willingness::DEFAULT,
            entries: vec![
                HelloAddressEntry { address: us, status: WireLinkStatus::Symmetric, mpr_domains: vec![], metrics: vec![] },
                HelloAddressEntry {
                    address: two_hop,
                    status: WireLinkStatus::Symmetric,
                    mpr_domains: vec![],
                    metrics: vec![(DomainId::FLOODING, Metric(10))],
                },
            ],
        };
        // 3 calls to clear hysteresis admission under the default config
        // (spec §8 scenario 1: symmetric within 3 HELLO intervals).
        let mut nid = None;
        for _ in 0..3 {
            nid = Some(nhdp.process_hello(InterfaceId(0), sender, &content, &[us], 0));
        }
        let nid = nid.unwrap();
        let our_addrs: AHashSet<Address> = [us].into_iter().collect();
        recompute(&mut nhdp, &[DomainId::FLOODING], &our_addrs);
        assert!(nhdp.neighbor(nid).unwrap().is_mpr(DomainId::FLOODING));
    }
}
