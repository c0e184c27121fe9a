//! NHDP: neighborhood discovery (spec §4.3). Ties [`link`], [`neighbor`]
//! and [`twohop`] together into one engine that consumes/produces
//! [`hello`] messages; [`hysteresis`] debounces every link's promotion to
//! `Symmetric` and demotion back out of it (spec §4.3 steps 3 and 6).

pub mod hello;
pub mod hysteresis;
pub mod link;
pub mod neighbor;
pub mod twohop;

use crate::address::Address;
use crate::domain::{DomainId, Metric, Willingness};
use crate::iface::InterfaceId;
use ahash::AHashMap;
use hello::{HelloAddressEntry, HelloContent, WireLinkStatus};
use hysteresis::HysteresisConfig;
use link::{Link, LinkId, LinkStatus};
use neighbor::{Neighbor, NeighborId, NeighborTable};
use twohop::TwoHopSet;

#[derive(Debug, Clone, Copy)]
pub struct NhdpConfig {
    pub hello_interval_ms: u64,
    pub heard_hold_ms: u64,
    pub sym_hold_ms: u64,
    pub lost_hold_ms: u64,
    /// How long a two-hop entry stays valid absent a refresh; normally a
    /// small multiple of `hello_interval_ms`.
    pub twohop_hold_ms: u64,
    pub hysteresis: HysteresisConfig,
}

impl Default for NhdpConfig {
    fn default() -> Self {
        Self {
            hello_interval_ms: 2_000,
            heard_hold_ms: 6_000,
            sym_hold_ms: 6_000,
            lost_hold_ms: 12_000,
            twohop_hold_ms: 6_000,
            hysteresis: HysteresisConfig::default(),
        }
    }
}

#[derive(Default)]
pub struct NhdpEngine {
    config: NhdpConfig,
    next_link_id: u32,
    links: AHashMap<LinkId, Link>,
    link_by_addr: AHashMap<(InterfaceId, Address), LinkId>,
    pub neighbors: NeighborTable,
    pub twohop: TwoHopSet,
}

impl NhdpEngine {
    pub fn new(config: NhdpConfig) -> Self {
        Self { config, ..Default::default() }
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(&id)
    }

    fn find_or_create_link(&mut self, iface: InterfaceId, addr: Address, now_ms: u64) -> LinkId {
        if let Some(id) = self.link_by_addr.get(&(iface, addr)) {
            return *id;
        }
        let id = LinkId(self.next_link_id);
        self.next_link_id += 1;
        let link = Link::new(id, iface, addr, now_ms, self.config.heard_hold_ms, self.config.lost_hold_ms);
        self.links.insert(id, link);
        self.link_by_addr.insert((iface, addr), id);
        id
    }

    fn find_or_create_neighbor(&mut self, addr: Address) -> NeighborId {
        if let Some(id) = self.neighbors.find_by_address(&addr) {
            return id;
        }
        let id = self.neighbors.insert_new();
        self.neighbors.get_mut(id).unwrap().addresses.push(addr);
        id
    }

    /// Process one HELLO received on `iface` from `sender_addr`.
    /// `our_addresses` are this router's own addresses on `iface`, used to
    /// decide whether the HELLO lists us symmetrically.
    pub fn process_hello(
        &mut self,
        iface: InterfaceId,
        sender_addr: Address,
        content: &HelloContent,
        our_addresses: &[Address],
        now_ms: u64,
    ) -> NeighborId {
        let link_id = self.find_or_create_link(iface, sender_addr, now_ms);
        // Spec §4.3 step 3: either status proves the neighbor heard us —
        // requiring SYMMETRIC specifically would deadlock two nodes that
        // have never yet heard each other be first to report it.
        let we_are_listed = content.entries.iter().any(|e| {
            matches!(e.status, WireLinkStatus::Symmetric | WireLinkStatus::Heard) && our_addresses.contains(&e.address)
        });

        let neighbor_id = self.find_or_create_neighbor(sender_addr);

        {
            let link = self.links.get_mut(&link_id).expect("just created/looked up");
            link.on_hello(
                now_ms,
                we_are_listed,
                &self.config.hysteresis,
                self.config.sym_hold_ms,
                self.config.heard_hold_ms,
                self.config.lost_hold_ms,
            );
            link.neighbor_id = Some(neighbor_id);
        }

        let link_symmetric = self.links[&link_id].is_symmetric();
        let neighbor = self.neighbors.get_mut(neighbor_id).expect("just created/looked up");
        neighbor.willingness = content.willingness;
        if !neighbor.links.contains(&link_id) {
            neighbor.links.push(link_id);
        }
        neighbor.symmetric = link_symmetric;
        for entry in &content.entries {
            for (domain, metric) in &entry.metrics {
                if entry.address == sender_addr {
                    neighbor.set_metric(*domain, *metric);
                }
            }
            // An entry addressing one of us, carrying an `MPR` TLV, means
            // the sender has selected us as its MPR for that domain —
            // the flag `forward_tc` gates default TC flooding on.
            if our_addresses.contains(&entry.address) {
                for domain in &entry.mpr_domains {
                    neighbor.selects_us_as_mpr.insert(*domain, true);
                }
            }
        }

        // Two-hop set: only addresses the sender itself reports as
        // symmetric neighbors count as N2 coverage for MPR selection.
        for entry in &content.entries {
            if entry.status != WireLinkStatus::Symmetric || our_addresses.contains(&entry.address) {
                continue;
            }
            if entry.metrics.is_empty() {
                self.twohop.update(
                    neighbor_id,
                    DomainId::FLOODING,
                    entry.address,
                    Metric::MIN,
                    now_ms,
                    self.config.twohop_hold_ms,
                );
            }
            for (domain, metric) in &entry.metrics {
                self.twohop.update(neighbor_id, *domain, entry.address, *metric, now_ms, self.config.twohop_hold_ms);
            }
        }

        neighbor_id
    }

    /// Run the periodic link-expiry sweep; drops neighbors that end up
    /// with no live links, and their two-hop entries with them.
    pub fn expire(&mut self, now_ms: u64) {
        let mut lost_links = Vec::new();
        for link in self.links.values_mut() {
            if link.is_expired(now_ms) {
                lost_links.push(link.id);
            } else if now_ms >= link.expires_at_ms {
                link.on_expiry(&self.config.hysteresis);
            }
        }
        for id in lost_links {
            if let Some(link) = self.links.remove(&id) {
                self.link_by_addr.retain(|_, v| *v != id);
                if let Some(neighbor_id) = link.neighbor_id {
                    if let Some(neighbor) = self.neighbors.get_mut(neighbor_id) {
                        neighbor.links.retain(|l| *l != id);
                        if neighbor.links.is_empty() {
                            self.neighbors.remove(neighbor_id);
                            self.twohop.remove_via(neighbor_id);
                        } else {
                            neighbor.symmetric = neighbor
                                .links
                                .iter()
                                .filter_map(|l| self.links.get(l))
                                .any(|l| l.is_symmetric());
                        }
                    }
                }
            }
        }
        self.twohop.evict_expired(now_ms);
    }

    /// Build the HELLO this router should send on `iface`.
    pub fn build_hello(&self, iface: InterfaceId, willingness: Willingness, domains: &[DomainId]) -> HelloContent {
        let mut entries = Vec::new();
        for link in self.links.values().filter(|l| l.iface == iface) {
            let status = match link.status {
                LinkStatus::Symmetric => WireLinkStatus::Symmetric,
                // A link that hasn't yet been referenced by any HELLO has
                // nothing meaningful to advertise; report it the same as a
                // freshly heard one rather than adding a wire value no
                // peer's consumption algorithm expects.
                LinkStatus::Pending | LinkStatus::Heard => WireLinkStatus::Heard,
                LinkStatus::Lost => WireLinkStatus::Lost,
            };
            let mpr_domains = link
                .neighbor_id
                .and_then(|id| self.neighbors.get(id))
                .map(|n| domains.iter().copied().filter(|d| n.is_mpr(*d)).collect())
                .unwrap_or_default();
            let metrics = link
                .neighbor_id
                .and_then(|id| self.neighbors.get(id))
                .map(|n| domains.iter().map(|d| (*d, n.metric(*d))).filter(|(_, m)| m.is_finite()).collect())
                .unwrap_or_default();
            entries.push(HelloAddressEntry { address: link.main_address, status, mpr_domains, metrics });
        }
        HelloContent {
            validity_ms: self.config.lost_hold_ms,
            interval_ms: self.config.hello_interval_ms,
            willingness,
            entries,
        }
    }

    pub fn neighbor(&self, id: NeighborId) -> Option<&Neighbor> {
        self.neighbors.get(id)
    }
}
