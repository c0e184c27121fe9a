//! The top-level aggregate (spec §5 "run loop"): drain sockets, fire
//! timers, then settle (MPR recompute -> Dijkstra -> FIB diff-apply).
//!
//! This ties together every other module but stays free of any actual
//! I/O itself — an embedder drives it by calling [`Daemon::receive`] when
//! bytes arrive, [`Daemon::fire_timers`] when the timer adapter wakes it,
//! and [`Daemon::settle`] once per run-loop pass, then applies the
//! returned outbound packets / FIB diff through its own adapters. That
//! split is what makes this struct unit-testable with a fake clock and no
//! sockets at all, same as every adapter-fronted module above it.

use crate::address::{Address, AddressFamily, Prefix};
use crate::codec::{Message, Packet, Writer};
use crate::config::Config;
use crate::domain::{DomainId, Metric, Willingness};
use crate::duplicate::{DupKey, DupResult, DuplicateSet};
use crate::iface::{InterfaceId, InterfaceState, InterfaceTable};
use crate::mpr;
use crate::nhdp::hello::{self, HelloContent};
use crate::nhdp::NhdpEngine;
use crate::routing::fib::{self, Fib, FibDiff};
use crate::routing::dijkstra;
use crate::tc::wire::MSG_TYPE_TC;
use crate::tc::{TcAccept, TcEngine};
use crate::telemetry::Counters;
use ahash::AHashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    Hello(InterfaceId),
    Tc,
}

/// One packet this router wants transmitted on `iface`'s multicast group.
pub struct OutboundPacket {
    pub iface: InterfaceId,
    pub bytes: Vec<u8>,
}

pub struct Daemon {
    pub ifaces: InterfaceTable,
    pub nhdp: NhdpEngine,
    pub tc: TcEngine,
    pub fib: Fib,
    pub counters: Counters,
    duplicates: DuplicateSet,
    domains: Vec<DomainId>,
    /// Locally attached networks advertised as TC endpoints (spec §4.5),
    /// parsed once from `config.lan` at construction time.
    local_endpoints: Vec<(Prefix, DomainId, Metric)>,
    willingness: Willingness,
    originator: Address,
    seqno_gen: crate::codec::PacketSeqGenerator,
    timers: crate::timer::TimerWheel<TimerKind>,
    dirty: bool,
}

impl Daemon {
    /// `originator` is this router's stable main address, used as the TC
    /// originator and HELLO-derived neighbor identity; it should be one of
    /// the addresses configured on an interface below.
    pub fn new(config: &Config, originator: Address) -> Self {
        let mut ifaces = InterfaceTable::new();
        for (idx, iface_cfg) in config.interfaces.iter().enumerate() {
            let id = InterfaceId(idx as u32);
            let mut state = InterfaceState::new(id, iface_cfg.name.clone(), iface_cfg.mtu.unwrap_or(1500));
            state.up = true;
            state.local_addresses = iface_cfg.addresses.iter().filter_map(|a| parse_ip_address(a)).collect();
            ifaces.add(state);
        }

        let domains = config.domains.iter().map(|d| DomainId(d.id)).collect();
        let local_endpoints: Vec<(Prefix, DomainId, Metric)> = config
            .lan
            .iter()
            .filter_map(|lan| prefix_from_cidr(&lan.prefix).map(|prefix| (prefix, DomainId(lan.domain), Metric(lan.metric))))
            .collect();
        let willingness = config
            .interfaces
            .iter()
            .map(|i| i.willingness)
            .max()
            .map(Willingness::new)
            .unwrap_or_default();
        let mut timers = crate::timer::TimerWheel::new();
        for iface in ifaces.up_interfaces() {
            timers.schedule_periodic(0, config.timers.hello_interval_ms, TimerKind::Hello(iface.id));
        }
        timers.schedule_periodic(0, config.timers.tc_interval_ms, TimerKind::Tc);

        Self {
            nhdp: NhdpEngine::new(config.timers.to_nhdp_config()),
            tc: TcEngine::new(config.timers.to_tc_config()),
            fib: Fib::new(),
            counters: Counters::new(),
            duplicates: DuplicateSet::new(),
            domains,
            local_endpoints,
            willingness,
            originator,
            seqno_gen: crate::codec::PacketSeqGenerator::default(),
            timers,
            dirty: false,
            ifaces,
        }
    }

    fn our_addresses(&self) -> Vec<Address> {
        self.ifaces.iter().flat_map(|i| i.local_addresses.iter().copied()).collect()
    }

    /// Processes one inbound packet received on `iface` from `sender` (the
    /// UDP datagram's source address — NHDP identifies a HELLO's originator
    /// by transport source, never by anything carried in the RFC 5444
    /// payload itself). Malformed packets and messages are dropped silently
    /// (spec §7 codec error handling); accepted HELLO/TC content updates
    /// NHDP/TC state and may mark the daemon dirty for the next
    /// [`Daemon::settle`]. A TC accepted from a neighbor that has selected
    /// us as its flooding MPR is re-transmitted on every up interface
    /// (spec §4.5 "Forwarding"); those outbound packets are returned here.
    pub fn receive(&mut self, iface: InterfaceId, sender: Address, bytes: bytes::Bytes, now_ms: u64) -> Vec<OutboundPacket> {
        let Some(packet) = Packet::decode(bytes) else { return Vec::new() };
        let our_addresses = self.our_addresses();
        let mut outbound = Vec::new();
        for msg in &packet.messages {
            outbound.extend(self.dispatch_message(iface, sender, msg, &our_addresses, now_ms));
        }
        outbound
    }

    fn dispatch_message(
        &mut self,
        iface: InterfaceId,
        sender: Address,
        msg: &Message,
        our_addresses: &[Address],
        now_ms: u64,
    ) -> Vec<OutboundPacket> {
        match msg.msg_type {
            hello::MSG_TYPE_HELLO => {
                if our_addresses.contains(&sender) {
                    return Vec::new(); // our own HELLO reflected back by a hub
                }
                let Some(content) = hello::parse_hello(msg) else { return Vec::new() };
                self.nhdp.process_hello(iface, sender, &content, our_addresses, now_ms);
                self.counters.hellos_received += 1;
                self.dirty = true;
                Vec::new()
            }
            MSG_TYPE_TC => {
                let Some(originator) = msg.orig_addr else { return Vec::new() };
                if self.ifaces.owns_address(&originator) {
                    return Vec::new(); // ORIGINATOR_IS_SELF, spec §7
                }
                let seqno = msg.seqno.unwrap_or(0);
                let key = DupKey { msg_type: MSG_TYPE_TC, originator };
                if self.duplicates.check(key, seqno, now_ms, self.tc.config.hold_ms) != DupResult::New {
                    self.counters.duplicates_dropped += 1;
                    return Vec::new();
                }
                self.counters.tcs_received += 1;
                match self.tc.ingest(msg, now_ms) {
                    Some(TcAccept::Accepted) => self.dirty = true,
                    Some(TcAccept::StaleAnsn) => self.counters.tcs_rejected_stale_ansn += 1,
                    None => {}
                }
                self.forward_tc(sender, msg)
            }
            _ => Vec::new(), // unknown message type: not ours to interpret, let a future forwarder handle it
        }
    }

    /// Default MPR flooding (spec §4.5): re-transmits `msg` unmodified
    /// except for a decremented hop limit, on every up interface, but only
    /// when `sender` is a symmetric 1-hop neighbor that has selected this
    /// router as its flooding MPR — the set any router must retransmit
    /// through to guarantee network-wide coverage.
    fn forward_tc(&mut self, sender: Address, msg: &Message) -> Vec<OutboundPacket> {
        let Some(neighbor_id) = self.nhdp.neighbors.find_by_address(&sender) else { return Vec::new() };
        let Some(neighbor) = self.nhdp.neighbor(neighbor_id) else { return Vec::new() };
        if !neighbor.symmetric || !neighbor.selects_us(DomainId::FLOODING) {
            return Vec::new();
        }
        let hop_limit = msg.hop_limit.unwrap_or(0);
        if hop_limit <= 1 {
            return Vec::new(); // would reach 0: RFC 5444 hop limits stop here
        }
        let mut forwarded = msg.clone();
        forwarded.hop_limit = Some(hop_limit - 1);
        forwarded.hop_count = Some(forwarded.hop_count.unwrap_or(0).saturating_add(1));

        self.counters.tcs_forwarded += 1;
        let up_ifaces: Vec<InterfaceId> = self.ifaces.up_interfaces().map(|i| i.id).collect();
        up_ifaces.into_iter().flat_map(|iface| self.pack_for_interface(iface, vec![forwarded.clone()])).collect()
    }

    /// Fires every timer due by `now_ms`: periodic HELLO/TC production.
    /// Also expires stale NHDP/TC state, which may mark the daemon dirty.
    pub fn fire_timers(&mut self, now_ms: u64) -> Vec<OutboundPacket> {
        self.nhdp.expire(now_ms);
        self.tc.expire(now_ms);
        self.dirty = true;

        let due = self.timers.drain_due(now_ms);
        let mut outbound = Vec::new();
        for (_, kind) in due {
            match kind {
                TimerKind::Hello(iface) => outbound.extend(self.build_hello_packet(iface, now_ms)),
                TimerKind::Tc => outbound.extend(self.build_tc_packet(now_ms)),
            }
        }
        outbound
    }

    fn build_hello_packet(&mut self, iface: InterfaceId, _now_ms: u64) -> Vec<OutboundPacket> {
        let content: HelloContent = self.nhdp.build_hello(iface, self.willingness, &self.domains);
        let family = self.originator.family();
        let msg = hello::build_hello(family, &content);
        self.counters.hellos_sent += 1;
        self.pack_for_interface(iface, vec![msg])
    }

    /// A TC is flooded identically out every up interface (spec §4.2 MPR
    /// flooding), fragmented to each interface's own MTU (spec §4.1/§4.5)
    /// and bin-packed via [`Writer`], one or more packets per interface so
    /// each carries its own transport-level sequence number.
    fn build_tc_packet(&mut self, _now_ms: u64) -> Vec<OutboundPacket> {
        // RFC 7181 only requires advertising the MPR selector set: the
        // neighbors that picked us as one of their MPRs.
        let mpr_selectors: Vec<(Address, DomainId, Metric)> = self
            .nhdp
            .neighbors
            .symmetric_neighbors()
            .filter(|(_, n)| n.selects_us(DomainId::FLOODING))
            .flat_map(|(_, n)| n.addresses.iter().map(move |&a| (a, DomainId::FLOODING, n.metric(DomainId::FLOODING))))
            .collect();
        if mpr_selectors.is_empty() && self.local_endpoints.is_empty() {
            return Vec::new(); // nothing to advertise yet
        }
        let family = self.originator.family();
        self.counters.tcs_sent += 1;

        let up_ifaces: Vec<InterfaceId> = self.ifaces.up_interfaces().map(|i| i.id).collect();
        up_ifaces
            .into_iter()
            .flat_map(|iface| {
                let mtu = self.ifaces.get(iface).map(|i| i.mtu).unwrap_or(1500);
                let fragments = self.tc.build_tc(family, self.originator, 255, &mpr_selectors, &self.local_endpoints, mtu);
                self.pack_for_interface(iface, fragments)
            })
            .collect()
    }

    /// Bin-packs `messages` into one or more packets sized to `iface`'s MTU
    /// via [`Writer`] (spec §4.1 writer pipeline). A message that still
    /// can't fit on its own — the writer refuses to truncate it — is
    /// dropped and counted rather than sent malformed.
    fn pack_for_interface(&mut self, iface: InterfaceId, messages: Vec<Message>) -> Vec<OutboundPacket> {
        let mtu = self.ifaces.get(iface).map(|i| i.mtu).unwrap_or(1500);
        let writer = Writer::new(mtu);
        match writer.pack(messages, &mut self.seqno_gen) {
            Ok(packets) => packets.into_iter().map(|p| OutboundPacket { iface, bytes: p.encode().to_vec() }).collect(),
            Err(_) => {
                self.counters.messages_too_large_for_mtu += 1;
                Vec::new()
            }
        }
    }

    /// Recomputes MPR selection and routing if anything changed since the
    /// last settle, returning the resulting FIB delta. A no-op (empty
    /// diff) when nothing is dirty.
    pub fn settle(&mut self) -> FibDiff {
        if !self.dirty {
            return FibDiff::default();
        }
        self.dirty = false;

        let our_addresses: AHashSet<Address> = self.our_addresses().into_iter().collect();
        let mut domains = self.domains.clone();
        domains.push(DomainId::FLOODING);
        mpr::recompute(&mut self.nhdp, &domains, &our_addresses);

        let mut next_routes = ahash::AHashMap::default();
        for &domain in &self.domains {
            self.counters.dijkstra_runs += 1;
            let spf = dijkstra::compute(self.originator, &self.tc.db, &self.nhdp, domain);
            let routes = fib::build_routes(
                domain,
                &spf,
                |addr| self.tc.db.endpoints_from(addr).map(|e| e.dst).collect(),
                |next_hop| self.iface_toward(next_hop),
            );
            next_routes.extend(routes);
        }

        let diff = self.fib.replace(next_routes);
        self.counters.fib_routes_added += diff.added.len() as u64;
        self.counters.fib_routes_changed += diff.changed.len() as u64;
        self.counters.fib_routes_removed += diff.removed.len() as u64;
        diff
    }

    fn iface_toward(&self, next_hop: &Address) -> Option<InterfaceId> {
        self.nhdp
            .links()
            .find(|l| l.has_address(next_hop) || l.main_address == *next_hop)
            .map(|l| l.iface)
    }
}

fn parse_ip_address(text: &str) -> Option<Address> {
    match text.parse::<std::net::IpAddr>().ok()? {
        std::net::IpAddr::V4(a) => Some(Address::Inet(a)),
        std::net::IpAddr::V6(a) => Some(Address::Inet6(a)),
    }
}

fn prefix_from_cidr(cidr: &str) -> Option<Prefix> {
    let net: ipnet::IpNet = cidr.parse().ok()?;
    match net {
        ipnet::IpNet::V4(n) => Some(Address::Inet(n.addr()).to_prefix(n.prefix_len())),
        ipnet::IpNet::V6(n) => Some(Address::Inet6(n.addr()).to_prefix(n.prefix_len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::domains::DomainConfig;
    use crate::config::interfaces::InterfaceConfig;
    use crate::config::timers::TimersConfig;
    use std::net::Ipv4Addr;

    fn minimal_config() -> Config {
        Config {
            interfaces: vec![InterfaceConfig { name: "wlan0".into(), mtu: None, willingness: 3, addresses: vec![] }],
            domains: vec![DomainConfig { id: 0, name: "default".into() }],
            timers: TimersConfig::default(),
            lan: vec![],
        }
    }

    #[test]
    fn new_daemon_schedules_hello_and_tc_timers() {
        let config = minimal_config();
        let mut daemon = Daemon::new(&config, Address::Inet(Ipv4Addr::new(10, 0, 0, 1)));
        let fired = daemon.fire_timers(2_000);
        assert!(fired.iter().any(|p| p.iface == InterfaceId(0)) || fired.is_empty());
    }

    #[test]
    fn settle_is_a_noop_without_dirty_state() {
        let config = minimal_config();
        let mut daemon = Daemon::new(&config, Address::Inet(Ipv4Addr::new(10, 0, 0, 1)));
        let diff = daemon.settle();
        assert!(diff.added.is_empty() && diff.changed.is_empty() && diff.removed.is_empty());
    }

    #[test]
    fn receiving_a_hello_marks_daemon_dirty_and_settle_recomputes() {
        let config = minimal_config();
        let us = Address::Inet(Ipv4Addr::new(10, 0, 0, 1));
        let mut daemon = Daemon::new(&config, us);
        daemon.ifaces.set_addresses(InterfaceId(0), vec![us]).unwrap();

        let sender = Address::Inet(Ipv4Addr::new(10, 0, 0, 2));
        let content = HelloContent {
            validity_ms: 20_000,
            interval_ms: 2_000,
            willingness: Willingness::DEFAULT,
            entries: vec![crate::nhdp::hello::HelloAddressEntry {
                address: us,
                status: crate::nhdp::hello::WireLinkStatus::Symmetric,
                mpr_domains: vec![],
                metrics: vec![],
            }],
        };
        let msg = hello::build_hello(AddressFamily::Inet, &content);
        let mut packet = Packet::new();
        packet.messages.push(msg);
        let bytes = packet.encode().freeze();

        // 3 deliveries to clear hysteresis admission under the default
        // config (spec §8 scenario 1: symmetric within 3 HELLO intervals).
        for _ in 0..3 {
            daemon.receive(InterfaceId(0), sender, bytes.clone(), 0);
        }
        assert_eq!(daemon.counters.hellos_received, 3);
        let diff = daemon.settle();
        // the neighbor is reachable in one hop, so a route should appear
        assert!(!diff.added.is_empty());
    }

    #[test]
    fn duplicate_tc_is_not_double_counted() {
        let config = minimal_config();
        let us = Address::Inet(Ipv4Addr::new(10, 0, 0, 1));
        let mut daemon = Daemon::new(&config, us);

        let mut producer = TcEngine::new(crate::tc::TcConfig::default());
        let msgs = producer.build_tc(AddressFamily::Inet, Address::Inet(Ipv4Addr::new(10, 0, 0, 9)), 255, &[], &[], 1400);
        let mut packet = Packet::new();
        packet.messages.extend(msgs);
        let bytes = packet.encode().freeze();

        let relay = Address::Inet(Ipv4Addr::new(10, 0, 0, 9));
        daemon.receive(InterfaceId(0), relay, bytes.clone(), 0);
        daemon.receive(InterfaceId(0), relay, bytes, 1);
        assert_eq!(daemon.counters.tcs_received, 1);
        assert_eq!(daemon.counters.duplicates_dropped, 1);
    }
}
