//! Multi-node scenarios driven entirely through the public [`Daemon`] API:
//! real RFC 5444 bytes in, a [`olsrv2_core::routing::fib::FibDiff`] out.
//! No sockets, no clock — every "node" here is just another `Daemon` fed
//! hand-built packets, the same test double style as the rest of the crate.

use bytes::Bytes;
use olsrv2_core::address::{Address, AddressFamily};
use olsrv2_core::codec::Packet;
use olsrv2_core::config::domains::DomainConfig;
use olsrv2_core::config::interfaces::InterfaceConfig;
use olsrv2_core::config::timers::TimersConfig;
use olsrv2_core::config::Config;
use olsrv2_core::daemon::Daemon;
use olsrv2_core::domain::{DomainId, Metric, Willingness};
use olsrv2_core::iface::InterfaceId;
use olsrv2_core::nhdp::hello::{self, HelloAddressEntry, HelloContent, WireLinkStatus};
use olsrv2_core::tc::{TcConfig, TcEngine};
use std::net::Ipv4Addr;

fn addr(n: u8) -> Address {
    Address::Inet(Ipv4Addr::new(10, 0, 0, n))
}

fn single_domain_config(iface_name: &str, own_address: Address) -> Config {
    Config {
        interfaces: vec![InterfaceConfig {
            name: iface_name.to_string(),
            mtu: None,
            willingness: 3,
            addresses: vec![own_address.to_string()],
        }],
        domains: vec![DomainConfig { id: 0, name: "default".into() }],
        timers: TimersConfig::default(),
        lan: vec![],
    }
}

fn hello_bytes(entries: Vec<HelloAddressEntry>) -> Bytes {
    let content = HelloContent { validity_ms: 20_000, interval_ms: 2_000, willingness: Willingness::DEFAULT, entries };
    let msg = hello::build_hello(AddressFamily::Inet, &content);
    let mut packet = Packet::new();
    packet.messages.push(msg);
    packet.encode().freeze()
}

/// Bytes for a HELLO whose single address entry lists `us` as a symmetric
/// neighbor, the same hand-crafted shape `daemon.rs`'s own unit tests use to
/// bootstrap a link without simulating the full multi-round handshake.
fn symmetric_hello_bytes(us: Address) -> Bytes {
    hello_bytes(vec![HelloAddressEntry { address: us, status: WireLinkStatus::Symmetric, mpr_domains: vec![], metrics: vec![] }])
}

/// Same, but also declares the sender has selected `us` as its MPR for
/// `domain` — what a neighbor's `forward_tc` gate checks before relaying.
fn symmetric_mpr_hello_bytes(us: Address, domain: DomainId) -> Bytes {
    hello_bytes(vec![HelloAddressEntry { address: us, status: WireLinkStatus::Symmetric, mpr_domains: vec![domain], metrics: vec![] }])
}

/// Delivers the same HELLO three times: hysteresis (spec §8 scenario 1)
/// only admits a link to `Symmetric` after three HELLO intervals, even when
/// every delivery already lists us as symmetric.
fn establish_symmetric_link(daemon: &mut Daemon, iface: InterfaceId, sender: Address, bytes: Bytes) {
    for _ in 0..3 {
        daemon.receive(iface, sender, bytes.clone(), 0);
    }
}

fn tc_bytes(producer: &mut TcEngine, originator: Address, neighbors: &[(Address, DomainId, Metric)]) -> Bytes {
    let msgs = producer.build_tc(AddressFamily::Inet, originator, 255, neighbors, &[], 1400);
    let mut packet = Packet::new();
    packet.messages.extend(msgs);
    packet.encode().freeze()
}

#[test]
fn three_node_chain_routes_through_relay() {
    let a = addr(1);
    let b = addr(2);
    let c = addr(3);

    let mut daemon_a = Daemon::new(&single_domain_config("eth0", a), a);

    // A hears B directly: B's HELLO lists A as a symmetric neighbor.
    establish_symmetric_link(&mut daemon_a, InterfaceId(0), b, symmetric_hello_bytes(a));
    assert_eq!(daemon_a.counters.hellos_received, 3);

    // B, as a TC originator, advertises its own link to C (two hops from A).
    // Delivered directly — one hop from B to A, no forwarding involved.
    let mut b_producer = TcEngine::new(TcConfig::default());
    let b_tc = tc_bytes(&mut b_producer, b, &[(c, DomainId(0), Metric(5))]);
    daemon_a.receive(InterfaceId(0), b, b_tc, 0);
    assert_eq!(daemon_a.counters.tcs_received, 1);

    let diff = daemon_a.settle();

    let route_to_b = diff.added.iter().find(|r| r.key.dst.address == b).expect("direct neighbor route");
    assert_eq!(route_to_b.next_hop, b);

    let route_to_c = diff.added.iter().find(|r| r.key.dst.address == c).expect("two-hop route via relay");
    assert_eq!(route_to_c.next_hop, b);
    assert!(route_to_c.metric.0 > route_to_b.metric.0, "two-hop cost must exceed the one-hop cost");

    // C, previously known to A only as a virtual edge target inside B's TC,
    // now originates its own TC. B is a live daemon that has selected C's
    // flooding-MPR choice of itself, so it forwards the message unmodified
    // — originator still C, hop limit decremented by one — toward A.
    let mut daemon_b = Daemon::new(&single_domain_config("eth0", b), b);
    establish_symmetric_link(&mut daemon_b, InterfaceId(0), c, symmetric_mpr_hello_bytes(b, DomainId::FLOODING));

    let mut c_producer = TcEngine::new(TcConfig::default());
    let c_tc = tc_bytes(&mut c_producer, c, &[]);
    let forwarded = daemon_b.receive(InterfaceId(0), c, c_tc, 0);
    assert_eq!(daemon_b.counters.tcs_forwarded, 1);
    assert_eq!(forwarded.len(), 1);

    daemon_a.receive(InterfaceId(0), b, Bytes::from(forwarded[0].bytes.clone()), 1);
    let node_c = daemon_a.tc.db.node(&c).expect("C now known to A via the relayed TC");
    assert!(!node_c.is_virtual, "a relayed originator TC must make C a live node, not just a virtual edge target");
}

#[test]
fn relayed_tc_duplicate_is_dropped_once_not_twice() {
    let a = addr(1);
    let b = addr(2);
    let c = addr(3);

    let mut daemon_a = Daemon::new(&single_domain_config("eth0", a), a);
    establish_symmetric_link(&mut daemon_a, InterfaceId(0), b, symmetric_hello_bytes(a));

    let mut producer = TcEngine::new(TcConfig::default());
    let bytes = tc_bytes(&mut producer, b, &[(c, DomainId(0), Metric(5))]);

    // The same TC arrives twice, as it would if a second relay flooded it too.
    daemon_a.receive(InterfaceId(0), b, bytes.clone(), 0);
    daemon_a.receive(InterfaceId(0), b, bytes, 1);

    assert_eq!(daemon_a.counters.tcs_received, 1);
    assert_eq!(daemon_a.counters.duplicates_dropped, 1);
}

#[test]
fn implicit_withdrawal_removes_the_stale_route() {
    let a = addr(1);
    let b = addr(2);
    let c = addr(3);

    let mut daemon_a = Daemon::new(&single_domain_config("eth0", a), a);
    establish_symmetric_link(&mut daemon_a, InterfaceId(0), b, symmetric_hello_bytes(a));

    let mut producer = TcEngine::new(TcConfig::default());
    let first = tc_bytes(&mut producer, b, &[(c, DomainId(0), Metric(5))]);
    daemon_a.receive(InterfaceId(0), b, first, 0);
    let diff = daemon_a.settle();
    assert!(diff.added.iter().any(|r| r.key.dst.address == c));

    // B's next (complete) TC no longer lists C: an implicit withdrawal via
    // the ANSN-tagged sweep, not an explicit delete message.
    let second = tc_bytes(&mut producer, b, &[]);
    daemon_a.receive(InterfaceId(0), b, second, 1);
    let diff = daemon_a.settle();
    assert!(diff.removed.iter().any(|key| key.dst.address == c));
}
