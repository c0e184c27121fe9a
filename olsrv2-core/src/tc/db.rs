//! Topology (TC) database (spec §4.5 "TcDb"), grounded on the reference
//! implementation's `olsrv2_tc.c`.
//!
//! A [`TcNode`] exists in one of two states: *live*, meaning its own TC has
//! been accepted and it carries a running validity timer, or *virtual*,
//! meaning it is known only because some other router's TC lists it as a
//! neighbor or attached network — no validity timer of its own, and it
//! disappears the moment nothing references it any more. This mirrors
//! `olsrv2_tc_node_add`'s `virtual_` flag: a node is created virtual the
//! first time it's mentioned as an edge endpoint and only becomes live
//! once its own TC message arrives (see SPEC_FULL.md §11(a)).

use crate::address::{Address, Prefix};
use crate::domain::{seqno_is_newer_or_equal, DomainId, Metric};
use ahash::{AHashMap, AHashSet};

#[derive(Debug, Clone)]
pub struct TcNode {
    pub originator: Address,
    pub is_virtual: bool,
    pub ansn: u16,
    /// `None` while virtual; `Some(deadline)` once live.
    pub valid_until_ms: Option<u64>,
}

impl TcNode {
    fn virtual_at(originator: Address) -> Self {
        Self { originator, is_virtual: true, ansn: 0, valid_until_ms: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct EdgeKey {
    from: Address,
    to: Address,
    domain: DomainId,
}

#[derive(Debug, Clone)]
pub struct TcEdge {
    pub from: Address,
    pub to: Address,
    pub domain: DomainId,
    pub metric: Metric,
    /// The ANSN of the TC message that last refreshed this edge; an edge
    /// whose `ansn` doesn't match its origin node's latest ANSN after a
    /// COMPLETE message is implicitly withdrawn (SPEC_FULL.md §11(c)).
    pub ansn: u16,
    pub valid_until_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct EndpointKey {
    from: Address,
    dst: Prefix,
    domain: DomainId,
}

#[derive(Debug, Clone)]
pub struct TcEndpoint {
    pub from: Address,
    pub dst: Prefix,
    pub domain: DomainId,
    pub metric: Metric,
    pub ansn: u16,
    pub valid_until_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcAccept {
    /// The message updated this engine's view of `originator`.
    Accepted,
    /// `ansn` was not newer than (or equal to) what's already on file;
    /// the message is stale and was ignored (RFC 1982 comparison).
    StaleAnsn,
}

#[derive(Debug, Default)]
pub struct TcDb {
    nodes: AHashMap<Address, TcNode>,
    edges: AHashMap<EdgeKey, TcEdge>,
    endpoints: AHashMap<EndpointKey, TcEndpoint>,
    /// Reverse index: who has an edge pointing *at* this address. Used to
    /// decide whether a node that loses its own TC can be fully deleted
    /// or must be kept around (virtual) because others still reference it
    /// — the "back-pointer" the reference implementation keeps per edge.
    incoming: AHashMap<Address, AHashSet<Address>>,
    /// Addresses of our own currently-symmetric NHDP neighbors, tracked
    /// independent of any TC traffic about them (SPEC_FULL.md §11(b)).
    direct_neighbors: AHashSet<Address>,
}

impl TcDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, addr: &Address) -> Option<&TcNode> {
        self.nodes.get(addr)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TcNode> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &TcEdge> {
        self.edges.values()
    }

    pub fn edges_from(&self, addr: &Address) -> impl Iterator<Item = &TcEdge> {
        self.edges.values().filter(move |e| &e.from == addr)
    }

    pub fn endpoints_from(&self, addr: &Address) -> impl Iterator<Item = &TcEndpoint> {
        self.endpoints.values().filter(move |e| &e.from == addr)
    }

    pub fn set_direct_neighbor(&mut self, addr: Address, present: bool) {
        if present {
            self.direct_neighbors.insert(addr);
        } else {
            self.direct_neighbors.remove(&addr);
        }
    }

    pub fn is_direct_neighbor(&self, addr: &Address) -> bool {
        self.direct_neighbors.contains(addr)
    }

    fn ensure_virtual(&mut self, addr: Address) {
        self.nodes.entry(addr).or_insert_with(|| TcNode::virtual_at(addr));
    }

    /// Apply one TC message. `is_complete` is the message's
    /// `CONT_SEQ_NUM` completeness flag: when set, any edge/endpoint this
    /// router previously recorded for `originator` that wasn't refreshed
    /// by this message is implicitly withdrawn.
    #[allow(clippy::too_many_arguments)]
    pub fn process_tc(
        &mut self,
        originator: Address,
        ansn: u16,
        is_complete: bool,
        neighbors: &[(Address, DomainId, Metric)],
        endpoints: &[(Prefix, DomainId, Metric)],
        now_ms: u64,
        hold_ms: u64,
    ) -> TcAccept {
        self.ensure_virtual(originator);
        let node = self.nodes.get(&originator).expect("just ensured");
        if !node.is_virtual && !seqno_is_newer_or_equal(ansn, node.ansn) {
            return TcAccept::StaleAnsn;
        }

        self.nodes.insert(
            originator,
            TcNode { originator, is_virtual: false, ansn, valid_until_ms: Some(now_ms + hold_ms) },
        );

        for &(to, domain, metric) in neighbors {
            self.ensure_virtual(to);
            let key = EdgeKey { from: originator, to, domain };
            self.edges.insert(key, TcEdge { from: originator, to, domain, metric, ansn, valid_until_ms: now_ms + hold_ms });
            self.incoming.entry(to).or_default().insert(originator);
        }

        for &(dst, domain, metric) in endpoints {
            let key = EndpointKey { from: originator, dst, domain };
            self.endpoints.insert(key, TcEndpoint { from: originator, dst, domain, metric, ansn, valid_until_ms: now_ms + hold_ms });
        }

        if is_complete {
            self.sweep_stale(originator, ansn);
        }

        TcAccept::Accepted
    }

    /// Removes any edge/endpoint from `originator` whose `ansn` doesn't
    /// match the message that just completed — SPEC_FULL.md §11(c).
    fn sweep_stale(&mut self, originator: Address, current_ansn: u16) {
        let stale_edges: Vec<EdgeKey> =
            self.edges.values().filter(|e| e.from == originator && e.ansn != current_ansn).map(|e| EdgeKey { from: e.from, to: e.to, domain: e.domain }).collect();
        for key in stale_edges {
            self.remove_edge(key);
        }
        self.endpoints.retain(|k, e| !(k.from == originator && e.ansn != current_ansn));
    }

    fn remove_edge(&mut self, key: EdgeKey) {
        self.edges.remove(&key);
        if let Some(set) = self.incoming.get_mut(&key.to) {
            set.remove(&key.from);
            if set.is_empty() {
                self.incoming.remove(&key.to);
            }
        }
        self.prune_if_orphaned(key.to);
    }

    fn prune_if_orphaned(&mut self, addr: Address) {
        let Some(node) = self.nodes.get(&addr) else { return };
        if !node.is_virtual {
            return;
        }
        let has_incoming = self.incoming.get(&addr).map(|s| !s.is_empty()).unwrap_or(false);
        if !has_incoming {
            self.nodes.remove(&addr);
        }
    }

    /// Runs when `originator`'s own validity timer expires: its outgoing
    /// edges/endpoints are removed (they described its own stale view),
    /// and the node itself is deleted unless other routers still
    /// reference it, in which case it reverts to virtual.
    pub fn expire_node(&mut self, originator: Address) {
        let outgoing: Vec<EdgeKey> =
            self.edges.values().filter(|e| e.from == originator).map(|e| EdgeKey { from: e.from, to: e.to, domain: e.domain }).collect();
        for key in outgoing {
            self.remove_edge(key);
        }
        self.endpoints.retain(|k, _| k.from != originator);

        let has_incoming = self.incoming.get(&originator).map(|s| !s.is_empty()).unwrap_or(false);
        if has_incoming {
            if let Some(node) = self.nodes.get_mut(&originator) {
                node.is_virtual = true;
                node.ansn = 0;
                node.valid_until_ms = None;
            }
        } else {
            self.nodes.remove(&originator);
        }
    }

    /// Sweeps every live node whose validity timer has elapsed.
    pub fn expire_all(&mut self, now_ms: u64) {
        let expired: Vec<Address> = self
            .nodes
            .values()
            .filter(|n| !n.is_virtual && n.valid_until_ms.is_some_and(|t| t <= now_ms))
            .map(|n| n.originator)
            .collect();
        for addr in expired {
            self.expire_node(addr);
        }
    }
}
