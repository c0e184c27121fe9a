//! Forwarding table entries and the kernel-facing adapter (spec §4.6
//! "FIB"/"RouteKey", §6 "FIB adapter contract").

use crate::address::{Address, Prefix, RouteKey};
use crate::domain::{DomainId, Metric};
use crate::iface::InterfaceId;
use ahash::AHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub key: RouteKey,
    pub next_hop: Address,
    pub iface: InterfaceId,
    pub domain: DomainId,
    pub metric: Metric,
}

/// This router's current view of the forwarding table, keyed the same way
/// the kernel FIB is (spec §3 "RouteKey"): one entry per destination prefix
/// (optionally source-specific). Recomputed wholesale each settle cycle and
/// diffed against the previous snapshot so only changed routes are pushed
/// to the adapter (spec §5 "settle: ... FIB diff-apply").
#[derive(Debug, Default, Clone)]
pub struct Fib {
    routes: AHashMap<RouteKey, Route>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FibDiff {
    pub added: Vec<Route>,
    pub changed: Vec<Route>,
    pub removed: Vec<RouteKey>,
}

impl Fib {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &RouteKey) -> Option<&Route> {
        self.routes.get(key)
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }

    /// Replaces the whole table with `next`, returning what changed so the
    /// caller can push only the delta to a [`FibAdapter`].
    pub fn replace(&mut self, next: AHashMap<RouteKey, Route>) -> FibDiff {
        let mut diff = FibDiff::default();
        for (key, route) in &next {
            match self.routes.get(key) {
                None => diff.added.push(*route),
                Some(existing) if existing != route => diff.changed.push(*route),
                Some(_) => {}
            }
        }
        for key in self.routes.keys() {
            if !next.contains_key(key) {
                diff.removed.push(*key);
            }
        }
        self.routes = next;
        diff
    }
}

/// External collaborator (§6): programs the host kernel's routing table.
/// The core computes *what* the table should look like; the embedder is
/// responsible for *how* (`ip route`, netlink, a platform-specific API).
pub trait FibAdapter {
    /// Install or update a route. A failure here that persists across
    /// retries surfaces to the daemon as
    /// [`crate::error::OlsrError::FibPermanentFailure`].
    fn add_or_update(&mut self, route: &Route) -> std::result::Result<(), ()>;

    fn remove(&mut self, key: &RouteKey);
}

/// Applies one diff to `adapter`, returning the route keys whose
/// `add_or_update` failed so the daemon can decide whether to retry or
/// escalate to [`crate::error::OlsrError::FibPermanentFailure`].
pub fn apply_diff(adapter: &mut dyn FibAdapter, diff: &FibDiff) -> Vec<RouteKey> {
    let mut failed = Vec::new();
    for route in diff.added.iter().chain(diff.changed.iter()) {
        if adapter.add_or_update(route).is_err() {
            failed.push(route.key);
        }
    }
    for key in &diff.removed {
        adapter.remove(key);
    }
    failed
}

/// Builds the full next-hop-only FIB for one domain from an [`super::dijkstra::SpfResult`],
/// resolving each reachable node's advertised attached-network prefixes
/// (endpoints) in addition to its own host route.
pub fn build_routes(
    domain: DomainId,
    spf: &super::dijkstra::SpfResult,
    endpoints_by_origin: impl Fn(&Address) -> Vec<Prefix>,
    iface_of_next_hop: impl Fn(&Address) -> Option<InterfaceId>,
) -> AHashMap<RouteKey, Route> {
    let mut routes = AHashMap::default();
    for (&addr, &distance) in &spf.distance {
        let Some(&next_hop) = spf.next_hop.get(&addr) else { continue }; // `us` itself
        let Some(iface) = iface_of_next_hop(&next_hop) else { continue };

        let key = RouteKey::destination_only(addr.host_prefix());
        routes.insert(key, Route { key, next_hop, iface, domain, metric: distance });

        for prefix in endpoints_by_origin(&addr) {
            let key = RouteKey::destination_only(prefix);
            routes.insert(key, Route { key, next_hop, iface, domain, metric: distance });
        }
    }
    routes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn addr(n: u8) -> Address {
        Address::Inet(Ipv4Addr::new(10, 0, 0, n))
    }

    fn route(n: u8, metric: u32) -> Route {
        Route {
            key: RouteKey::destination_only(addr(n).host_prefix()),
            next_hop: addr(n),
            iface: InterfaceId(0),
            domain: DomainId::FLOODING,
            metric: Metric(metric),
        }
    }

    #[test]
    fn replace_reports_added_changed_and_removed() {
        let mut fib = Fib::new();
        let mut first = AHashMap::default();
        first.insert(route(1, 10).key, route(1, 10));
        first.insert(route(2, 10).key, route(2, 10));
        let diff = fib.replace(first);
        assert_eq!(diff.added.len(), 2);

        let mut second = AHashMap::default();
        second.insert(route(1, 10).key, route(1, 10)); // unchanged
        second.insert(route(2, 20).key, route(2, 20)); // changed metric
        let diff = fib.replace(second);
        assert_eq!(diff.changed.len(), 1);
        assert_eq!(diff.added.len(), 0);
        assert_eq!(diff.removed.len(), 0);
    }

    #[test]
    fn removed_routes_are_reported_when_absent_from_next() {
        let mut fib = Fib::new();
        let mut first = AHashMap::default();
        first.insert(route(1, 10).key, route(1, 10));
        fib.replace(first);
        let diff = fib.replace(AHashMap::default());
        assert_eq!(diff.removed, vec![route(1, 10).key]);
    }

    struct RecordingAdapter {
        installed: Vec<RouteKey>,
        removed: Vec<RouteKey>,
        reject: RouteKey,
    }

    impl FibAdapter for RecordingAdapter {
        fn add_or_update(&mut self, route: &Route) -> std::result::Result<(), ()> {
            if route.key == self.reject {
                return Err(());
            }
            self.installed.push(route.key);
            Ok(())
        }
        fn remove(&mut self, key: &RouteKey) {
            self.removed.push(*key);
        }
    }

    #[test]
    fn apply_diff_reports_failed_keys_but_keeps_applying_the_rest() {
        let r1 = route(1, 10);
        let r2 = route(2, 10);
        let mut adapter = RecordingAdapter { installed: vec![], removed: vec![], reject: r1.key };
        let diff = FibDiff { added: vec![r1, r2], changed: vec![], removed: vec![] };
        let failed = apply_diff(&mut adapter, &diff);
        assert_eq!(failed, vec![r1.key]);
        assert_eq!(adapter.installed, vec![r2.key]);
    }
}
