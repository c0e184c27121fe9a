//! Local interfaces (spec §3 "Interface", §6 "Interface adapter contract").
//!
//! [`InterfaceTable`] is the engine's own bookkeeping — which interfaces
//! exist, their local addresses and MTU. [`InterfaceAdapter`] is the
//! embedder's collaborator for actually sending bytes and learning about
//! up/down and address changes, mirroring the split already used by
//! [`crate::timer`].

use crate::address::Address;
use crate::error::{OlsrError, Result};
use ahash::AHashMap;

/// Stable handle for a local interface, independent of OS ifindex renumbering
/// across restarts (the embedder is responsible for keeping the mapping
/// stable for the life of one process).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InterfaceId(pub u32);

#[derive(Debug, Clone)]
pub struct InterfaceState {
    pub id: InterfaceId,
    pub name: String,
    pub mtu: usize,
    pub up: bool,
    pub local_addresses: Vec<Address>,
}

impl InterfaceState {
    pub fn new(id: InterfaceId, name: impl Into<String>, mtu: usize) -> Self {
        Self { id, name: name.into(), mtu, up: false, local_addresses: Vec::new() }
    }

    pub fn has_address(&self, addr: &Address) -> bool {
        self.local_addresses.contains(addr)
    }
}

/// The engine's view of every locally configured OLSR interface (spec §3
/// "InterfaceSet"). Kept separate from [`InterfaceAdapter`] so NHDP logic
/// can be unit-tested by mutating this table directly, without a socket.
#[derive(Debug, Default)]
pub struct InterfaceTable {
    interfaces: AHashMap<InterfaceId, InterfaceState>,
}

impl InterfaceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, state: InterfaceState) {
        self.interfaces.insert(state.id, state);
    }

    pub fn remove(&mut self, id: InterfaceId) -> Option<InterfaceState> {
        self.interfaces.remove(&id)
    }

    pub fn get(&self, id: InterfaceId) -> Option<&InterfaceState> {
        self.interfaces.get(&id)
    }

    pub fn get_mut(&mut self, id: InterfaceId) -> Option<&mut InterfaceState> {
        self.interfaces.get_mut(&id)
    }

    pub fn set_up(&mut self, id: InterfaceId, up: bool) -> Result<()> {
        self.interfaces.get_mut(&id).map(|i| i.up = up).ok_or(OlsrError::UnknownInterface(id.0))
    }

    pub fn set_addresses(&mut self, id: InterfaceId, addresses: Vec<Address>) -> Result<()> {
        let iface = self.interfaces.get_mut(&id).ok_or(OlsrError::UnknownInterface(id.0))?;
        iface.local_addresses = addresses;
        Ok(())
    }

    /// Does any up interface carry this address as one of its own? Used to
    /// recognize our own HELLOs reflected by a hub, and to reject a remote
    /// TC advertising one of our own addresses as a neighbor (spec §4.5
    /// "duplicate originator" edge case).
    pub fn owns_address(&self, addr: &Address) -> bool {
        self.interfaces.values().any(|i| i.up && i.has_address(addr))
    }

    pub fn up_interfaces(&self) -> impl Iterator<Item = &InterfaceState> {
        self.interfaces.values().filter(|i| i.up)
    }

    pub fn iter(&self) -> impl Iterator<Item = &InterfaceState> {
        self.interfaces.values()
    }
}

/// External collaborator (§6): actually transmits bytes and reports link
/// status/address changes. The core never opens a socket itself.
pub trait InterfaceAdapter {
    /// Send `packet` out `iface` to its configured multicast/broadcast
    /// destination. Best-effort: a transient send failure is logged by the
    /// embedder and does not become an [`OlsrError`].
    fn send(&mut self, iface: InterfaceId, packet: &[u8]);

    fn mtu(&self, iface: InterfaceId) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn unknown_interface_set_up_errors() {
        let mut table = InterfaceTable::new();
        assert!(matches!(table.set_up(InterfaceId(1), true), Err(OlsrError::UnknownInterface(1))));
    }

    #[test]
    fn owns_address_only_considers_up_interfaces() {
        let mut table = InterfaceTable::new();
        let addr = Address::Inet(Ipv4Addr::new(10, 0, 0, 1));
        let mut iface = InterfaceState::new(InterfaceId(1), "wlan0", 1500);
        iface.local_addresses.push(addr);
        table.add(iface);
        assert!(!table.owns_address(&addr));
        table.set_up(InterfaceId(1), true).unwrap();
        assert!(table.owns_address(&addr));
    }

    #[test]
    fn remove_returns_removed_state() {
        let mut table = InterfaceTable::new();
        table.add(InterfaceState::new(InterfaceId(2), "eth0", 1500));
        assert!(table.remove(InterfaceId(2)).is_some());
        assert!(table.get(InterfaceId(2)).is_none());
    }
}
