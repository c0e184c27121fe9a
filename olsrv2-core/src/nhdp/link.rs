//! Per-interface link records (spec §4.3 "Link"), the unit NHDP tracks
//! before a neighbor relationship is even established.

use super::hysteresis::{HysteresisConfig, HysteresisState};
use crate::address::Address;
use crate::iface::InterfaceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkId(pub u32);

/// RFC 6130 §2 link status life cycle: a link starts `Pending` (created
/// but not yet referenced by any HELLO), becomes `Heard` on the first
/// HELLO received over it, `Symmetric` once a HELLO from the neighbor
/// lists one of our own addresses *and* hysteresis admits the link, and
/// `Lost` once its validity timer expires without being refreshed (or
/// hysteresis demotes it outright).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Pending,
    Heard,
    Symmetric,
    Lost,
}

#[derive(Debug, Clone)]
pub struct Link {
    pub id: LinkId,
    pub iface: InterfaceId,
    /// The address this link was discovered under — typically the
    /// neighbor's HELLO source address. Stable identity key for
    /// `link_by_addr` lookups even as `neighbor_addresses` grows.
    pub main_address: Address,
    /// Addresses the neighbor advertised as belonging to the interface
    /// this link runs over (its "local interface" addresses, not every
    /// address it owns).
    pub neighbor_addresses: Vec<Address>,
    pub status: LinkStatus,
    /// Deadline (monotonic ms) after which, absent a refresh, the link
    /// status degrades — `L_heard_time` while `Heard`, `L_SYM_time` while
    /// `Symmetric`.
    pub expires_at_ms: u64,
    /// Deadline after which the link record itself is deleted even if a
    /// later HELLO could have revived it (`L_time`, always >= the status
    /// expiry).
    pub lost_at_ms: u64,
    pub neighbor_id: Option<super::neighbor::NeighborId>,
    /// Link-quality hysteresis (spec §4.3 step 6), debouncing promotion to
    /// `Symmetric` and demotion back out of it.
    pub hysteresis: HysteresisState,
}

impl Link {
    pub fn new(
        id: LinkId,
        iface: InterfaceId,
        main_address: Address,
        now_ms: u64,
        heard_hold_ms: u64,
        lost_hold_ms: u64,
    ) -> Self {
        Self {
            id,
            iface,
            main_address,
            neighbor_addresses: Vec::new(),
            status: LinkStatus::Pending,
            expires_at_ms: now_ms + heard_hold_ms,
            lost_at_ms: now_ms + lost_hold_ms,
            neighbor_id: None,
            hysteresis: HysteresisState::new(),
        }
    }

    pub fn is_symmetric(&self) -> bool {
        matches!(self.status, LinkStatus::Symmetric)
    }

    pub fn has_address(&self, addr: &Address) -> bool {
        self.neighbor_addresses.contains(addr)
    }

    /// Advance the status per a freshly received HELLO: `we_are_listed`
    /// is whether the HELLO's OTHER_NEIGHB addresses include one of ours.
    /// Any HELLO clears `Pending` to `Heard`; promotion on to `Symmetric`
    /// additionally requires hysteresis to have admitted the link.
    pub fn on_hello(
        &mut self,
        now_ms: u64,
        we_are_listed: bool,
        hysteresis: &HysteresisConfig,
        sym_hold_ms: u64,
        heard_hold_ms: u64,
        lost_hold_ms: u64,
    ) {
        self.hysteresis.on_hello_received(hysteresis);
        self.status = if we_are_listed && self.hysteresis.is_admitted() {
            LinkStatus::Symmetric
        } else {
            LinkStatus::Heard
        };
        self.expires_at_ms = now_ms + if self.status == LinkStatus::Symmetric { sym_hold_ms } else { heard_hold_ms };
        self.lost_at_ms = now_ms + lost_hold_ms;
    }

    /// Timer-driven decay: a `Symmetric` link whose hold time elapsed
    /// drops back to `Heard` rather than straight to `Lost`, mirroring
    /// RFC 6130's two-stage timeout (`L_SYM_time` then `L_heard_time`).
    /// A link whose hysteresis quality has dropped below the reject
    /// threshold is forced straight to `Lost` regardless of stage.
    pub fn on_expiry(&mut self, hysteresis: &HysteresisConfig) {
        self.hysteresis.on_hello_missed(hysteresis);
        if !self.hysteresis.is_admitted() {
            self.status = LinkStatus::Lost;
            return;
        }
        self.status = match self.status {
            LinkStatus::Pending => LinkStatus::Lost,
            LinkStatus::Symmetric => LinkStatus::Heard,
            LinkStatus::Heard | LinkStatus::Lost => LinkStatus::Lost,
        };
    }

    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.lost_at_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn addr() -> Address {
        Address::Inet(Ipv4Addr::new(10, 0, 0, 9))
    }

    #[test]
    fn new_link_starts_pending() {
        let link = Link::new(LinkId(1), InterfaceId(0), addr(), 0, 1000, 5000);
        assert_eq!(link.status, LinkStatus::Pending);
    }

    #[test]
    fn first_hello_clears_pending_to_heard_even_if_listed() {
        // Hysteresis hasn't admitted the link yet, so even a HELLO that
        // lists us can only reach Heard, not Symmetric (spec §4.3 step 6).
        let mut link = Link::new(LinkId(1), InterfaceId(0), addr(), 0, 1000, 5000);
        link.on_hello(10, true, &HysteresisConfig::default(), 2000, 1000, 5000);
        assert_eq!(link.status, LinkStatus::Heard);
    }

    #[test]
    fn hello_listing_us_promotes_to_symmetric_once_hysteresis_admits() {
        let config = HysteresisConfig::default();
        let mut link = Link::new(LinkId(1), InterfaceId(0), addr(), 0, 1000, 5000);
        // Matches spec §8 scenario 1: convergence within 3 HELLO intervals
        // under the default hysteresis configuration.
        for _ in 0..3 {
            link.on_hello(10, true, &config, 2000, 1000, 5000);
        }
        assert!(link.is_symmetric());
    }

    #[test]
    fn hello_not_listing_us_stays_heard() {
        let config = HysteresisConfig::default();
        let mut link = Link::new(LinkId(1), InterfaceId(0), addr(), 0, 1000, 5000);
        for _ in 0..3 {
            link.on_hello(10, false, &config, 2000, 1000, 5000);
        }
        assert_eq!(link.status, LinkStatus::Heard);
    }

    #[test]
    fn symmetric_decays_to_heard_then_lost_on_expiry() {
        let config = HysteresisConfig::default();
        let mut link = Link::new(LinkId(1), InterfaceId(0), addr(), 0, 1000, 5000);
        for _ in 0..3 {
            link.on_hello(10, true, &config, 2000, 1000, 5000);
        }
        assert!(link.is_symmetric());
        link.on_expiry(&config);
        assert_eq!(link.status, LinkStatus::Heard);
        link.on_expiry(&config);
        assert_eq!(link.status, LinkStatus::Lost);
    }
}
