//! Topology Control: the TC database plus message ingestion/production
//! (spec §4.5), following the same engine-wraps-state shape as [`crate::nhdp`].

pub mod db;
pub mod wire;

use crate::address::{Address, AddressFamily, Prefix};
use crate::domain::{DomainId, Metric};
pub use db::{TcAccept, TcDb, TcEdge, TcEndpoint, TcNode};
pub use wire::{TcAdvertisement, TcWireContent, MSG_TYPE_TC};

use crate::codec::Message;

#[derive(Debug, Clone, Copy)]
pub struct TcConfig {
    /// How long an accepted TC's edges/endpoints stay valid absent a refresh.
    pub hold_ms: u64,
    /// Minimum gap between this router's own TC transmissions.
    pub tc_interval_ms: u64,
}

impl Default for TcConfig {
    fn default() -> Self {
        Self { hold_ms: 30_000, tc_interval_ms: 5_000 }
    }
}

#[derive(Debug)]
pub struct TcEngine {
    pub config: TcConfig,
    pub db: TcDb,
    next_ansn: u16,
}

impl TcEngine {
    pub fn new(config: TcConfig) -> Self {
        Self { config, db: TcDb::new(), next_ansn: 0 }
    }

    /// Consumes one already-parsed TC message, applying RFC 1982 ANSN
    /// gating and the COMPLETE-message implicit-withdrawal sweep.
    pub fn ingest(&mut self, msg: &Message, now_ms: u64) -> Option<TcAccept> {
        let content = wire::parse_tc(msg)?;
        let neighbors: Vec<(Address, DomainId, Metric)> = content
            .advertisements
            .iter()
            .filter(|a| !a.is_endpoint)
            .map(|a| (a.prefix.address, a.domain, a.metric))
            .collect();
        let endpoints: Vec<(Prefix, DomainId, Metric)> = content
            .advertisements
            .iter()
            .filter(|a| a.is_endpoint)
            .map(|a| (a.prefix, a.domain, a.metric))
            .collect();
        Some(self.db.process_tc(
            content.originator,
            content.ansn,
            content.is_complete,
            &neighbors,
            &endpoints,
            now_ms,
            self.config.hold_ms,
        ))
    }

    /// Builds this router's own TC message(s) advertising `mpr_selectors`
    /// (the neighbors that selected *us* as an MPR — RFC 7181 only
    /// requires advertising the MPR selector set, not every neighbor) plus
    /// any locally attached network prefixes. Splits into several
    /// messages sharing one ANSN, each marked incomplete but the last,
    /// when the full advertisement set wouldn't fit in `mtu` bytes (spec
    /// §4.1 writer fragmentation, §4.5 TC production).
    pub fn build_tc(
        &mut self,
        family: AddressFamily,
        originator: Address,
        hop_limit: u8,
        mpr_selectors: &[(Address, DomainId, Metric)],
        local_endpoints: &[(Prefix, DomainId, Metric)],
        mtu: usize,
    ) -> Vec<Message> {
        let ansn = self.next_ansn;
        self.next_ansn = self.next_ansn.wrapping_add(1);

        let mut advertisements: Vec<TcAdvertisement> = mpr_selectors
            .iter()
            .map(|&(addr, domain, metric)| TcAdvertisement { prefix: addr.host_prefix(), domain, metric, is_endpoint: false })
            .collect();
        advertisements.extend(
            local_endpoints
                .iter()
                .map(|&(prefix, domain, metric)| TcAdvertisement { prefix, domain, metric, is_endpoint: true }),
        );

        wire::build_tc_fragments(family, originator, ansn, hop_limit, advertisements, mtu)
    }

    pub fn expire(&mut self, now_ms: u64) {
        self.db.expire_all(now_ms);
    }
}
