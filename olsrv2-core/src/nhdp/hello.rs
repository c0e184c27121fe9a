//! HELLO message production and consumption (spec §4.3 "HELLO").
//!
//! Wire shape: message-level `VALIDITY_TIME`/`INTERVAL_TIME`/`WILLINGNESS`
//! TLVs, then one address per link/neighbor address known on this
//! interface, each carrying a `LINK_STATUS` address-TLV and, per routing
//! domain, an optional `LINK_METRIC` and `MPR` address-TLV (`MPR`'s
//! presence, not its value, is what matters — it means "I have selected
//! the owner of this address as my MPR for this domain").

use crate::address::{Address, AddressFamily};
use crate::codec::{Message, Tlv};
use crate::domain::{decode_time8, encode_time8, DomainId, Metric, Willingness};

pub const MSG_TYPE_HELLO: u8 = 0;

const TLV_VALIDITY_TIME: u8 = 1;
const TLV_INTERVAL_TIME: u8 = 2;
const TLV_WILLINGNESS: u8 = 3;
const TLV_LINK_STATUS: u8 = 10;
const TLV_LINK_METRIC: u8 = 11;
const TLV_MPR: u8 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireLinkStatus {
    Heard,
    Symmetric,
    Lost,
}

impl WireLinkStatus {
    fn to_byte(self) -> u8 {
        match self {
            WireLinkStatus::Heard => 0,
            WireLinkStatus::Symmetric => 1,
            WireLinkStatus::Lost => 2,
        }
    }

    fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(WireLinkStatus::Heard),
            1 => Some(WireLinkStatus::Symmetric),
            2 => Some(WireLinkStatus::Lost),
            _ => None,
        }
    }
}

/// One neighbor-address entry as it will appear in the outgoing HELLO.
#[derive(Debug, Clone)]
pub struct HelloAddressEntry {
    pub address: Address,
    pub status: WireLinkStatus,
    pub mpr_domains: Vec<DomainId>,
    pub metrics: Vec<(DomainId, Metric)>,
}

#[derive(Debug, Clone)]
pub struct HelloContent {
    pub validity_ms: u64,
    pub interval_ms: u64,
    pub willingness: Willingness,
    pub entries: Vec<HelloAddressEntry>,
}

pub fn build_hello(family: AddressFamily, content: &HelloContent) -> Message {
    let mut msg = Message::new(MSG_TYPE_HELLO, family);
    msg.msg_tlvs.push(Tlv::with_value(TLV_VALIDITY_TIME, vec![encode_time8(content.validity_ms)]));
    msg.msg_tlvs.push(Tlv::with_value(TLV_INTERVAL_TIME, vec![encode_time8(content.interval_ms)]));
    msg.msg_tlvs.push(Tlv::with_value(TLV_WILLINGNESS, vec![content.willingness.value()]));

    for (idx, entry) in content.entries.iter().enumerate() {
        let idx = idx as u8;
        msg.addresses.push((entry.address, entry.address.maxbits()));
        msg.addr_tlvs.push(
            Tlv::with_value(TLV_LINK_STATUS, vec![entry.status.to_byte()]).with_index_range(idx, idx),
        );
        for domain in &entry.mpr_domains {
            msg.addr_tlvs.push(Tlv::new(TLV_MPR).with_ext(domain.0).with_index_range(idx, idx));
        }
        for (domain, metric) in &entry.metrics {
            if let Some(field) = metric.encode12() {
                msg.addr_tlvs.push(
                    Tlv::with_value(TLV_LINK_METRIC, field.to_be_bytes().to_vec())
                        .with_ext(domain.0)
                        .with_index_range(idx, idx),
                );
            }
        }
    }
    msg
}

pub fn parse_hello(msg: &Message) -> Option<HelloContent> {
    if msg.msg_type != MSG_TYPE_HELLO {
        return None;
    }
    let validity_ms = msg
        .msg_tlvs
        .iter()
        .find(|t| t.tlv_type == TLV_VALIDITY_TIME)
        .and_then(|t| t.value.as_ref())
        .and_then(|v| v.first())
        .map(|b| decode_time8(*b))?;
    let interval_ms = msg
        .msg_tlvs
        .iter()
        .find(|t| t.tlv_type == TLV_INTERVAL_TIME)
        .and_then(|t| t.value.as_ref())
        .and_then(|v| v.first())
        .map(|b| decode_time8(*b))
        .unwrap_or(validity_ms);
    let willingness = msg
        .msg_tlvs
        .iter()
        .find(|t| t.tlv_type == TLV_WILLINGNESS)
        .and_then(|t| t.value.as_ref())
        .and_then(|v| v.first())
        .map(|b| Willingness::new(*b))
        .unwrap_or_default();

    let mut entries = Vec::with_capacity(msg.addresses.len());
    for (idx, (address, _len)) in msg.addresses.iter().enumerate() {
        let idx = idx as u8;
        let covers = |tlv: &&Tlv| tlv.index_range.map(|(s, e)| idx >= s && idx <= e).unwrap_or(true);

        let status = msg
            .addr_tlvs
            .iter()
            .filter(|t| t.tlv_type == TLV_LINK_STATUS)
            .filter(covers)
            .find_map(|t| t.value.as_ref().and_then(|v| v.first()).and_then(|b| WireLinkStatus::from_byte(*b)))
            .unwrap_or(WireLinkStatus::Heard);

        let mpr_domains = msg
            .addr_tlvs
            .iter()
            .filter(|t| t.tlv_type == TLV_MPR)
            .filter(covers)
            .filter_map(|t| t.ext_type.map(DomainId))
            .collect();

        let metrics = msg
            .addr_tlvs
            .iter()
            .filter(|t| t.tlv_type == TLV_LINK_METRIC)
            .filter(covers)
            .filter_map(|t| {
                let domain = DomainId(t.ext_type?);
                let value = t.value.as_ref()?;
                let field = u16::from_be_bytes([*value.first()?, *value.get(1)?]);
                Some((domain, Metric::decode12(field)))
            })
            .collect();

        entries.push(HelloAddressEntry { address: *address, status, mpr_domains, metrics });
    }

    Some(HelloContent { validity_ms, interval_ms, willingness, entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn round_trips_hello_with_mixed_entries() {
        let content = HelloContent {
            validity_ms: 20_000,
            interval_ms: 2_000,
            willingness: Willingness::DEFAULT,
            entries: vec![
                HelloAddressEntry {
                    address: Address::Inet(Ipv4Addr::new(10, 0, 0, 1)),
                    status: WireLinkStatus::Symmetric,
                    mpr_domains: vec![DomainId(0)],
                    metrics: vec![(DomainId(0), Metric(100))],
                },
                HelloAddressEntry {
                    address: Address::Inet(Ipv4Addr::new(10, 0, 0, 2)),
                    status: WireLinkStatus::Heard,
                    mpr_domains: vec![],
                    metrics: vec![],
                },
            ],
        };
        let msg = build_hello(AddressFamily::Inet, &content);
        let parsed = parse_hello(&msg).unwrap();
        assert_eq!(parsed.entries.len(), 2);
        assert_eq!(parsed.entries[0].status, WireLinkStatus::Symmetric);
        assert_eq!(parsed.entries[0].mpr_domains, vec![DomainId(0)]);
        assert!(parsed.entries[0].metrics[0].1 .0 >= 100);
        assert_eq!(parsed.entries[1].status, WireLinkStatus::Heard);
        assert!(parsed.entries[1].mpr_domains.is_empty());
    }

    #[test]
    fn non_hello_message_is_rejected() {
        let msg = Message::new(99, AddressFamily::Inet);
        assert!(parse_hello(&msg).is_none());
    }
}
