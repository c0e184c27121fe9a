//! TC message wire encoding (spec §4.5 "TC message"), grounded on
//! `olsrv2_writer.c`/`olsrv2_reader.c`'s ANSN-carrying, CONT_SEQ_NUM-flagged
//! TC message shape.
//!
//! Reuses the message's own `seqno` field for the ANSN (RFC 7181 sends the
//! ANSN as the message sequence number, not a separate TLV) and marks each
//! advertised address as either a neighbor (host prefix) or an attached
//! network endpoint (arbitrary prefix length) via a presence-only
//! `ENDPOINT` address-TLV.

use crate::address::{Address, AddressFamily, Prefix};
use crate::codec::{Message, Tlv};
use crate::domain::{DomainId, Metric};

pub const MSG_TYPE_TC: u8 = 1;

const TLV_CONT_SEQ_NUM: u8 = 20;
const TLV_ENDPOINT: u8 = 21;
const TLV_LINK_METRIC: u8 = 22;

const CONT_SEQ_NUM_COMPLETE: u8 = 1;
const CONT_SEQ_NUM_INCOMPLETE: u8 = 0;

#[derive(Debug, Clone)]
pub struct TcAdvertisement {
    pub prefix: Prefix,
    pub domain: DomainId,
    pub metric: Metric,
    pub is_endpoint: bool,
}

#[derive(Debug, Clone)]
pub struct TcWireContent {
    pub originator: Address,
    pub ansn: u16,
    pub is_complete: bool,
    pub hop_limit: u8,
    pub advertisements: Vec<TcAdvertisement>,
}

pub fn build_tc(family: AddressFamily, content: &TcWireContent) -> Message {
    let mut msg = Message::new(MSG_TYPE_TC, family);
    msg.orig_addr = Some(content.originator);
    msg.hop_limit = Some(content.hop_limit);
    msg.hop_count = Some(0);
    msg.seqno = Some(content.ansn);
    msg.msg_tlvs.push(Tlv::with_value(
        TLV_CONT_SEQ_NUM,
        vec![if content.is_complete { CONT_SEQ_NUM_COMPLETE } else { CONT_SEQ_NUM_INCOMPLETE }],
    ));

    for (idx, adv) in content.advertisements.iter().enumerate() {
        let idx = idx as u8;
        msg.addresses.push((adv.prefix.address, adv.prefix.len));
        if adv.is_endpoint {
            msg.addr_tlvs.push(Tlv::new(TLV_ENDPOINT).with_index_range(idx, idx));
        }
        if let Some(field) = adv.metric.encode12() {
            msg.addr_tlvs.push(
                Tlv::with_value(TLV_LINK_METRIC, field.to_be_bytes().to_vec())
                    .with_ext(adv.domain.0)
                    .with_index_range(idx, idx),
            );
        }
    }
    msg
}

/// Builds the one or more TC messages needed to carry `advertisements`
/// within `mtu` bytes each (spec §4.1 writer fragmentation / §4.5 TC
/// production): every fragment shares `originator`/`ansn`/`hop_limit`, and
/// every fragment but the last is marked incomplete via `CONT_SEQ_NUM` so
/// the receiver withholds the implicit-withdrawal sweep until the whole
/// set has arrived.
pub fn build_tc_fragments(
    family: AddressFamily,
    originator: Address,
    ansn: u16,
    hop_limit: u8,
    advertisements: Vec<TcAdvertisement>,
    mtu: usize,
) -> Vec<Message> {
    if advertisements.is_empty() {
        let content = TcWireContent { originator, ansn, is_complete: true, hop_limit, advertisements };
        return vec![build_tc(family, &content)];
    }

    let mut fragments: Vec<Vec<TcAdvertisement>> = Vec::new();
    let mut chunk: Vec<TcAdvertisement> = Vec::new();

    for adv in advertisements {
        chunk.push(adv);
        let probe = TcWireContent { originator, ansn, is_complete: false, hop_limit, advertisements: chunk.clone() };
        let encoded = build_tc(family, &probe);
        let mut buf = bytes::BytesMut::new();
        encoded.encode(&mut buf);
        if buf.len() > mtu && chunk.len() > 1 {
            // The last-added advertisement pushed this fragment over
            // budget; close the fragment out without it.
            let overflowed = chunk.pop().expect("just pushed");
            fragments.push(chunk);
            chunk = vec![overflowed];
        }
    }
    fragments.push(chunk);

    let last_index = fragments.len() - 1;
    fragments
        .into_iter()
        .enumerate()
        .map(|(i, advs)| {
            let content = TcWireContent { originator, ansn, is_complete: i == last_index, hop_limit, advertisements: advs };
            build_tc(family, &content)
        })
        .collect()
}

pub fn parse_tc(msg: &Message) -> Option<TcWireContent> {
    if msg.msg_type != MSG_TYPE_TC {
        return None;
    }
    let originator = msg.orig_addr?;
    let ansn = msg.seqno?;
    let hop_limit = msg.hop_limit.unwrap_or(0);
    let is_complete = msg
        .msg_tlvs
        .iter()
        .find(|t| t.tlv_type == TLV_CONT_SEQ_NUM)
        .and_then(|t| t.value.as_ref())
        .and_then(|v| v.first())
        .map(|b| *b == CONT_SEQ_NUM_COMPLETE)
        .unwrap_or(true);

    let mut advertisements = Vec::with_capacity(msg.addresses.len());
    for (idx, (address, len)) in msg.addresses.iter().enumerate() {
        let idx = idx as u8;
        let covers = |tlv: &&Tlv| tlv.index_range.map(|(s, e)| idx >= s && idx <= e).unwrap_or(true);
        let is_endpoint = msg.addr_tlvs.iter().filter(|t| t.tlv_type == TLV_ENDPOINT).any(|t| covers(&t));
        let (domain, metric) = msg
            .addr_tlvs
            .iter()
            .filter(|t| t.tlv_type == TLV_LINK_METRIC)
            .filter(covers)
            .find_map(|t| {
                let domain = DomainId(t.ext_type?);
                let value = t.value.as_ref()?;
                let field = u16::from_be_bytes([*value.first()?, *value.get(1)?]);
                Some((domain, Metric::decode12(field)))
            })
            .unwrap_or((DomainId::FLOODING, Metric::MIN));
        advertisements.push(TcAdvertisement { prefix: Prefix::new(*address, *len), domain, metric, is_endpoint });
    }

    Some(TcWireContent { originator, ansn, is_complete, hop_limit, advertisements })
}
