//! RFC 5444 message layout (spec §4.1 "Message").
//!
//! One address block per message (fragmentation across several *messages*
//! is the writer's job, spec §4.1 "writer pipeline"; splitting one logical
//! message across several physical address blocks is not needed for any
//! message type this engine emits).

use super::addrblock;
use super::tlv::{self, Tlv};
use crate::address::{Address, AddressFamily};
use bytes::{Buf, BufMut, Bytes, BytesMut};

const FLAG_HAS_ORIG: u8 = 0x01;
const FLAG_HAS_HOP_LIMIT: u8 = 0x02;
const FLAG_HAS_HOP_COUNT: u8 = 0x04;
const FLAG_HAS_SEQNO: u8 = 0x08;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub msg_type: u8,
    pub family: AddressFamily,
    pub orig_addr: Option<Address>,
    pub hop_limit: Option<u8>,
    pub hop_count: Option<u8>,
    pub seqno: Option<u16>,
    pub msg_tlvs: Vec<Tlv>,
    pub addresses: Vec<(Address, u8)>,
    /// Address TLVs; each carries its own index range into `addresses`.
    pub addr_tlvs: Vec<Tlv>,
}

impl Message {
    pub fn new(msg_type: u8, family: AddressFamily) -> Self {
        Self {
            msg_type,
            family,
            orig_addr: None,
            hop_limit: None,
            hop_count: None,
            seqno: None,
            msg_tlvs: Vec::new(),
            addresses: Vec::new(),
            addr_tlvs: Vec::new(),
        }
    }

    pub fn encode(&self, out: &mut BytesMut) {
        out.put_u8(self.msg_type);

        let mut flags = 0u8;
        if self.orig_addr.is_some() {
            flags |= FLAG_HAS_ORIG;
        }
        if self.hop_limit.is_some() {
            flags |= FLAG_HAS_HOP_LIMIT;
        }
        if self.hop_count.is_some() {
            flags |= FLAG_HAS_HOP_COUNT;
        }
        if self.seqno.is_some() {
            flags |= FLAG_HAS_SEQNO;
        }
        out.put_u8(flags);

        let len_pos = out.len();
        out.put_u16(0); // patched below

        if let Some(orig) = &self.orig_addr {
            out.put_slice(&orig.octets());
        }
        if let Some(hl) = self.hop_limit {
            out.put_u8(hl);
        }
        if let Some(hc) = self.hop_count {
            out.put_u8(hc);
        }
        if let Some(seq) = self.seqno {
            out.put_u16(seq);
        }

        tlv::encode_block(&self.msg_tlvs, out);
        addrblock::encode(self.family, &self.addresses, out);
        tlv::encode_block(&self.addr_tlvs, out);

        let total_len = (out.len() - len_pos + 2) as u16;
        out[len_pos..len_pos + 2].copy_from_slice(&total_len.to_be_bytes());
    }

    /// Decodes one message from the front of `buf`, advancing it past the
    /// message regardless of whether every field was understood (so an
    /// unknown `msg_type` can still be skipped for forwarding).
    ///
    /// Returns `None` only when the message's own header couldn't be
    /// located — `buf` is left in an unrecoverable position and the caller
    /// must stop parsing the packet. Once the declared `msg_len` has been
    /// consumed, any further problem is reported as
    /// [`MessageDecode::Malformed`]: `buf` is already past this message, so
    /// the caller can safely skip it and keep parsing the rest of the
    /// packet (spec §4.1 "any inconsistency drops the containing message,
    /// not the packet").
    pub fn decode(buf: &mut Bytes) -> Option<MessageDecode> {
        if buf.remaining() < 4 {
            return None;
        }
        let msg_type = buf.get_u8();
        let flags = buf.get_u8();
        let msg_len = buf.get_u16() as usize;
        if msg_len < 4 || buf.remaining() < msg_len - 4 {
            return None;
        }
        let body = buf.copy_to_bytes(msg_len - 4);
        Some(Self::decode_body(msg_type, flags, body))
    }

    fn decode_body(msg_type: u8, flags: u8, body: Bytes) -> MessageDecode {
        let prefix_len_without_orig = (if flags & FLAG_HAS_HOP_LIMIT != 0 { 1 } else { 0 })
            + (if flags & FLAG_HAS_HOP_COUNT != 0 { 1 } else { 0 })
            + (if flags & FLAG_HAS_SEQNO != 0 { 2 } else { 0 });

        // The originator field's width depends on `family`, which isn't
        // known until we reach the address block further on. Rather than a
        // true two-pass parse, try each family's originator width in turn
        // and keep the one under which the rest of the message parses.
        let mut msg = Message::new(msg_type, AddressFamily::Inet);
        let mut cursor;
        if flags & FLAG_HAS_ORIG != 0 {
            let mut found = None;
            for candidate in [
                AddressFamily::Inet,
                AddressFamily::Inet6,
                AddressFamily::Mac48,
                AddressFamily::Eui64,
            ] {
                let orig_len = candidate.byte_len();
                let mut c = body.clone();
                if c.remaining() < orig_len + prefix_len_without_orig {
                    continue;
                }
                let mut orig_bytes = vec![0u8; orig_len];
                c.copy_to_slice(&mut orig_bytes);
                c.advance(prefix_len_without_orig);
                if tlv::decode_block(&mut c.clone()).is_none() {
                    continue;
                }
                let Some(orig_addr) = build_from_bytes(candidate, &orig_bytes) else {
                    continue;
                };
                found = Some((candidate, orig_addr, c));
                break;
            }
            let Some((family, orig_addr, c)) = found else {
                return MessageDecode::Malformed;
            };
            msg.family = family;
            msg.orig_addr = Some(orig_addr);
            cursor = c;
        } else {
            if body.remaining() < prefix_len_without_orig {
                return MessageDecode::Malformed;
            }
            cursor = body.clone();
        }

        if flags & FLAG_HAS_HOP_LIMIT != 0 {
            msg.hop_limit = Some(cursor.get_u8());
        }
        if flags & FLAG_HAS_HOP_COUNT != 0 {
            msg.hop_count = Some(cursor.get_u8());
        }
        if flags & FLAG_HAS_SEQNO != 0 {
            msg.seqno = Some(cursor.get_u16());
        }

        let Some(msg_tlvs) = tlv::decode_block(&mut cursor) else {
            return MessageDecode::Malformed;
        };
        msg.msg_tlvs = msg_tlvs;
        let Some(addresses) = addrblock::decode(&mut cursor) else {
            return MessageDecode::Malformed;
        };
        if flags & FLAG_HAS_ORIG == 0 {
            msg.family = addresses.first().map(|(a, _)| a.family()).unwrap_or(AddressFamily::Inet);
        }
        msg.addresses = addresses;
        let Some(addr_tlvs) = tlv::decode_block(&mut cursor) else {
            return MessageDecode::Malformed;
        };
        msg.addr_tlvs = addr_tlvs;

        MessageDecode::Parsed(msg)
    }
}

/// Outcome of [`Message::decode`] once the message's declared length has
/// been located and consumed from the input buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageDecode {
    Parsed(Message),
    /// The length header was valid and `buf` was advanced past this
    /// message, but its body (TLV block, address block, or originator) was
    /// internally inconsistent.
    Malformed,
}

fn build_from_bytes(family: AddressFamily, bytes: &[u8]) -> Option<Address> {
    match family {
        AddressFamily::Inet => {
            let a: [u8; 4] = bytes.try_into().ok()?;
            Some(Address::Inet(a.into()))
        }
        AddressFamily::Inet6 => {
            let a: [u8; 16] = bytes.try_into().ok()?;
            Some(Address::Inet6(a.into()))
        }
        AddressFamily::Mac48 => {
            let a: [u8; 6] = bytes.try_into().ok()?;
            Some(Address::Mac48(a))
        }
        AddressFamily::Eui64 => {
            let a: [u8; 8] = bytes.try_into().ok()?;
            Some(Address::Eui64(a))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn round_trips_minimal_message() {
        let mut msg = Message::new(1, AddressFamily::Inet);
        msg.addresses.push((Address::Inet(Ipv4Addr::new(10, 0, 0, 1)), 32));
        let mut buf = BytesMut::new();
        msg.encode(&mut buf);
        let mut bytes: Bytes = buf.freeze();
        let MessageDecode::Parsed(decoded) = Message::decode(&mut bytes).unwrap() else {
            panic!("expected a parsed message");
        };
        assert_eq!(decoded, msg);
        assert!(bytes.is_empty());
    }

    #[test]
    fn round_trips_full_header_and_tlvs() {
        let mut msg = Message::new(2, AddressFamily::Inet);
        msg.orig_addr = Some(Address::Inet(Ipv4Addr::new(192, 168, 0, 1)));
        msg.hop_limit = Some(255);
        msg.hop_count = Some(0);
        msg.seqno = Some(42);
        msg.msg_tlvs.push(Tlv::with_value(1, vec![9, 9]));
        msg.addresses.push((Address::Inet(Ipv4Addr::new(10, 0, 0, 1)), 32));
        msg.addresses.push((Address::Inet(Ipv4Addr::new(10, 0, 0, 2)), 32));
        msg.addr_tlvs.push(Tlv::with_value(2, vec![1]).with_index_range(0, 1));

        let mut buf = BytesMut::new();
        msg.encode(&mut buf);
        let mut bytes = buf.freeze();
        let MessageDecode::Parsed(decoded) = Message::decode(&mut bytes).unwrap() else {
            panic!("expected a parsed message");
        };
        assert_eq!(decoded, msg);
    }

    #[test]
    fn unknown_trailing_message_can_be_skipped() {
        let mut msg = Message::new(9, AddressFamily::Inet);
        msg.addresses.push((Address::Inet(Ipv4Addr::new(1, 2, 3, 4)), 32));
        let mut buf = BytesMut::new();
        msg.encode(&mut buf);
        buf.put_u8(0xff); // trailing junk belonging to a next message
        let mut bytes = buf.freeze();
        let MessageDecode::Parsed(decoded) = Message::decode(&mut bytes).unwrap() else {
            panic!("expected a parsed message");
        };
        assert_eq!(decoded.msg_type, 9);
        assert_eq!(bytes.len(), 1);
    }

    #[test]
    fn corrupt_body_is_reported_malformed_not_fatal() {
        // A valid header/length, but a `msg_tlvs` block whose own declared
        // length claims more bytes than are actually present in the body.
        // `msg_len` (and so `buf`'s overall advancement) is untouched, so
        // the caller should treat this single message as skippable rather
        // than aborting the rest of the packet.
        let mut msg = Message::new(9, AddressFamily::Inet);
        msg.addresses.push((Address::Inet(Ipv4Addr::new(1, 2, 3, 4)), 32));
        let mut buf = BytesMut::new();
        msg.encode(&mut buf);
        // The `msg_tlvs` block's 2-byte length prefix sits right after the
        // 4-byte message header (no orig/hop-limit/hop-count/seqno here).
        buf[4] = 0xff;
        buf[5] = 0xff;
        let mut bytes = buf.freeze();
        assert_eq!(Message::decode(&mut bytes), Some(MessageDecode::Malformed));
        assert!(bytes.is_empty());
    }
}
