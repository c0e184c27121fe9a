//! RFC 5444 packet layout (spec §4.1 "Packet"): one byte of flags,
//! optional 1-byte sequence number, optional packet-TLV block, then zero or
//! more messages back to back.

use super::message::{Message, MessageDecode};
use super::tlv::{self, Tlv};
use bytes::{Buf, BufMut, Bytes, BytesMut};

const FLAG_HAS_SEQNO: u8 = 0x01;
const FLAG_HAS_TLV: u8 = 0x02;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Packet {
    pub seqno: Option<u8>,
    pub tlvs: Vec<Tlv>,
    pub messages: Vec<Message>,
}

impl Packet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encode(&self) -> BytesMut {
        let mut out = BytesMut::new();
        let mut flags = 0u8;
        if self.seqno.is_some() {
            flags |= FLAG_HAS_SEQNO;
        }
        if !self.tlvs.is_empty() {
            flags |= FLAG_HAS_TLV;
        }
        out.put_u8(flags);
        if let Some(seq) = self.seqno {
            out.put_u8(seq);
        }
        if flags & FLAG_HAS_TLV != 0 {
            tlv::encode_block(&self.tlvs, &mut out);
        }
        for msg in &self.messages {
            msg.encode(&mut out);
        }
        out
    }

    /// Decodes a whole packet. Individual messages that fail to parse are
    /// dropped (a malformed neighbor's message must not take the rest of
    /// the packet down with it); messages that parse fine but aren't
    /// understood still come back as [`Message`] values for the reader
    /// pipeline's consumers to accept or reject.
    ///
    /// A message whose length header was valid is always fully consumed
    /// from `buf` before its body is inspected, so a malformed body
    /// ([`MessageDecode::Malformed`]) only drops that one message and
    /// parsing continues. Only a header-level failure (`None`, `buf` left
    /// at an unrecoverable position) stops the packet.
    pub fn decode(mut buf: Bytes) -> Option<Packet> {
        if buf.remaining() < 1 {
            return None;
        }
        let flags = buf.get_u8();
        let mut pkt = Packet::new();
        if flags & FLAG_HAS_SEQNO != 0 {
            if buf.remaining() < 1 {
                return None;
            }
            pkt.seqno = Some(buf.get_u8());
        }
        if flags & FLAG_HAS_TLV != 0 {
            pkt.tlvs = tlv::decode_block(&mut buf)?;
        }
        while buf.has_remaining() {
            match Message::decode(&mut buf) {
                Some(MessageDecode::Parsed(msg)) => pkt.messages.push(msg),
                Some(MessageDecode::Malformed) => {}
                None => break,
            }
        }
        Some(pkt)
    }
}
