//! Writer pipeline (spec §4.1 "writer pipeline"): packs a stream of
//! messages into MTU-sized packets, opening a new packet (and, for an
//! over-budget single message, refusing it rather than silently
//! truncating) whenever the next message wouldn't fit.
//!
//! Per-destination fan-out ("target selector") is left to the caller: this
//! module turns `Vec<Message>` into `Vec<Packet>`, and the embedder decides
//! which interface(s) each resulting packet goes out on.

use super::packet::Packet;
use crate::codec::message::Message;

/// Wrapping 8-bit packet sequence number generator (matches the 1-byte
/// packet `seqno` field this codec's [`Packet`](super::packet::Packet) uses).
#[derive(Debug, Default)]
pub struct PacketSeqGenerator(u8);

impl PacketSeqGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self) -> u8 {
        let v = self.0;
        self.0 = self.0.wrapping_add(1);
        v
    }
}

#[derive(Debug)]
pub struct Writer {
    mtu: usize,
}

/// A message whose encoded size exceeds the link MTU even as the sole
/// occupant of a packet; the writer refuses to silently truncate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageTooLarge {
    pub msg_type: u8,
    pub encoded_len: usize,
}

impl Writer {
    pub fn new(mtu: usize) -> Self {
        Self { mtu }
    }

    /// Greedily bin-packs `messages` into as few packets as possible,
    /// stamping each with the next sequence number from `seqno_gen`.
    pub fn pack(
        &self,
        messages: Vec<Message>,
        seqno_gen: &mut PacketSeqGenerator,
    ) -> Result<Vec<Packet>, MessageTooLarge> {
        let mut packets = Vec::new();
        let mut current = Packet::new();
        let mut current_len = self.packet_overhead(&current);

        for msg in messages {
            let mut probe = bytes::BytesMut::new();
            msg.encode(&mut probe);
            let msg_len = probe.len();
            if msg_len > self.mtu.saturating_sub(self.packet_overhead(&Packet::new())) {
                return Err(MessageTooLarge { msg_type: msg.msg_type, encoded_len: msg_len });
            }
            if current_len + msg_len > self.mtu && !current.messages.is_empty() {
                current.seqno = Some(seqno_gen.next());
                packets.push(current);
                current = Packet::new();
                current_len = self.packet_overhead(&current);
            }
            current_len += msg_len;
            current.messages.push(msg);
        }

        if !current.messages.is_empty() {
            current.seqno = Some(seqno_gen.next());
            packets.push(current);
        }

        Ok(packets)
    }

    fn packet_overhead(&self, packet: &Packet) -> usize {
        // flags byte + seqno byte, always reserved even before it's assigned.
        let mut len = 2;
        if !packet.tlvs.is_empty() {
            let mut buf = bytes::BytesMut::new();
            super::tlv::encode_block(&packet.tlvs, &mut buf);
            len += buf.len();
        }
        len
    }
}
