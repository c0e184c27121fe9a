//! Generic TLV encode/decode (spec §4.1 "TLV").
//!
//! Field layout is a deliberate simplification of the full RFC 5444 TLV
//! flag byte: we keep type, extension-type, value and an optional address
//! index range (so one TLV can cover a contiguous run of addresses sharing
//! the same value, e.g. every `THIS_IF` address in a HELLO carrying the same
//! `LOCAL_IF` value), but drop the "multivalue" bit that lets one TLV carry
//! a *different* value per covered address. Real traffic overwhelmingly
//! shares one value across a run; see DESIGN.md for the trade-off.

use bytes::{Buf, BufMut, BytesMut};

const FLAG_HAS_EXT_TYPE: u8 = 0x01;
const FLAG_HAS_VALUE: u8 = 0x02;
const FLAG_HAS_EXT_LEN: u8 = 0x04;
const FLAG_HAS_INDEX: u8 = 0x08;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlv {
    pub tlv_type: u8,
    pub ext_type: Option<u8>,
    pub value: Option<Vec<u8>>,
    /// `Some((start, end))` inclusive 0-based index range into the address
    /// block this TLV is attached to. `None` for message/packet-level TLVs,
    /// and for address TLVs that cover every address in the block.
    pub index_range: Option<(u8, u8)>,
}

impl Tlv {
    pub fn new(tlv_type: u8) -> Self {
        Self { tlv_type, ext_type: None, value: None, index_range: None }
    }

    pub fn with_value(tlv_type: u8, value: Vec<u8>) -> Self {
        Self { tlv_type, ext_type: None, value: Some(value), index_range: None }
    }

    pub fn with_ext(mut self, ext_type: u8) -> Self {
        self.ext_type = Some(ext_type);
        self
    }

    pub fn with_index_range(mut self, start: u8, end: u8) -> Self {
        self.index_range = Some((start, end));
        self
    }

    pub fn encode(&self, out: &mut BytesMut) {
        out.put_u8(self.tlv_type);
        let mut flags = 0u8;
        if self.ext_type.is_some() {
            flags |= FLAG_HAS_EXT_TYPE;
        }
        let ext_len = self.value.as_ref().map(|v| v.len() > 255).unwrap_or(false);
        if self.value.is_some() {
            flags |= FLAG_HAS_VALUE;
            if ext_len {
                flags |= FLAG_HAS_EXT_LEN;
            }
        }
        if self.index_range.is_some() {
            flags |= FLAG_HAS_INDEX;
        }
        out.put_u8(flags);
        if let Some(ext) = self.ext_type {
            out.put_u8(ext);
        }
        if let Some((start, end)) = self.index_range {
            out.put_u8(start);
            out.put_u8(end);
        }
        if let Some(value) = &self.value {
            if ext_len {
                out.put_u16(value.len() as u16);
            } else {
                out.put_u8(value.len() as u8);
            }
            out.put_slice(value);
        }
    }

    pub fn decode(buf: &mut impl Buf) -> Option<Tlv> {
        if buf.remaining() < 2 {
            return None;
        }
        let tlv_type = buf.get_u8();
        let flags = buf.get_u8();
        let ext_type = if flags & FLAG_HAS_EXT_TYPE != 0 {
            if buf.remaining() < 1 {
                return None;
            }
            Some(buf.get_u8())
        } else {
            None
        };
        let index_range = if flags & FLAG_HAS_INDEX != 0 {
            if buf.remaining() < 2 {
                return None;
            }
            Some((buf.get_u8(), buf.get_u8()))
        } else {
            None
        };
        let value = if flags & FLAG_HAS_VALUE != 0 {
            let len = if flags & FLAG_HAS_EXT_LEN != 0 {
                if buf.remaining() < 2 {
                    return None;
                }
                buf.get_u16() as usize
            } else {
                if buf.remaining() < 1 {
                    return None;
                }
                buf.get_u8() as usize
            };
            if buf.remaining() < len {
                return None;
            }
            let mut v = vec![0u8; len];
            buf.copy_to_slice(&mut v);
            Some(v)
        } else {
            None
        };
        Some(Tlv { tlv_type, ext_type, value, index_range })
    }
}

/// Encodes a block of TLVs prefixed by its own 2-byte length, the shape
/// every `tlv-block` takes inside a packet/message/address-block.
pub fn encode_block(tlvs: &[Tlv], out: &mut BytesMut) {
    let mut body = BytesMut::new();
    for tlv in tlvs {
        tlv.encode(&mut body);
    }
    out.put_u16(body.len() as u16);
    out.put_slice(&body);
}

pub fn decode_block(buf: &mut impl Buf) -> Option<Vec<Tlv>> {
    if buf.remaining() < 2 {
        return None;
    }
    let len = buf.get_u16() as usize;
    if buf.remaining() < len {
        return None;
    }
    let mut body = buf.copy_to_bytes(len);
    let mut tlvs = Vec::new();
    while body.has_remaining() {
        tlvs.push(Tlv::decode(&mut body)?);
    }
    Some(tlvs)
}
