//! RFC 5444-style address-block compression (spec §4.1 "address compression
//! via head/tail splitting").
//!
//! All addresses in one block share a family. The encoder finds the longest
//! byte prefix ("head") and byte suffix ("tail") common to every address and
//! writes those once, followed by just the differing middle bytes per
//! address — the classic win for e.g. a HELLO listing several addresses on
//! the same `/24`.

use crate::address::{Address, AddressFamily};
use bytes::{Buf, BufMut, BytesMut};

const FLAG_HAS_PREFIX_LENS: u8 = 0x01;

pub(crate) fn family_tag(family: AddressFamily) -> u8 {
    match family {
        AddressFamily::Inet => 0,
        AddressFamily::Inet6 => 1,
        AddressFamily::Mac48 => 2,
        AddressFamily::Eui64 => 3,
    }
}

fn family_from_tag(tag: u8) -> Option<AddressFamily> {
    match tag {
        0 => Some(AddressFamily::Inet),
        1 => Some(AddressFamily::Inet6),
        2 => Some(AddressFamily::Mac48),
        3 => Some(AddressFamily::Eui64),
        _ => None,
    }
}

fn build_address(family: AddressFamily, bytes: &[u8]) -> Option<Address> {
    match family {
        AddressFamily::Inet => {
            let arr: [u8; 4] = bytes.try_into().ok()?;
            Some(Address::Inet(arr.into()))
        }
        AddressFamily::Inet6 => {
            let arr: [u8; 16] = bytes.try_into().ok()?;
            Some(Address::Inet6(arr.into()))
        }
        AddressFamily::Mac48 => {
            let arr: [u8; 6] = bytes.try_into().ok()?;
            Some(Address::Mac48(arr))
        }
        AddressFamily::Eui64 => {
            let arr: [u8; 8] = bytes.try_into().ok()?;
            Some(Address::Eui64(arr))
        }
    }
}

fn common_head_len(octets: &[Vec<u8>], byte_len: usize) -> usize {
    if octets.len() < 2 {
        return 0;
    }
    let mut head = 0;
    'outer: while head < byte_len {
        let b = octets[0][head];
        for o in &octets[1..] {
            if o[head] != b {
                break 'outer;
            }
        }
        head += 1;
    }
    head
}

fn common_tail_len(octets: &[Vec<u8>], byte_len: usize, head: usize) -> usize {
    if octets.len() < 2 {
        return 0;
    }
    let mut tail = 0;
    'outer: while head + tail < byte_len {
        let idx = byte_len - 1 - tail;
        let b = octets[0][idx];
        for o in &octets[1..] {
            if o[idx] != b {
                break 'outer;
            }
        }
        tail += 1;
    }
    tail
}

/// Encodes `addresses` (all assumed to share `family`) as a compressed
/// address block: count, head length, tail length, head bytes, tail bytes,
/// per-address middle bytes, then an optional prefix-length array.
pub fn encode(family: AddressFamily, addresses: &[(Address, u8)], out: &mut BytesMut) {
    let byte_len = family.byte_len();
    out.put_u8(family_tag(family));
    out.put_u16(addresses.len() as u16);

    let octets: Vec<Vec<u8>> = addresses.iter().map(|(a, _)| a.octets()).collect();
    let head = common_head_len(&octets, byte_len);
    let tail = common_tail_len(&octets, byte_len, head);

    out.put_u8(head as u8);
    out.put_u8(tail as u8);
    if head > 0 {
        out.put_slice(&octets[0][..head]);
    }
    if tail > 0 {
        out.put_slice(&octets[0][byte_len - tail..]);
    }
    for o in &octets {
        out.put_slice(&o[head..byte_len - tail]);
    }

    let uniform_len = addresses.first().map(|(a, l)| *l == a.maxbits()).unwrap_or(true)
        && addresses.iter().all(|(a, l)| *l == a.maxbits());
    let mut flags = 0u8;
    if !uniform_len {
        flags |= FLAG_HAS_PREFIX_LENS;
    }
    out.put_u8(flags);
    if !uniform_len {
        for (_, len) in addresses {
            out.put_u8(*len);
        }
    }
}

pub fn decode(buf: &mut impl Buf) -> Option<Vec<(Address, u8)>> {
    if buf.remaining() < 1 {
        return None;
    }
    let family = family_from_tag(buf.get_u8())?;
    if buf.remaining() < 2 {
        return None;
    }
    let count = buf.get_u16() as usize;
    if buf.remaining() < 2 {
        return None;
    }
    let head = buf.get_u8() as usize;
    let tail = buf.get_u8() as usize;
    let byte_len = family.byte_len();
    if head + tail > byte_len {
        return None;
    }
    let mid_len = byte_len - head - tail;

    if buf.remaining() < head {
        return None;
    }
    let mut head_bytes = vec![0u8; head];
    buf.copy_to_slice(&mut head_bytes);

    if buf.remaining() < tail {
        return None;
    }
    let mut tail_bytes = vec![0u8; tail];
    buf.copy_to_slice(&mut tail_bytes);

    let mut addr_bytes = Vec::with_capacity(count);
    for _ in 0..count {
        if buf.remaining() < mid_len {
            return None;
        }
        let mut full = Vec::with_capacity(byte_len);
        full.extend_from_slice(&head_bytes);
        let mut mid = vec![0u8; mid_len];
        buf.copy_to_slice(&mut mid);
        full.extend_from_slice(&mid);
        full.extend_from_slice(&tail_bytes);
        addr_bytes.push(full);
    }

    if buf.remaining() < 1 {
        return None;
    }
    let flags = buf.get_u8();
    let lens: Vec<u8> = if flags & FLAG_HAS_PREFIX_LENS != 0 {
        if buf.remaining() < count {
            return None;
        }
        let mut v = vec![0u8; count];
        buf.copy_to_slice(&mut v);
        v
    } else {
        vec![family.maxbits(); count]
    };

    addr_bytes
        .into_iter()
        .zip(lens)
        .map(|(bytes, len)| build_address(family, &bytes).map(|a| (a, len)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn single_address_round_trips() {
        let addrs = vec![(Address::Inet(Ipv4Addr::new(10, 0, 0, 1)), 32)];
        let mut buf = BytesMut::new();
        encode(AddressFamily::Inet, &addrs, &mut buf);
        let decoded = decode(&mut buf).unwrap();
        assert_eq!(decoded, addrs);
    }

    #[test]
    fn shared_prefix_is_compressed() {
        let addrs = vec![
            (Address::Inet(Ipv4Addr::new(10, 0, 0, 1)), 32),
            (Address::Inet(Ipv4Addr::new(10, 0, 0, 2)), 32),
            (Address::Inet(Ipv4Addr::new(10, 0, 0, 3)), 32),
        ];
        let mut buf = BytesMut::new();
        encode(AddressFamily::Inet, &addrs, &mut buf);
        // head = 10.0.0 (3 bytes) ; tail = 0
        assert_eq!(buf[4], 3);
        let decoded = decode(&mut BytesMut::from(&buf[..])).unwrap();
        assert_eq!(decoded, addrs);
    }

    #[test]
    fn mixed_prefix_lengths_round_trip() {
        let addrs = vec![
            (Address::Inet(Ipv4Addr::new(10, 0, 0, 0)), 24),
            (Address::Inet(Ipv4Addr::new(10, 0, 1, 0)), 24),
        ];
        let mut buf = BytesMut::new();
        encode(AddressFamily::Inet, &addrs, &mut buf);
        let decoded = decode(&mut buf).unwrap();
        assert_eq!(decoded, addrs);
    }

    #[test]
    fn ipv6_addresses_round_trip() {
        use std::net::Ipv6Addr;
        let addrs = vec![
            (Address::Inet6(Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 1)), 128),
            (Address::Inet6(Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 2)), 128),
        ];
        let mut buf = BytesMut::new();
        encode(AddressFamily::Inet6, &addrs, &mut buf);
        let decoded = decode(&mut buf).unwrap();
        assert_eq!(decoded, addrs);
    }

    #[test]
    fn empty_block_round_trips() {
        let addrs: Vec<(Address, u8)> = vec![];
        let mut buf = BytesMut::new();
        encode(AddressFamily::Inet, &addrs, &mut buf);
        let decoded = decode(&mut buf).unwrap();
        assert!(decoded.is_empty());
    }
}
