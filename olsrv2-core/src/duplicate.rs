//! `(msg_type, originator, seqno)` duplicate cache (spec §4.2, glossary
//! "DuplicateEntry").
//!
//! One entry per `(msg_type, originator)` pair holds the most recently
//! accepted sequence number plus a sliding bitmap of the last
//! [`WINDOW_BITS`] sequence numbers, so slightly out-of-order delivery
//! (common over a lossy wireless multicast link) doesn't get misreported as
//! "too old".

use crate::address::Address;
use crate::domain::seqno_is_newer;
use std::time::Duration;

/// Width of the out-of-order acceptance window, in sequence numbers behind
/// the newest one seen.
pub const WINDOW_BITS: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DupResult {
    /// First time this seqno has been seen; process it.
    New,
    /// Already processed this exact seqno; drop silently.
    Duplicate,
    /// Older than the window can represent; drop silently.
    TooOld,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DupKey {
    pub msg_type: u8,
    pub originator: Address,
}

struct DupEntry {
    last_seqno: u16,
    /// Bit `k` set means `last_seqno - k` has been accepted. Bit 0 is
    /// always set for `last_seqno` itself.
    window: u32,
    expiry_ms: u64,
}

/// Extra time kept past `vtime` before an entry is eligible for lazy
/// removal, so a slightly-late duplicate retransmission still hits cache.
pub const HOLD: Duration = Duration::from_secs(1);

#[derive(Default)]
pub struct DuplicateSet {
    entries: ahash::AHashMap<DupKey, DupEntry>,
}

impl DuplicateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spec §4.2 `check`. `vtime_ms` is the validity time carried by the
    /// message (used only to compute the refreshed expiry); `now_ms` is the
    /// current monotonic time.
    pub fn check(&mut self, key: DupKey, seqno: u16, now_ms: u64, vtime_ms: u64) -> DupResult {
        self.evict_expired(now_ms);
        let new_expiry = now_ms.saturating_add(vtime_ms).saturating_add(HOLD.as_millis() as u64);

        let entry = match self.entries.get_mut(&key) {
            None => {
                self.entries.insert(key, DupEntry { last_seqno: seqno, window: 1, expiry_ms: new_expiry });
                return DupResult::New;
            }
            Some(e) => e,
        };

        if seqno == entry.last_seqno {
            // bit 0 is always set for last_seqno
            entry.expiry_ms = new_expiry;
            return DupResult::Duplicate;
        }

        if seqno_is_newer(seqno, entry.last_seqno) {
            let shift = seqno.wrapping_sub(entry.last_seqno) as u32;
            entry.window = if shift >= WINDOW_BITS { 1 } else { (entry.window << shift) | 1 };
            entry.last_seqno = seqno;
            entry.expiry_ms = new_expiry;
            return DupResult::New;
        }

        // seqno is older than last_seqno
        let offset = entry.last_seqno.wrapping_sub(seqno) as u32;
        if offset >= WINDOW_BITS {
            return DupResult::TooOld;
        }
        let bit = 1u32 << offset;
        if entry.window & bit != 0 {
            DupResult::Duplicate
        } else {
            entry.window |= bit;
            entry.expiry_ms = new_expiry;
            DupResult::New
        }
    }

    fn evict_expired(&mut self, now_ms: u64) {
        self.entries.retain(|_, e| e.expiry_ms > now_ms);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn key() -> DupKey {
        DupKey { msg_type: 2, originator: Address::Inet(Ipv4Addr::new(10, 0, 0, 1)) }
    }

    #[test]
    fn first_seen_is_new() {
        let mut set = DuplicateSet::new();
        assert_eq!(set.check(key(), 1, 0, 20_000), DupResult::New);
    }

    #[test]
    fn exact_repeat_is_duplicate() {
        let mut set = DuplicateSet::new();
        set.check(key(), 1, 0, 20_000);
        assert_eq!(set.check(key(), 1, 10, 20_000), DupResult::Duplicate);
    }

    #[test]
    fn monotonicity_never_returns_new_twice_for_same_seqno() {
        // spec §8: "A sequence of check calls with a given (type,orig)
        // never returns NEW twice for the same seqno."
        let mut set = DuplicateSet::new();
        let mut seen_new = std::collections::HashSet::new();
        let sequence = [1u16, 2, 2, 3, 1, 4, 3, 5];
        for (i, seqno) in sequence.iter().enumerate() {
            let result = set.check(key(), *seqno, i as u64 * 10, 20_000);
            if result == DupResult::New {
                assert!(seen_new.insert(*seqno), "seqno {seqno} returned NEW twice");
            }
        }
    }

    #[test]
    fn out_of_order_within_window_is_new_once() {
        let mut set = DuplicateSet::new();
        set.check(key(), 10, 0, 20_000);
        // 8 arrives late but within window -> accepted as NEW (out of order)
        assert_eq!(set.check(key(), 8, 1, 20_000), DupResult::New);
        assert_eq!(set.check(key(), 8, 2, 20_000), DupResult::Duplicate);
    }

    #[test]
    fn far_older_is_too_old() {
        let mut set = DuplicateSet::new();
        set.check(key(), 1000, 0, 20_000);
        assert_eq!(set.check(key(), 900, 1, 20_000), DupResult::TooOld);
    }

    #[test]
    fn ansn_wraparound_sequence_from_spec_scenario_3() {
        let mut set = DuplicateSet::new();
        for seqno in [65534u16, 65535, 0, 1] {
            assert_eq!(set.check(key(), seqno, 0, 20_000), DupResult::New);
        }
        assert_eq!(set.check(key(), 65534, 1, 20_000), DupResult::TooOld);
    }

    #[test]
    fn expired_entries_are_evicted() {
        let mut set = DuplicateSet::new();
        set.check(key(), 1, 0, 100);
        assert_eq!(set.len(), 1);
        // well past vtime + hold
        set.check(key(), 1, 10_000, 100);
        assert_eq!(set.len(), 1); // re-inserted as NEW after eviction
    }
}
