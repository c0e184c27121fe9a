//! In-process counters (spec §10 ambient stack). Deliberately not
//! network-facing — no Prometheus registry, no OpenTelemetry meter, unlike
//! the teacher's `telemetry::Metrics` — this is the part of that concern a
//! routing-engine *core* crate carries on its own; an embedder wanting a
//! `/metrics` endpoint reads these values and exports them itself.
//!
//! The core is single-threaded cooperative (spec §5), so plain `u64`
//! fields are enough; no atomics.

#[derive(Debug, Default, Clone, Copy)]
pub struct Counters {
    pub hellos_sent: u64,
    pub hellos_received: u64,
    pub tcs_sent: u64,
    pub tcs_received: u64,
    pub tcs_forwarded: u64,
    pub tcs_rejected_stale_ansn: u64,
    pub duplicates_dropped: u64,
    pub messages_too_large_for_mtu: u64,
    pub dijkstra_runs: u64,
    pub fib_routes_added: u64,
    pub fib_routes_changed: u64,
    pub fib_routes_removed: u64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let counters = Counters::new();
        assert_eq!(counters.hellos_sent, 0);
        assert_eq!(counters.fib_routes_removed, 0);
    }

    #[test]
    fn fields_are_independently_incrementable() {
        let mut counters = Counters::new();
        counters.hellos_sent += 3;
        counters.tcs_rejected_stale_ansn += 1;
        assert_eq!(counters.hellos_sent, 3);
        assert_eq!(counters.tcs_rejected_stale_ansn, 1);
        assert_eq!(counters.tcs_sent, 0);
    }
}
