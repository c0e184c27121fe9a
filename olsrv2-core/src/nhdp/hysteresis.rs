//! Optional link-quality hysteresis (RFC 6130 §10), used to delay a link's
//! promotion to `Heard`/`Symmetric` until a run of HELLOs has been received
//! reliably enough, damping flapping on a lossy link.
//!
//! Disabled by default (spec §4.3 treats hysteresis as a Non-goal for the
//! mandatory path); this module exists because the distilled spec's
//! willingness/metric machinery assumes *some* link admission policy is
//! pluggable, and RFC 6130 only ever specifies this one.

/// Exponential-moving-average link quality in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy)]
pub struct HysteresisConfig {
    pub scaling: f32,
    pub accept_threshold: f32,
    pub reject_threshold: f32,
}

impl Default for HysteresisConfig {
    fn default() -> Self {
        Self { scaling: 0.5, accept_threshold: 0.8, reject_threshold: 0.3 }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HysteresisState {
    quality: f32,
    pending: bool,
}

impl Default for HysteresisState {
    fn default() -> Self {
        Self { quality: 0.0, pending: true }
    }
}

impl HysteresisState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quality(&self) -> f32 {
        self.quality
    }

    /// A HELLO was received for this link in the current interval.
    pub fn on_hello_received(&mut self, config: &HysteresisConfig) {
        self.quality = self.quality + (1.0 - config.scaling) * (1.0 - self.quality);
        self.reassess(config);
    }

    /// The HELLO interval elapsed without a HELLO from this link.
    pub fn on_hello_missed(&mut self, config: &HysteresisConfig) {
        self.quality *= config.scaling;
        self.reassess(config);
    }

    fn reassess(&mut self, config: &HysteresisConfig) {
        if self.pending && self.quality >= config.accept_threshold {
            self.pending = false;
        } else if !self.pending && self.quality < config.reject_threshold {
            self.pending = true;
        }
    }

    /// Whether the link is quality-admitted (i.e. NHDP should treat it as
    /// usable rather than holding it `Pending`).
    pub fn is_admitted(&self) -> bool {
        !self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_pending() {
        let state = HysteresisState::new();
        assert!(!state.is_admitted());
    }

    #[test]
    fn repeated_receipt_eventually_admits() {
        let config = HysteresisConfig::default();
        let mut state = HysteresisState::new();
        for _ in 0..20 {
            state.on_hello_received(&config);
        }
        assert!(state.is_admitted());
    }

    #[test]
    fn repeated_misses_reject_an_admitted_link() {
        let config = HysteresisConfig::default();
        let mut state = HysteresisState::new();
        for _ in 0..20 {
            state.on_hello_received(&config);
        }
        assert!(state.is_admitted());
        for _ in 0..10 {
            state.on_hello_missed(&config);
        }
        assert!(!state.is_admitted());
    }
}
