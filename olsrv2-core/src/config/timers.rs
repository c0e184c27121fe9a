use serde::Deserialize;

/// Protocol timer intervals (spec §4.3/§4.5). Defaults mirror
/// [`crate::nhdp::NhdpConfig::default`] / [`crate::tc::TcConfig::default`];
/// kept as plain deserializable durations here rather than re-deriving
/// `Deserialize` on those structs directly, since the wire/engine structs
/// stay free of serde so the core crate's public API doesn't force a
/// particular config format on every embedder.
#[derive(Debug, Deserialize, Clone)]
pub struct TimersConfig {
    /// Default: 2000.
    #[serde(default = "default_hello_interval_ms")]
    pub hello_interval_ms: u64,
    /// How long a `Heard` link stays valid absent a refresh. Default: 6000.
    #[serde(default = "default_heard_hold_ms")]
    pub heard_hold_ms: u64,
    /// How long a `Symmetric` link stays valid absent a refresh. Default: 6000.
    #[serde(default = "default_sym_hold_ms")]
    pub sym_hold_ms: u64,
    /// How long a link record survives after going `Lost` before deletion.
    /// Default: 12000.
    #[serde(default = "default_lost_hold_ms")]
    pub lost_hold_ms: u64,
    /// How long a two-hop set entry stays valid absent a refresh. Default: 6000.
    #[serde(default = "default_twohop_hold_ms")]
    pub twohop_hold_ms: u64,
    /// Default: 5000.
    #[serde(default = "default_tc_interval_ms")]
    pub tc_interval_ms: u64,
    /// How long an accepted TC's edges/endpoints stay valid absent a
    /// refresh. Default: 30000.
    #[serde(default = "default_tc_hold_ms")]
    pub tc_hold_ms: u64,
}

impl Default for TimersConfig {
    fn default() -> Self {
        Self {
            hello_interval_ms: default_hello_interval_ms(),
            heard_hold_ms: default_heard_hold_ms(),
            sym_hold_ms: default_sym_hold_ms(),
            lost_hold_ms: default_lost_hold_ms(),
            twohop_hold_ms: default_twohop_hold_ms(),
            tc_interval_ms: default_tc_interval_ms(),
            tc_hold_ms: default_tc_hold_ms(),
        }
    }
}

impl TimersConfig {
    pub fn to_nhdp_config(&self) -> crate::nhdp::NhdpConfig {
        crate::nhdp::NhdpConfig {
            hello_interval_ms: self.hello_interval_ms,
            heard_hold_ms: self.heard_hold_ms,
            sym_hold_ms: self.sym_hold_ms,
            lost_hold_ms: self.lost_hold_ms,
            twohop_hold_ms: self.twohop_hold_ms,
            hysteresis: crate::nhdp::hysteresis::HysteresisConfig::default(),
        }
    }

    pub fn to_tc_config(&self) -> crate::tc::TcConfig {
        crate::tc::TcConfig { hold_ms: self.tc_hold_ms, tc_interval_ms: self.tc_interval_ms }
    }
}

fn default_hello_interval_ms() -> u64 {
    2_000
}
fn default_heard_hold_ms() -> u64 {
    6_000
}
fn default_sym_hold_ms() -> u64 {
    6_000
}
fn default_lost_hold_ms() -> u64 {
    12_000
}
fn default_twohop_hold_ms() -> u64 {
    6_000
}
fn default_tc_interval_ms() -> u64 {
    5_000
}
fn default_tc_hold_ms() -> u64 {
    30_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_uses_all_defaults() {
        let cfg: TimersConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.hello_interval_ms, 2_000);
        assert_eq!(cfg.tc_hold_ms, 30_000);
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let cfg: TimersConfig = toml::from_str("hello_interval_ms = 500").unwrap();
        assert_eq!(cfg.hello_interval_ms, 500);
        assert_eq!(cfg.sym_hold_ms, 6_000);
    }
}
