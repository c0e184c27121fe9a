use serde::Deserialize;

use super::domains::DomainConfig;
use super::interfaces::InterfaceConfig;
use super::lan::LanConfig;
use super::timers::TimersConfig;

/// Root configuration structure, loaded via [`super::loader::load_from_path`].
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Interfaces to run OLSRv2 on. At least one is required.
    pub interfaces: Vec<InterfaceConfig>,
    /// Additional routing domains beyond the implicit flooding domain.
    /// Default: empty (flooding-only, no multi-topology routing).
    #[serde(default)]
    pub domains: Vec<DomainConfig>,
    /// Protocol timer intervals.
    #[serde(default)]
    pub timers: TimersConfig,
    /// Locally attached networks to redistribute.
    #[serde(default)]
    pub lan: Vec<LanConfig>,
}
