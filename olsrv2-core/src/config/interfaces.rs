use serde::Deserialize;

/// One local interface OLSRv2 should run on (spec §3 "Interface").
#[derive(Debug, Deserialize, Clone)]
pub struct InterfaceConfig {
    /// OS interface name, e.g. "wlan0". Resolved to a stable
    /// [`crate::iface::InterfaceId`] by the embedder at startup.
    pub name: String,
    /// MTU override in bytes. Default: probed from the OS by the
    /// [`crate::iface::InterfaceAdapter`]; this is only needed when the
    /// adapter can't probe it (e.g. a tunnel device) or a smaller value
    /// is wanted to leave headroom for a lower-layer header.
    #[serde(default)]
    pub mtu: Option<usize>,
    /// Willingness to be selected as MPR on this interface (0-7).
    /// Default: 3 ([`crate::domain::Willingness::DEFAULT`]).
    #[serde(default = "default_willingness")]
    pub willingness: u8,
    /// Local addresses this interface answers to, e.g. "10.0.0.1" or
    /// "fe80::1". Needed so the daemon can recognize its own HELLOs
    /// reflected by a hub and its own originator address in a TC; the
    /// OS-level enumeration an embedder would otherwise do is left out of
    /// scope here, so these are configured explicitly like everything
    /// else under `[[interfaces]]`.
    #[serde(default)]
    pub addresses: Vec<String>,
}

fn default_willingness() -> u8 {
    crate::domain::Willingness::DEFAULT.value()
}
