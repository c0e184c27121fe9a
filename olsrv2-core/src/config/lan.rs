use serde::Deserialize;

/// A locally attached network this router redistributes as a TC
/// "endpoint" advertisement (spec §4.5 "endpoint"/"attached network"),
/// e.g. a LAN segment behind this router that isn't itself running OLSRv2.
#[derive(Debug, Deserialize, Clone)]
pub struct LanConfig {
    /// CIDR prefix, e.g. "192.168.1.0/24".
    pub prefix: String,
    /// Which routing domain to advertise this prefix in.
    #[serde(default)]
    pub domain: u8,
    /// Outgoing metric for this attachment. Default: 1 (unit cost).
    #[serde(default = "default_metric")]
    pub metric: u32,
}

fn default_metric() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_with_default_domain_and_metric() {
        let cfg: LanConfig = toml::from_str(r#"prefix = "192.168.1.0/24""#).unwrap();
        assert_eq!(cfg.prefix, "192.168.1.0/24");
        assert_eq!(cfg.domain, 0);
        assert_eq!(cfg.metric, 1);
    }
}
