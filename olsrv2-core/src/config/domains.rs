use serde::Deserialize;

/// One routing domain this router participates in (spec §3/§4.4 "Domain").
/// The flooding pseudo-domain ([`crate::domain::DomainId::FLOODING`]) is
/// implicit and never configured here.
#[derive(Debug, Deserialize, Clone)]
pub struct DomainConfig {
    /// Wire extension-type byte identifying this domain (0-254; 255 is
    /// reserved for flooding).
    pub id: u8,
    /// Human-readable label for logs; purely cosmetic.
    #[serde(default)]
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Wrapper {
        domains: Vec<DomainConfig>,
    }

    #[test]
    fn deserializes_domain_list() {
        let wrapper: Wrapper = toml::from_str(
            r#"
            [[domains]]
            id = 0
            name = "default"

            [[domains]]
            id = 1
            "#,
        )
        .unwrap();
        assert_eq!(wrapper.domains.len(), 2);
        assert_eq!(wrapper.domains[0].name, "default");
        assert_eq!(wrapper.domains[1].name, "");
    }
}
