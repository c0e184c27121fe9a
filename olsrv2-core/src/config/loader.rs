use super::root::Config;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("no interfaces configured — at least one is required")]
    NoInterfaces,
    #[error("duplicate domain id {0} in [domains]")]
    DuplicateDomain(u8),
    #[error("domain id {0} collides with the reserved flooding domain (255)")]
    ReservedDomainId(u8),
    #[error("invalid LAN prefix {prefix:?}: {source}")]
    InvalidLanPrefix { prefix: String, source: ipnet::AddrParseError },
}

/// Loads, parses and validates a [`Config`] from `path`. Validation
/// mirrors the teacher's `load_from_path`: parse first, then enforce the
/// invariants the wire types can't express on their own (non-overlapping
/// domain ids, at least one interface, well-formed LAN CIDRs).
pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;
    let config: Config = toml::from_str(&text)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.interfaces.is_empty() {
        return Err(ConfigError::NoInterfaces);
    }

    let mut seen = ahash::AHashSet::default();
    for domain in &config.domains {
        if domain.id == crate::domain::DomainId::FLOODING.0 {
            return Err(ConfigError::ReservedDomainId(domain.id));
        }
        if !seen.insert(domain.id) {
            return Err(ConfigError::DuplicateDomain(domain.id));
        }
    }

    for lan in &config.lan {
        lan.prefix.parse::<ipnet::IpNet>().map_err(|source| ConfigError::InvalidLanPrefix { prefix: lan.prefix.clone(), source })?;
    }

    Ok(())
}
