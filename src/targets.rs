//! Target registry: configured hosts and their scan parameters

use crate::config::{TargetConfig, WatchConfig};
use crate::error::WatchError;
use crate::utils::port_range::PortRange;
use std::fmt;

/// A host under surveillance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    host: String,
    ports: PortRange,
    persistence_key: String,
}

impl Target {
    pub fn new(host: impl Into<String>, ports: PortRange) -> crate::Result<Self> {
        let host = host.into().trim().to_string();
        if host.is_empty() {
            return Err(WatchError::InvalidTarget("Target cannot be empty".to_string()));
        }
        let persistence_key = persistence_key(&host);
        Ok(Self {
            host,
            ports,
            persistence_key,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn ports(&self) -> &PortRange {
        &self.ports
    }

    pub fn persistence_key(&self) -> &str {
        &self.persistence_key
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.host)
    }
}

/// Derive the record key for a host identifier.
///
/// ASCII alphanumerics and `-` pass through, `.` becomes `_`, and every other
/// byte (`_` and `%` included) is written as `%XX`. Since `_` and `%` are only
/// ever produced by the mapping itself, the key decodes back to the host, so
/// two distinct hosts never share a record.
pub fn persistence_key(host: &str) -> String {
    let mut key = String::with_capacity(host.len());
    for byte in host.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' => key.push(byte as char),
            b'.' => key.push('_'),
            other => key.push_str(&format!("%{:02X}", other)),
        }
    }
    key
}

/// A target the registry refused, with the reason
#[derive(Debug)]
pub struct RejectedTarget {
    pub host: String,
    pub error: WatchError,
}

/// Configured targets, built once from an explicit configuration value
#[derive(Debug, Clone, Default)]
pub struct TargetRegistry {
    targets: Vec<Target>,
    default_ports: PortRange,
}

impl TargetRegistry {
    /// Build the registry. A bad entry (unparsable range, duplicate host) is
    /// rejected on its own; the remaining targets are kept.
    pub fn from_config(config: &WatchConfig) -> crate::Result<(Self, Vec<RejectedTarget>)> {
        let default_ports = PortRange::parse(&config.default_ports)
            .map_err(|e| WatchError::Config(format!("default_ports: {}", e)))?;

        let mut registry = Self {
            targets: Vec::new(),
            default_ports,
        };
        let mut rejected = Vec::new();

        for entry in config.target_entries() {
            let host = entry.host.clone();
            if let Err(error) = registry.add(entry) {
                log::warn!("Skipping target '{}': {}", host, error);
                rejected.push(RejectedTarget { host, error });
            }
        }

        Ok((registry, rejected))
    }

    fn add(&mut self, entry: TargetConfig) -> crate::Result<()> {
        let ports = match entry.ports.as_deref() {
            Some(spec) => PortRange::parse(spec)?,
            None => self.default_ports.clone(),
        };
        let target = Target::new(entry.host, ports)?;

        if self.get(target.host()).is_some() {
            return Err(WatchError::InvalidTarget(format!(
                "Duplicate target '{}'",
                target.host()
            )));
        }

        self.targets.push(target);
        Ok(())
    }

    pub fn get(&self, host: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.host() == host.trim())
    }

    /// The configured target, or an ad-hoc one on the default port range
    pub fn resolve(&self, host: &str) -> crate::Result<Target> {
        match self.get(host) {
            Some(target) => Ok(target.clone()),
            None => {
                log::info!("'{}' is not configured, using default ports {}", host, self.default_ports);
                Target::new(host, self.default_ports.clone())
            }
        }
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
