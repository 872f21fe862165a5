//! Port range parsing (e.g. "1-1024,8080")

use crate::error::WatchError;
use std::collections::BTreeSet;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Default range scanned when a target does not override it.
pub const DEFAULT_PORT_RANGE: &str = "1-1024";

/// Ordered, de-duplicated set of ports to probe for one target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortRange {
    ports: BTreeSet<u16>,
}

impl PortRange {
    /// Inclusive range; both ends must be in 1..=65535
    pub fn inclusive(range: RangeInclusive<u16>) -> crate::Result<Self> {
        let (start, end) = (*range.start(), *range.end());
        if start == 0 {
            return Err(WatchError::PortRange("Port 0 is not valid".to_string()));
        }
        if start > end {
            return Err(WatchError::PortRange(format!(
                "Start port {} cannot be greater than end port {}",
                start, end
            )));
        }
        Ok(Self { ports: range.collect() })
    }

    /// Parse a comma separated list of ports and `a-b` ranges
    pub fn parse(spec: &str) -> crate::Result<Self> {
        let mut ports = BTreeSet::new();

        for part in spec.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            if let Some((start, end)) = part.split_once('-') {
                let start = parse_port(start)?;
                let end = parse_port(end)?;
                ports.extend(Self::inclusive(start..=end)?.ports);
            } else {
                ports.insert(parse_port(part)?);
            }
        }

        if ports.is_empty() {
            return Err(WatchError::PortRange(format!("No ports in '{}'", spec)));
        }

        Ok(Self { ports })
    }

    /// Ports in ascending order
    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.ports.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    pub fn contains(&self, port: u16) -> bool {
        self.ports.contains(&port)
    }
}

impl Default for PortRange {
    fn default() -> Self {
        Self { ports: (1..=1024).collect() }
    }
}

impl FromStr for PortRange {
    type Err = WatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<BTreeSet<u16>> for PortRange {
    fn from(mut ports: BTreeSet<u16>) -> Self {
        ports.remove(&0);
        Self { ports }
    }
}

/// Compact form: consecutive runs are folded back into `a-b`
impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut runs: Vec<(u16, u16)> = Vec::new();
        for port in self.iter() {
            if let Some(last) = runs.last_mut() {
                if last.1.checked_add(1) == Some(port) {
                    last.1 = port;
                    continue;
                }
            }
            runs.push((port, port));
        }

        let parts: Vec<String> = runs
            .into_iter()
            .map(|(start, end)| {
                if start == end {
                    start.to_string()
                } else {
                    format!("{}-{}", start, end)
                }
            })
            .collect();
        write!(f, "{}", parts.join(","))
    }
}

fn parse_port(raw: &str) -> crate::Result<u16> {
    let raw = raw.trim();
    let port: u16 = raw
        .parse()
        .map_err(|e| WatchError::PortRange(format!("Invalid port '{}': {}", raw, e)))?;
    if port == 0 {
        return Err(WatchError::PortRange("Port 0 is not valid".to_string()));
    }
    Ok(port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_first_1024() {
        let range = PortRange::parse(DEFAULT_PORT_RANGE).unwrap();
        assert_eq!(range, PortRange::default());
        assert_eq!(range.len(), 1024);
        assert_eq!(range.iter().next(), Some(1));
        assert_eq!(range.iter().last(), Some(1024));
    }

    #[test]
    fn test_mixed_list() {
        let range = PortRange::parse(" 22, 80-82 ,443,80").unwrap();
        assert_eq!(range.iter().collect::<Vec<_>>(), vec![22, 80, 81, 82, 443]);
    }

    #[test]
    fn test_range_edges_are_inclusive() {
        let range = PortRange::parse("65530-65535").unwrap();
        assert_eq!(range.len(), 6);
        assert!(range.contains(65535));

        let range = PortRange::parse("1").unwrap();
        assert!(range.contains(1));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(PortRange::parse("0").is_err());
        assert!(PortRange::parse("0-10").is_err());
        assert!(PortRange::parse("100-10").is_err());
        assert!(PortRange::parse("65536").is_err());
        assert!(PortRange::parse("http").is_err());
        assert!(PortRange::parse("1-2-3").is_err());
        assert!(PortRange::parse("").is_err());
        assert!(PortRange::parse(" , ").is_err());
    }

    #[test]
    fn test_display_folds_runs() {
        let range = PortRange::parse("443,1-3,8080,5,4").unwrap();
        assert_eq!(range.to_string(), "1-5,443,8080");
        assert_eq!(PortRange::parse("65535").unwrap().to_string(), "65535");
    }
}
