//! Scanner module containing the scan engine and per-cycle results

pub mod engine;

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::time::Duration;

pub use engine::ScanEngine;

/// Open ports of one target at one point in time. Iterates in ascending order.
pub type PortSet = BTreeSet<u16>;

/// Outcome of one complete cycle for one target
#[derive(Debug, Clone, PartialEq)]
pub struct ScanResult {
    /// Host that was scanned
    pub target: String,

    /// Ports open in this scan
    pub current_ports: PortSet,

    /// Baseline loaded before this scan
    pub previous_ports: PortSet,

    /// `current_ports - previous_ports`
    pub newly_opened: PortSet,

    /// `previous_ports - current_ports`, reported but never alerted
    pub closed: PortSet,

    /// Ports whose alert could not be delivered
    pub failed_alerts: PortSet,

    /// Number of ports probed
    pub probed: usize,

    pub started_at: DateTime<Utc>,

    pub duration: Duration,
}

impl ScanResult {
    pub fn has_changes(&self) -> bool {
        !self.newly_opened.is_empty() || !self.closed.is_empty()
    }

    /// Scan rate in ports per second
    pub fn scan_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.probed as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Comma separated, ascending (e.g. "22, 80, 443")
pub fn format_ports(ports: &PortSet) -> String {
    ports
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
