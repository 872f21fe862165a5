//! Baseline comparison

use crate::scanner::PortSet;

/// Ports present now but absent from the baseline. Only these are alerted;
/// a port that closed never raises an alert.
pub fn decide(current: &PortSet, previous: &PortSet) -> PortSet {
    current.difference(previous).copied().collect()
}

/// Both directions of change between two snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortDiff {
    pub newly_opened: PortSet,
    pub closed: PortSet,
}

impl PortDiff {
    pub fn between(current: &PortSet, previous: &PortSet) -> Self {
        Self {
            newly_opened: decide(current, previous),
            closed: previous.difference(current).copied().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.newly_opened.is_empty() && self.closed.is_empty()
    }
}
