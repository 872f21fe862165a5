//! Portwatch - watches hosts for newly opened TCP ports
//!
//! Each cycle connect-scans a target's port range, compares the open set
//! with the last persisted baseline, alerts once per newly opened port and
//! then stores the current set as the new baseline.

pub mod alert;
pub mod config;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod network;
pub mod output;
pub mod scanner;
pub mod state;
pub mod targets;
pub mod utils;

// Re-export commonly used types
pub use config::WatchConfig;
pub use error::WatchError;
pub use monitor::{Monitor, TargetReport};
pub use network::{ProbeOutcome, Prober, TcpConnectProber};
pub use scanner::{PortSet, ScanEngine, ScanResult};
pub use state::{decide, StateStore};
pub use targets::{Target, TargetRegistry};
pub use utils::port_range::PortRange;

pub type Result<T> = std::result::Result<T, WatchError>;
