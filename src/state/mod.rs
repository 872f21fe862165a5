//! Baseline persistence: the last observed open-port set per target
//!
//! One plain-text record per target, `<persistence_key>_ports.txt`, holding
//! one decimal port per line in ascending order. Each save replaces the whole
//! record through a temporary file renamed over the old one, so a crash never
//! leaves a half-written baseline behind.

pub mod diff;

use crate::error::WatchError;
use crate::scanner::PortSet;
use crate::targets::Target;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub use diff::{decide, PortDiff};

/// File-backed state store
#[derive(Debug, Clone)]
pub struct StateStore {
    state_dir: PathBuf,
}

impl StateStore {
    /// Create the store, creating the directory if needed
    pub fn new(state_dir: impl Into<PathBuf>) -> io::Result<Self> {
        let state_dir = state_dir.into();
        fs::create_dir_all(&state_dir)?;
        Ok(Self { state_dir })
    }

    /// Store whose directory is created by the first save
    pub fn lazy(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Path of the record for a target
    pub fn record_path(&self, target: &Target) -> PathBuf {
        self.state_dir
            .join(format!("{}_ports.txt", target.persistence_key()))
    }

    /// Load the baseline. A missing record is the empty set; an unreadable one
    /// is logged and also treated as empty. Lines that are not a port number
    /// in 1..=65535 are skipped.
    pub fn load(&self, target: &Target) -> PortSet {
        let path = self.record_path(target);
        match fs::read_to_string(&path) {
            Ok(content) => parse_record(&content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => PortSet::new(),
            Err(e) => {
                log::warn!(
                    "Could not read baseline {} for {}, starting from empty: {}",
                    path.display(),
                    target.host(),
                    e
                );
                PortSet::new()
            }
        }
    }

    /// Replace the baseline for a target
    pub fn save(&self, target: &Target, ports: &PortSet) -> crate::Result<()> {
        let path = self.record_path(target);
        self.write_atomic(&path, &render_record(ports))
            .map_err(|source| WatchError::Persistence {
                key: target.persistence_key().to_string(),
                source,
            })?;
        log::debug!("Saved {} ports for {} to {}", ports.len(), target.host(), path.display());
        Ok(())
    }

    fn write_atomic(&self, path: &Path, content: &str) -> io::Result<()> {
        fs::create_dir_all(&self.state_dir)?;
        // Same directory as the record, so the rename cannot cross filesystems
        let mut tmp = NamedTempFile::new_in(&self.state_dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Parse a record, ignoring blank, non-numeric and out-of-range lines
pub fn parse_record(content: &str) -> PortSet {
    content
        .lines()
        .filter_map(|line| line.trim().parse::<u16>().ok())
        .filter(|&port| port != 0)
        .collect()
}

/// One port per line, ascending
pub fn render_record(ports: &PortSet) -> String {
    let mut out = String::with_capacity(ports.len() * 6);
    for port in ports {
        out.push_str(&port.to_string());
        out.push('\n');
    }
    out
}
