//! Watch cycles: scan, compare with the baseline, alert, persist
//!
//! The order inside one target's cycle is fixed: the baseline is loaded after
//! the scan completes, every newly opened port gets its own alert attempt, and
//! only then is the current set saved as the new baseline. The save happens
//! whether or not the alerts went out, so an alert lost to a webhook outage is
//! not repeated on the next cycle.
//!
//! Each target owns its own record. Callers must not run two cycles for the
//! same target at once; the registry never holds the same host twice, so
//! [`Monitor::run_all`] upholds that on its own.

use crate::alert::{AlertSink, PortAlert};
use crate::config::WatchConfig;
use crate::error::WatchError;
use crate::network::{Prober, TcpConnectProber};
use crate::scanner::{format_ports, PortSet, ScanEngine, ScanResult};
use crate::state::{PortDiff, StateStore};
use crate::targets::Target;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Result of one target's cycle
#[derive(Debug)]
pub struct TargetReport {
    pub host: String,
    pub outcome: crate::Result<ScanResult>,
}

/// Drives scans for a set of targets
pub struct Monitor<P = TcpConnectProber> {
    engine: ScanEngine<P>,
    store: StateStore,
    sink: Arc<dyn AlertSink>,
    parallel_targets: usize,
    pacing: Duration,
}

impl Monitor<TcpConnectProber> {
    /// Build a monitor from configuration: connect prober, file store, configured sink
    pub fn from_config(config: &WatchConfig) -> crate::Result<Self> {
        let engine = ScanEngine::new(
            TcpConnectProber::new(config.timeout_duration()),
            config.concurrency,
        );
        // An unusable directory fails each target's save, not the whole run
        let store = StateStore::new(&config.state_dir).unwrap_or_else(|e| {
            log::warn!(
                "Cannot create state directory {}: {}",
                config.state_dir.display(),
                e
            );
            StateStore::lazy(&config.state_dir)
        });
        let sink = crate::alert::sink_from_config(config)?;

        Ok(Self::new(engine, store, sink)
            .with_parallel_targets(config.parallel_targets)
            .with_pacing(config.interval_between_targets()))
    }
}

impl<P: Prober> Monitor<P> {
    pub fn new(engine: ScanEngine<P>, store: StateStore, sink: Arc<dyn AlertSink>) -> Self {
        Self {
            engine,
            store,
            sink,
            parallel_targets: 1,
            pacing: Duration::ZERO,
        }
    }

    /// Targets scanned at the same time by `run_all`
    pub fn with_parallel_targets(mut self, parallel_targets: usize) -> Self {
        self.parallel_targets = parallel_targets.max(1);
        self
    }

    /// Pause between targets when running them one by one
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// One full cycle for one target.
    ///
    /// Fails with `Cancelled` (nothing persisted) when the scan is interrupted
    /// and with `Persistence` when the new baseline cannot be written. Alert
    /// failures are logged and listed in the result, never returned.
    pub async fn run_target(&self, target: &Target, cancel: &CancellationToken) -> crate::Result<ScanResult> {
        let started_at = Utc::now();
        let start = Instant::now();
        log::info!("Scanning {} ports on {}", target.ports().len(), target.host());

        let current = self.engine.scan(target, cancel).await?;
        let previous = self.store.load(target);
        let diff = PortDiff::between(&current, &previous);

        if diff.newly_opened.is_empty() {
            log::info!("No new ports on {}", target.host());
        } else {
            log::warn!("New ports on {}: {}", target.host(), format_ports(&diff.newly_opened));
        }
        if !diff.closed.is_empty() {
            log::info!("Ports closed on {}: {}", target.host(), format_ports(&diff.closed));
        }

        let failed_alerts = self.emit_alerts(target, &diff.newly_opened).await;

        self.store.save(target, &current)?;
        log::info!(
            "Baseline for {} saved to {}",
            target.host(),
            self.store.record_path(target).display()
        );

        Ok(ScanResult {
            target: target.host().to_string(),
            probed: target.ports().len(),
            current_ports: current,
            previous_ports: previous,
            newly_opened: diff.newly_opened,
            closed: diff.closed,
            failed_alerts,
            started_at,
            duration: start.elapsed(),
        })
    }

    /// One alert per port; a failed delivery does not stop the others
    async fn emit_alerts(&self, target: &Target, ports: &PortSet) -> PortSet {
        let mut failed = PortSet::new();
        for &port in ports {
            let alert = PortAlert::new(target.host(), port);
            if let Err(e) = self.sink.notify(&alert).await {
                log::error!("Alert for {} via {} failed: {}", alert, self.sink.name(), e);
                failed.insert(port);
            }
        }
        failed
    }

    /// Run every target once. A failing target never stops the others.
    /// Reports come back in target order.
    pub async fn run_all(&self, targets: &[Target], cancel: &CancellationToken) -> Vec<TargetReport> {
        if self.parallel_targets > 1 {
            return stream::iter(targets)
                .map(|target| self.report(target, cancel))
                .buffered(self.parallel_targets)
                .collect::<Vec<_>>()
                .await;
        }

        let mut reports = Vec::with_capacity(targets.len());
        for (i, target) in targets.iter().enumerate() {
            if cancel.is_cancelled() {
                break;
            }
            if i > 0 && !self.pacing.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.pacing) => {}
                }
            }
            reports.push(self.report(target, cancel).await);
        }
        reports
    }

    async fn report(&self, target: &Target, cancel: &CancellationToken) -> TargetReport {
        let outcome = self.run_target(target, cancel).await;
        if let Err(ref e) = outcome {
            match e {
                WatchError::Cancelled => log::info!("{}: {}", target.host(), e),
                _ => log::error!("Cycle for {} failed: {}", target.host(), e),
            }
        }
        TargetReport {
            host: target.host().to_string(),
            outcome,
        }
    }

    /// Repeat `run_all` every `interval` until cancelled. Returns the number
    /// of cycles that ran to completion.
    pub async fn watch<F>(
        &self,
        targets: &[Target],
        interval: Duration,
        cancel: &CancellationToken,
        mut on_report: F,
    ) -> usize
    where
        F: FnMut(&TargetReport),
    {
        let mut cycles = 0;
        loop {
            let reports = self.run_all(targets, cancel).await;
            for report in &reports {
                on_report(report);
            }
            if cancel.is_cancelled() {
                break;
            }
            cycles += 1;

            log::info!("Cycle {} complete, next in {}s", cycles, interval.as_secs());
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
        cycles
    }
}
