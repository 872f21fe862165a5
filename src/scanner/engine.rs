//! Scan engine: bounded-concurrency connect sweep over a target's port range

use crate::error::WatchError;
use crate::network::{ProbeOutcome, Prober, TcpConnectProber};
use crate::scanner::PortSet;
use crate::targets::Target;
use futures::stream::{self, StreamExt};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Default number of simultaneous connection attempts
pub const DEFAULT_CONCURRENCY: usize = 256;

/// Probe tallies for one sweep, used for diagnostics only
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeStats {
    pub open: usize,
    pub refused: usize,
    pub timed_out: usize,
    pub errors: usize,
}

impl ProbeStats {
    fn record(&mut self, outcome: ProbeOutcome) {
        match outcome {
            ProbeOutcome::Open => self.open += 1,
            ProbeOutcome::Refused => self.refused += 1,
            ProbeOutcome::TimedOut => self.timed_out += 1,
            ProbeOutcome::OtherError(_) => self.errors += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.open + self.refused + self.timed_out + self.errors
    }
}

/// Main scanning engine
pub struct ScanEngine<P = TcpConnectProber> {
    prober: Arc<P>,
    concurrency: usize,
}

impl<P> Clone for ScanEngine<P> {
    fn clone(&self) -> Self {
        Self {
            prober: self.prober.clone(),
            concurrency: self.concurrency,
        }
    }
}

impl<P: Prober> ScanEngine<P> {
    /// Create a new engine; concurrency is at least one probe at a time
    pub fn new(prober: P, concurrency: usize) -> Self {
        Self {
            prober: Arc::new(prober),
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Probe every port of the target and return the ones that are open.
    ///
    /// Unreachable or closed ports simply do not appear; a target where every
    /// probe fails yields the empty set. Cancellation is observed between
    /// probes and returns [`WatchError::Cancelled`] instead of a partial set.
    pub async fn scan(&self, target: &Target, cancel: &CancellationToken) -> crate::Result<PortSet> {
        if cancel.is_cancelled() {
            return Err(WatchError::Cancelled);
        }

        let ip = match self.prober.resolve(target.host()).await {
            Some(ip) => ip,
            None => {
                log::warn!("Could not resolve {}, treating every port as not open", target.host());
                return Ok(PortSet::new());
            }
        };

        let (open, stats) = self.sweep(ip, target.ports().iter(), cancel).await?;

        log::debug!(
            "{} ({}): {} probed, {} open, {} refused, {} timed out, {} errors",
            target.host(),
            ip,
            stats.total(),
            stats.open,
            stats.refused,
            stats.timed_out,
            stats.errors
        );

        Ok(open)
    }

    /// Fan the probes out over at most `concurrency` in-flight connects and
    /// fold the outcomes into a set, whatever order they complete in.
    pub async fn sweep(
        &self,
        ip: IpAddr,
        ports: impl Iterator<Item = u16>,
        cancel: &CancellationToken,
    ) -> crate::Result<(PortSet, ProbeStats)> {
        let start = Instant::now();
        let prober = self.prober.as_ref();

        let mut probes = stream::iter(ports)
            .map(move |port| async move {
                let outcome = prober.probe(SocketAddr::new(ip, port)).await;
                (port, outcome)
            })
            .buffer_unordered(self.concurrency);

        let mut open = PortSet::new();
        let mut stats = ProbeStats::default();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    log::info!("Scan of {} cancelled after {} probes", ip, stats.total());
                    return Err(WatchError::Cancelled);
                }
                next = probes.next() => match next {
                    Some((port, outcome)) => {
                        stats.record(outcome);
                        if outcome.is_open() {
                            log::debug!("OPEN: {}:{}", ip, port);
                            open.insert(port);
                        }
                    }
                    None => break,
                }
            }
        }

        log::trace!("Sweep of {} finished in {:?}", ip, start.elapsed());
        Ok((open, stats))
    }
}
