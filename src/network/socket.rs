//! TCP connect prober

use crate::network::{ProbeOutcome, Prober, DEFAULT_PROBE_TIMEOUT};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;

/// Full-handshake connect prober with a fixed timeout
#[derive(Debug, Clone, Copy)]
pub struct TcpConnectProber {
    timeout: Duration,
}

impl TcpConnectProber {
    /// A zero timeout would classify every port as timed out; it is clamped to 1ms.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout: timeout.max(Duration::from_millis(1)),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for TcpConnectProber {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT)
    }
}

#[async_trait]
impl Prober for TcpConnectProber {
    async fn probe(&self, addr: SocketAddr) -> ProbeOutcome {
        // The stream (or the pending connect future on timeout) is dropped at the
        // end of this scope, closing the socket on every path.
        match tokio::time::timeout(self.timeout, TcpStream::connect(addr)).await {
            Ok(Ok(_stream)) => ProbeOutcome::Open,
            Ok(Err(e)) => {
                let outcome = ProbeOutcome::from_io_error(&e);
                log::trace!("{} -> {} ({})", addr, outcome, e);
                outcome
            }
            Err(_) => ProbeOutcome::TimedOut,
        }
    }
}
