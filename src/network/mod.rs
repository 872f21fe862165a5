//! Network module: single-port TCP connect probing

pub mod socket;

use async_trait::async_trait;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

pub use socket::TcpConnectProber;

/// Default probe timeout. Slow or lossy links may report open ports as closed.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(100);

/// Outcome of one bounded-timeout connect attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The handshake completed within the timeout
    Open,
    /// The peer answered with RST
    Refused,
    /// No answer before the timeout elapsed
    TimedOut,
    /// Any other network error (unreachable host, no route, ...)
    OtherError(io::ErrorKind),
}

impl ProbeOutcome {
    /// Classify a connect error by its kind, never by its message text
    pub fn from_io_error(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => ProbeOutcome::Refused,
            io::ErrorKind::TimedOut => ProbeOutcome::TimedOut,
            kind => ProbeOutcome::OtherError(kind),
        }
    }

    /// Everything but `Open` is folded into "not open"
    pub fn is_open(&self) -> bool {
        matches!(self, ProbeOutcome::Open)
    }
}

impl std::fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeOutcome::Open => write!(f, "open"),
            ProbeOutcome::Refused => write!(f, "refused"),
            ProbeOutcome::TimedOut => write!(f, "timed out"),
            ProbeOutcome::OtherError(kind) => write!(f, "error ({:?})", kind),
        }
    }
}

/// A single-port prober. One call, one attempt: no retries.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, addr: SocketAddr) -> ProbeOutcome;

    /// Address to probe for a host identifier; `None` when it cannot be resolved
    async fn resolve(&self, host: &str) -> Option<IpAddr> {
        resolve_host(host).await
    }
}

/// First resolved address, IPv4 preferred
pub async fn resolve_host(host: &str) -> Option<IpAddr> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Some(ip);
    }

    match tokio::net::lookup_host((host, 0)).await {
        Ok(addrs) => {
            let addrs: Vec<SocketAddr> = addrs.collect();
            addrs
                .iter()
                .find(|a| a.is_ipv4())
                .or_else(|| addrs.first())
                .map(|a| a.ip())
        }
        Err(e) => {
            log::debug!("DNS lookup for {} failed: {}", host, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_uses_error_kind() {
        let refused = io::Error::new(io::ErrorKind::ConnectionRefused, "anything");
        assert_eq!(ProbeOutcome::from_io_error(&refused), ProbeOutcome::Refused);

        // Message text mentioning a timeout must not change the kind
        let other = io::Error::new(io::ErrorKind::Other, "timed out");
        assert_eq!(
            ProbeOutcome::from_io_error(&other),
            ProbeOutcome::OtherError(io::ErrorKind::Other)
        );

        let timed_out = io::Error::from(io::ErrorKind::TimedOut);
        assert_eq!(ProbeOutcome::from_io_error(&timed_out), ProbeOutcome::TimedOut);
    }

    #[tokio::test]
    async fn test_ip_literals_skip_dns() {
        assert_eq!(resolve_host("127.0.0.1").await, Some(IpAddr::from([127, 0, 0, 1])));
        assert_eq!(resolve_host("::1").await, "::1".parse().ok());
    }

    #[test]
    fn test_only_open_is_open() {
        assert!(ProbeOutcome::Open.is_open());
        assert!(!ProbeOutcome::Refused.is_open());
        assert!(!ProbeOutcome::TimedOut.is_open());
        assert!(!ProbeOutcome::OtherError(io::ErrorKind::Other).is_open());
    }
}
