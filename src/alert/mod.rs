//! Alert sinks for newly opened ports

pub mod email;
pub mod webhook;

use crate::error::WatchError;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

pub use email::EmailSink;
pub use webhook::WebhookSink;

/// One newly opened port on one host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortAlert {
    pub host: String,
    pub port: u16,
}

impl PortAlert {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for PortAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "newly opened port on {}: {}", self.host, self.port)
    }
}

/// Destination for alerts. Delivery is best effort: the caller logs a
/// failure and moves on to the next port.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn notify(&self, alert: &PortAlert) -> crate::Result<()>;

    fn name(&self) -> &str;
}

/// Writes alerts to the log; used when no other sink is enabled
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl AlertSink for LogSink {
    async fn notify(&self, alert: &PortAlert) -> crate::Result<()> {
        log::warn!("ALERT: {}", alert);
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Delivers each alert to every sink in turn. A failing sink does not stop
/// the others; the alert counts as failed when any of them failed.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn AlertSink>>,
    name: String,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn AlertSink>>) -> Self {
        let name = sinks.iter().map(|s| s.name()).collect::<Vec<_>>().join("+");
        Self { sinks, name }
    }
}

#[async_trait]
impl AlertSink for FanoutSink {
    async fn notify(&self, alert: &PortAlert) -> crate::Result<()> {
        let mut failures = Vec::new();
        for sink in &self.sinks {
            if let Err(e) = sink.notify(alert).await {
                log::warn!("{} delivery of '{}' failed: {}", sink.name(), alert, e);
                failures.push(format!("{}: {}", sink.name(), e));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(WatchError::Alert(failures.join("; ")))
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Every enabled sink, or the log sink when none is
pub fn sink_from_config(config: &crate::config::WatchConfig) -> crate::Result<Arc<dyn AlertSink>> {
    let mut sinks: Vec<Arc<dyn AlertSink>> = Vec::new();

    let webhook = &config.alerts.webhook;
    if let Some(url) = webhook.url.as_deref().filter(|_| webhook.enabled) {
        sinks.push(Arc::new(WebhookSink::new(
            url,
            &webhook.payload_key,
            std::time::Duration::from_secs(webhook.timeout_secs),
        )?));
    }

    if config.alerts.email.enabled {
        sinks.push(Arc::new(EmailSink::new(&config.alerts.email)?));
    }

    Ok(match sinks.len() {
        0 => Arc::new(LogSink),
        1 => sinks.remove(0),
        _ => Arc::new(FanoutSink::new(sinks)),
    })
}
