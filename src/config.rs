//! Configuration module for the port watcher

use crate::error::WatchError;
use crate::utils::port_range::DEFAULT_PORT_RANGE;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure. Unknown keys are rejected at load time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    /// Timeout for each connection attempt in milliseconds
    pub timeout_ms: u64,

    /// Simultaneous connection attempts within one target's scan
    pub concurrency: usize,

    /// Number of targets scanned at the same time in one cycle
    pub parallel_targets: usize,

    /// Port range used by targets that do not override it
    pub default_ports: String,

    /// Directory holding one baseline record per target
    pub state_dir: PathBuf,

    /// Pause between two watch cycles, in seconds
    pub interval_secs: u64,

    /// Pause between targets when scanning sequentially, in seconds
    pub interval_between_targets_secs: u64,

    /// Shorthand targets using `default_ports`
    pub domains: Vec<String>,

    /// Targets with optional per-target overrides
    pub targets: Vec<TargetConfig>,

    pub alerts: AlertsConfig,

    pub logging: LoggingConfig,
}

/// One `[[targets]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    pub host: String,
    pub ports: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AlertsConfig {
    pub webhook: WebhookConfig,
    pub email: EmailConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WebhookConfig {
    pub enabled: bool,
    pub url: Option<String>,
    pub timeout_secs: u64,
    /// JSON key carrying the message (`content` for Discord, `text` for Slack)
    pub payload_key: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: None,
            timeout_secs: 10,
            payload_key: "content".to_string(),
        }
    }
}

/// `[alerts.email]`: one plain-text mail per newly opened port
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmailConfig {
    pub enabled: bool,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    /// Recipient address
    pub to: String,
    /// Sender address; the SMTP username when unset
    pub from: Option<String>,
    /// STARTTLS upgrade (usually port 587); implicit TLS (port 465) when false
    pub starttls: bool,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_server: String::new(),
            smtp_port: 587,
            username: String::new(),
            password: String::new(),
            to: String::new(),
            from: None,
            starttls: true,
        }
    }
}

impl EmailConfig {
    pub fn sender(&self) -> &str {
        self.from.as_deref().unwrap_or(&self.username)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<PathBuf>,
    pub console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            console: true,
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 100,
            concurrency: crate::scanner::engine::DEFAULT_CONCURRENCY,
            parallel_targets: 1,
            default_ports: DEFAULT_PORT_RANGE.to_string(),
            state_dir: default_state_dir(),
            interval_secs: 60,
            interval_between_targets_secs: 5,
            domains: Vec::new(),
            targets: Vec::new(),
            alerts: AlertsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl WatchConfig {
    /// Set the probe timeout in milliseconds
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the number of simultaneous probes
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_default_ports(mut self, ports: impl Into<String>) -> Self {
        self.default_ports = ports.into();
        self
    }

    pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = dir.into();
        self
    }

    /// Enable the webhook sink with the given URL
    pub fn with_webhook(mut self, url: impl Into<String>) -> Self {
        self.alerts.webhook.enabled = true;
        self.alerts.webhook.url = Some(url.into());
        self
    }

    pub fn with_target(mut self, host: impl Into<String>, ports: Option<String>) -> Self {
        self.targets.push(TargetConfig {
            host: host.into(),
            ports,
        });
        self
    }

    /// Get timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn interval_between_targets(&self) -> Duration {
        Duration::from_secs(self.interval_between_targets_secs)
    }

    /// `domains` shorthand first, then `[[targets]]`, in file order
    pub fn target_entries(&self) -> Vec<TargetConfig> {
        self.domains
            .iter()
            .map(|host| TargetConfig {
                host: host.clone(),
                ports: None,
            })
            .chain(self.targets.iter().cloned())
            .collect()
    }

    /// Load configuration from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            WatchError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let config: WatchConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `~/.portwatch.toml` when present, defaults otherwise
    pub fn load_default_config() -> crate::Result<Self> {
        match default_config_path() {
            Some(path) if path.exists() => {
                log::info!("Loading config from {}", path.display());
                Self::from_toml_file(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Validate the global settings. Per-target port ranges are checked
    /// later so that one bad target does not disable the others.
    pub fn validate(&self) -> crate::Result<()> {
        if self.timeout_ms == 0 {
            return Err(WatchError::Config("Timeout must be greater than 0".to_string()));
        }

        if self.concurrency == 0 {
            return Err(WatchError::Config("Concurrency must be greater than 0".to_string()));
        }

        if self.parallel_targets == 0 {
            return Err(WatchError::Config("parallel_targets must be greater than 0".to_string()));
        }

        let webhook = &self.alerts.webhook;
        if webhook.enabled && webhook.url.as_deref().map_or(true, |u| u.trim().is_empty()) {
            return Err(WatchError::Config("Webhook is enabled but has no url".to_string()));
        }
        if webhook.payload_key.is_empty() {
            return Err(WatchError::Config("Webhook payload_key cannot be empty".to_string()));
        }

        let email = &self.alerts.email;
        if email.enabled {
            if email.smtp_server.trim().is_empty() {
                return Err(WatchError::Config("Email is enabled but has no smtp_server".to_string()));
            }
            if email.to.trim().is_empty() {
                return Err(WatchError::Config("Email is enabled but has no recipient (to)".to_string()));
            }
            if email.sender().trim().is_empty() {
                return Err(WatchError::Config("Email needs a username or from address".to_string()));
            }
        }

        Ok(())
    }
}

/// `~/.portwatch.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".portwatch.toml"))
}

/// `~/.portwatch/state`, or `./state` without a home directory
pub fn default_state_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".portwatch").join("state"))
        .unwrap_or_else(|| PathBuf::from("state"))
}
