//! SMTP sink using lettre: one plain-text mail per newly opened port

use crate::alert::{AlertSink, PortAlert};
use crate::config::EmailConfig;
use crate::error::WatchError;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

pub struct EmailSink {
    transport: SmtpTransport,
    from: Mailbox,
    to: Mailbox,
}

impl EmailSink {
    /// Addresses and relay settings are checked here; nothing is sent until `notify`
    pub fn new(config: &EmailConfig) -> crate::Result<Self> {
        let relay = if config.starttls {
            SmtpTransport::starttls_relay(&config.smtp_server)
        } else {
            SmtpTransport::relay(&config.smtp_server)
        };
        let mut builder = relay
            .map_err(|e| {
                WatchError::Config(format!("Cannot set up SMTP relay {}: {}", config.smtp_server, e))
            })?
            .port(config.smtp_port);

        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from: config.sender().parse()?,
            to: config.to.parse()?,
        })
    }

    pub fn build_message(&self, alert: &PortAlert) -> crate::Result<Message> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(format!("Port alert: {}", alert.host))
            .header(ContentType::TEXT_PLAIN)
            .body(alert.to_string())?;
        Ok(message)
    }
}

#[async_trait]
impl AlertSink for EmailSink {
    async fn notify(&self, alert: &PortAlert) -> crate::Result<()> {
        let message = self.build_message(alert)?;
        let transport = self.transport.clone();

        // lettre's SmtpTransport blocks
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| WatchError::Alert(format!("Email task failed: {}", e)))??;

        log::info!("Alert for {}:{} mailed to {}", alert.host, alert.port, self.to);
        Ok(())
    }

    fn name(&self) -> &str {
        "email"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EmailConfig {
        EmailConfig {
            enabled: true,
            smtp_server: "smtp.example.com".to_string(),
            username: "alerts@example.com".to_string(),
            password: "pass".to_string(),
            to: "admin@example.com".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_message_carries_alert() {
        let sink = EmailSink::new(&config()).unwrap();
        let message = sink.build_message(&PortAlert::new("example.com", 8080)).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("Subject: Port alert: example.com"));
        assert!(raw.contains("From: alerts@example.com"));
        assert!(raw.contains("To: admin@example.com"));
        assert!(raw.contains("newly opened port on example.com: 8080"));
        assert_eq!(sink.name(), "email");
    }

    #[test]
    fn test_explicit_sender_wins_over_username() {
        let mut config = config();
        config.username = "smtp-login".to_string();
        config.from = Some("watch@example.com".to_string());
        let sink = EmailSink::new(&config).unwrap();
        let raw = String::from_utf8(
            sink.build_message(&PortAlert::new("h.test", 22)).unwrap().formatted(),
        )
        .unwrap();
        assert!(raw.contains("From: watch@example.com"));
    }

    #[test]
    fn test_bad_recipient_is_config_error() {
        let mut config = config();
        config.to = "not an address".to_string();
        let err = EmailSink::new(&config).err().unwrap();
        assert!(err.is_config());
    }

    #[tokio::test]
    async fn test_unreachable_relay_is_alert_error() {
        // Bind and release so nothing listens there
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut config = config();
        config.smtp_server = "127.0.0.1".to_string();
        config.smtp_port = port;

        let sink = EmailSink::new(&config).unwrap();
        let err = sink.notify(&PortAlert::new("example.com", 22)).await.unwrap_err();
        assert!(matches!(err, WatchError::Alert(_)));
    }
}
