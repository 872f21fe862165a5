//! JSON webhook sink (Discord/Slack style incoming hooks)

use crate::alert::{AlertSink, PortAlert};
use crate::error::WatchError;
use async_trait::async_trait;
use std::time::Duration;

pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
    payload_key: String,
}

impl WebhookSink {
    pub fn new(url: &str, payload_key: &str, timeout: Duration) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("portwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| WatchError::Config(format!("Cannot build webhook client: {}", e)))?;

        Ok(Self {
            client,
            url: url.to_string(),
            payload_key: payload_key.to_string(),
        })
    }

    /// `{"<payload_key>": "<message>"}`
    pub fn payload(&self, alert: &PortAlert) -> serde_json::Value {
        let mut body = serde_json::Map::new();
        body.insert(self.payload_key.clone(), serde_json::Value::String(alert.to_string()));
        serde_json::Value::Object(body)
    }
}

#[async_trait]
impl AlertSink for WebhookSink {
    async fn notify(&self, alert: &PortAlert) -> crate::Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&self.payload(alert))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WatchError::Alert(format!("Webhook answered {}", status)));
        }

        log::info!("Alert for {}:{} sent to webhook", alert.host, alert.port);
        Ok(())
    }

    fn name(&self) -> &str {
        "webhook"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    /// Accept one connection, capture the request and answer with `status_line`
    fn one_shot_server(status_line: &'static str) -> (String, std::thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/hook", listener.local_addr().unwrap());

        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        request.extend_from_slice(&buf[..n]);
                        let text = String::from_utf8_lossy(&request);
                        if let Some(idx) = text.find("\r\n\r\n") {
                            let body_len = text
                                .lines()
                                .find_map(|l| {
                                    l.to_ascii_lowercase()
                                        .strip_prefix("content-length:")
                                        .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                                })
                                .unwrap_or(0);
                            if request.len() >= idx + 4 + body_len {
                                break;
                            }
                        }
                    }
                }
            }
            let response = format!("HTTP/1.1 {}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n", status_line);
            stream.write_all(response.as_bytes()).unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });

        (url, handle)
    }

    #[test]
    fn test_payload_key() {
        let sink = WebhookSink::new("http://127.0.0.1/", "text", Duration::from_secs(1)).unwrap();
        let payload = sink.payload(&PortAlert::new("example.com", 8080));
        assert_eq!(payload["text"], "newly opened port on example.com: 8080");
    }

    #[tokio::test]
    async fn test_posts_json() {
        let (url, server) = one_shot_server("204 No Content");
        let sink = WebhookSink::new(&url, "content", Duration::from_secs(2)).unwrap();

        sink.notify(&PortAlert::new("example.com", 8080)).await.unwrap();

        let request = server.join().unwrap();
        assert!(request.starts_with("POST /hook"));
        assert!(request.contains(r#"{"content":"newly opened port on example.com: 8080"}"#));
    }

    #[tokio::test]
    async fn test_error_status_is_a_failure() {
        let (url, server) = one_shot_server("500 Internal Server Error");
        let sink = WebhookSink::new(&url, "content", Duration::from_secs(2)).unwrap();

        let err = sink.notify(&PortAlert::new("example.com", 22)).await.unwrap_err();
        assert!(matches!(err, WatchError::Alert(_)));
        server.join().unwrap();
    }
}
