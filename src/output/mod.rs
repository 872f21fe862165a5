//! Output formatting for per-target reports

use crate::monitor::TargetReport;
use crate::scanner::{format_ports, ScanResult};
use chrono::{DateTime, Utc};
use colored::*;
use serde::Serialize;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    /// One JSON object per line and target
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Serializable view of one report
#[derive(Debug, Serialize)]
pub struct ReportRecord<'a> {
    pub target: &'a str,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    pub changed: bool,
    pub open_ports: Vec<u16>,
    pub newly_opened: Vec<u16>,
    pub closed: Vec<u16>,
    pub failed_alerts: Vec<u16>,
    pub duration_ms: u128,
}

impl<'a> From<&'a TargetReport> for ReportRecord<'a> {
    fn from(report: &'a TargetReport) -> Self {
        match &report.outcome {
            Ok(result) => Self {
                target: &report.host,
                ok: true,
                error: None,
                started_at: Some(result.started_at),
                changed: result.has_changes(),
                open_ports: result.current_ports.iter().copied().collect(),
                newly_opened: result.newly_opened.iter().copied().collect(),
                closed: result.closed.iter().copied().collect(),
                failed_alerts: result.failed_alerts.iter().copied().collect(),
                duration_ms: result.duration.as_millis(),
            },
            Err(e) => Self {
                target: &report.host,
                ok: false,
                error: Some(e.to_string()),
                started_at: None,
                changed: false,
                open_ports: Vec::new(),
                newly_opened: Vec::new(),
                closed: Vec::new(),
                failed_alerts: Vec::new(),
                duration_ms: 0,
            },
        }
    }
}

/// Render a report in the requested format
pub fn render(report: &TargetReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => serde_json::to_string(&ReportRecord::from(report))
            .unwrap_or_else(|e| format!(r#"{{"target":"{}","ok":false,"error":"{}"}}"#, report.host, e)),
        OutputFormat::Text => match &report.outcome {
            Ok(result) => render_text(result),
            Err(e) => format!(
                "{} {} {}",
                "[!]".bright_red(),
                report.host.bright_cyan(),
                e.to_string().bright_red()
            ),
        },
    }
}

fn render_text(result: &ScanResult) -> String {
    let mut lines = Vec::new();

    lines.push(format!(
        "{} {} ({} ports in {:.2}s, {:.0} ports/s)",
        "[~]".bright_blue(),
        result.target.bright_cyan().bold(),
        result.probed,
        result.duration.as_secs_f64(),
        result.scan_rate()
    ));

    if result.current_ports.is_empty() {
        lines.push(format!("    Open: {}", "none".dimmed()));
    } else {
        lines.push(format!("    Open: {}", format_ports(&result.current_ports).bright_green()));
    }

    if result.newly_opened.is_empty() {
        lines.push(format!("    {}", "No new ports detected".bright_white()));
    } else {
        for port in &result.newly_opened {
            let marker = if result.failed_alerts.contains(port) {
                "← NEW (alert failed)".bright_red()
            } else {
                "← NEW".bright_green()
            };
            lines.push(format!("    {} {}", port.to_string().bright_yellow().bold(), marker));
        }
    }

    if !result.closed.is_empty() {
        lines.push(format!("    Closed: {}", format_ports(&result.closed).bright_red()));
    }

    lines.join("\n")
}

pub fn print_report(report: &TargetReport, format: OutputFormat) {
    println!("{}", render(report, format));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WatchError;
    use crate::scanner::PortSet;
    use std::time::Duration;

    fn ports(list: &[u16]) -> PortSet {
        list.iter().copied().collect()
    }

    fn sample() -> TargetReport {
        TargetReport {
            host: "example.com".to_string(),
            outcome: Ok(ScanResult {
                target: "example.com".to_string(),
                current_ports: ports(&[80, 443, 8080]),
                previous_ports: ports(&[80, 443, 22]),
                newly_opened: ports(&[8080]),
                closed: ports(&[22]),
                failed_alerts: PortSet::new(),
                probed: 1024,
                started_at: Utc::now(),
                duration: Duration::from_millis(1500),
            }),
        }
    }

    #[test]
    fn test_text_lists_changes() {
        colored::control::set_override(false);
        let text = render(&sample(), OutputFormat::Text);
        assert!(text.contains("example.com (1024 ports in 1.50s, 683 ports/s)"));
        assert!(text.contains("Open: 80, 443, 8080"));
        assert!(text.contains("8080 ← NEW"));
        assert!(text.contains("Closed: 22"));
    }

    #[test]
    fn test_json_record() {
        let json: serde_json::Value =
            serde_json::from_str(&render(&sample(), OutputFormat::Json)).unwrap();
        assert_eq!(json["target"], "example.com");
        assert_eq!(json["ok"], true);
        assert_eq!(json["newly_opened"], serde_json::json!([8080]));
        assert_eq!(json["duration_ms"], 1500);
        assert_eq!(json["changed"], true);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_failed_report() {
        let report = TargetReport {
            host: "broken.test".to_string(),
            outcome: Err(WatchError::Cancelled),
        };
        let json: serde_json::Value =
            serde_json::from_str(&render(&report, OutputFormat::Json)).unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["error"], "Scan cancelled");
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("txt".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
