//! Alert delivery: the `NotificationSink` seam plus webhook, file, and journal channels.
//!
//! The manager fans an alert out to every configured channel. Unlike a
//! fire-and-forget notifier, delivery outcome is reported back: a send counts
//! as delivered when at least one channel accepted the text, and fails
//! otherwise so the checker can retry on its next invocation.

#![allow(missing_docs)]

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::errors::{DgError, Result};

/// Delivers a formatted alert text verbatim.
pub trait NotificationSink: Send + Sync {
    fn send_message(&self, text: &str) -> Result<()>;
}

impl<T: NotificationSink + ?Sized> NotificationSink for Arc<T> {
    fn send_message(&self, text: &str) -> Result<()> {
        (**self).send_message(text)
    }
}

impl<T: NotificationSink + ?Sized> NotificationSink for Box<T> {
    fn send_message(&self, text: &str) -> Result<()> {
        (**self).send_message(text)
    }
}

// ──────────────────── configuration ────────────────────

/// Top-level notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NotificationConfig {
    /// Master switch for all notifications.
    pub enabled: bool,
    /// Which channel names to activate.
    pub channels: Vec<String>,
    pub webhook: WebhookConfig,
    pub file: FileConfig,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            channels: vec!["journal".to_string(), "file".to_string()],
            webhook: WebhookConfig::default(),
            file: FileConfig::default(),
        }
    }
}

/// Chat webhook settings (HTTP POST via curl).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WebhookConfig {
    pub enabled: bool,
    pub url: String,
    /// JSON body with a `${MESSAGE}` placeholder.
    pub template: String,
    pub timeout_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            template: r#"{"content": "${MESSAGE}"}"#.to_string(),
            timeout_secs: 5,
        }
    }
}

/// Append-only JSONL alert history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FileConfig {
    pub path: PathBuf,
}

impl Default for FileConfig {
    fn default() -> Self {
        let home = std::env::var_os("HOME").map_or_else(|| PathBuf::from("/tmp"), PathBuf::from);
        Self {
            path: home
                .join(".local")
                .join("share")
                .join("diskguard")
                .join("alerts.jsonl"),
        }
    }
}

// ──────────────────── channels ────────────────────

#[derive(Debug, Serialize)]
struct AlertRecord<'a> {
    ts: String,
    message: &'a str,
}

trait Channel: Send + Sync {
    fn name(&self) -> &'static str;
    fn send(&self, text: &str) -> Result<()>;
}

// ──── Journal (stderr, captured by systemd) ────

struct JournalChannel;

impl Channel for JournalChannel {
    fn name(&self) -> &'static str {
        "journal"
    }

    fn send(&self, text: &str) -> Result<()> {
        eprintln!("[DG-NOTIFY] {text}");
        Ok(())
    }
}

// ──── File (append-only JSONL) ────

struct FileChannel {
    path: PathBuf,
}

impl Channel for FileChannel {
    fn name(&self) -> &'static str {
        "file"
    }

    fn send(&self, text: &str) -> Result<()> {
        let record = AlertRecord {
            ts: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            message: text,
        };
        let json = serde_json::to_string(&record)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| DgError::io(parent, source))?;
        }

        let mut opts = OpenOptions::new();
        opts.create(true).append(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt as _;
            opts.mode(0o600);
        }
        let mut file = opts
            .open(&self.path)
            .map_err(|source| DgError::io(&self.path, source))?;
        writeln!(file, "{json}").map_err(|source| DgError::io(&self.path, source))
    }
}

// ──── Webhook (HTTP POST via curl) ────

struct WebhookChannel {
    url: String,
    template: String,
    timeout_secs: u64,
}

impl WebhookChannel {
    fn render_body(&self, text: &str) -> String {
        // JSON-escape so alert text cannot break out of the payload.
        let escaped = text
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('\n', "\\n");
        self.template.replace("${MESSAGE}", &escaped)
    }
}

impl Channel for WebhookChannel {
    fn name(&self) -> &'static str {
        "webhook"
    }

    fn send(&self, text: &str) -> Result<()> {
        if self.url.is_empty() {
            return Err(DgError::Notification {
                channel: "webhook",
                details: "webhook url is empty".to_string(),
            });
        }

        let output = Command::new("curl")
            .arg("--silent")
            .arg("--show-error")
            .arg("--fail")
            .arg("--max-time")
            .arg(self.timeout_secs.to_string())
            .arg("--header")
            .arg("Content-Type: application/json")
            .arg("--data")
            .arg(self.render_body(text))
            .arg(&self.url)
            .output()
            .map_err(|error| DgError::Notification {
                channel: "webhook",
                details: format!("failed to spawn curl: {error}"),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(DgError::Notification {
                channel: "webhook",
                details: format!(
                    "curl exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            })
        }
    }
}

// ──────────────────── notification manager ────────────────────

/// Dispatches alert text to all enabled channels.
pub struct NotificationManager {
    channels: Vec<Box<dyn Channel>>,
    enabled: bool,
    last_delivery: Mutex<Option<Instant>>,
}

impl NotificationManager {
    /// Build a manager from configuration.
    #[must_use]
    pub fn from_config(config: &NotificationConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }

        let mut channels: Vec<Box<dyn Channel>> = Vec::new();
        for channel_name in &config.channels {
            match channel_name.as_str() {
                "journal" => channels.push(Box::new(JournalChannel)),
                "file" => channels.push(Box::new(FileChannel {
                    path: config.file.path.clone(),
                })),
                "webhook" if config.webhook.enabled => {
                    channels.push(Box::new(WebhookChannel {
                        url: config.webhook.url.clone(),
                        template: config.webhook.template.clone(),
                        timeout_secs: config.webhook.timeout_secs,
                    }));
                }
                other => {
                    eprintln!("[DG-NOTIFY] skipping unknown or disabled channel {other:?}");
                }
            }
        }

        Self {
            channels,
            enabled: true,
            last_delivery: Mutex::new(None),
        }
    }

    /// Create a disabled manager. Every send fails, so alerts stay pending.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            channels: Vec::new(),
            enabled: false,
            last_delivery: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// When the last successful delivery happened.
    #[must_use]
    pub fn last_delivery(&self) -> Option<Instant> {
        *self.last_delivery.lock()
    }
}

impl NotificationSink for NotificationManager {
    fn send_message(&self, text: &str) -> Result<()> {
        if !self.enabled || self.channels.is_empty() {
            return Err(DgError::Notification {
                channel: "manager",
                details: "no notification channel is active".to_string(),
            });
        }

        let mut failures = Vec::new();
        for channel in &self.channels {
            if let Err(err) = channel.send(text) {
                eprintln!("[DG-NOTIFY] channel {} failed: {err}", channel.name());
                failures.push(format!("{}: {err}", channel.name()));
            }
        }

        if failures.len() == self.channels.len() {
            return Err(DgError::Notification {
                channel: "manager",
                details: failures.join("; "),
            });
        }

        *self.last_delivery.lock() = Some(Instant::now());
        Ok(())
    }
}

// ──────────────────── tests ────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const ALERT: &str =
        ":rotating_light: Disk usage is **90%**: **1 GB** of **10 GB** available :rotating_light:";

    fn file_only(path: PathBuf) -> NotificationConfig {
        NotificationConfig {
            channels: vec!["file".to_string()],
            file: FileConfig { path },
            ..Default::default()
        }
    }

    #[test]
    fn default_config_has_journal_and_file() {
        let config = NotificationConfig::default();
        assert!(config.enabled);
        assert_eq!(config.channels, vec!["journal", "file"]);
        assert!(!config.webhook.enabled);
    }

    #[test]
    fn manager_from_default_config() {
        let manager = NotificationManager::from_config(&NotificationConfig::default());
        assert!(manager.is_enabled());
        assert_eq!(manager.channel_names(), vec!["journal", "file"]);
    }

    #[test]
    fn manager_skips_disabled_webhook() {
        let config = NotificationConfig {
            channels: vec!["webhook".to_string(), "journal".to_string()],
            ..Default::default()
        };
        let manager = NotificationManager::from_config(&config);
        assert_eq!(manager.channel_names(), vec!["journal"]);
    }

    #[test]
    fn disabled_manager_reports_failure() {
        let manager = NotificationManager::disabled();
        assert!(!manager.is_enabled());
        let err = manager
            .send_message(ALERT)
            .expect_err("disabled manager cannot deliver");
        assert_eq!(err.code(), "DG-2201");
        assert!(manager.last_delivery().is_none());
    }

    #[test]
    fn manager_with_no_channels_reports_failure() {
        let config = NotificationConfig {
            channels: Vec::new(),
            ..Default::default()
        };
        let manager = NotificationManager::from_config(&config);
        assert!(manager.send_message(ALERT).is_err());
    }

    #[test]
    fn file_channel_writes_message_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("alerts.jsonl");
        let manager = NotificationManager::from_config(&file_only(path.clone()));

        manager.send_message(ALERT).expect("file delivery");
        manager.send_message(ALERT).expect("file delivery");

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["message"], ALERT);
        assert!(parsed.get("ts").is_some());
        assert!(manager.last_delivery().is_some());
    }

    #[test]
    fn all_channels_failing_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes the append fail.
        let path = dir.path().join("blocked");
        fs::create_dir_all(&path).unwrap();
        let manager = NotificationManager::from_config(&file_only(path));

        let err = manager.send_message(ALERT).expect_err("append must fail");
        assert!(err.to_string().contains("file:"), "got: {err}");
        assert!(manager.last_delivery().is_none());
    }

    #[test]
    fn partial_delivery_counts_as_success() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blocked");
        fs::create_dir_all(&path).unwrap();
        let config = NotificationConfig {
            channels: vec!["file".to_string(), "journal".to_string()],
            file: FileConfig { path },
            ..Default::default()
        };
        let manager = NotificationManager::from_config(&config);
        assert!(manager.send_message(ALERT).is_ok());
    }

    #[test]
    fn webhook_renders_escaped_message() {
        let channel = WebhookChannel {
            url: "https://chat.example.com/hooks/abc".to_string(),
            template: WebhookConfig::default().template,
            timeout_secs: 5,
        };
        let body = channel.render_body("line \"one\"\nline two");
        assert_eq!(body, r#"{"content": "line \"one\"\nline two"}"#);
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["content"], "line \"one\"\nline two");
    }

    #[test]
    fn webhook_with_empty_url_fails() {
        let channel = WebhookChannel {
            url: String::new(),
            template: WebhookConfig::default().template,
            timeout_secs: 5,
        };
        let err = channel.send(ALERT).expect_err("empty url cannot deliver");
        assert!(err.to_string().contains("url is empty"));
    }

    #[test]
    fn notification_config_roundtrip_toml() {
        let config = NotificationConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: NotificationConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }
}
