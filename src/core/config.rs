//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{DgError, Result};
use crate::daemon::notifications::NotificationConfig;
use crate::monitor::checker::validate_threshold;
use crate::monitor::disk_usage::DEFAULT_THRESHOLD_PCT;
use crate::platform::pal::{UsageQueryKind, detect_usage_query};

/// Full diskguard configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub monitor: MonitorConfig,
    pub notifications: NotificationConfig,
    pub paths: PathsConfig,
}

/// Which paths to watch and when to alert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    /// One checker is built per path.
    pub paths: Vec<PathBuf>,
    /// Utilization percentage at or above which an alert is raised.
    pub threshold_pct: f64,
    /// Seconds between checks in daemon mode.
    pub interval_secs: u64,
    pub query: UsageQueryKind,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            paths: vec![PathBuf::from("/")],
            threshold_pct: DEFAULT_THRESHOLD_PCT,
            interval_secs: 60,
            query: detect_usage_query(),
        }
    }
}

/// Filesystem paths used by diskguard itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub activity_log: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!("[DG-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths");
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        Self {
            config_file: home_dir
                .join(".config")
                .join("diskguard")
                .join("config.toml"),
            activity_log: home_dir
                .join(".local")
                .join("share")
                .join("diskguard")
                .join("activity.jsonl"),
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| DgError::io(&path_buf, source))?;
            toml::from_str::<Self>(&raw)?
        } else if path.is_some() {
            return Err(DgError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.normalize_paths();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic FNV-1a hash of the effective config for logs.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("DG_MONITOR_THRESHOLD_PCT") {
            self.monitor.threshold_pct = parse_env("DG_MONITOR_THRESHOLD_PCT", &raw)?;
        }
        if let Some(raw) = lookup("DG_MONITOR_INTERVAL_SECS") {
            self.monitor.interval_secs = parse_env("DG_MONITOR_INTERVAL_SECS", &raw)?;
        }
        if let Some(raw) = lookup("DG_MONITOR_PATHS") {
            self.monitor.paths = env::split_paths(&raw)
                .filter(|path| !path.as_os_str().is_empty())
                .collect();
        }
        if let Some(raw) = lookup("DG_MONITOR_QUERY") {
            self.monitor.query = parse_env("DG_MONITOR_QUERY", &raw)?;
        }
        if let Some(raw) = lookup("DG_NOTIFICATIONS_ENABLED") {
            self.notifications.enabled = parse_env("DG_NOTIFICATIONS_ENABLED", &raw)?;
        }

        // A webhook URL from the environment implies the operator wants it used.
        if let Some(raw) = lookup("DG_WEBHOOK_URL") {
            self.notifications.webhook.url = raw;
            self.notifications.webhook.enabled = true;
            if !self.notifications.channels.iter().any(|c| c == "webhook") {
                self.notifications.channels.push("webhook".to_string());
            }
        }

        Ok(())
    }

    /// Strip trailing slashes from monitored paths and drop duplicates.
    fn normalize_paths(&mut self) {
        let mut seen = Vec::with_capacity(self.monitor.paths.len());
        for path in self.monitor.paths.drain(..) {
            let s = path.to_string_lossy();
            let trimmed = if s.len() > 1 {
                s.strip_suffix('/').map_or_else(|| path.clone(), PathBuf::from)
            } else {
                path.clone()
            };
            if !seen.contains(&trimmed) {
                seen.push(trimmed);
            }
        }
        self.monitor.paths = seen;
    }

    pub fn validate(&self) -> Result<()> {
        validate_threshold(self.monitor.threshold_pct).map_err(|_| DgError::InvalidConfig {
            details: format!(
                "monitor.threshold_pct must be in (0, 100], got {}",
                self.monitor.threshold_pct
            ),
        })?;

        if self.monitor.interval_secs == 0 {
            return Err(DgError::InvalidConfig {
                details: "monitor.interval_secs must be >= 1".to_string(),
            });
        }

        if self.monitor.paths.is_empty() {
            return Err(DgError::InvalidConfig {
                details: "monitor.paths must name at least one path".to_string(),
            });
        }

        let webhook = &self.notifications.webhook;
        if webhook.enabled {
            if webhook.url.trim().is_empty() {
                return Err(DgError::InvalidConfig {
                    details: "notifications.webhook.url is required when the webhook is enabled"
                        .to_string(),
                });
            }
            if !webhook.template.contains("${MESSAGE}") {
                return Err(DgError::InvalidConfig {
                    details: "notifications.webhook.template must contain ${MESSAGE}".to_string(),
                });
            }
            if webhook.timeout_secs == 0 {
                return Err(DgError::InvalidConfig {
                    details: "notifications.webhook.timeout_secs must be > 0".to_string(),
                });
            }
        }

        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|error| DgError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}
