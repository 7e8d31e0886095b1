//! JSONL activity log: one self-contained JSON object per line.
//!
//! Each line is serialized in full before a single `write_all`, so a reader
//! tailing the file never sees half an entry. When the primary file cannot be
//! written the writer degrades to the fallback path, then to stderr with a
//! `[DG-JSONL]` prefix, then to silent discard. Logging never fails a check.

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{DgError, Result};
use crate::monitor::checker::CheckOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    UsageCheck,
    AlertSent,
    AlertSuppressed,
    AlertRearmed,
    CheckFailed,
    DaemonStart,
    DaemonStop,
}

/// A single activity record. Only `ts`, `event` and `severity` are mandatory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// RFC 3339 UTC timestamp with millisecond precision.
    pub ts: String,
    pub event: EventType,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_used: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    /// Create a new entry stamped with the current UTC time.
    #[must_use]
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: format_utc_now(),
            event,
            severity,
            path: None,
            total_bytes: None,
            available_bytes: None,
            percent_used: None,
            threshold_pct: None,
            error_code: None,
            error_message: None,
            details: None,
        }
    }

    /// Record for a completed check of `path`.
    #[must_use]
    pub fn from_outcome(path: &Path, threshold_pct: f64, outcome: &CheckOutcome) -> Self {
        let (event, severity) = match outcome {
            CheckOutcome::Normal { .. } => (EventType::UsageCheck, Severity::Info),
            CheckOutcome::Rearmed { .. } => (EventType::AlertRearmed, Severity::Info),
            CheckOutcome::AlertSent { .. } => (EventType::AlertSent, Severity::Critical),
            CheckOutcome::AlertSuppressed { .. } => (EventType::AlertSuppressed, Severity::Warning),
        };
        let usage = outcome.usage();
        let mut entry = Self::new(event, severity);
        entry.path = Some(path.to_string_lossy().into_owned());
        entry.total_bytes = Some(usage.total);
        entry.available_bytes = Some(usage.available);
        entry.percent_used = Some(outcome.percent_used());
        entry.threshold_pct = Some(threshold_pct);
        if let CheckOutcome::AlertSent { message, .. } = outcome {
            entry.details = Some(message.clone());
        }
        entry
    }

    /// Record for a check that failed before completing.
    #[must_use]
    pub fn from_error(path: &Path, error: &DgError) -> Self {
        let mut entry = Self::new(EventType::CheckFailed, Severity::Warning);
        entry.path = Some(path.to_string_lossy().into_owned());
        entry.error_code = Some(error.code().to_string());
        entry.error_message = Some(error.to_string());
        entry
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Normal,
    Fallback,
    Stderr,
    Discard,
}

#[derive(Debug, Clone)]
pub struct JsonlConfig {
    pub path: PathBuf,
    pub fallback_path: Option<PathBuf>,
    /// Rotate once the current file would exceed this size.
    pub max_size_bytes: u64,
    pub max_rotated_files: u32,
}

impl JsonlConfig {
    #[must_use]
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

impl Default for JsonlConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/var/lib/diskguard/activity.jsonl"),
            fallback_path: Some(std::env::temp_dir().join("diskguard-activity.jsonl")),
            max_size_bytes: 10 * 1024 * 1024,
            max_rotated_files: 3,
        }
    }
}

/// Append-only JSONL writer with size-based rotation and degradation.
pub struct JsonlWriter {
    config: JsonlConfig,
    writer: Option<BufWriter<File>>,
    state: WriterState,
    bytes_written: u64,
}

impl JsonlWriter {
    /// Open the log, falling through the degradation chain on failure.
    #[must_use]
    pub fn open(config: JsonlConfig) -> Self {
        let mut writer = Self {
            config,
            writer: None,
            state: WriterState::Discard,
            bytes_written: 0,
        };
        writer.open_primary();
        writer
    }

    pub fn write_entry(&mut self, entry: &LogEntry) {
        match serde_json::to_string(entry) {
            Ok(json) => self.write_line(&format!("{json}\n")),
            Err(e) => eprintln!("[DG-JSONL] serialize error: {e}"),
        }
    }

    /// Flush buffered lines to disk.
    pub fn flush(&mut self) {
        if let Some(w) = self.writer.as_mut() {
            let _ = w.flush();
        }
    }

    pub fn state(&self) -> &'static str {
        match self.state {
            WriterState::Normal => "normal",
            WriterState::Fallback => "fallback",
            WriterState::Stderr => "stderr",
            WriterState::Discard => "discard",
        }
    }

    fn active_path(&self) -> Option<&Path> {
        match self.state {
            WriterState::Normal => Some(&self.config.path),
            WriterState::Fallback => self.config.fallback_path.as_deref(),
            WriterState::Stderr | WriterState::Discard => None,
        }
    }

    fn write_line(&mut self, line: &str) {
        if self.bytes_written + line.len() as u64 > self.config.max_size_bytes {
            self.rotate();
        }

        match self.state {
            WriterState::Normal | WriterState::Fallback => {
                let written = self
                    .writer
                    .as_mut()
                    .is_some_and(|w| w.write_all(line.as_bytes()).and_then(|()| w.flush()).is_ok());
                if written {
                    self.bytes_written += line.len() as u64;
                } else {
                    self.degrade();
                    self.write_line(line);
                }
            }
            WriterState::Stderr => {
                if write!(io::stderr(), "[DG-JSONL] {line}").is_err() {
                    self.state = WriterState::Discard;
                }
            }
            WriterState::Discard => {}
        }
    }

    fn open_primary(&mut self) {
        match open_append(&self.config.path) {
            Ok((file, size)) => self.install(file, size, WriterState::Normal),
            Err(_) => self.open_fallback(),
        }
    }

    fn open_fallback(&mut self) {
        let opened = self
            .config
            .fallback_path
            .as_deref()
            .map(|fallback| (fallback.to_path_buf(), open_append(fallback)));
        match opened {
            Some((fallback, Ok((file, size)))) => {
                eprintln!(
                    "[DG-JSONL] primary log unavailable, using fallback: {}",
                    fallback.display()
                );
                self.install(file, size, WriterState::Fallback);
            }
            _ => {
                eprintln!("[DG-JSONL] no writable log file, using stderr");
                self.writer = None;
                self.state = WriterState::Stderr;
            }
        }
    }

    fn install(&mut self, file: File, size: u64, state: WriterState) {
        self.writer = Some(BufWriter::new(file));
        self.state = state;
        self.bytes_written = size;
    }

    fn degrade(&mut self) {
        self.writer = None;
        match self.state {
            WriterState::Normal => self.open_fallback(),
            WriterState::Fallback => self.state = WriterState::Stderr,
            WriterState::Stderr | WriterState::Discard => self.state = WriterState::Discard,
        }
    }

    /// `log.jsonl` -> `log.jsonl.1` -> ... -> `log.jsonl.N` (dropped).
    fn rotate(&mut self) {
        let Some(base) = self.active_path().map(Path::to_path_buf) else {
            return;
        };
        self.flush();
        self.writer = None;

        let max = self.config.max_rotated_files;
        let _ = fs::remove_file(rotated_name(&base, max));
        for index in (1..max).rev() {
            let _ = fs::rename(rotated_name(&base, index), rotated_name(&base, index + 1));
        }
        if max > 0 {
            let _ = fs::rename(&base, rotated_name(&base, 1));
        } else {
            let _ = fs::remove_file(&base);
        }

        match open_append(&base) {
            Ok((file, _)) => {
                let state = self.state;
                self.install(file, 0, state);
            }
            Err(_) => self.degrade(),
        }
    }
}

fn open_append(path: &Path) -> Result<(File, u64)> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| DgError::io(parent, source))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| DgError::io(path, source))?;
    let size = file.metadata().map_or(0, |m| m.len());
    Ok((file, size))
}

fn rotated_name(base: &Path, index: u32) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

fn format_utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
