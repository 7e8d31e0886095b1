//! Usage-query abstraction with native `statvfs` and `df`-utility implementations.

#![allow(missing_docs)]

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::errors::{DgError, Result};
use crate::monitor::disk_usage::DiskUsage;

/// Capability to measure capacity of one monitored path.
///
/// Implementations must return `total > 0` and `available <= total` for a real
/// filesystem; the checker still validates every measurement.
pub trait UsageQuery: Send + Sync {
    fn get_usage(&self) -> Result<DiskUsage>;

    /// Path being measured, used for log context.
    fn path(&self) -> &Path;
}

impl<T: UsageQuery + ?Sized> UsageQuery for Arc<T> {
    fn get_usage(&self) -> Result<DiskUsage> {
        (**self).get_usage()
    }

    fn path(&self) -> &Path {
        (**self).path()
    }
}

impl<T: UsageQuery + ?Sized> UsageQuery for Box<T> {
    fn get_usage(&self) -> Result<DiskUsage> {
        (**self).get_usage()
    }

    fn path(&self) -> &Path {
        (**self).path()
    }
}

/// Which backend measures disk usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UsageQueryKind {
    /// Native `statvfs(3)` call.
    #[default]
    Statvfs,
    /// Spawn `df -P -k <path>` and parse its POSIX output.
    Df,
}

impl fmt::Display for UsageQueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Statvfs => write!(f, "statvfs"),
            Self::Df => write!(f, "df"),
        }
    }
}

impl std::str::FromStr for UsageQueryKind {
    type Err = DgError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "statvfs" => Ok(Self::Statvfs),
            "df" => Ok(Self::Df),
            other => Err(DgError::ConfigParse {
                context: "usage query",
                details: format!("unknown usage query backend {other:?} (expected statvfs or df)"),
            }),
        }
    }
}

/// Native measurement through `statvfs`.
#[cfg(target_os = "linux")]
#[derive(Debug, Clone)]
pub struct StatvfsUsage {
    path: PathBuf,
}

#[cfg(target_os = "linux")]
impl StatvfsUsage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[cfg(target_os = "linux")]
impl UsageQuery for StatvfsUsage {
    fn get_usage(&self) -> Result<DiskUsage> {
        let stat = nix::sys::statvfs::statvfs(&self.path).map_err(|error| DgError::FsStats {
            path: self.path.clone(),
            details: error.to_string(),
        })?;
        let fragment = stat.fragment_size();
        Ok(DiskUsage {
            total: stat.blocks().saturating_mul(fragment),
            available: stat.blocks_available().saturating_mul(fragment),
        })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

/// Measurement by invoking the POSIX `df` utility.
#[derive(Debug, Clone)]
pub struct DfUsage {
    path: PathBuf,
}

impl DfUsage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl UsageQuery for DfUsage {
    fn get_usage(&self) -> Result<DiskUsage> {
        let output = Command::new("df")
            .arg("-P")
            .arg("-k")
            .arg(&self.path)
            .output()
            .map_err(|error| DgError::CommandFailed {
                command: "df",
                details: error.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DgError::FsStats {
                path: self.path.clone(),
                details: format!("df exited with {}: {}", output.status, stderr.trim()),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_df_output(&stdout).map_err(|details| DgError::FsStats {
            path: self.path.clone(),
            details,
        })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

/// Build the usage query for `path` with the requested backend.
pub fn usage_query_for(kind: UsageQueryKind, path: &Path) -> Result<Box<dyn UsageQuery>> {
    match kind {
        UsageQueryKind::Df => Ok(Box::new(DfUsage::new(path))),
        UsageQueryKind::Statvfs => {
            #[cfg(target_os = "linux")]
            {
                Ok(Box::new(StatvfsUsage::new(path)))
            }
            #[cfg(not(target_os = "linux"))]
            {
                Err(DgError::UnsupportedPlatform {
                    details: "statvfs backend is only implemented on Linux; use query = \"df\""
                        .to_string(),
                })
            }
        }
    }
}

/// Pick the best available backend for the current platform.
#[must_use]
pub const fn detect_usage_query() -> UsageQueryKind {
    if cfg!(target_os = "linux") {
        UsageQueryKind::Statvfs
    } else {
        UsageQueryKind::Df
    }
}

/// Parse `df -P -k` output: a header line followed by one data line with
/// 1024-byte block counts. Long device names may wrap the data line, so all
/// non-header fields are joined before splitting.
fn parse_df_output(raw: &str) -> std::result::Result<DiskUsage, String> {
    let mut lines = raw.lines().filter(|line| !line.trim().is_empty());
    let header = lines.next().ok_or_else(|| "empty df output".to_string())?;
    if !header.trim_start().starts_with("Filesystem") {
        return Err(format!("unexpected df header: {header}"));
    }

    let data: Vec<&str> = lines.flat_map(str::split_whitespace).collect();
    if data.len() < 6 {
        return Err(format!("df data line has {} fields, expected 6", data.len()));
    }

    let parse_blocks = |label: &str, value: &str| {
        value
            .parse::<u64>()
            .map_err(|err| format!("invalid df {label} value {value:?}: {err}"))
    };
    let total_kib = parse_blocks("size", data[1])?;
    let available_kib = parse_blocks("available", data[3])?;

    Ok(DiskUsage {
        total: total_kib.saturating_mul(1024),
        available: available_kib.saturating_mul(1024),
    })
}
