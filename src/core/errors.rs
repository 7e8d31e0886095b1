//! DG-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, DgError>;

/// Top-level error type for diskguard.
#[derive(Debug, Error)]
pub enum DgError {
    #[error("[DG-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[DG-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[DG-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[DG-1101] unsupported platform: {details}")]
    UnsupportedPlatform { details: String },

    #[error("[DG-2001] filesystem stats failure for {path}: {details}")]
    FsStats { path: PathBuf, details: String },

    #[error("[DG-2002] invalid disk measurement: total={total} available={available}")]
    InvalidMeasurement { total: u64, available: u64 },

    #[error("[DG-2003] command `{command}` failed: {details}")]
    CommandFailed {
        command: &'static str,
        details: String,
    },

    #[error("[DG-2201] notification delivery failed via {channel}: {details}")]
    Notification {
        channel: &'static str,
        details: String,
    },

    #[error("[DG-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[DG-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[DG-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl DgError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "DG-1001",
            Self::MissingConfig { .. } => "DG-1002",
            Self::ConfigParse { .. } => "DG-1003",
            Self::UnsupportedPlatform { .. } => "DG-1101",
            Self::FsStats { .. } => "DG-2001",
            Self::InvalidMeasurement { .. } => "DG-2002",
            Self::CommandFailed { .. } => "DG-2003",
            Self::Serialization { .. } => "DG-2101",
            Self::Notification { .. } => "DG-2201",
            Self::Io { .. } => "DG-3002",
            Self::Runtime { .. } => "DG-3900",
        }
    }

    /// Whether a later invocation might succeed without operator action.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io { .. }
                | Self::FsStats { .. }
                | Self::CommandFailed { .. }
                | Self::Notification { .. }
                | Self::Runtime { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for DgError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for DgError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_variants() -> Vec<DgError> {
        vec![
            DgError::InvalidConfig {
                details: String::new(),
            },
            DgError::MissingConfig {
                path: PathBuf::new(),
            },
            DgError::ConfigParse {
                context: "",
                details: String::new(),
            },
            DgError::UnsupportedPlatform {
                details: String::new(),
            },
            DgError::FsStats {
                path: PathBuf::new(),
                details: String::new(),
            },
            DgError::InvalidMeasurement {
                total: 0,
                available: 0,
            },
            DgError::CommandFailed {
                command: "df",
                details: String::new(),
            },
            DgError::Notification {
                channel: "webhook",
                details: String::new(),
            },
            DgError::Serialization {
                context: "",
                details: String::new(),
            },
            DgError::Io {
                path: PathBuf::new(),
                source: std::io::Error::other("test"),
            },
            DgError::Runtime {
                details: String::new(),
            },
        ]
    }

    #[test]
    fn error_codes_are_unique() {
        let errors = all_variants();
        let codes: Vec<&str> = errors.iter().map(DgError::code).collect();
        let unique: std::collections::HashSet<&&str> = codes.iter().collect();
        assert_eq!(
            codes.len(),
            unique.len(),
            "error codes must be unique: {codes:?}"
        );
    }

    #[test]
    fn display_carries_code_prefix() {
        for err in all_variants() {
            let msg = err.to_string();
            assert!(
                msg.starts_with(&format!("[{}]", err.code())),
                "display should lead with the code: {msg}"
            );
        }
    }

    #[test]
    fn invalid_measurement_reports_both_fields() {
        let err = DgError::InvalidMeasurement {
            total: 10,
            available: 20,
        };
        let msg = err.to_string();
        assert!(msg.contains("total=10"));
        assert!(msg.contains("available=20"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn retryable_errors_are_correct() {
        assert!(
            DgError::Notification {
                channel: "webhook",
                details: String::new()
            }
            .is_retryable()
        );
        assert!(
            DgError::FsStats {
                path: PathBuf::new(),
                details: String::new()
            }
            .is_retryable()
        );
        assert!(
            !DgError::InvalidConfig {
                details: String::new()
            }
            .is_retryable()
        );
        assert!(
            !DgError::MissingConfig {
                path: PathBuf::new()
            }
            .is_retryable()
        );
    }

    #[test]
    fn io_convenience_constructor() {
        let err = DgError::io(
            "/tmp/alerts.jsonl",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.code(), "DG-3002");
        assert!(err.to_string().contains("/tmp/alerts.jsonl"));
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: DgError = json_err.into();
        assert_eq!(err.code(), "DG-2101");
    }

    #[test]
    fn from_toml_error() {
        let toml_err = toml::from_str::<toml::Value>("= invalid").unwrap_err();
        let err: DgError = toml_err.into();
        assert_eq!(err.code(), "DG-1003");
    }
}
