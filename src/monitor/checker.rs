//! Disk usage checker: threshold crossing with one alert per high-usage episode.
//!
//! The checker is a two-state machine. NORMAL (`alert_sent == false`) moves to
//! ALERTED only after the alert text was delivered; every other transition is
//! silent. The checker owns no schedule: a host calls [`DiskUsageChecker::check_usage`]
//! repeatedly, and `&mut self` keeps those calls serialized per instance.

#![allow(missing_docs)]

use crate::core::errors::{DgError, Result};
use crate::daemon::notifications::NotificationSink;
use crate::monitor::disk_usage::{DEFAULT_THRESHOLD_PCT, DiskUsage, alert_message};
use crate::platform::pal::UsageQuery;

/// Result of one successful `check_usage` invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    /// Below threshold and no alert was pending.
    Normal { usage: DiskUsage, percent_used: f64 },
    /// Below threshold after an alert; the checker is armed again.
    Rearmed { usage: DiskUsage, percent_used: f64 },
    /// At or above threshold; the alert was delivered.
    AlertSent {
        usage: DiskUsage,
        percent_used: f64,
        message: String,
    },
    /// At or above threshold, but this episode was already reported.
    AlertSuppressed { usage: DiskUsage, percent_used: f64 },
}

impl CheckOutcome {
    #[must_use]
    pub const fn usage(&self) -> DiskUsage {
        match self {
            Self::Normal { usage, .. }
            | Self::Rearmed { usage, .. }
            | Self::AlertSent { usage, .. }
            | Self::AlertSuppressed { usage, .. } => *usage,
        }
    }

    #[must_use]
    pub const fn percent_used(&self) -> f64 {
        match self {
            Self::Normal { percent_used, .. }
            | Self::Rearmed { percent_used, .. }
            | Self::AlertSent { percent_used, .. }
            | Self::AlertSuppressed { percent_used, .. } => *percent_used,
        }
    }

    /// Whether usage was at or above the threshold.
    #[must_use]
    pub const fn is_high(&self) -> bool {
        matches!(self, Self::AlertSent { .. } | Self::AlertSuppressed { .. })
    }

    /// Stable snake_case label for logs and JSON output.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Normal { .. } => "normal",
            Self::Rearmed { .. } => "alert_rearmed",
            Self::AlertSent { .. } => "alert_sent",
            Self::AlertSuppressed { .. } => "alert_suppressed",
        }
    }
}

/// Watches one path and alerts through `S` when utilization crosses the threshold.
pub struct DiskUsageChecker<Q, S> {
    query: Q,
    sink: S,
    threshold_pct: f64,
    alert_sent: bool,
}

impl<Q: UsageQuery, S: NotificationSink> DiskUsageChecker<Q, S> {
    /// Checker with the default 90% threshold.
    #[must_use]
    pub const fn new(query: Q, sink: S) -> Self {
        Self {
            query,
            sink,
            threshold_pct: DEFAULT_THRESHOLD_PCT,
            alert_sent: false,
        }
    }

    /// Checker with a custom threshold in `(0, 100]`.
    pub fn with_threshold(query: Q, sink: S, threshold_pct: f64) -> Result<Self> {
        validate_threshold(threshold_pct)?;
        Ok(Self {
            query,
            sink,
            threshold_pct,
            alert_sent: false,
        })
    }

    /// Measure once, then alert, suppress, or re-arm.
    ///
    /// Query failures and invalid measurements abort before any state change.
    /// A failed send leaves the checker armed so the next call retries it.
    pub fn check_usage(&mut self) -> Result<CheckOutcome> {
        let usage = self.query.get_usage()?;
        let percent_used = usage.percent_used()?;

        if percent_used < self.threshold_pct {
            let was_alerted = std::mem::replace(&mut self.alert_sent, false);
            return Ok(if was_alerted {
                CheckOutcome::Rearmed {
                    usage,
                    percent_used,
                }
            } else {
                CheckOutcome::Normal {
                    usage,
                    percent_used,
                }
            });
        }

        if self.alert_sent {
            return Ok(CheckOutcome::AlertSuppressed {
                usage,
                percent_used,
            });
        }

        let message = alert_message(percent_used, &usage);
        self.sink.send_message(&message)?;
        self.alert_sent = true;

        Ok(CheckOutcome::AlertSent {
            usage,
            percent_used,
            message,
        })
    }

    /// Whether an alert has been delivered for the current episode.
    #[must_use]
    pub const fn alert_sent(&self) -> bool {
        self.alert_sent
    }

    #[must_use]
    pub const fn threshold_pct(&self) -> f64 {
        self.threshold_pct
    }

    #[must_use]
    pub const fn query(&self) -> &Q {
        &self.query
    }

    #[must_use]
    pub const fn sink(&self) -> &S {
        &self.sink
    }
}

/// Thresholds must lie in `(0, 100]`.
pub fn validate_threshold(threshold_pct: f64) -> Result<()> {
    if threshold_pct.is_nan() || threshold_pct <= 0.0 || threshold_pct > 100.0 {
        return Err(DgError::InvalidConfig {
            details: format!("threshold_pct must be in (0, 100], got {threshold_pct}"),
        });
    }
    Ok(())
}
