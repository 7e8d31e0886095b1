//! Disk usage measurement value type and display-unit formatting.

#![allow(clippy::cast_precision_loss)]

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::errors::{DgError, Result};

/// Byte divisor for every displayed magnitude. Labelled "GB" in alert text.
///
/// Numerically this is 2^20; alert wording and fixtures depend on this exact
/// value, so it must stay the single point of definition.
pub const DISPLAY_UNIT_BYTES: u64 = 1_048_576;

/// Label rendered after displayed magnitudes.
pub const DISPLAY_UNIT_LABEL: &str = "GB";

/// Default utilization percentage at or above which an alert is raised.
pub const DEFAULT_THRESHOLD_PCT: f64 = 90.0;

/// A single capacity measurement for a monitored path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskUsage {
    pub total: u64,
    pub available: u64,
}

impl DiskUsage {
    #[must_use]
    pub const fn new(total: u64, available: u64) -> Self {
        Self { total, available }
    }

    /// Utilized share of capacity, `100 - available / total * 100`.
    ///
    /// Rejects `total == 0` and `available > total` instead of producing a
    /// meaningless percentage.
    pub fn percent_used(&self) -> Result<f64> {
        if self.total == 0 || self.available > self.total {
            return Err(DgError::InvalidMeasurement {
                total: self.total,
                available: self.available,
            });
        }
        Ok(100.0 - (self.available as f64 / self.total as f64 * 100.0))
    }
}

impl fmt::Display for DiskUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {DISPLAY_UNIT_LABEL} of {} {DISPLAY_UNIT_LABEL} available",
            format_number(to_display_unit(self.available)),
            format_number(to_display_unit(self.total)),
        )
    }
}

/// Convert a raw byte count into display units. No rounding is applied here.
#[must_use]
pub fn to_display_unit(bytes: u64) -> f64 {
    bytes as f64 / DISPLAY_UNIT_BYTES as f64
}

/// Round to at most two decimal places, half away from zero.
///
/// Returns a number rather than a string so that whole values render without
/// a fractional part (`100.0` prints as `100`).
#[must_use]
pub fn format_number(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Render the operator-facing alert for a high-usage measurement.
#[must_use]
pub fn alert_message(percent_used: f64, usage: &DiskUsage) -> String {
    format!(
        ":rotating_light: Disk usage is **{}%**: **{} {DISPLAY_UNIT_LABEL}** of **{} {DISPLAY_UNIT_LABEL}** available :rotating_light:",
        format_number(percent_used),
        format_number(to_display_unit(usage.available)),
        format_number(to_display_unit(usage.total)),
    )
}
