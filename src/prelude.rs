//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use diskguard::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{DgError, Result};

// Platform
pub use crate::platform::pal::{UsageQuery, UsageQueryKind, detect_usage_query, usage_query_for};

// Monitor
pub use crate::monitor::checker::{CheckOutcome, DiskUsageChecker};
pub use crate::monitor::disk_usage::{DiskUsage, alert_message, format_number};

// Notifications
pub use crate::daemon::notifications::{NotificationManager, NotificationSink};

// Daemon
#[cfg(feature = "daemon")]
pub use crate::daemon::loop_main::MonitorDaemon;
#[cfg(feature = "daemon")]
pub use crate::daemon::signals::SignalHandler;
