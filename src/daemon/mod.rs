//! Daemon subsystem: monitoring loop, signal handling, and multi-channel
//! notifications.

#[cfg(feature = "daemon")]
pub mod loop_main;
pub mod notifications;
#[cfg(feature = "daemon")]
pub mod signals;
