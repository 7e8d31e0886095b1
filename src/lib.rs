#![forbid(unsafe_code)]

//! diskguard: watches filesystem usage and sends one alert per high-usage
//! episode.
//!
//! A [`monitor::checker::DiskUsageChecker`] measures a path through a
//! [`platform::pal::UsageQuery`], compares the used percentage against its
//! threshold, and notifies a [`daemon::notifications::NotificationSink`] the
//! first time usage crosses it. It re-arms once usage drops back below.
//!
//! # Library usage
//!
//! ```rust,no_run
//! use diskguard::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use diskguard::core::config::Config;
//! use diskguard::monitor::checker::DiskUsageChecker;
//! ```

pub mod prelude;

pub mod core;
pub mod daemon;
pub mod logger;
pub mod monitor;
pub mod platform;
