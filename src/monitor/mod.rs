//! Disk usage monitoring: the usage value type, display formatting, and the
//! one-alert-per-episode checker.

pub mod checker;
pub mod disk_usage;
