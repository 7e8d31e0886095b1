//! Platform abstraction: disk usage query backends.

pub mod pal;
