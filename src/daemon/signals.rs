//! Signal handling: SIGTERM/SIGINT graceful shutdown and SIGUSR1 immediate check.
//!
//! Uses `signal-hook` flag registration; the daemon loop polls the flags
//! between ticks instead of blocking on signals.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use signal_hook::consts::{SIGINT, SIGTERM};

/// Signal state shared between OS handlers and the daemon loop.
#[derive(Clone, Default)]
pub struct SignalHandler {
    shutdown_flag: Arc<AtomicBool>,
    check_flag: Arc<AtomicBool>,
}

impl SignalHandler {
    /// Create a handler and register OS signal hooks.
    ///
    /// Registration failures are reported on stderr and otherwise ignored.
    #[must_use]
    pub fn install() -> Self {
        let handler = Self::default();
        handler.register_signals();
        handler
    }

    pub fn should_shutdown(&self) -> bool {
        self.shutdown_flag.load(Ordering::Relaxed)
    }

    /// Check (and clear) whether an out-of-schedule check was requested.
    pub fn should_check_now(&self) -> bool {
        self.check_flag.swap(false, Ordering::Relaxed)
    }

    pub fn request_shutdown(&self) {
        self.shutdown_flag.store(true, Ordering::Relaxed);
    }

    pub fn request_check(&self) {
        self.check_flag.store(true, Ordering::Relaxed);
    }

    fn register_signals(&self) {
        for (name, signal) in [("SIGTERM", SIGTERM), ("SIGINT", SIGINT)] {
            if let Err(e) = signal_hook::flag::register(signal, Arc::clone(&self.shutdown_flag)) {
                eprintln!("[DG-SIGNAL] failed to register {name}: {e}");
            }
        }

        #[cfg(unix)]
        {
            use signal_hook::consts::SIGUSR1;
            if let Err(e) = signal_hook::flag::register(SIGUSR1, Arc::clone(&self.check_flag)) {
                eprintln!("[DG-SIGNAL] failed to register SIGUSR1: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_handler_has_no_requests() {
        let handler = SignalHandler::default();
        assert!(!handler.should_shutdown());
        assert!(!handler.should_check_now());
    }

    #[test]
    fn shutdown_request_is_sticky() {
        let handler = SignalHandler::default();
        handler.request_shutdown();
        assert!(handler.should_shutdown());
        assert!(handler.should_shutdown());
    }

    #[test]
    fn check_flag_clears_on_read() {
        let handler = SignalHandler::default();
        handler.request_check();
        assert!(handler.should_check_now());
        assert!(!handler.should_check_now());
    }

    #[test]
    fn clones_share_state() {
        let handler = SignalHandler::default();
        let other = handler.clone();
        handler.request_shutdown();
        assert!(other.should_shutdown());
    }
}
