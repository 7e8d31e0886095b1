//! Daemon loop: drives one checker per monitored path on a fixed tick.
//!
//! Every tick runs all checkers to completion, one after another, before the
//! loop waits again, so invocations of a single checker never overlap. A failed
//! check is logged and retried on the next tick; nothing here stops the loop
//! except a shutdown signal or the optional tick limit.

#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, tick};

use crate::core::config::Config;
use crate::core::errors::{DgError, Result};
use crate::daemon::notifications::{NotificationManager, NotificationSink};
use crate::daemon::signals::SignalHandler;
use crate::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity};
use crate::monitor::checker::{CheckOutcome, DiskUsageChecker};
use crate::platform::pal::{UsageQuery, usage_query_for};

/// How often the wait between ticks re-checks signal flags.
const SIGNAL_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Checker type used by the daemon: any backend, one shared sink.
pub type PathChecker = DiskUsageChecker<Box<dyn UsageQuery>, Arc<dyn NotificationSink>>;

/// Counters accumulated across the daemon's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DaemonStats {
    pub ticks: u64,
    pub checks: u64,
    pub alerts_sent: u64,
    pub failures: u64,
}

pub struct MonitorDaemon {
    checkers: Vec<PathChecker>,
    interval: Duration,
    activity: JsonlWriter,
    signals: SignalHandler,
    stats: DaemonStats,
}

impl MonitorDaemon {
    /// Build checkers for every configured path, sharing one notification manager.
    pub fn from_config(config: &Config, signals: SignalHandler) -> Result<Self> {
        let sink: Arc<dyn NotificationSink> =
            Arc::new(NotificationManager::from_config(&config.notifications));

        let checkers = config
            .monitor
            .paths
            .iter()
            .map(|path| {
                let query = usage_query_for(config.monitor.query, path)?;
                DiskUsageChecker::with_threshold(
                    query,
                    Arc::clone(&sink),
                    config.monitor.threshold_pct,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(
            checkers,
            Duration::from_secs(config.monitor.interval_secs),
            JsonlWriter::open(JsonlConfig::for_path(&config.paths.activity_log)),
            signals,
        ))
    }

    #[must_use]
    pub fn new(
        checkers: Vec<PathChecker>,
        interval: Duration,
        activity: JsonlWriter,
        signals: SignalHandler,
    ) -> Self {
        Self {
            checkers,
            interval,
            activity,
            signals,
            stats: DaemonStats::default(),
        }
    }

    #[must_use]
    pub const fn stats(&self) -> DaemonStats {
        self.stats
    }

    #[must_use]
    pub fn checkers(&self) -> &[PathChecker] {
        &self.checkers
    }

    /// Run every checker once, in configuration order.
    pub fn run_tick(&mut self) {
        self.stats.ticks += 1;
        for checker in &mut self.checkers {
            self.stats.checks += 1;
            let path = checker.query().path().to_path_buf();
            match checker.check_usage() {
                Ok(outcome) => {
                    match &outcome {
                        CheckOutcome::AlertSent { percent_used, .. } => {
                            self.stats.alerts_sent += 1;
                            eprintln!(
                                "[DG-MONITOR] alert sent for {} ({percent_used:.2}% used)",
                                path.display()
                            );
                        }
                        CheckOutcome::Rearmed { percent_used, .. } => {
                            eprintln!(
                                "[DG-MONITOR] {} back below threshold ({percent_used:.2}% used)",
                                path.display()
                            );
                        }
                        CheckOutcome::Normal { .. } | CheckOutcome::AlertSuppressed { .. } => {}
                    }
                    self.activity.write_entry(&LogEntry::from_outcome(
                        &path,
                        checker.threshold_pct(),
                        &outcome,
                    ));
                }
                Err(err) => {
                    self.stats.failures += 1;
                    eprintln!("[DG-MONITOR] check failed for {}: {err}", path.display());
                    self.activity.write_entry(&LogEntry::from_error(&path, &err));
                }
            }
        }
    }

    /// Tick until shutdown is requested or `max_ticks` ticks have run.
    pub fn run(&mut self, max_ticks: Option<u64>) -> Result<DaemonStats> {
        let mut start = LogEntry::new(EventType::DaemonStart, Severity::Info);
        start.details = Some(format!(
            "v{} monitoring {} path(s) every {:?}",
            env!("CARGO_PKG_VERSION"),
            self.checkers.len(),
            self.interval
        ));
        self.activity.write_entry(&start);

        let ticker = tick(self.interval);
        let mut ticks_run = 0u64;

        'outer: while !self.signals.should_shutdown() {
            self.run_tick();
            ticks_run += 1;
            if max_ticks.is_some_and(|max| ticks_run >= max) {
                break;
            }

            loop {
                if self.signals.should_shutdown() {
                    break 'outer;
                }
                if self.signals.should_check_now() {
                    break;
                }
                match ticker.recv_timeout(SIGNAL_POLL_INTERVAL) {
                    Ok(_) => break,
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => {
                        return Err(DgError::Runtime {
                            details: "daemon ticker disconnected".to_string(),
                        });
                    }
                }
            }
        }

        let mut stop = LogEntry::new(EventType::DaemonStop, Severity::Info);
        stop.details = Some(format!(
            "ticks={} checks={} alerts_sent={} failures={}",
            self.stats.ticks, self.stats.checks, self.stats.alerts_sent, self.stats.failures
        ));
        self.activity.write_entry(&stop);
        self.activity.flush();

        Ok(self.stats)
    }
}
