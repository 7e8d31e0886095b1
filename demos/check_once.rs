//! Measure a path a few times and print what the checker would do.
//!
//! Usage:
//!   cargo run --example check_once -- /path/to/monitor [threshold_pct]
//!
//! Demonstrates library-only usage: usage query backend, checker, and a
//! printing notification sink.

use std::path::PathBuf;
use std::time::Duration;

use diskguard::core::errors::Result;
use diskguard::daemon::notifications::NotificationSink;
use diskguard::monitor::checker::DiskUsageChecker;
use diskguard::monitor::disk_usage::DEFAULT_THRESHOLD_PCT;
use diskguard::platform::pal::{detect_usage_query, usage_query_for};

struct PrintSink;

impl NotificationSink for PrintSink {
    fn send_message(&self, text: &str) -> Result<()> {
        println!("    -> {text}");
        Ok(())
    }
}

fn main() {
    let monitor_path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from("/"), PathBuf::from);
    let threshold_pct = std::env::args()
        .nth(2)
        .and_then(|raw| raw.parse::<f64>().ok())
        .unwrap_or(DEFAULT_THRESHOLD_PCT);

    let kind = detect_usage_query();
    println!(
        "Monitoring: {} (backend {kind}, threshold {threshold_pct}%)",
        monitor_path.display()
    );

    let query = usage_query_for(kind, &monitor_path).expect("build usage query");
    let mut checker =
        DiskUsageChecker::with_threshold(query, PrintSink, threshold_pct).expect("valid threshold");

    // Take 3 samples at 1-second intervals; only the first high one alerts.
    for i in 0..3 {
        match checker.check_usage() {
            Ok(outcome) => println!(
                "[{i}] {:.2}% used ({}) -> {}",
                outcome.percent_used(),
                outcome.usage(),
                outcome.label()
            ),
            Err(e) => println!("[{i}] check failed: {e}"),
        }
        std::thread::sleep(Duration::from_secs(1));
    }
}
