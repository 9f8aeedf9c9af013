use crate::config::Role;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Total bytes transferred across every connection of a run.
///
/// The receiver loop adds to it after each successful read while a reporter
/// reads it concurrently. Clones share the same counter.
///
/// # Examples
///
/// ```
/// use rntttcp::TransferCounter;
///
/// let counter = TransferCounter::new();
/// let reporter = counter.clone();
///
/// counter.add(1500);
/// counter.add(500);
/// assert_eq!(reporter.get(), 2000);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TransferCounter {
    bytes: Arc<AtomicU64>,
}

impl TransferCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically adds `bytes` to the total.
    pub fn add(&self, bytes: u64) {
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Current total.
    pub fn get(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}

/// Throughput in bits per second for `bytes` moved over `elapsed`.
pub fn bits_per_second(bytes: u64, elapsed: Duration) -> f64 {
    if elapsed.as_secs_f64() > 0.0 {
        (bytes as f64 * 8.0) / elapsed.as_secs_f64()
    } else {
        0.0
    }
}

/// Formats a byte count the way the reports print it.
pub fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_000_000_000 {
        format!("{:.2} GBytes", bytes as f64 / 1_000_000_000.0)
    } else if bytes >= 1_000_000 {
        format!("{:.2} MBytes", bytes as f64 / 1_000_000.0)
    } else if bytes >= 1_000 {
        format!("{:.2} KBytes", bytes as f64 / 1_000.0)
    } else {
        format!("{} Bytes", bytes)
    }
}

/// Formats a bitrate with a unit suffix.
pub fn format_bitrate(bps: f64) -> String {
    if bps >= 1_000_000_000.0 {
        format!("{:.2} Gbits/sec", bps / 1_000_000_000.0)
    } else if bps >= 1_000_000.0 {
        format!("{:.2} Mbits/sec", bps / 1_000_000.0)
    } else if bps >= 1_000.0 {
        format!("{:.2} Kbits/sec", bps / 1_000.0)
    } else {
        format!("{:.2} bits/sec", bps)
    }
}

/// End-of-test summary for one side of the stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSummary {
    pub role: Role,
    pub threads: usize,
    pub bytes: u64,
    pub seconds: f64,
    pub bits_per_second: f64,
}

impl TestSummary {
    pub fn new(role: Role, threads: usize, bytes: u64, elapsed: Duration) -> Self {
        Self {
            role,
            threads,
            bytes,
            seconds: elapsed.as_secs_f64(),
            bits_per_second: bits_per_second(bytes, elapsed),
        }
    }
}

impl std::fmt::Display for TestSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:?}: {} thread(s), {} in {:.2} sec, {}",
            self.role,
            self.threads,
            format_bytes(self.bytes),
            self.seconds,
            format_bitrate(self.bits_per_second)
        )
    }
}
