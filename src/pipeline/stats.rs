//! Batch-wide statistics helpers.
//!
//! This module defines the `BatchStats` structure used to track the outcome
//! of a batch run and the `StatsManager` helper that coordinates thread-safe
//! updates from the worker pool.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Mutex;

use crate::core::errors::ErrorKind;

/// Statistics for a batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchStats {
    /// The total number of files processed.
    pub total_processed: usize,
    /// The number of files cropped successfully.
    pub succeeded: usize,
    /// The number of files that failed.
    pub failed: usize,
    /// Failures per error kind.
    pub failures_by_kind: BTreeMap<String, usize>,
    /// Sum of per-file processing times in milliseconds.
    pub total_time_ms: f64,
    /// Wall-clock time of the whole batch in milliseconds.
    pub elapsed_ms: f64,
}

impl BatchStats {
    /// Creates a new BatchStats instance with zeroed metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the success rate as a percentage (0.0 to 100.0).
    pub fn success_rate(&self) -> f64 {
        if self.total_processed == 0 {
            0.0
        } else {
            (self.succeeded as f64 / self.total_processed as f64) * 100.0
        }
    }

    /// Average per-file processing time in milliseconds.
    pub fn average_time_ms(&self) -> f64 {
        if self.total_processed == 0 {
            0.0
        } else {
            self.total_time_ms / self.total_processed as f64
        }
    }

    /// Files per second of wall-clock time.
    pub fn files_per_second(&self) -> f64 {
        if self.elapsed_ms == 0.0 {
            0.0
        } else {
            self.total_processed as f64 * 1000.0 / self.elapsed_ms
        }
    }
}

impl fmt::Display for BatchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Batch Statistics:")?;
        writeln!(f, "  Total processed: {}", self.total_processed)?;
        writeln!(
            f,
            "  Succeeded: {} ({:.1}%)",
            self.succeeded,
            self.success_rate()
        )?;
        writeln!(f, "  Failed: {}", self.failed)?;
        for (kind, count) in &self.failures_by_kind {
            writeln!(f, "    {kind}: {count}")?;
        }
        writeln!(f, "  Average time per file: {:.2} ms", self.average_time_ms())?;
        writeln!(f, "  Elapsed: {:.2} ms", self.elapsed_ms)?;
        writeln!(f, "  Throughput: {:.2} files/sec", self.files_per_second())?;
        Ok(())
    }
}

/// Thread-safe manager for updating batch statistics from worker threads.
#[derive(Debug, Default)]
pub struct StatsManager {
    /// Shared statistics state guarded by a mutex.
    stats: Mutex<BatchStats>,
}

impl StatsManager {
    /// Creates a new `StatsManager` instance with zeroed metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the current statistics snapshot.
    pub fn get_stats(&self) -> BatchStats {
        self.lock().clone()
    }

    /// Records the outcome of one file.
    pub fn record(&self, outcome: Result<(), ErrorKind>, time_ms: f64) {
        let mut stats = self.lock();
        stats.total_processed += 1;
        stats.total_time_ms += time_ms;
        match outcome {
            Ok(()) => stats.succeeded += 1,
            Err(kind) => {
                stats.failed += 1;
                *stats.failures_by_kind.entry(kind.to_string()).or_insert(0) += 1;
            }
        }
    }

    /// Sets the wall-clock duration of the batch.
    pub fn set_elapsed(&self, elapsed_ms: f64) {
        self.lock().elapsed_ms = elapsed_ms;
    }

    /// Resets the tracked statistics to their default state.
    pub fn reset_stats(&self) {
        *self.lock() = BatchStats::default();
    }

    // A worker that panicked mid-update leaves counters that are still usable.
    fn lock(&self) -> std::sync::MutexGuard<'_, BatchStats> {
        self.stats
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::{BatchStats, StatsManager};
    use crate::core::errors::ErrorKind;

    #[test]
    fn success_rate_handles_zero_processed() {
        let stats = BatchStats::default();
        assert_eq!(stats.success_rate(), 0.0);
        assert_eq!(stats.average_time_ms(), 0.0);
        assert_eq!(stats.files_per_second(), 0.0);
    }

    #[test]
    fn manager_accumulates_outcomes() {
        let manager = StatsManager::new();
        manager.record(Ok(()), 10.0);
        manager.record(Ok(()), 20.0);
        manager.record(Err(ErrorKind::DecodeError), 1.0);
        manager.record(Err(ErrorKind::DecodeError), 1.0);
        manager.set_elapsed(500.0);

        let stats = manager.get_stats();
        assert_eq!(stats.total_processed, 4);
        assert_eq!(stats.succeeded, 2);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.failures_by_kind.get("DecodeError"), Some(&2));
        assert_eq!(stats.success_rate(), 50.0);
        assert_eq!(stats.average_time_ms(), 8.0);
        assert_eq!(stats.files_per_second(), 8.0);
    }

    #[test]
    fn manager_is_shared_across_threads() {
        let manager = StatsManager::new();
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..25 {
                        manager.record(Ok(()), 1.0);
                    }
                });
            }
        });
        assert_eq!(manager.get_stats().total_processed, 100);
    }

    #[test]
    fn reset_clears_counters() {
        let manager = StatsManager::new();
        manager.record(Err(ErrorKind::NoPlausibleChip), 3.0);
        manager.reset_stats();
        assert_eq!(manager.get_stats().total_processed, 0);
        assert!(manager.get_stats().failures_by_kind.is_empty());
    }

    #[test]
    fn display_lists_failure_kinds() {
        let manager = StatsManager::new();
        manager.record(Err(ErrorKind::NoRegionDetected), 3.0);
        let text = manager.get_stats().to_string();
        assert!(text.contains("NoRegionDetected: 1"));
    }
}
