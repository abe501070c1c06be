//! Run progress reporting
//!
//! Each run owns one [`RunProgress`]. Pollers reach the current run through a
//! [`ProgressSlot`], a single-slot mailbox whose content is swapped when a new
//! run is accepted. A run that has been replaced keeps writing into its own
//! record, which nobody reads any more.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Initial status line of every run
pub const READY_STATUS: &str = "Ready";

/// Point-in-time copy of a run's progress, served verbatim to pollers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub progress: usize,
    pub status: String,
    pub completed: bool,
    pub success: bool,
}

impl Default for ProgressRecord {
    fn default() -> Self {
        Self {
            progress: 0,
            status: READY_STATUS.to_string(),
            completed: false,
            success: false,
        }
    }
}

/// Progress record of one run, written by its worker and read by pollers.
#[derive(Debug, Default)]
pub struct RunProgress {
    record: RwLock<ProgressRecord>,
}

impl RunProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a timestamped line to the status log. Earlier lines are kept.
    pub fn append_status(&self, message: impl AsRef<str>) {
        let line = format!(
            "[{}] {}",
            chrono::Local::now().format("%H:%M:%S"),
            message.as_ref()
        );
        let mut record = self.record.write();
        if !record.status.is_empty() {
            record.status.push('\n');
        }
        record.status.push_str(&line);
    }

    /// Overwrite the progress counter. Monotonicity is up to the caller.
    pub fn set_progress(&self, step: usize) {
        self.record.write().progress = step;
    }

    /// Mark the run as finished
    pub fn finish(&self, success: bool) {
        let mut record = self.record.write();
        record.completed = true;
        record.success = success;
    }

    pub fn read(&self) -> ProgressRecord {
        self.record.read().clone()
    }

    pub fn is_completed(&self) -> bool {
        self.record.read().completed
    }
}

/// Thread-safe single-slot mailbox holding the progress of the latest run.
#[derive(Debug, Default)]
pub struct ProgressSlot {
    current: RwLock<Arc<RunProgress>>,
}

impl ProgressSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset for a new run: install a fresh `{0, "Ready", false, false}`
    /// record and return it. The previous run's record is detached from the
    /// slot, so its worker can no longer write into what pollers see.
    pub fn reset(&self) -> Arc<RunProgress> {
        let fresh = Arc::new(RunProgress::new());
        *self.current.write() = Arc::clone(&fresh);
        fresh
    }

    pub fn read(&self) -> ProgressRecord {
        self.current.read().read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_ready() {
        let progress = RunProgress::new();
        assert_eq!(progress.read(), ProgressRecord::default());
        assert_eq!(progress.read().status, "Ready");
    }

    #[test]
    fn test_append_status_keeps_earlier_lines() {
        let progress = RunProgress::new();
        progress.append_status("first");
        progress.append_status("second");

        let status = progress.read().status;
        let lines: Vec<&str> = status.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Ready");
        assert!(lines[1].starts_with('[') && lines[1].ends_with("] first"));
        assert!(lines[2].ends_with("] second"));
    }

    #[test]
    fn test_reset_discards_previous_state() {
        let slot = ProgressSlot::new();
        let run = slot.reset();
        run.set_progress(4);
        run.append_status("working");
        run.finish(true);
        assert!(slot.read().completed);

        slot.reset();
        assert_eq!(slot.read(), ProgressRecord::default());
    }

    #[test]
    fn test_slot_detaches_previous_run() {
        let slot = ProgressSlot::new();
        let first = slot.reset();
        first.set_progress(3);

        let second = slot.reset();
        first.append_status("late write from old run");
        first.finish(false);

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(slot.read(), ProgressRecord::default());
    }

    #[test]
    fn test_concurrent_reads_during_writes() {
        let progress = Arc::new(RunProgress::new());
        let writer = {
            let progress = Arc::clone(&progress);
            std::thread::spawn(move || {
                for i in 0..200 {
                    progress.set_progress(i);
                    progress.append_status(format!("line {}", i));
                }
                progress.finish(true);
            })
        };

        let mut last_len = 0;
        while !progress.is_completed() {
            let len = progress.read().status.len();
            assert!(len >= last_len);
            last_len = len;
        }
        writer.join().unwrap();
        assert_eq!(progress.read().status.lines().count(), 201);
    }
}
