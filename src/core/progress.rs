//! Progress reporting.

/// Observational sink for long-running phases. Implementations must tolerate
/// repeated `update` calls with the same values and `current == total`.
pub trait ProgressReporter {
    /// Reports progress of a labelled phase.
    ///
    /// * `label`   - The phase label.
    /// * `current` - Completed work items.
    /// * `total`   - Total work items.
    fn update(&mut self, label: &str, current: usize, total: usize);
}

/// Discards all progress updates.
#[derive(Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn update(&mut self, _label: &str, _current: usize, _total: usize) {}
}

/// Logs progress through the `log` crate, one `info!` line per decile so the
/// log does not drown in updates.
#[derive(Default)]
pub struct LogProgress {
    last_decile: usize,
}

impl ProgressReporter for LogProgress {
    fn update(&mut self, label: &str, current: usize, total: usize) {
        if total == 0 {
            return;
        }
        let decile = current * 10 / total;
        if decile != self.last_decile || current == total {
            self.last_decile = decile;
            info!("{}: {}/{}", label, current, total);
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder(Vec<(String, usize, usize)>);

    impl ProgressReporter for Recorder {
        fn update(&mut self, label: &str, current: usize, total: usize) {
            self.0.push((label.to_string(), current, total));
        }
    }

    #[test]
    fn recorder_receives_updates_in_order() {
        let mut r = Recorder(Vec::new());
        r.update("phase", 1, 2);
        r.update("phase", 2, 2);
        assert_eq!(r.0.len(), 2);
        assert_eq!(r.0[1], ("phase".to_string(), 2, 2));
    }

    #[test]
    fn log_progress_tolerates_zero_total() {
        LogProgress::default().update("empty", 0, 0);
    }
}
