use std::time::{Duration, Instant};
use tracing::{debug, info};

// ============================================
// SCOPED TIMER
// ============================================

/// Wall-clock timer for one named operation.
///
/// Logs its duration through `tracing` when stopped or dropped, unless the
/// duration is under the configured threshold.
pub struct Timer {
    name: String,
    start: Instant,
    threshold_ms: u128,
    silent: bool,
}

impl Timer {
    pub fn start(name: impl Into<String>) -> Self {
        Self::start_with_threshold(name, 0)
    }

    /// Only log if the operation takes at least `threshold_ms`
    pub fn start_with_threshold(name: impl Into<String>, threshold_ms: u128) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
            threshold_ms,
            silent: false,
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Stop and log, returning the measured duration
    pub fn stop(mut self) -> Duration {
        let duration = self.start.elapsed();
        self.log_duration(duration);
        self.silent = true;
        duration
    }

    fn log_duration(&self, duration: Duration) {
        let ms = duration.as_millis();
        if ms < self.threshold_ms {
            return;
        }

        if ms >= 5_000 {
            info!(operation = %self.name, elapsed_ms = ms as u64, "slow operation");
        } else {
            debug!(operation = %self.name, elapsed_ms = ms as u64, "operation finished");
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if !self.silent {
            let duration = self.start.elapsed();
            self.log_duration(duration);
        }
    }
}
