use crate::error::ExperimentError;
use crate::surface::Key;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DISPLAY_MS: u64 = 2000;
pub const DEFAULT_TICK_DELAY_MS: u64 = 1;
pub const DEFAULT_MARKER_REFRESH_MS: u64 = 20;

/// Trial runner parameters, fixed for the whole run.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub total_trials: usize,
    /// Seconds per trial; zero or negative gives trials with no ticks.
    pub timeout_secs: f64,
    /// Upper bound on how long the target is shown before tracking.
    pub display_duration: Duration,
    /// Per-tick wait that lets the display process pending events.
    pub tick_delay: Duration,
    /// Folder for the review snapshot and the results file.
    pub output_dir: PathBuf,
}

impl RunnerConfig {
    pub fn new(total_trials: usize, timeout_secs: f64, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            total_trials,
            timeout_secs,
            display_duration: Duration::from_millis(DEFAULT_DISPLAY_MS),
            tick_delay: Duration::from_millis(DEFAULT_TICK_DELAY_MS),
            output_dir: output_dir.into(),
        }
    }

    pub fn with_display_duration(mut self, display_duration: Duration) -> Self {
        self.display_duration = display_duration;
        self
    }

    pub fn with_tick_delay(mut self, tick_delay: Duration) -> Self {
        self.tick_delay = tick_delay;
        self
    }

    pub fn validate(&self) -> Result<(), ExperimentError> {
        if self.total_trials == 0 {
            return Err(ExperimentError::InvalidTrialCount(self.total_trials));
        }
        if !self.timeout_secs.is_finite() {
            return Err(ExperimentError::InvalidTimeout(self.timeout_secs));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct MarkerConfig {
    pub refresh: Duration,
    pub quit_key: Key,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            refresh: Duration::from_millis(DEFAULT_MARKER_REFRESH_MS),
            quit_key: Key::Escape,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_trials_and_non_finite_timeouts_are_rejected() {
        assert!(matches!(
            RunnerConfig::new(0, 1.0, "out").validate(),
            Err(ExperimentError::InvalidTrialCount(0))
        ));
        assert!(matches!(
            RunnerConfig::new(1, f64::NAN, "out").validate(),
            Err(ExperimentError::InvalidTimeout(_))
        ));
        assert!(RunnerConfig::new(1, -3.0, "out").validate().is_ok());
    }
}
