use crate::timer::Timer;
use std::time::Duration;

/// Fixed-length countdown anchored at a timer reading.
#[derive(Debug, Clone, Copy)]
pub struct Countdown<S> {
    started: S,
    duration: Duration,
}

impl<S: Copy> Countdown<S> {
    pub fn start<T: Timer<Timestamp = S>>(timer: &T, duration: Duration) -> Self {
        Self {
            started: timer.now(),
            duration,
        }
    }

    /// Countdown from a timeout in seconds. Non-positive timeouts expire
    /// immediately.
    pub fn from_secs<T: Timer<Timestamp = S>>(timer: &T, timeout_secs: f64) -> Self {
        let duration = if timeout_secs > 0.0 {
            Duration::try_from_secs_f64(timeout_secs).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        };
        Self::start(timer, duration)
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Time since the countdown started.
    pub fn elapsed<T: Timer<Timestamp = S>>(&self, timer: &T) -> Duration {
        timer.elapsed(self.started)
    }

    pub fn is_expired_at(&self, elapsed: Duration) -> bool {
        elapsed >= self.duration
    }

    pub fn remaining<T: Timer<Timestamp = S>>(&self, timer: &T) -> Duration {
        self.duration.saturating_sub(self.elapsed(timer))
    }
}
