#![allow(dead_code)]

use rewardmap_core::RewardSite;
use rewardmap_render::MapImage;
use rewardmap_timing::{CalibrationStats, Timer};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tiny_skia::Color;

/// Clock that moves forward by a fixed step every time it is read.
#[derive(Clone)]
pub struct SteppedTimer {
    clock: Arc<AtomicU64>,
    step_ns: u64,
    frames: Vec<Duration>,
}

impl SteppedTimer {
    pub fn new(step: Duration) -> Self {
        Self {
            clock: Arc::new(AtomicU64::new(0)),
            step_ns: step.as_nanos() as u64,
            frames: Vec::new(),
        }
    }
}

impl Timer for SteppedTimer {
    type Timestamp = u64;

    fn now(&self) -> u64 {
        self.clock.fetch_add(self.step_ns, Ordering::SeqCst)
    }

    fn elapsed(&self, ts: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(ts))
    }

    fn sleep(&self, d: Duration) {
        self.clock.fetch_add(d.as_nanos() as u64, Ordering::SeqCst);
    }

    fn record_frame(&mut self, d: Duration) {
        self.frames.push(d);
    }

    fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn calibration_stats(&self) -> CalibrationStats {
        CalibrationStats::from_frames(&self.frames)
    }
}

pub fn white_map(width: u32, height: u32) -> MapImage {
    MapImage::filled(width, height, Color::WHITE).unwrap()
}

/// Position source that stays on the target.
pub fn on_target(target: RewardSite, _elapsed: Duration) -> (i32, i32) {
    (target.x, target.y)
}
