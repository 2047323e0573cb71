//! Trial sequencing and the real-time tracking loop.

use crate::config::RunnerConfig;
use crate::error::ExperimentError;
use crate::strategy::{PositionSource, SiteSampler};
use crate::surface::{DisplaySurface, Key, SurfaceError, SurfaceEvent};
use rewardmap_core::{
    CoreError, RewardSite, RunnerPhase, SiteTable, TrialRecord, TrialState, write_atomic,
};
use rewardmap_render::{MapImage, OverlayPainter, save_snapshot};
use rewardmap_timing::{Countdown, Timer};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub const TRIAL_RESULTS_FILE: &str = "TrialResults.json";
pub const REVIEW_SNAPSHOT_FILE: &str = "RewardLocationsused.tif";
const REVIEW_WINDOW_TITLE: &str = "CheckRewardLocation";
const REVIEW_REFRESH: Duration = Duration::from_millis(20);

/// What happened during one [`TrialRunner::step`].
#[derive(Debug, Clone, PartialEq)]
pub enum TrialEvent {
    TargetDisplay {
        trial_index: usize,
        target: RewardSite,
    },
    TrackingStarted {
        trial_index: usize,
    },
    Tick {
        trial_index: usize,
        elapsed_secs: f64,
        agent_position: (i32, i32),
    },
    TrialCompleted(TrialRecord),
    Finished,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub records: Vec<TrialRecord>,
}

impl RunReport {
    pub fn write(&self, path: &Path) -> Result<(), ExperimentError> {
        let json = serde_json::to_vec_pretty(self).map_err(|source| ExperimentError::Results {
            path: path.to_path_buf(),
            source,
        })?;
        write_atomic(path, &json)?;
        info!(path = %path.display(), trials = self.records.len(), "saved trial results");
        Ok(())
    }
}

enum Stage<S> {
    Idle,
    TargetDisplay(TrialState),
    Tracking(TrialState, Countdown<S>),
    TrialDone(TrialState),
    Finished,
    Aborted,
}

/// Runs a fixed number of trials: pick a target, show it, then track the
/// agent against a countdown until it expires.
///
/// Trials always last the full timeout; reaching the target early does
/// not end a trial.
pub struct TrialRunner<T: Timer, S, P> {
    config: RunnerConfig,
    map: MapImage,
    sites: SiteTable,
    painter: OverlayPainter,
    timer: T,
    sampler: S,
    positions: P,
    stage: Stage<T::Timestamp>,
    trial_index: usize,
    records: Vec<TrialRecord>,
}

impl<T, S, P> TrialRunner<T, S, P>
where
    T: Timer,
    S: SiteSampler,
    P: PositionSource,
{
    /// Fails on an invalid config, an empty site table, or a site that
    /// does not lie on the map.
    pub fn new(
        config: RunnerConfig,
        map: MapImage,
        sites: SiteTable,
        timer: T,
        sampler: S,
        positions: P,
    ) -> Result<Self, ExperimentError> {
        config.validate()?;
        if sites.is_empty() {
            return Err(CoreError::EmptySiteTable.into());
        }
        sites.check_bounds(map.width(), map.height())?;
        info!(
            sites = sites.len(),
            trials = config.total_trials,
            timeout_secs = config.timeout_secs,
            "trial runner ready"
        );

        Ok(Self {
            config,
            map,
            sites,
            painter: OverlayPainter::default(),
            timer,
            sampler,
            positions,
            stage: Stage::Idle,
            trial_index: 0,
            records: Vec::new(),
        })
    }

    pub fn with_painter(mut self, painter: OverlayPainter) -> Self {
        self.painter = painter;
        self
    }

    pub fn phase(&self) -> RunnerPhase {
        match self.stage {
            Stage::Idle => RunnerPhase::Idle,
            Stage::TargetDisplay(_) => RunnerPhase::TargetDisplay,
            Stage::Tracking(..) => RunnerPhase::Tracking,
            Stage::TrialDone(_) => RunnerPhase::TrialDone,
            Stage::Finished | Stage::Aborted => RunnerPhase::Finished,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.stage, Stage::Aborted)
    }

    /// Index of the trial in flight, or the count of completed trials
    /// between trials.
    pub fn trial_index(&self) -> usize {
        self.trial_index
    }

    pub fn current_trial(&self) -> Option<&TrialState> {
        match &self.stage {
            Stage::TargetDisplay(trial) | Stage::Tracking(trial, _) | Stage::TrialDone(trial) => {
                Some(trial)
            }
            _ => None,
        }
    }

    pub fn records(&self) -> &[TrialRecord] {
        &self.records
    }

    pub fn sites(&self) -> &SiteTable {
        &self.sites
    }

    pub fn map(&self) -> &MapImage {
        &self.map
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    /// Shows every loaded site until Escape is pressed, then saves the
    /// annotated map as `RewardLocationsused.tif`.
    pub fn review_sites<D: DisplaySurface + ?Sized>(
        &mut self,
        surface: &mut D,
    ) -> Result<PathBuf, ExperimentError> {
        let frame = self.painter.sites_frame(&self.map, self.sites.sites());
        info!(sites = self.sites.len(), "press Escape if reward locations are correct");
        loop {
            surface.show(REVIEW_WINDOW_TITLE, &frame)?;
            match surface.wait_event(REVIEW_REFRESH)? {
                Some(SurfaceEvent::Key(Key::Escape)) => break,
                Some(SurfaceEvent::Closed) => return Err(SurfaceError::Closed.into()),
                _ => {}
            }
        }
        surface.release();
        let path = self.config.output_dir.join(REVIEW_SNAPSHOT_FILE);
        save_snapshot(&frame, &path)?;
        Ok(path)
    }

    /// Runs every remaining trial, reporting each event to `observer`,
    /// and writes `TrialResults.json` to the output folder.
    pub fn run<D: DisplaySurface + ?Sized>(
        &mut self,
        surface: &mut D,
        mut observer: impl FnMut(&TrialEvent),
    ) -> Result<RunReport, ExperimentError> {
        if self.is_aborted() {
            return Err(ExperimentError::Aborted);
        }
        while !self.phase().is_terminal() {
            for event in self.step(surface)? {
                observer(&event);
            }
        }

        let stats = self.timer.calibration_stats();
        info!(
            trials = self.records.len(),
            ticks = self.timer.frame_count(),
            tick_rate_hz = stats.effective_fps,
            render_jitter_ms = stats.jitter_ns / 1_000_000.0,
            "run finished"
        );

        let report = RunReport {
            records: self.records.clone(),
        };
        report.write(&self.config.output_dir.join(TRIAL_RESULTS_FILE))?;
        Ok(report)
    }

    /// Advances the state machine by one transition, or by one tick while
    /// tracking. An error aborts the run for good.
    pub fn step<D: DisplaySurface + ?Sized>(
        &mut self,
        surface: &mut D,
    ) -> Result<Vec<TrialEvent>, ExperimentError> {
        let mut events = Vec::new();
        let stage = std::mem::replace(&mut self.stage, Stage::Aborted);
        self.stage = match stage {
            Stage::Idle => self.begin_trial(surface, &mut events)?,
            Stage::TargetDisplay(trial) => self.start_tracking(surface, trial, &mut events)?,
            Stage::Tracking(trial, countdown) => {
                self.tick(surface, trial, countdown, &mut events)?
            }
            Stage::TrialDone(trial) => self.finish_trial(surface, trial, &mut events),
            Stage::Finished => Stage::Finished,
            Stage::Aborted => return Err(ExperimentError::Aborted),
        };
        Ok(events)
    }

    fn window_title(trial_index: usize) -> String {
        format!("Trial {trial_index} Reward")
    }

    fn begin_trial<D: DisplaySurface + ?Sized>(
        &mut self,
        surface: &mut D,
        events: &mut Vec<TrialEvent>,
    ) -> Result<Stage<T::Timestamp>, ExperimentError> {
        if self.trial_index >= self.config.total_trials {
            events.push(TrialEvent::Finished);
            return Ok(Stage::Finished);
        }

        let sampler = &mut self.sampler;
        let target = self.sites.select(|len| sampler.sample(len))?;
        info!(trial = self.trial_index, %target, "trial beginning, go to reward location");

        let frame = self.painter.target_frame(&self.map, target);
        surface.show(&Self::window_title(self.trial_index), &frame)?;

        events.push(TrialEvent::TargetDisplay {
            trial_index: self.trial_index,
            target,
        });
        Ok(Stage::TargetDisplay(TrialState::new(
            self.trial_index,
            self.config.total_trials,
            self.config.timeout_secs,
            target,
        )))
    }

    fn start_tracking<D: DisplaySurface + ?Sized>(
        &mut self,
        surface: &mut D,
        trial: TrialState,
        events: &mut Vec<TrialEvent>,
    ) -> Result<Stage<T::Timestamp>, ExperimentError> {
        self.hold_target(surface)?;

        self.positions.reset(trial.current_target);
        let countdown = Countdown::from_secs(&self.timer, self.config.timeout_secs);
        events.push(TrialEvent::TrackingStarted {
            trial_index: trial.trial_index,
        });
        Ok(Stage::Tracking(trial, countdown))
    }

    fn tick<D: DisplaySurface + ?Sized>(
        &mut self,
        surface: &mut D,
        mut trial: TrialState,
        countdown: Countdown<T::Timestamp>,
        events: &mut Vec<TrialEvent>,
    ) -> Result<Stage<T::Timestamp>, ExperimentError> {
        let elapsed = countdown.elapsed(&self.timer);
        if countdown.is_expired_at(elapsed) {
            info!(
                trial = trial.trial_index,
                ticks = trial.ticks,
                elapsed_secs = trial.elapsed_secs,
                "trial ended"
            );
            return Ok(Stage::TrialDone(trial));
        }

        let elapsed_secs = elapsed.as_secs_f64();
        let target = trial.current_target;
        let position = self.positions.next_position(target, elapsed);

        let render_start = Instant::now();
        let frame = self
            .painter
            .tracking_frame(&self.map, target, elapsed_secs, position);
        surface.show(&Self::window_title(trial.trial_index), &frame)?;
        self.timer.record_frame(render_start.elapsed());

        trial.record_tick(elapsed_secs, position);
        debug!(
            trial = trial.trial_index,
            elapsed_secs,
            x = position.0,
            y = position.1,
            "tick"
        );
        events.push(TrialEvent::Tick {
            trial_index: trial.trial_index,
            elapsed_secs,
            agent_position: position,
        });

        // Only gives the display a chance to process events; timing comes
        // from the countdown alone.
        if let Some(SurfaceEvent::Closed) = self.pause(surface, self.config.tick_delay)? {
            return Err(SurfaceError::Closed.into());
        }
        Ok(Stage::Tracking(trial, countdown))
    }

    fn finish_trial<D: DisplaySurface + ?Sized>(
        &mut self,
        surface: &mut D,
        trial: TrialState,
        events: &mut Vec<TrialEvent>,
    ) -> Stage<T::Timestamp> {
        surface.release();
        let record = trial.into_record();
        self.records.push(record.clone());
        self.trial_index += 1;
        events.push(TrialEvent::TrialCompleted(record));

        if self.trial_index >= self.config.total_trials {
            info!(trials = self.trial_index, "all trials complete");
            events.push(TrialEvent::Finished);
            Stage::Finished
        } else {
            Stage::Idle
        }
    }

    /// Keeps the target on screen for the display duration, or until a
    /// key is pressed.
    fn hold_target<D: DisplaySurface + ?Sized>(&self, surface: &mut D) -> Result<(), ExperimentError> {
        let display = self.config.display_duration;
        if display.is_zero() {
            return Ok(());
        }
        let started = self.timer.now();
        loop {
            let remaining = display.saturating_sub(self.timer.elapsed(started));
            if remaining.is_zero() {
                return Ok(());
            }
            match self.pause(surface, remaining)? {
                Some(SurfaceEvent::Key(_)) => return Ok(()),
                Some(SurfaceEvent::Closed) => return Err(SurfaceError::Closed.into()),
                _ => {}
            }
        }
    }

    /// Waits up to `wait` for input. A surface that comes back early with
    /// nothing has the rest of the wait slept on the timer.
    fn pause<D: DisplaySurface + ?Sized>(
        &self,
        surface: &mut D,
        wait: Duration,
    ) -> Result<Option<SurfaceEvent>, SurfaceError> {
        if wait.is_zero() {
            return surface.wait_event(wait);
        }
        let started = self.timer.now();
        let event = surface.wait_event(wait)?;
        if event.is_none() {
            let waited = self.timer.elapsed(started);
            if waited < wait {
                self.timer.sleep(wait - waited);
            }
        }
        Ok(event)
    }
}
