/// States of the trial runner.
///
/// `Idle -> TargetDisplay -> Tracking -> TrialDone`, then back to `Idle`
/// for the next trial or on to `Finished` once every trial has run.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum RunnerPhase {
    #[default]
    Idle,
    TargetDisplay,
    Tracking,
    TrialDone,
    Finished,
}

impl RunnerPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunnerPhase::Finished)
    }

    /// Phases during which a trial is in flight.
    pub fn in_trial(&self) -> bool {
        matches!(
            self,
            RunnerPhase::TargetDisplay | RunnerPhase::Tracking | RunnerPhase::TrialDone
        )
    }
}
