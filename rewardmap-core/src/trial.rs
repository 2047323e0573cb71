use crate::site::RewardSite;
use serde::{Deserialize, Serialize};

/// State of the trial in flight. Created when a target is drawn and
/// consumed into a [`TrialRecord`] when the countdown expires.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialState {
    pub trial_index: usize,
    pub total_trials: usize,
    pub timeout_secs: f64,
    pub current_target: RewardSite,
    pub elapsed_secs: f64,
    /// Last observed agent position; `None` until the first tick.
    pub agent_position: Option<(i32, i32)>,
    pub ticks: u64,
}

impl TrialState {
    pub fn new(
        trial_index: usize,
        total_trials: usize,
        timeout_secs: f64,
        current_target: RewardSite,
    ) -> Self {
        Self {
            trial_index,
            total_trials,
            timeout_secs,
            current_target,
            elapsed_secs: 0.0,
            agent_position: None,
            ticks: 0,
        }
    }

    pub fn record_tick(&mut self, elapsed_secs: f64, agent_position: (i32, i32)) {
        self.elapsed_secs = elapsed_secs;
        self.agent_position = Some(agent_position);
        self.ticks += 1;
    }

    pub fn is_last(&self) -> bool {
        self.trial_index + 1 >= self.total_trials
    }

    pub fn into_record(self) -> TrialRecord {
        TrialRecord {
            trial_index: self.trial_index,
            target: self.current_target,
            ticks: self.ticks,
            elapsed_secs: self.elapsed_secs,
            final_agent_position: self.agent_position,
        }
    }
}

/// Recorded result per trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub trial_index: usize,
    pub target: RewardSite,
    pub ticks: u64,
    pub elapsed_secs: f64,
    /// `null` in the results file when the trial ended before any tick.
    pub final_agent_position: Option<(i32, i32)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_update_elapsed_and_position() {
        let mut state = TrialState::new(0, 2, 1.5, RewardSite::new(10, 20));
        assert_eq!(state.agent_position, None);
        assert!(!state.is_last());

        state.record_tick(0.1, (11, 21));
        state.record_tick(0.2, (12, 22));
        let record = state.into_record();

        assert_eq!(record.ticks, 2);
        assert_eq!(record.elapsed_secs, 0.2);
        assert_eq!(record.final_agent_position, Some((12, 22)));
        assert_eq!(record.target, RewardSite::new(10, 20));
    }

    #[test]
    fn trial_without_ticks_records_no_position() {
        let record = TrialState::new(0, 1, 0.0, RewardSite::new(30, 40)).into_record();

        assert_eq!(record.ticks, 0);
        assert_eq!(record.final_agent_position, None);
        let json = serde_json::to_value(&record).unwrap();
        assert!(json["final_agent_position"].is_null());
    }
}
