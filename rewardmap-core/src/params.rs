//! Session folder layout and the write-once experiment parameters record.

use crate::error::CoreError;
use crate::persist::write_atomic;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const PARAMETERS_FILE: &str = "ExperimentParameters.csv";

/// Per-session output folder: `<experiment_folder>/<date>/<number>_<subject>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLayout {
    root: PathBuf,
}

impl SessionLayout {
    /// Works out the folder without touching the filesystem.
    pub fn new(
        experiment_folder: &Path,
        date: &str,
        experiment_number: u32,
        subject: &str,
    ) -> Self {
        let root = experiment_folder
            .join(date)
            .join(format!("{experiment_number}_{subject}"));
        Self { root }
    }

    pub fn create(
        experiment_folder: &Path,
        date: &str,
        experiment_number: u32,
        subject: &str,
    ) -> Result<Self, CoreError> {
        let layout = Self::new(experiment_folder, date, experiment_number, subject);
        layout.create_dirs()?;
        Ok(layout)
    }

    /// Creates the folder and its parents; existing folders are fine.
    pub fn create_dirs(&self) -> Result<(), CoreError> {
        fs::create_dir_all(&self.root).map_err(|e| CoreError::io(&self.root, e))?;
        info!(folder = %self.root.display(), "session folder ready");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

/// Audit record of how a session was configured. Never read back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentParameters {
    pub experiment_number: u32,
    pub experiment_date: String,
    pub subject_name: String,
    pub number_of_trials: usize,
    pub reward_timeout_secs: f64,
    pub map: PathBuf,
    pub reward_locations: PathBuf,
}

impl ExperimentParameters {
    /// Key/value rows in file order. Keys match the files existing
    /// analysis scripts already consume.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("ExperimentNumber", self.experiment_number.to_string()),
            ("ExperimentDate", self.experiment_date.clone()),
            ("MonkeyName", self.subject_name.clone()),
            ("NumberOfTrials", self.number_of_trials.to_string()),
            ("RewardTimeOut", self.reward_timeout_secs.to_string()),
            ("Map", self.map.display().to_string()),
            ("RewardLocationCSV", self.reward_locations.display().to_string()),
        ]
    }

    pub fn to_csv(&self) -> String {
        self.rows()
            .into_iter()
            .map(|(key, value)| format!("{key},{}\n", csv_field(&value)))
            .collect()
    }

    /// Writes `ExperimentParameters.csv` into `folder`.
    pub fn write(&self, folder: &Path) -> Result<PathBuf, CoreError> {
        let path = folder.join(PARAMETERS_FILE);
        write_atomic(&path, self.to_csv().as_bytes())?;
        info!(path = %path.display(), "saved experiment parameters");
        Ok(path)
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ExperimentParameters {
        ExperimentParameters {
            experiment_number: 1,
            experiment_date: "21022018".into(),
            subject_name: "Chimpian".into(),
            number_of_trials: 10,
            reward_timeout_secs: 10.0,
            map: PathBuf::from("maps/map1.pgm"),
            reward_locations: PathBuf::from("maps/a,b.csv"),
        }
    }

    #[test]
    fn session_folder_is_nested_by_date_and_subject() {
        let dir = tempfile::tempdir().unwrap();
        let layout = SessionLayout::create(dir.path(), "21022018", 1, "Chimpian").unwrap();

        assert_eq!(layout.path(), dir.path().join("21022018").join("1_Chimpian"));
        assert!(layout.path().is_dir());
        // Re-creating an existing session folder is fine.
        SessionLayout::create(dir.path(), "21022018", 1, "Chimpian").unwrap();
    }

    #[test]
    fn planned_session_creates_nothing_until_asked() {
        let dir = tempfile::tempdir().unwrap();
        let layout = SessionLayout::new(dir.path(), "21022018", 2, "Chimpian");

        assert!(!dir.path().join("21022018").exists());
        layout.create_dirs().unwrap();
        assert!(layout.path().is_dir());
    }

    #[test]
    fn parameters_file_has_one_row_per_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = params().write(dir.path()).unwrap();
        let text = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 7);
        assert_eq!(lines[0], "ExperimentNumber,1");
        assert_eq!(lines[2], "MonkeyName,Chimpian");
        assert_eq!(lines[4], "RewardTimeOut,10");
        assert_eq!(lines[6], "RewardLocationCSV,\"maps/a,b.csv\"");
    }

    #[test]
    fn parameters_into_missing_folder_fail() {
        let dir = tempfile::tempdir().unwrap();
        let err = params().write(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, CoreError::Io { .. }));
    }
}
