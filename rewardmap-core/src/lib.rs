pub mod error;
pub mod params;
pub mod persist;
pub mod phase;
pub mod site;
pub mod trial;

pub use error::CoreError;
pub use params::{ExperimentParameters, PARAMETERS_FILE, SessionLayout};
pub use persist::{staging_path, write_atomic};
pub use phase::RunnerPhase;
pub use site::{RewardSite, SITE_SNAPSHOT_FILE, SITE_TABLE_FILE, SiteTable};
pub use trial::{TrialRecord, TrialState};
