pub mod config;
pub mod error;
pub mod marker;
pub mod runner;
pub mod strategy;
pub mod surface;

pub use config::{MarkerConfig, RunnerConfig};
pub use error::ExperimentError;
pub use marker::{LocationMarker, PersistedSites};
pub use runner::{REVIEW_SNAPSHOT_FILE, RunReport, TRIAL_RESULTS_FILE, TrialEvent, TrialRunner};
pub use strategy::{DriftingPosition, PositionSource, SiteSampler, UniformSampler};
pub use surface::{DisplaySurface, Gesture, HeadlessSurface, Key, SurfaceError, SurfaceEvent};
