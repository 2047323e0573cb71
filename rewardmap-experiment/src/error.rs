use crate::surface::SurfaceError;
use rewardmap_core::CoreError;
use rewardmap_render::RenderError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExperimentError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Surface(#[from] SurfaceError),

    #[error("number of trials must be at least 1, got {0}")]
    InvalidTrialCount(usize),

    #[error("reward timeout must be a finite number of seconds, got {0}")]
    InvalidTimeout(f64),

    #[error("cannot encode results for {path}: {source}")]
    Results {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("run was aborted by an earlier error and cannot resume")]
    Aborted,
}
