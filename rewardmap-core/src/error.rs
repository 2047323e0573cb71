use crate::site::RewardSite;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("site table line {line}: {reason}")]
    SiteTableFormat { line: usize, reason: String },

    #[error("site table has no reward sites")]
    EmptySiteTable,

    #[error("sampler picked index {index} from a table of {len} sites")]
    SamplerOutOfRange { index: usize, len: usize },

    #[error("reward site {site} lies outside the {width}x{height} map")]
    SiteOutOfBounds {
        site: RewardSite,
        width: u32,
        height: u32,
    },
}

impl CoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CoreError::Io {
            path: path.into(),
            source,
        }
    }
}
