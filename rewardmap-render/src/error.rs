use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("cannot load map {path}: {source}")]
    MapLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("cannot write snapshot {path}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot allocate a {width}x{height} pixmap")]
    Pixmap { width: u32, height: u32 },

    #[error("invalid font {path}: {reason}")]
    Font { path: PathBuf, reason: String },
}
