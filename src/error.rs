use std::path::PathBuf;

use thiserror::Error;

/// Library error type for picview operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The configured photo library is missing or not a directory.
    #[error("invalid photo directory: {0}")]
    BadDir(String),

    /// The scan completed but found no images.
    #[error("no images found in configured directory")]
    EmptyScan,

    /// An image could not be decoded, even unprocessed.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The graphics context rejected an upload or release.
    #[error(transparent)]
    Gpu(#[from] GpuError),

    /// The session was shut down; no new textures are created.
    #[error("image cache has been shut down")]
    ShutDown,

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML/serde configuration error.
    #[error(transparent)]
    Config(#[from] serde_yaml::Error),
}

/// Decoding `path` failed.
#[derive(Debug, Error)]
#[error("failed to decode {}: {kind}", .path.display())]
pub struct DecodeError {
    pub path: PathBuf,
    #[source]
    pub kind: DecodeErrorKind,
}

impl DecodeError {
    pub fn new(path: impl Into<PathBuf>, kind: impl Into<DecodeErrorKind>) -> Self {
        Self {
            path: path.into(),
            kind: kind.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DecodeErrorKind {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error("resize failed: {0}")]
    Resize(String),

    #[error("image has zero width or height")]
    Empty,
}

/// Failures crossing the graphics-context boundary.
#[derive(Debug, Error)]
pub enum GpuError {
    /// The context was torn down; nothing may be created or released on it.
    #[error("graphics context is no longer available")]
    ContextUnavailable,

    #[error("texture upload failed: {0}")]
    Upload(String),

    #[error("texture release failed: {0}")]
    Release(String),
}
