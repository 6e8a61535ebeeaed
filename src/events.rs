use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use crate::error::DecodeError;

/// Decoded RGBA8 pixels, rows stored bottom-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RawImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }
}

/// Identifies one generated thumbnail page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub start: usize,
    pub width: u32,
    pub height: u32,
}

impl PageKey {
    pub const fn new(start: usize, width: u32, height: u32) -> Self {
        Self {
            start,
            width,
            height,
        }
    }
}

/// Pipeline -> worker pool.
#[derive(Debug)]
pub struct ThumbnailJob {
    pub key: PageKey,
    pub path: PathBuf,
    pub bound: (u32, u32),
    pub epoch: u64,
    pub cancel: CancellationToken,
}

/// Worker pool -> pipeline, drained on the owning thread.
#[derive(Debug)]
pub struct JobResult {
    pub key: PageKey,
    pub path: PathBuf,
    pub epoch: u64,
    pub outcome: Result<RawImage, DecodeError>,
}
