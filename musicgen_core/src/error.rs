use std::path::PathBuf;

use thiserror::Error;

/// Rejected segmentation input
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SegmentError {
    #[error("Audio buffer is empty")]
    EmptyBuffer,

    #[error("Sample rate must be greater than zero")]
    ZeroSampleRate,

    #[error("Segment duration must be greater than zero")]
    ZeroSegmentDuration,

    #[error("Overlap ({overlap}s) must be shorter than the segment ({segment}s)")]
    OverlapTooLarge { overlap: u32, segment: u32 },

    #[error("Window of {segment_frames} frames cannot step with an overlap of {overlap_frames} frames")]
    InvalidWindow {
        segment_frames: usize,
        overlap_frames: usize,
    },
}

/// Failure of a single font source. Never escapes the resolver.
#[derive(Debug, Error)]
pub enum FontError {
    #[error("Font not found: {0}")]
    NotFound(String),

    #[error("No hub namespace configured (set SPACE_ID)")]
    MissingNamespace,

    #[error("Hub download failed: {0}")]
    Hub(#[from] hf_hub::api::sync::ApiError),

    #[error("HTTP download failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Font I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not a usable font: {0}")]
    Parse(String),
}

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("Unable to open background {path}: {source}")]
    Background {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Unable to create temp file: {0}")]
    TempFile(#[from] std::io::Error),

    #[error("Unable to save image: {0}")]
    Save(#[from] image::ImageError),
}
