use std::path::{Path, PathBuf};

use crate::error::ApiError;

/// Largest cover edge in pixels
const MAX_COVER_EDGE: u32 = 4096;
const MAX_TITLE_LENGTH: usize = 200;
const MAX_DESCRIPTION_LENGTH: usize = 2000;
/// Highest sample rate accepted for segmentation
const MAX_SAMPLE_RATE: u32 = 384_000;
/// Most windows a single segmentation request may produce
const MAX_SEGMENTS: u64 = 10_000;

/// Validate a segmentation request
pub fn validate_segment_request(
    sample_rate: u32,
    num_frames: usize,
    segment_duration: u32,
    overlap: u32,
) -> Result<(), ApiError> {
    if sample_rate == 0 || sample_rate > MAX_SAMPLE_RATE {
        return Err(ApiError::InvalidInput(format!(
            "Sample rate must be between 1 and {} Hz",
            MAX_SAMPLE_RATE
        )));
    }
    if num_frames == 0 {
        return Err(ApiError::InvalidInput("Audio cannot be empty".to_string()));
    }
    if segment_duration == 0 {
        return Err(ApiError::InvalidInput(
            "Segment duration must be at least 1 second".to_string(),
        ));
    }
    if overlap >= segment_duration {
        return Err(ApiError::InvalidInput(format!(
            "Overlap ({}s) must be shorter than the segment duration ({}s)",
            overlap, segment_duration
        )));
    }

    let segment_frames = sample_rate as u64 * segment_duration as u64;
    let step = sample_rate as u64 * (segment_duration - overlap) as u64;
    let num_frames = num_frames as u64;
    // full windows plus the tail window flush with the end
    let windows = if num_frames > segment_frames {
        (num_frames - segment_frames) / step + 2
    } else {
        1
    };
    if windows > MAX_SEGMENTS {
        return Err(ApiError::InvalidInput(format!(
            "Request would produce {} segments (max {})",
            windows, MAX_SEGMENTS
        )));
    }
    Ok(())
}

/// Validate cover settings
pub fn validate_cover_request(title: &str, description: &str, width: u32, height: u32) -> Result<(), ApiError> {
    if width == 0 || height == 0 || width > MAX_COVER_EDGE || height > MAX_COVER_EDGE {
        return Err(ApiError::InvalidInput(format!(
            "Cover size must be between 1x1 and {}x{}",
            MAX_COVER_EDGE, MAX_COVER_EDGE
        )));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ApiError::InvalidInput(format!(
            "Title too long (max {} characters)",
            MAX_TITLE_LENGTH
        )));
    }
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(ApiError::InvalidInput(format!(
            "Description too long (max {} characters)",
            MAX_DESCRIPTION_LENGTH
        )));
    }
    Ok(())
}

/// Font names are looked up by file name only; paths and URLs are refused
pub fn validate_font_name(font: &str) -> Result<(), ApiError> {
    let is_bare_name = Path::new(font).file_name().and_then(|f| f.to_str()) == Some(font);
    if font.is_empty() || !is_bare_name || font.contains("http") {
        return Err(ApiError::InvalidInput(format!(
            "Font must be a plain file name, got '{}'",
            font
        )));
    }
    Ok(())
}

/// Resolve a requested background inside `allowed_dir`.
///
/// Relative paths are taken from `allowed_dir`. The result is canonical and
/// must stay inside that directory; without one, backgrounds are refused.
pub fn resolve_background_path(requested: &Path, allowed_dir: Option<&Path>) -> Result<PathBuf, ApiError> {
    let Some(allowed_dir) = allowed_dir else {
        return Err(ApiError::InvalidInput(
            "Background images are not enabled on this server".to_string(),
        ));
    };
    let root = allowed_dir
        .canonicalize()
        .map_err(|e| ApiError::InternalError(format!("Background directory unavailable: {e}")))?;
    let resolved = root
        .join(requested)
        .canonicalize()
        .map_err(|_| ApiError::InvalidInput("Background image not found".to_string()))?;
    if !resolved.starts_with(&root) || !resolved.is_file() {
        return Err(ApiError::InvalidInput(
            "Background image must be a file inside the background directory".to_string(),
        ));
    }
    Ok(resolved)
}
