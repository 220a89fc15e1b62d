//! Fixed-length, optionally overlapping chunking of audio buffers.

use std::ops::Range;

use tracing::debug;

use crate::audio::AudioBuffer;
use crate::error::SegmentError;

/// Frame ranges covering `total_frames` with windows of `segment_frames`
/// stepping by `segment_frames - overlap_frames`.
///
/// When the last full window stops short of the end, one more window is
/// taken flush against the end of the buffer. That window may overlap its
/// predecessor by more than `overlap_frames`. A buffer shorter than one
/// window yields a single range over the whole buffer.
///
/// Fails unless `0 <= overlap_frames < segment_frames`.
pub fn segment_bounds(
    total_frames: usize,
    segment_frames: usize,
    overlap_frames: usize,
) -> Result<Vec<Range<usize>>, SegmentError> {
    if segment_frames == 0 || overlap_frames >= segment_frames {
        return Err(SegmentError::InvalidWindow {
            segment_frames,
            overlap_frames,
        });
    }
    let step = segment_frames - overlap_frames;

    let mut bounds = Vec::new();
    let mut start = 0usize;
    let mut consumed = 0usize;

    while start + segment_frames <= total_frames {
        bounds.push(start..start + segment_frames);
        consumed = start + segment_frames;
        start += step;
    }

    if consumed < total_frames {
        bounds.push(total_frames.saturating_sub(segment_frames)..total_frames);
    }

    Ok(bounds)
}

/// Split `audio` into `segment_duration`-second chunks overlapping by
/// `overlap` seconds.
pub fn separate_audio_segments(
    audio: &AudioBuffer,
    segment_duration: u32,
    overlap: u32,
) -> Result<Vec<AudioBuffer>, SegmentError> {
    if audio.is_empty() {
        return Err(SegmentError::EmptyBuffer);
    }
    if audio.sample_rate == 0 {
        return Err(SegmentError::ZeroSampleRate);
    }
    if segment_duration == 0 {
        return Err(SegmentError::ZeroSegmentDuration);
    }
    if overlap >= segment_duration {
        return Err(SegmentError::OverlapTooLarge {
            overlap,
            segment: segment_duration,
        });
    }

    let segment_frames = audio.sample_rate as usize * segment_duration as usize;
    let overlap_frames = audio.sample_rate as usize * overlap as usize;

    let segments: Vec<AudioBuffer> = segment_bounds(audio.num_frames(), segment_frames, overlap_frames)?
        .into_iter()
        .map(|r| audio.slice_frames(r.start, r.end))
        .collect();

    debug!("separate_audio_segments: {} segments", segments.len());
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(sample_rate: u32, frames: usize) -> AudioBuffer {
        AudioBuffer::mono(sample_rate, (0..frames).map(|i| i as f32).collect())
    }

    #[test]
    fn test_exact_multiple_without_overlap() {
        assert_eq!(segment_bounds(90, 30, 0).unwrap(), vec![0..30, 30..60, 60..90]);
    }

    #[test]
    fn test_overlapping_windows_step_back() {
        // step of 20, last full window ends at 90, 10 frames left over
        assert_eq!(segment_bounds(100, 30, 10).unwrap(), vec![0..30, 20..50, 40..70, 60..90, 70..100]);
    }

    #[test]
    fn test_tail_window_is_flush_with_end() {
        let bounds = segment_bounds(75, 30, 0).unwrap();
        assert_eq!(bounds.last(), Some(&(45..75)));
        // tail overlaps its predecessor by more than the configured zero
        assert_eq!(bounds, vec![0..30, 30..60, 45..75]);
    }

    #[test]
    fn test_short_buffer_is_single_segment() {
        assert_eq!(segment_bounds(12, 30, 5).unwrap(), vec![0..12]);
    }

    #[test]
    fn test_bounds_cover_every_frame() {
        for total in [1usize, 29, 30, 31, 59, 60, 61, 1000, 1013] {
            for overlap in [0usize, 1, 10, 29] {
                let bounds = segment_bounds(total, 30, overlap).unwrap();
                let mut covered = vec![false; total];
                for r in &bounds {
                    assert!(r.end <= total);
                    for c in &mut covered[r.clone()] {
                        *c = true;
                    }
                }
                assert!(covered.iter().all(|&c| c), "gap for total={total} overlap={overlap}");
            }
        }
    }

    #[test]
    fn test_bounds_reject_degenerate_windows() {
        assert_eq!(
            segment_bounds(10, 0, 0),
            Err(SegmentError::InvalidWindow {
                segment_frames: 0,
                overlap_frames: 0
            })
        );
        assert!(segment_bounds(10, 4, 4).is_err());
        assert!(segment_bounds(10, 4, 9).is_err());
    }

    #[test]
    fn test_separate_uses_seconds() {
        let audio = ramp(4, 50);
        let segments = separate_audio_segments(&audio, 5, 1).unwrap();
        // 20-frame windows stepping 16: 0..20, 16..36, then tail 30..50
        assert_eq!(segments.len(), 3);
        assert!(segments.iter().all(|s| s.num_frames() == 20 && s.sample_rate == 4));
        assert_eq!(segments[1].samples[[0, 0]], 16.0);
        assert_eq!(segments[2].samples[[0, 0]], 30.0);
        assert_eq!(segments[2].samples[[0, 19]], 49.0);
    }

    #[test]
    fn test_separate_rejects_degenerate_input() {
        let empty = AudioBuffer::mono(4, Vec::new());
        assert_eq!(separate_audio_segments(&empty, 5, 0), Err(SegmentError::EmptyBuffer));

        let audio = ramp(4, 10);
        assert_eq!(separate_audio_segments(&audio, 0, 0), Err(SegmentError::ZeroSegmentDuration));
        assert_eq!(
            separate_audio_segments(&audio, 2, 2),
            Err(SegmentError::OverlapTooLarge { overlap: 2, segment: 2 })
        );

        let silent_rate = AudioBuffer::mono(0, vec![0.0; 4]);
        assert_eq!(separate_audio_segments(&silent_rate, 1, 0), Err(SegmentError::ZeroSampleRate));
    }
}
