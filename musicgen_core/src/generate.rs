//! Segment-by-segment generation of music longer than the model's window.
//!
//! The melody is cut into `segment_duration` chunks, each chunk conditions
//! one model call, and every call after the first continues from the last
//! `overlap` seconds of the previous output.

use ndarray::{concatenate, s, Array3, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::audio::AudioBuffer;
use crate::cancel::CancellationToken;
use crate::error::SegmentError;
use crate::model::{ModelRequest, MusicModel};
use crate::segment::separate_audio_segments;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub text: String,
    pub seed: u64,
    /// Total seconds of music wanted
    pub duration: u32,
    /// Seconds generated per model call
    pub segment_duration: u32,
    /// Seconds of previous output fed back as the continuation prompt
    pub overlap: u32,
}

impl Default for GenerationRequest {
    fn default() -> Self {
        Self {
            text: String::new(),
            seed: 0,
            duration: 10,
            segment_duration: 30,
            overlap: 1,
        }
    }
}

impl GenerationRequest {
    pub fn total_segments(&self) -> u32 {
        self.duration.div_ceil(self.segment_duration).max(1)
    }

    /// Seconds of the final segment that fall inside `duration`
    pub fn excess_duration(&self) -> u32 {
        self.segment_duration - (self.total_segments() * self.segment_duration - self.duration)
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedSegments {
    /// Model outputs in generation order, each `(batch, channels, frames)`
    pub segments: Vec<Array3<f32>>,
    /// Seconds to keep from the final segment, or the seconds still owed
    /// when the run was cancelled
    pub excess_duration: u32,
    /// Melody chunks prepared for conditioning, after padding
    pub melody_segments_used: usize,
    pub cancelled: bool,
}

/// Generate `request.duration` seconds of music conditioned on `melody`.
///
/// Model errors are returned as-is; nothing is retried. A cancelled run
/// returns whatever was generated before the flag was seen.
pub fn generate_music_segments<M: MusicModel + ?Sized>(
    melody: &AudioBuffer,
    model: &mut M,
    request: &GenerationRequest,
    cancel: &CancellationToken,
) -> anyhow::Result<GeneratedSegments> {
    if request.segment_duration == 0 {
        return Err(SegmentError::ZeroSegmentDuration.into());
    }
    if request.overlap >= request.segment_duration {
        return Err(SegmentError::OverlapTooLarge {
            overlap: request.overlap,
            segment: request.segment_duration,
        }
        .into());
    }

    let mut melody_segments = separate_audio_segments(melody, request.segment_duration, 0)?;
    let description = format!("{}, seed={}", request.text, request.seed);

    let total_segments = request.total_segments() as usize;
    let excess_duration = request.excess_duration();
    info!(
        "total segments to generate: {} for {} seconds. Each segment is {} seconds. Excess {}",
        total_segments, request.duration, request.segment_duration, excess_duration
    );

    if melody_segments.len() < total_segments {
        let missing = total_segments - melody_segments.len();
        for i in 0..missing {
            let segment = melody_segments[i].clone();
            melody_segments.push(segment);
        }
        debug!("melody segments padded to {}", melody_segments.len());
    }

    let max_frames = (melody.sample_rate as f32 * model.config().max_conditioning_secs) as usize;
    let mut melodies: Vec<Array3<f32>> = Vec::with_capacity(total_segments);
    for (idx, segment) in melody_segments.iter().take(total_segments).enumerate() {
        if cancel.is_cancelled() {
            warn!("generation cancelled while preparing melody segment {}", idx + 1);
            return Ok(GeneratedSegments {
                segments: Vec::new(),
                excess_duration: request.duration,
                melody_segments_used: melodies.len(),
                cancelled: true,
            });
        }
        let verse = conditioning_tensor(segment.samples.view(), max_frames);
        debug!("segment {} of {}: melody shape {:?}", idx + 1, total_segments, verse.shape());
        melodies.push(verse);
    }

    model.set_seed(request.seed);

    let descriptions = [description];
    let prompt_frames = request.overlap as usize * model.sample_rate() as usize;
    let mut output_segments: Vec<Array3<f32>> = Vec::with_capacity(total_segments);

    for (idx, verse) in melodies.iter().enumerate() {
        if cancel.is_cancelled() {
            let produced = output_segments.len() as u32;
            let remaining = request
                .duration
                .saturating_sub(request.segment_duration * produced);
            warn!("generation cancelled after {} of {} segments", produced, total_segments);
            return Ok(GeneratedSegments {
                segments: output_segments,
                excess_duration: remaining,
                melody_segments_used: melodies.len(),
                cancelled: true,
            });
        }

        info!("generating segment {}: {}", idx + 1, descriptions[0]);
        let prompt = output_segments
            .last()
            .filter(|_| prompt_frames > 0)
            .map(|previous| tail_frames(previous, prompt_frames));

        let output = model.generate_with_all(ModelRequest {
            descriptions: &descriptions,
            melody: verse,
            melody_sample_rate: melody.sample_rate,
            progress: false,
            prompt: prompt.as_ref(),
        })?;

        debug!("output segment {}: shape {:?}", idx + 1, output.shape());
        output_segments.push(output);
    }

    Ok(GeneratedSegments {
        segments: output_segments,
        excess_duration,
        melody_segments_used: melodies.len(),
        cancelled: false,
    })
}

/// `(channels, frames)` melody as a `(1, channels, frames)` batch, cut to
/// the model's conditioning window
fn conditioning_tensor(samples: ArrayView2<'_, f32>, max_frames: usize) -> Array3<f32> {
    let frames = samples.len_of(Axis(1)).min(max_frames);
    samples
        .slice(s![.., ..frames])
        .to_owned()
        .insert_axis(Axis(0))
}

fn tail_frames(output: &Array3<f32>, frames: usize) -> Array3<f32> {
    let start = output.len_of(Axis(2)).saturating_sub(frames);
    output.slice(s![.., .., start..]).to_owned()
}

/// Join generated segments into one buffer at `sample_rate`.
///
/// Every segment after the first starts with the `overlap` seconds it was
/// prompted with, so those frames are dropped. For a completed run the last
/// segment is cut to `excess_duration` seconds of new material. Only the
/// first batch item of each segment is used.
pub fn concatenate_segments(
    generated: &GeneratedSegments,
    sample_rate: u32,
    overlap: u32,
) -> anyhow::Result<AudioBuffer> {
    let Some(first) = generated.segments.first() else {
        anyhow::bail!("no generated segments to join");
    };
    let channels = first.len_of(Axis(1));
    let prompt_frames = overlap as usize * sample_rate as usize;
    let last = generated.segments.len() - 1;

    let mut parts: Vec<ArrayView2<'_, f32>> = Vec::with_capacity(generated.segments.len());
    for (idx, segment) in generated.segments.iter().enumerate() {
        if segment.len_of(Axis(1)) != channels {
            anyhow::bail!(
                "segment {} has {} channels, expected {}",
                idx,
                segment.len_of(Axis(1)),
                channels
            );
        }
        let frames = segment.len_of(Axis(2));
        let start = if idx == 0 { 0 } else { prompt_frames.min(frames) };
        let mut end = frames;
        if idx == last && !generated.cancelled {
            let keep = generated.excess_duration as usize * sample_rate as usize;
            end = (start + keep).min(frames);
        }
        parts.push(segment.slice(s![0, .., start..end]));
    }

    let samples = concatenate(Axis(1), &parts)?;
    Ok(AudioBuffer::new(sample_rate, samples))
}
