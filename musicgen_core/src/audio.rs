use std::path::Path;

use anyhow::Context;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use ndarray::{s, Array1, Array2, Axis};

/// PCM audio held as `(channels, frames)` f32 samples in [-1.0, 1.0].
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub sample_rate: u32,
    pub samples: Array2<f32>,
}

impl AudioBuffer {
    pub fn new(sample_rate: u32, samples: Array2<f32>) -> Self {
        Self { sample_rate, samples }
    }

    /// Single-channel buffer from a flat sample vector
    pub fn mono(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            samples: Array1::from(samples).insert_axis(Axis(0)),
        }
    }

    pub fn channels(&self) -> usize {
        self.samples.len_of(Axis(0))
    }

    pub fn num_frames(&self) -> usize {
        self.samples.len_of(Axis(1))
    }

    pub fn is_empty(&self) -> bool {
        self.num_frames() == 0
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.num_frames() as f64 / self.sample_rate as f64
    }

    /// Copy of the frames in `[start, end)`
    pub fn slice_frames(&self, start: usize, end: usize) -> Self {
        Self {
            sample_rate: self.sample_rate,
            samples: self.samples.slice(s![.., start..end]).to_owned(),
        }
    }

    /// Read a WAV file, normalising integer formats to f32
    pub fn from_wav<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let mut reader = WavReader::open(path.as_ref())
            .with_context(|| format!("Failed to open {}", path.as_ref().display()))?;
        let spec = reader.spec();
        let channels = spec.channels as usize;
        if channels == 0 {
            anyhow::bail!("{} declares zero channels", path.as_ref().display());
        }

        let interleaved: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(|e| anyhow::anyhow!("wav sample err: {e}"))?,
            SampleFormat::Int => {
                let max = (1_i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / max))
                    .collect::<Result<_, _>>()
                    .map_err(|e| anyhow::anyhow!("wav sample err: {e}"))?
            }
        };

        let frames = interleaved.len() / channels;
        // hound yields frame-major samples; transpose into (channels, frames)
        let frame_major = Array2::from_shape_vec((frames, channels), interleaved[..frames * channels].to_vec())?
            .reversed_axes();
        let samples = frame_major.as_standard_layout().into_owned();

        Ok(Self {
            sample_rate: spec.sample_rate,
            samples,
        })
    }

    /// Write as 16-bit PCM WAV
    pub fn write_wav<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let spec = WavSpec {
            channels: self.channels() as u16,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path.as_ref(), spec)
            .map_err(|e| anyhow::anyhow!("wav write err: {e}"))?;

        const I16_MAX_F32: f32 = i16::MAX as f32;
        for frame in self.samples.axis_iter(Axis(1)) {
            for &s in frame.iter() {
                let v = (s.clamp(-1.0, 1.0) * I16_MAX_F32) as i16;
                writer
                    .write_sample(v)
                    .map_err(|e| anyhow::anyhow!("wav sample err: {e}"))?;
            }
        }
        writer
            .finalize()
            .map_err(|e| anyhow::anyhow!("wav finalize err: {e}"))?;
        Ok(())
    }
}
