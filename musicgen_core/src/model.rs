use ndarray::Array3;

/// Static facts about a loaded model that the generation loop depends on.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Longest melody excerpt, in seconds, the model accepts as conditioning
    pub max_conditioning_secs: f32,
    /// Device the model runs on (e.g. "cpu", "cuda:0"), informational only
    pub device: String,
}

/// One call into the model.
///
/// Tensors are laid out `(batch, channels, frames)`.
#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
    pub descriptions: &'a [String],
    pub melody: &'a Array3<f32>,
    pub melody_sample_rate: u32,
    pub progress: bool,
    /// Audio the output should continue from
    pub prompt: Option<&'a Array3<f32>>,
}

/// A melody-conditioned music generator.
pub trait MusicModel {
    fn config(&self) -> &ModelConfig;

    /// Seed the model's sampler
    fn set_seed(&mut self, seed: u64);

    /// Generate one batch of audio at `config().sample_rate`
    fn generate_with_all(&mut self, request: ModelRequest<'_>) -> anyhow::Result<Array3<f32>>;

    fn sample_rate(&self) -> u32 {
        self.config().sample_rate
    }
}
