//! Building blocks for extending melodies with a music-generation model and
//! rendering cover art for the result.
//!
//! The generation loop is written against the [`MusicModel`] trait so any
//! backend that can condition on a melody and continue from an audio prompt
//! can be plugged in.

pub mod audio;
pub mod cancel;
pub mod compose;
pub mod config;
pub mod error;
pub mod font;
pub mod generate;
pub mod model;
pub mod segment;

pub use audio::AudioBuffer;
pub use cancel::CancellationToken;
pub use compose::{
    add_settings_to_image, add_settings_to_image_in, hex_to_rgba, render_cover, save_image, CoverSettings,
};
pub use config::FontConfig;
pub use error::{ComposeError, FontError, SegmentError};
pub use font::{load_font, Font, FontResolver, FontSource};
pub use generate::{concatenate_segments, generate_music_segments, GeneratedSegments, GenerationRequest};
pub use model::{ModelConfig, ModelRequest, MusicModel};
pub use segment::{segment_bounds, separate_audio_segments};
