//! Narration audio for mathviz beats.
//!
//! - [`SarvamClient`] - Sarvam AI text-to-speech over HTTP
//! - [`SpeechSynthesizer`] - The seam the pipeline synthesizes through
//! - [`AudioCache`] - sha256-keyed WAV cache with a JSON manifest
//! - [`wav`] - Header parsing, PCM wrapping, silence trimming
//! - [`generate_all_audio`] - Concurrent narration for a whole plan

mod cache;
mod narration;
mod sarvam;
pub mod wav;

pub use cache::{AudioCache, CacheEntry};
pub use narration::{generate_all_audio, generate_audio, BLANK_NARRATION_SECS};
pub use sarvam::{estimate_word_timestamps, SarvamClient, SpeechSynthesizer, WordTimestamp};

/// Sample rate requested from the TTS service.
pub const DEFAULT_SAMPLE_RATE: u32 = 22050;

/// Synthesized speech for one piece of text.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    /// WAV file bytes, or raw 16-bit mono PCM.
    pub audio_bytes: Vec<u8>,
    /// Length in seconds.
    pub duration: f64,
    pub sample_rate: u32,
    pub text: String,
}

impl AudioClip {
    /// A clip with no audio, used for blank narration.
    pub fn silent(duration: f64, text: impl Into<String>) -> Self {
        Self {
            audio_bytes: Vec::new(),
            duration,
            sample_rate: DEFAULT_SAMPLE_RATE,
            text: text.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.audio_bytes.is_empty()
    }
}
