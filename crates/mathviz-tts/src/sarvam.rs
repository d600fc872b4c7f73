//! Sarvam AI text-to-speech client.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use mathviz_core::EngineError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::wav::{concat_clips, wav_duration};
use crate::{AudioClip, DEFAULT_SAMPLE_RATE};

const SARVAM_API_URL: &str = "https://api.sarvam.ai";

/// Longest text sent in one request, in characters.
pub const MAX_CHUNK_CHARS: usize = 500;

/// Anything that turns narration text into audio.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesizes `text` in `language` (`en`, `hi`, `en-IN`, `hi-IN`).
    async fn synthesize(&self, text: &str, language: &str) -> Result<AudioClip, EngineError>;

    /// Voice identifier, part of the audio cache key.
    fn voice(&self) -> &str;
}

/// Word-level timing estimate for subtitle sync.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordTimestamp {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

/// Spreads `duration` evenly across the words of `text`.
///
/// Input for building an SRT for `Composer::add_subtitles`; the pipeline does
/// not burn subtitles itself.
pub fn estimate_word_timestamps(text: &str, duration: f64) -> Vec<WordTimestamp> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let step = duration / words.len() as f64;
    words
        .iter()
        .enumerate()
        .map(|(i, word)| WordTimestamp {
            word: word.to_string(),
            start: i as f64 * step,
            end: (i + 1) as f64 * step,
        })
        .collect()
}

/// Sarvam language code for a short or regional code. Unknown codes map to English.
fn target_language_code(language: &str) -> &'static str {
    match language {
        "hi" | "hi-IN" => "hi-IN",
        _ => "en-IN",
    }
}

/// Splits after `.`, `!` or `?` followed by a space, keeping the punctuation.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for (i, c) in text.char_indices() {
        if matches!(c, '.' | '!' | '?') && text[i + 1..].starts_with(' ') {
            sentences.push(text[start..=i].trim());
            start = i + 1;
        }
    }
    sentences.push(text[start..].trim());
    sentences.retain(|s| !s.is_empty());
    sentences
}

/// Packs sentences into chunks of at most `max_chars` characters.
///
/// A single sentence longer than the limit becomes its own chunk.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in split_sentences(text) {
        let needed = current.chars().count() + sentence.chars().count() + 1;
        if current.is_empty() {
            current.push_str(sentence);
        } else if needed <= max_chars {
            current.push(' ');
            current.push_str(sentence);
        } else {
            chunks.push(std::mem::take(&mut current));
            current.push_str(sentence);
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    if chunks.is_empty() {
        vec![text.to_string()]
    } else {
        chunks
    }
}

#[derive(Serialize)]
struct TtsRequest<'a> {
    text: &'a str,
    target_language_code: &'a str,
    speaker: &'a str,
    model: &'a str,
    speech_sample_rate: u32,
    enable_preprocessing: bool,
}

#[derive(Deserialize)]
struct TtsResponse {
    #[serde(default)]
    audios: Vec<String>,
}

/// Client for the Sarvam `text-to-speech` endpoint.
pub struct SarvamClient {
    client: Client,
    api_key: String,
    voice: String,
    model: String,
    base_url: String,
}

impl SarvamClient {
    pub fn new(api_key: &str, voice: &str, model: &str) -> Self {
        debug!("SarvamClient: voice={}, model={}, api_key_len={}", voice, model, api_key.len());
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            voice: voice.to_string(),
            model: model.to_string(),
            base_url: SARVAM_API_URL.to_string(),
        }
    }

    /// Points the client at another host (test servers).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn synthesize_chunk(&self, text: &str, language: &str) -> Result<AudioClip, EngineError> {
        let body = TtsRequest {
            text,
            target_language_code: target_language_code(language),
            speaker: &self.voice,
            model: &self.model,
            speech_sample_rate: DEFAULT_SAMPLE_RATE,
            enable_preprocessing: true,
        };

        let response = self
            .client
            .post(format!("{}/text-to-speech", self.base_url))
            .header("api-subscription-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::Tts(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Tts(format!("Sarvam API error {}: {}", status, body)));
        }

        let resp: TtsResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Tts(e.to_string()))?;
        let encoded = resp
            .audios
            .first()
            .ok_or_else(|| EngineError::Tts("Sarvam response contained no audio".into()))?;
        let audio_bytes = STANDARD
            .decode(encoded)
            .map_err(|e| EngineError::Tts(format!("Invalid base64 audio: {}", e)))?;

        Ok(AudioClip {
            duration: wav_duration(&audio_bytes),
            audio_bytes,
            sample_rate: DEFAULT_SAMPLE_RATE,
            text: text.to_string(),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for SarvamClient {
    async fn synthesize(&self, text: &str, language: &str) -> Result<AudioClip, EngineError> {
        if text.trim().is_empty() {
            return Ok(AudioClip::silent(0.0, text));
        }

        let chunks = chunk_text(text, MAX_CHUNK_CHARS);
        if let [single] = chunks.as_slice() {
            return self.synthesize_chunk(single, language).await;
        }

        debug!("Sarvam: {} chars split into {} chunks", text.len(), chunks.len());
        let mut clips = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            clips.push(self.synthesize_chunk(chunk, language).await?);
        }
        Ok(concat_clips(&clips, text))
    }

    fn voice(&self) -> &str {
        &self.voice
    }
}
