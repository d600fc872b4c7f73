//! Per-beat narration: cache lookup, synthesis, trimming, WAV output.

use std::collections::HashMap;
use std::path::Path;

use futures::future::join_all;
use mathviz_core::{Beat, EngineError};
use tracing::{debug, error, info};

use crate::cache::AudioCache;
use crate::sarvam::SpeechSynthesizer;
use crate::wav::{ensure_wav, trim_silence};
use crate::AudioClip;

/// Duration given to a beat with no narration.
pub const BLANK_NARRATION_SECS: f64 = 5.0;

/// Audio for one narration string, from the cache when possible.
///
/// Blank narration yields a silent clip of [`BLANK_NARRATION_SECS`] without
/// touching the synthesizer or cache.
pub async fn generate_audio(
    narration: &str,
    language: &str,
    tts: &dyn SpeechSynthesizer,
    cache: &AudioCache,
) -> Result<AudioClip, EngineError> {
    let text = narration.trim();
    if text.is_empty() {
        return Ok(AudioClip::silent(BLANK_NARRATION_SECS, ""));
    }

    let voice = tts.voice();
    if let Some(hit) = cache.get(text, voice, language).await {
        debug!("Audio cache hit: {:.40}", text);
        return Ok(hit);
    }

    let clip = trim_silence(tts.synthesize(text, language).await?);
    cache.put(text, voice, language, &clip).await?;
    Ok(clip)
}

/// Narrates every beat concurrently and writes `<beat_id>.wav` into `audio_dir`.
///
/// Beats whose synthesis or write fails are logged and left out of the map.
/// Beats with blank narration are present but have no file.
pub async fn generate_all_audio(
    beats: &[Beat],
    language: &str,
    tts: &dyn SpeechSynthesizer,
    cache: &AudioCache,
    audio_dir: &Path,
) -> Result<HashMap<String, AudioClip>, EngineError> {
    tokio::fs::create_dir_all(audio_dir)
        .await
        .map_err(|e| EngineError::io(audio_dir, e))?;

    let tasks = beats.iter().map(|beat| async move {
        let result = async {
            let clip = generate_audio(&beat.narration, language, tts, cache).await?;
            if !clip.is_empty() {
                let path = audio_dir.join(format!("{}.wav", beat.beat_id));
                tokio::fs::write(&path, ensure_wav(&clip))
                    .await
                    .map_err(|e| EngineError::io(&path, e))?;
            }
            Ok::<_, EngineError>(clip)
        }
        .await;

        match result {
            Ok(clip) => Some((beat.beat_id.clone(), clip)),
            Err(e) => {
                error!("TTS failed for beat '{}': {}", beat.beat_id, e);
                None
            }
        }
    });

    let clips: HashMap<String, AudioClip> = join_all(tasks).await.into_iter().flatten().collect();
    info!("Narration: {}/{} beats have audio", clips.len(), beats.len());
    Ok(clips)
}
