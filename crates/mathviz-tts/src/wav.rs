//! Minimal RIFF/WAVE handling for 16-bit PCM narration.
//!
//! Only what the narration path needs: read the header, wrap raw PCM,
//! concatenate chunk clips and trim leading/trailing silence.

use crate::{AudioClip, DEFAULT_SAMPLE_RATE};

/// Anything quieter than this RMS level counts as silence.
const SILENCE_THRESH_DBFS: f64 = -40.0;
/// Silence shorter than this is kept.
const MIN_SILENCE_MS: usize = 100;
/// Padding left around the speech after trimming.
const KEEP_PADDING_MS: usize = 50;
/// Loudness analysis window.
const WINDOW_MS: usize = 10;

/// Parsed view over a WAV file.
#[derive(Debug, Clone, Copy)]
pub struct WavInfo<'a> {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub data: &'a [u8],
}

impl WavInfo<'_> {
    fn frame_bytes(&self) -> usize {
        self.channels as usize * (self.bits_per_sample as usize / 8)
    }
}

fn u16_at(b: &[u8], at: usize) -> Option<u16> {
    b.get(at..at + 2).map(|s| u16::from_le_bytes([s[0], s[1]]))
}

fn u32_at(b: &[u8], at: usize) -> Option<u32> {
    b.get(at..at + 4).map(|s| u32::from_le_bytes([s[0], s[1], s[2], s[3]]))
}

/// True when the bytes start with a RIFF header.
pub fn is_riff(bytes: &[u8]) -> bool {
    bytes.starts_with(b"RIFF")
}

/// Walks the RIFF chunks and returns the `fmt ` fields plus the `data` payload.
pub fn parse_wav(bytes: &[u8]) -> Option<WavInfo<'_>> {
    if bytes.len() < 12 || !is_riff(bytes) || &bytes[8..12] != b"WAVE" {
        return None;
    }

    let mut fmt: Option<(u16, u32, u16)> = None;
    let mut offset = 12;

    while offset + 8 <= bytes.len() {
        let id = &bytes[offset..offset + 4];
        let size = u32_at(bytes, offset + 4)? as usize;
        let body = offset + 8;

        match id {
            b"fmt " => {
                fmt = Some((
                    u16_at(bytes, body + 2)?,
                    u32_at(bytes, body + 4)?,
                    u16_at(bytes, body + 14)?,
                ));
            }
            b"data" => {
                let (channels, sample_rate, bits_per_sample) = fmt?;
                // Streamed WAVs sometimes carry a bogus data size.
                let end = body.saturating_add(size).min(bytes.len());
                return Some(WavInfo {
                    channels,
                    sample_rate,
                    bits_per_sample,
                    data: &bytes[body..end],
                });
            }
            _ => {}
        }

        offset = body.checked_add(size)?.checked_add(size & 1)?;
    }

    None
}

/// Duration of WAV bytes in seconds.
///
/// Unparseable input is assumed to be 16-bit mono PCM at the default rate.
pub fn wav_duration(bytes: &[u8]) -> f64 {
    match parse_wav(bytes) {
        Some(info) if info.sample_rate > 0 && info.frame_bytes() > 0 => {
            (info.data.len() / info.frame_bytes()) as f64 / info.sample_rate as f64
        }
        Some(_) => 0.0,
        None if bytes.is_empty() => 0.0,
        None => bytes.len() as f64 / (DEFAULT_SAMPLE_RATE as f64 * 2.0),
    }
}

/// Wraps raw 16-bit PCM in a WAV container.
pub fn pcm_to_wav(pcm: &[u8], sample_rate: u32, channels: u16) -> Vec<u8> {
    let bits: u16 = 16;
    let block_align = channels * bits / 8;
    let byte_rate = sample_rate * block_align as u32;
    let data_len = pcm.len() as u32;

    let mut out = Vec::with_capacity(44 + pcm.len());
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&bits.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    out.extend_from_slice(pcm);
    out
}

fn sample_rate_or_default(rate: u32) -> u32 {
    if rate == 0 {
        DEFAULT_SAMPLE_RATE
    } else {
        rate
    }
}

/// WAV bytes for a clip: passes RIFF data through, wraps raw PCM otherwise.
pub fn ensure_wav(clip: &AudioClip) -> Vec<u8> {
    if is_riff(&clip.audio_bytes) {
        return clip.audio_bytes.clone();
    }
    pcm_to_wav(&clip.audio_bytes, sample_rate_or_default(clip.sample_rate), 1)
}

/// PCM payload and format of a clip, or None for unsupported encodings.
fn pcm_of(clip: &AudioClip) -> Option<(&[u8], u32, u16)> {
    if is_riff(&clip.audio_bytes) {
        let info = parse_wav(&clip.audio_bytes)?;
        if info.bits_per_sample != 16 || info.channels == 0 {
            return None;
        }
        return Some((info.data, info.sample_rate, info.channels));
    }
    Some((&clip.audio_bytes, sample_rate_or_default(clip.sample_rate), 1))
}

/// Joins chunk clips into one WAV clip.
pub fn concat_clips(clips: &[AudioClip], text: &str) -> AudioClip {
    let Some(first) = clips.first() else {
        return AudioClip::silent(0.0, text);
    };

    let (rate, channels) = pcm_of(first)
        .map(|(_, r, c)| (r, c))
        .unwrap_or((sample_rate_or_default(first.sample_rate), 1));

    let mut pcm = Vec::new();
    for clip in clips {
        if let Some((data, _, _)) = pcm_of(clip) {
            pcm.extend_from_slice(data);
        }
    }

    AudioClip {
        audio_bytes: pcm_to_wav(&pcm, rate, channels),
        duration: clips.iter().map(|c| c.duration).sum(),
        sample_rate: rate,
        text: text.to_string(),
    }
}

fn window_is_loud(samples: &[u8]) -> bool {
    let count = samples.len() / 2;
    if count == 0 {
        return false;
    }
    let sum_sq: f64 = samples
        .chunks_exact(2)
        .map(|s| {
            let v = i16::from_le_bytes([s[0], s[1]]) as f64;
            v * v
        })
        .sum();
    let rms = (sum_sq / count as f64).sqrt();
    if rms == 0.0 {
        return false;
    }
    20.0 * (rms / 32768.0).log10() >= SILENCE_THRESH_DBFS
}

/// Trims leading and trailing silence, keeping a little padding.
///
/// Returns the clip unchanged when it is empty, entirely silent, or not
/// 16-bit PCM.
pub fn trim_silence(clip: AudioClip) -> AudioClip {
    if clip.audio_bytes.is_empty() {
        return clip;
    }
    let Some((pcm, rate, channels)) = pcm_of(&clip) else {
        return clip;
    };

    let frame_bytes = channels as usize * 2;
    let total_frames = pcm.len() / frame_bytes;
    let frames_per_ms = |ms: usize| rate as usize * ms / 1000;
    let window = frames_per_ms(WINDOW_MS);
    if window == 0 || total_frames == 0 {
        return clip;
    }

    let loud: Vec<usize> = pcm[..total_frames * frame_bytes]
        .chunks(window * frame_bytes)
        .enumerate()
        .filter(|(_, w)| window_is_loud(w))
        .map(|(i, _)| i)
        .collect();

    let (Some(&first), Some(&last)) = (loud.first(), loud.last()) else {
        return clip;
    };

    let min_silence = frames_per_ms(MIN_SILENCE_MS);
    let pad = frames_per_ms(KEEP_PADDING_MS);

    let mut start = first * window;
    if start < min_silence {
        start = 0;
    }
    let mut end = ((last + 1) * window).min(total_frames);
    if total_frames - end < min_silence {
        end = total_frames;
    }
    let start = start.saturating_sub(pad);
    let end = (end + pad).min(total_frames);

    let trimmed = &pcm[start * frame_bytes..end * frame_bytes];
    AudioClip {
        audio_bytes: pcm_to_wav(trimmed, rate, channels),
        duration: (end - start) as f64 / rate as f64,
        sample_rate: rate,
        text: clip.text,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// 16-bit mono PCM: `lead` s of silence, `tone` s of a 440 Hz sine, `tail` s of silence.
    pub(crate) fn speech_like_pcm(rate: u32, lead: f64, tone: f64, tail: f64) -> Vec<u8> {
        let n = |s: f64| (s * rate as f64).round() as usize;
        let mut samples = vec![0i16; n(lead)];
        samples.extend((0..n(tone)).map(|i| {
            let t = i as f64 / rate as f64;
            (10_000.0 * (2.0 * std::f64::consts::PI * 440.0 * t).sin()) as i16
        }));
        samples.extend(std::iter::repeat(0i16).take(n(tail)));
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    fn clip(bytes: Vec<u8>) -> AudioClip {
        let duration = wav_duration(&bytes);
        AudioClip {
            audio_bytes: bytes,
            duration,
            sample_rate: 22050,
            text: "t".into(),
        }
    }

    #[test]
    fn header_round_trip() {
        let pcm = vec![0u8; 22050 * 2];
        let wav = pcm_to_wav(&pcm, 22050, 1);
        assert_eq!(wav.len(), 44 + pcm.len());
        let info = parse_wav(&wav).unwrap();
        assert_eq!(info.channels, 1);
        assert_eq!(info.sample_rate, 22050);
        assert_eq!(info.bits_per_sample, 16);
        assert!((wav_duration(&wav) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn duration_fallback_for_raw_bytes() {
        assert_eq!(wav_duration(&[]), 0.0);
        assert!((wav_duration(&vec![0u8; 44100]) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn skips_unknown_chunks() {
        let mut wav = pcm_to_wav(&[1, 0, 2, 0], 16000, 1);
        // Splice a LIST chunk between fmt and data.
        let list = [b"LIST".as_slice(), &4u32.to_le_bytes(), b"INFO"].concat();
        wav.splice(36..36, list);
        let info = parse_wav(&wav).unwrap();
        assert_eq!(info.sample_rate, 16000);
        assert_eq!(info.data, &[1, 0, 2, 0]);
    }

    #[test]
    fn ensure_wav_wraps_pcm_and_passes_riff() {
        let raw = clip(vec![0u8; 100]);
        let wrapped = ensure_wav(&raw);
        assert!(is_riff(&wrapped));
        assert_eq!(ensure_wav(&clip(wrapped.clone())), wrapped);
    }

    #[test]
    fn trim_removes_surrounding_silence() {
        let wav = pcm_to_wav(&speech_like_pcm(22050, 0.5, 1.0, 0.5), 22050, 1);
        let original = clip(wav);
        assert!((original.duration - 2.0).abs() < 1e-3);

        let trimmed = trim_silence(original);
        assert!((trimmed.duration - 1.1).abs() < 0.03, "got {}", trimmed.duration);
        assert!((wav_duration(&trimmed.audio_bytes) - trimmed.duration).abs() < 1e-3);
    }

    #[test]
    fn short_edges_are_kept() {
        let wav = pcm_to_wav(&speech_like_pcm(22050, 0.05, 1.0, 0.05), 22050, 1);
        let trimmed = trim_silence(clip(wav));
        assert!((trimmed.duration - 1.1).abs() < 0.01, "got {}", trimmed.duration);
    }

    #[test]
    fn raw_pcm_is_trimmed_into_wav() {
        let trimmed = trim_silence(clip(speech_like_pcm(22050, 0.5, 0.5, 0.5)));
        assert!(is_riff(&trimmed.audio_bytes));
        assert!(trimmed.duration < 0.7);
    }

    #[test]
    fn silence_is_left_alone() {
        let wav = pcm_to_wav(&vec![0u8; 22050 * 2], 22050, 1);
        let original = clip(wav);
        assert_eq!(trim_silence(original.clone()), original);
    }

    #[test]
    fn concat_sums_duration_and_pcm() {
        let a = clip(pcm_to_wav(&vec![0u8; 22050 * 2], 22050, 1));
        let b = clip(vec![0u8; 22050]);
        let joined = concat_clips(&[a, b], "both");
        assert!((joined.duration - 1.5).abs() < 1e-9);
        assert!((wav_duration(&joined.audio_bytes) - 1.5).abs() < 1e-9);
        assert_eq!(joined.text, "both");
    }
}
