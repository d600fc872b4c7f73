//! FFmpeg composition: per-beat audio merge, concatenation, subtitles, final encode.
//!
//! The job pipeline merges and concatenates; [`Composer::encode_final`] runs
//! on request from `render-from-plan --encode`. Subtitle burn-in and xfade
//! joins are library API with no caller in the pipeline.

use std::path::{Path, PathBuf};
use std::time::Duration;

use mathviz_config::Settings;
use mathviz_core::EngineError;
use tracing::{debug, info, warn};

use crate::command::{tail, CommandRunner, RunOptions};

/// Duration assumed when ffprobe cannot read a file.
pub const FALLBACK_DURATION_SECS: f64 = 5.0;

/// Audio longer than video by more than this freezes the last frame.
const PAD_THRESHOLD_SECS: f64 = 0.5;

const FFMPEG_TIMEOUT: Duration = Duration::from_secs(600);
const STDERR_TAIL_CHARS: usize = 4000;

fn s(p: &Path) -> String {
    p.to_string_lossy().into_owned()
}

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|a| a.to_string()).collect()
}

/// ffmpeg arguments for muxing a beat's video with its narration.
///
/// Longer audio pads the video by cloning the last frame; otherwise the
/// output is cut to the audio length. Both paths re-encode so every segment
/// shares codec, frame rate and timebase for a stream-copy concat.
pub fn merge_args(
    video: &Path,
    audio: &Path,
    out: &Path,
    video_dur: f64,
    audio_dur: f64,
    fps: u32,
) -> Vec<String> {
    let mut cmd = args(&["-y", "-i"]);
    cmd.push(s(video));
    cmd.push("-i".into());
    cmd.push(s(audio));

    if audio_dur > video_dur + PAD_THRESHOLD_SECS {
        let pad = audio_dur - video_dur + PAD_THRESHOLD_SECS;
        cmd.push("-vf".into());
        cmd.push(format!("tpad=stop_mode=clone:stop_duration={:.2}", pad));
        cmd.extend(args(&[
            "-c:v", "libx264", "-preset", "ultrafast", "-crf", "23", "-c:a", "aac", "-b:a", "192k",
            "-map", "0:v:0", "-map", "1:a:0", "-shortest",
        ]));
    } else {
        cmd.extend(args(&["-c:v", "libx264", "-preset", "ultrafast", "-crf", "23", "-r"]));
        cmd.push(fps.to_string());
        cmd.extend(args(&["-c:a", "aac", "-b:a", "192k", "-map", "0:v:0", "-map", "1:a:0", "-t"]));
        cmd.push(format!("{:.2}", audio_dur));
    }

    cmd.push(s(out));
    cmd
}

/// Concat demuxer list: one `file '<path>'` line per segment, `'` escaped as `'\''`.
pub fn concat_list(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("file '{}'\n", s(p).replace('\'', r"'\''")))
        .collect()
}

/// Escapes a path for use inside the `subtitles=` filter argument.
fn subtitle_filter_path(path: &Path) -> String {
    s(path).replace('\\', "/").replace(':', r"\:")
}

/// Parses a `WIDTHxHEIGHT` string.
fn parse_resolution(resolution: &str) -> Result<(u32, u32), EngineError> {
    let invalid = || EngineError::Config(format!("Invalid resolution '{}'", resolution));
    let (w, h) = resolution.split_once('x').ok_or_else(invalid)?;
    Ok((
        w.trim().parse().map_err(|_| invalid())?,
        h.trim().parse().map_err(|_| invalid())?,
    ))
}

async fn ensure_parent(path: &Path) -> Result<(), EngineError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| EngineError::io(parent, e))?;
    }
    Ok(())
}

async fn copy_file(from: &Path, to: &Path) -> Result<PathBuf, EngineError> {
    ensure_parent(to).await?;
    tokio::fs::copy(from, to)
        .await
        .map_err(|e| EngineError::io(from, e))?;
    Ok(to.to_path_buf())
}

/// Wraps the ffmpeg and ffprobe binaries.
pub struct Composer {
    ffmpeg: String,
    ffprobe: String,
    fps: u32,
}

impl Composer {
    pub fn new(ffmpeg: &str, ffprobe: &str) -> Self {
        Self {
            ffmpeg: ffmpeg.to_string(),
            ffprobe: ffprobe.to_string(),
            fps: 30,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.ffmpeg_path, &settings.ffprobe_path).with_fps(settings.render_fps)
    }

    /// Frame rate segments are normalized to when merged.
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    async fn ffmpeg(&self, cmd: Vec<String>, what: &str) -> Result<(), EngineError> {
        let options = RunOptions::default().timeout(FFMPEG_TIMEOUT);
        let output = CommandRunner::run(&self.ffmpeg, &cmd, &options)
            .await
            .map_err(|e| EngineError::Compose(format!("FFmpeg {} failed: {}", what, e)))?;
        if !output.success() {
            return Err(EngineError::Compose(format!(
                "FFmpeg {} failed: {}",
                what,
                tail(&output.stderr, STDERR_TAIL_CHARS)
            )));
        }
        Ok(())
    }

    /// Fails when `ffmpeg -version` cannot run.
    pub async fn verify_ffmpeg(&self) -> Result<(), EngineError> {
        let options = RunOptions::default().timeout(Duration::from_secs(30));
        match CommandRunner::run(&self.ffmpeg, &args(&["-version"]), &options).await {
            Ok(out) if out.success() => Ok(()),
            _ => Err(EngineError::Compose(format!(
                "FFmpeg not found at '{}'. Install FFmpeg and ensure it is in PATH.",
                self.ffmpeg
            ))),
        }
    }

    /// Container duration in seconds, or [`FALLBACK_DURATION_SECS`] on any failure.
    pub async fn probe_duration(&self, path: &Path) -> f64 {
        let mut cmd = args(&[
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ]);
        cmd.push(s(path));

        let options = RunOptions::default().timeout(Duration::from_secs(30));
        match CommandRunner::run(&self.ffprobe, &cmd, &options).await {
            Ok(out) => out.stdout.trim().parse().unwrap_or_else(|_| {
                debug!("ffprobe gave no duration for {}", path.display());
                FALLBACK_DURATION_SECS
            }),
            Err(e) => {
                warn!("ffprobe failed for {}: {}", path.display(), e);
                FALLBACK_DURATION_SECS
            }
        }
    }

    /// Muxes a beat's video with its narration into `out`.
    ///
    /// With no audio, or an audio path that does not exist, the video is copied.
    pub async fn merge_segment(
        &self,
        video: &Path,
        audio: Option<&Path>,
        out: &Path,
    ) -> Result<PathBuf, EngineError> {
        let audio = match audio {
            Some(a) if tokio::fs::try_exists(a).await.unwrap_or(false) => a,
            _ => return copy_file(video, out).await,
        };
        ensure_parent(out).await?;

        let video_dur = self.probe_duration(video).await;
        let audio_dur = self.probe_duration(audio).await;
        self.ffmpeg(merge_args(video, audio, out, video_dur, audio_dur, self.fps), "merge")
            .await?;
        Ok(out.to_path_buf())
    }

    /// Joins segments into `out`.
    ///
    /// One segment is copied. Exactly two with `crossfade > 0` use xfade;
    /// everything else goes through the concat demuxer without re-encoding.
    pub async fn concat_segments(
        &self,
        segments: &[PathBuf],
        out: &Path,
        crossfade: f64,
    ) -> Result<PathBuf, EngineError> {
        match segments {
            [] => Err(EngineError::Compose("No segments to concatenate".into())),
            [only] => copy_file(only, out).await,
            [first, second] if crossfade > 0.0 => self.concat_xfade(first, second, out, crossfade).await,
            _ => self.concat_demuxer(segments, out).await,
        }
    }

    async fn concat_demuxer(&self, segments: &[PathBuf], out: &Path) -> Result<PathBuf, EngineError> {
        ensure_parent(out).await?;
        info!("Concatenating {} segments -> {}", segments.len(), out.display());

        let mut absolute = Vec::with_capacity(segments.len());
        for seg in segments {
            absolute.push(
                tokio::fs::canonicalize(seg)
                    .await
                    .unwrap_or_else(|_| seg.clone()),
            );
        }

        let stem = out.file_stem().and_then(|s| s.to_str()).unwrap_or("concat");
        let list_path = out.with_file_name(format!(".{}_concat.txt", stem));
        tokio::fs::write(&list_path, concat_list(&absolute))
            .await
            .map_err(|e| EngineError::io(&list_path, e))?;

        let mut cmd = args(&["-y", "-f", "concat", "-safe", "0", "-i"]);
        cmd.push(s(&list_path));
        cmd.extend(args(&["-c", "copy", "-reset_timestamps", "1"]));
        cmd.push(s(out));

        let result = self.ffmpeg(cmd, "concat").await;
        let _ = tokio::fs::remove_file(&list_path).await;
        result.map(|_| out.to_path_buf())
    }

    async fn concat_xfade(
        &self,
        first: &Path,
        second: &Path,
        out: &Path,
        crossfade: f64,
    ) -> Result<PathBuf, EngineError> {
        ensure_parent(out).await?;
        let offset = (self.probe_duration(first).await - crossfade).max(0.0);

        let mut cmd = args(&["-y", "-i"]);
        cmd.push(s(first));
        cmd.push("-i".into());
        cmd.push(s(second));
        cmd.push("-filter_complex".into());
        cmd.push(format!("xfade=transition=fade:duration={}:offset={}", crossfade, offset));
        cmd.extend(args(&["-c:a", "aac"]));
        cmd.push(s(out));

        self.ffmpeg(cmd, "xfade").await?;
        Ok(out.to_path_buf())
    }

    /// Burns an SRT file into the video. `out` defaults to `<stem>_subtitled.mp4`.
    pub async fn add_subtitles(
        &self,
        video: &Path,
        srt: &Path,
        out: Option<&Path>,
    ) -> Result<PathBuf, EngineError> {
        let out = match out {
            Some(p) => p.to_path_buf(),
            None => {
                let stem = video.file_stem().and_then(|s| s.to_str()).unwrap_or("video");
                video.with_file_name(format!("{}_subtitled.mp4", stem))
            }
        };

        let mut cmd = args(&["-y", "-i"]);
        cmd.push(s(video));
        cmd.push("-vf".into());
        cmd.push(format!("subtitles='{}'", subtitle_filter_path(srt)));
        cmd.extend(args(&["-c:a", "copy"]));
        cmd.push(s(&out));

        self.ffmpeg(cmd, "subtitles").await?;
        Ok(out)
    }

    /// Scales and letterboxes to `resolution` (`WIDTHxHEIGHT`) for delivery.
    pub async fn encode_final(
        &self,
        input: &Path,
        out: &Path,
        resolution: &str,
        fps: u32,
    ) -> Result<PathBuf, EngineError> {
        let (w, h) = parse_resolution(resolution)?;
        ensure_parent(out).await?;

        let mut cmd = args(&["-y", "-i"]);
        cmd.push(s(input));
        cmd.push("-vf".into());
        cmd.push(format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2"
        ));
        cmd.push("-r".into());
        cmd.push(fps.to_string());
        cmd.extend(args(&[
            "-c:v", "libx264", "-preset", "medium", "-crf", "23", "-c:a", "aac", "-b:a", "192k",
            "-movflags", "+faststart",
        ]));
        cmd.push(s(out));

        self.ffmpeg(cmd, "encode").await?;
        Ok(out.to_path_buf())
    }
}
