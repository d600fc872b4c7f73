//! Runtime settings and output directory layout.
//!
//! This crate defines how mathviz is configured:
//!
//! - [`Settings`] - Every tunable, loaded from environment variables
//! - [`Quality`] - Render quality and its Manim flag
//! - [`ConfigError`] - Load and directory-creation failures
//!
//! # Loading
//!
//! Binaries call `dotenvy::dotenv()` first, so a `.env` file feeds the same
//! lookup as the process environment.
//!
//! ```rust,ignore
//! use mathviz_config::Settings;
//!
//! let settings = Settings::from_env()?;
//! settings.ensure_dirs()?;
//! ```
//!
//! # Custom lookup
//!
//! ```rust
//! use std::collections::HashMap;
//! use mathviz_config::Settings;
//!
//! let vars = HashMap::from([("PORT", "9090"), ("OUTPUT_DIR", "/custom")]);
//! let settings = Settings::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
//!
//! assert_eq!(settings.port, 9090);
//! assert_eq!(settings.final_dir(), std::path::Path::new("/custom/final"));
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default output volume when `OUTPUT_DIR` is unset.
pub const DEFAULT_OUTPUT_DIR: &str = "/data";
/// Default listen port when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 8000;

/// Errors that can occur when loading settings or preparing directories.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// Failed to create an output directory.
    #[error("Failed to create directory '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// An environment value could not be parsed.
    #[error("Invalid value for {key}: '{value}'")]
    Invalid { key: String, value: String },
}

impl ConfigError {
    /// Creates an IO error with path context.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// Creates a parse error for an environment key.
    pub fn invalid(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Render quality requested for a job.
///
/// | Quality | Manim flag |
/// |---------|------------|
/// | `Low` | `-ql` |
/// | `Medium` | `-qm` |
/// | `High` | `-qh` |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Low,
    #[default]
    Medium,
    High,
}

impl Quality {
    /// Manim `-q` flag letter.
    pub fn manim_flag(&self) -> &'static str {
        match self {
            Quality::Low => "l",
            Quality::Medium => "m",
            Quality::High => "h",
        }
    }

    /// Parses a quality name, falling back to `Medium` for anything unknown.
    pub fn parse_lossy(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl FromStr for Quality {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        write!(f, "{}", s)
    }
}

/// All engine settings.
#[derive(Debug, Clone)]
pub struct Settings {
    // LLM provider
    pub llm_provider: String,
    pub llm_model: String,
    pub llm_api_key: String,

    // Sarvam TTS
    pub sarvam_api_key: String,
    pub sarvam_model: String,

    // Defaults
    pub default_voice: String,
    pub default_language: String,
    pub default_theme: String,
    pub default_accent_color: String,

    // Output
    pub output_dir: PathBuf,

    // Rendering
    /// Target of the optional delivery encode.
    pub render_resolution: String,
    pub render_fps: u32,
    /// Not applied by the pipeline, whose final concat never crossfades.
    pub crossfade_duration: f64,
    pub manim_command: String,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub render_timeout_secs: u64,
    pub max_render_workers: usize,

    // Beat timing and planning budgets
    pub min_beat_duration: f64,
    pub max_beats_per_chapter: usize,
    pub max_chapter_output_tokens: u32,
    pub outline_output_tokens: u32,

    // Cloudflare R2
    pub r2_account_id: String,
    pub r2_access_key_id: String,
    pub r2_secret_access_key: String,
    pub r2_bucket_name: String,
    pub r2_public_url: String,

    // Server
    pub api_host: String,
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            llm_provider: "claude".into(),
            llm_model: "claude-opus-4-6".into(),
            llm_api_key: String::new(),
            sarvam_api_key: String::new(),
            sarvam_model: "bulbul:v3".into(),
            default_voice: "shubh".into(),
            default_language: "en".into(),
            default_theme: "dark".into(),
            default_accent_color: "#58C4DD".into(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            render_resolution: "1920x1080".into(),
            render_fps: 30,
            crossfade_duration: 0.5,
            manim_command: "manim".into(),
            ffmpeg_path: "ffmpeg".into(),
            ffprobe_path: "ffprobe".into(),
            render_timeout_secs: 300,
            max_render_workers: 4,
            min_beat_duration: 10.0,
            max_beats_per_chapter: 5,
            max_chapter_output_tokens: 1500,
            outline_output_tokens: 600,
            r2_account_id: String::new(),
            r2_access_key_id: String::new(),
            r2_secret_access_key: String::new(),
            r2_bucket_name: String::new(),
            r2_public_url: String::new(),
            api_host: "0.0.0.0".into(),
            port: DEFAULT_PORT,
        }
    }
}

/// Reads typed values out of a key lookup, keeping the first parse failure.
struct Reader<F> {
    lookup: F,
}

impl<F> Reader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &str, default: String) -> String {
        (self.lookup)(key).unwrap_or(default)
    }

    fn parsed<T: FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        match (self.lookup)(key) {
            Some(raw) if !raw.trim().is_empty() => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid(key, raw)),
            _ => Ok(default),
        }
    }
}

impl Settings {
    /// Loads settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads settings from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let r = Reader { lookup };
        let d = Settings::default();

        // PORT is the deployment-facing name; API_PORT is honoured as a fallback.
        let port = match (r.lookup)("PORT") {
            Some(_) => r.parsed("PORT", d.port)?,
            None => r.parsed("API_PORT", d.port)?,
        };

        let settings = Self {
            llm_provider: r.string("LLM_PROVIDER", d.llm_provider),
            llm_model: r.string("LLM_MODEL", d.llm_model),
            llm_api_key: r.string("LLM_API_KEY", d.llm_api_key),
            sarvam_api_key: r.string("SARVAM_API_KEY", d.sarvam_api_key),
            sarvam_model: r.string("SARVAM_MODEL", d.sarvam_model),
            default_voice: r.string("DEFAULT_VOICE", d.default_voice),
            default_language: r.string("DEFAULT_LANGUAGE", d.default_language),
            default_theme: r.string("DEFAULT_THEME", d.default_theme),
            default_accent_color: r.string("DEFAULT_ACCENT_COLOR", d.default_accent_color),
            output_dir: r.string("OUTPUT_DIR", DEFAULT_OUTPUT_DIR.into()).into(),
            render_resolution: r.string("RENDER_RESOLUTION", d.render_resolution),
            render_fps: r.parsed("RENDER_FPS", d.render_fps)?,
            crossfade_duration: r.parsed("CROSSFADE_DURATION", d.crossfade_duration)?,
            manim_command: r.string("MANIM_COMMAND", d.manim_command),
            ffmpeg_path: r.string("FFMPEG_PATH", d.ffmpeg_path),
            ffprobe_path: r.string("FFPROBE_PATH", d.ffprobe_path),
            render_timeout_secs: r.parsed("RENDER_TIMEOUT_SECS", d.render_timeout_secs)?,
            max_render_workers: r.parsed("MAX_RENDER_WORKERS", d.max_render_workers)?,
            min_beat_duration: r.parsed("MIN_BEAT_DURATION", d.min_beat_duration)?,
            max_beats_per_chapter: r.parsed("MAX_BEATS_PER_CHAPTER", d.max_beats_per_chapter)?,
            max_chapter_output_tokens: r
                .parsed("MAX_CHAPTER_OUTPUT_TOKENS", d.max_chapter_output_tokens)?,
            outline_output_tokens: r.parsed("OUTLINE_OUTPUT_TOKENS", d.outline_output_tokens)?,
            r2_account_id: r.string("R2_ACCOUNT_ID", d.r2_account_id),
            r2_access_key_id: r.string("R2_ACCESS_KEY_ID", d.r2_access_key_id),
            r2_secret_access_key: r.string("R2_SECRET_ACCESS_KEY", d.r2_secret_access_key),
            r2_bucket_name: r.string("R2_BUCKET_NAME", d.r2_bucket_name),
            r2_public_url: r.string("R2_PUBLIC_URL", d.r2_public_url),
            api_host: r.string("API_HOST", d.api_host),
            port,
        };

        debug!(
            provider = %settings.llm_provider,
            model = %settings.llm_model,
            output_dir = %settings.output_dir.display(),
            "settings loaded"
        );
        Ok(settings)
    }

    /// Returns `true` when every R2 credential is present.
    pub fn r2_enabled(&self) -> bool {
        [
            &self.r2_account_id,
            &self.r2_access_key_id,
            &self.r2_secret_access_key,
            &self.r2_bucket_name,
            &self.r2_public_url,
        ]
        .iter()
        .all(|v| !v.is_empty())
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.output_dir.join("raw")
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.output_dir.join("audio")
    }

    pub fn final_dir(&self) -> PathBuf {
        self.output_dir.join("final")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.output_dir.join("cache")
    }

    pub fn audio_cache_dir(&self) -> PathBuf {
        self.cache_dir().join("audio")
    }

    pub fn video_cache_dir(&self) -> PathBuf {
        self.cache_dir().join("video")
    }

    /// Creates every output directory if missing.
    pub fn ensure_dirs(&self) -> Result<(), ConfigError> {
        for dir in [
            self.raw_dir(),
            self.audio_dir(),
            self.final_dir(),
            self.audio_cache_dir(),
            self.video_cache_dir(),
        ] {
            fs::create_dir_all(&dir).map_err(|e| ConfigError::io(&dir, e))?;
        }
        Ok(())
    }

    /// `host:port` the server binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.api_host, self.port)
    }
}
