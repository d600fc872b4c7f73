//! Hash-keyed cache of synthesized narration.
//!
//! Each entry is a `<sha256>.wav` file plus a record in `manifest.json`.
//! The key covers text, voice and language, so changing any of them misses.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use mathviz_core::EngineError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{AudioClip, DEFAULT_SAMPLE_RATE};

const MANIFEST_FILE: &str = "manifest.json";
const PREVIEW_CHARS: usize = 100;

fn default_sample_rate() -> u32 {
    DEFAULT_SAMPLE_RATE
}

/// Manifest record for one cached clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub filename: String,
    #[serde(default)]
    pub duration: f64,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default)]
    pub text_preview: String,
    #[serde(default)]
    pub voice: String,
    #[serde(default)]
    pub language: String,
}

type Manifest = BTreeMap<String, CacheEntry>;

/// On-disk narration cache shared by concurrent beat tasks.
pub struct AudioCache {
    dir: PathBuf,
    manifest_path: PathBuf,
    manifest: Mutex<Manifest>,
}

impl AudioCache {
    /// Opens (creating if needed) the cache in `dir`.
    ///
    /// An unreadable manifest starts the cache empty rather than failing.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, EngineError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| EngineError::io(&dir, e))?;

        let manifest_path = dir.join(MANIFEST_FILE);
        let manifest = match tokio::fs::read(&manifest_path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!("Ignoring unreadable audio cache manifest {}: {}", manifest_path.display(), e);
                Manifest::new()
            }),
            Err(_) => Manifest::new(),
        };

        debug!("AudioCache: {} entries in {}", manifest.len(), dir.display());
        Ok(Self {
            dir,
            manifest_path,
            manifest: Mutex::new(manifest),
        })
    }

    /// Cache key: hex sha256 of `text|voice|language`.
    pub fn key(text: &str, voice: &str, language: &str) -> String {
        let digest = Sha256::digest(format!("{}|{}|{}", text, voice, language).as_bytes());
        format!("{:x}", digest)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn save(&self, manifest: &Manifest) -> Result<(), EngineError> {
        let json = serde_json::to_vec_pretty(manifest)?;
        tokio::fs::write(&self.manifest_path, json)
            .await
            .map_err(|e| EngineError::io(&self.manifest_path, e))
    }

    /// Cached clip for the key, or None. Entries whose file vanished are dropped.
    pub async fn get(&self, text: &str, voice: &str, language: &str) -> Option<AudioClip> {
        let key = Self::key(text, voice, language);
        let mut manifest = self.manifest.lock().await;
        let entry = manifest.get(&key)?.clone();
        let path = self.dir.join(&entry.filename);

        match tokio::fs::read(&path).await {
            Ok(audio_bytes) => Some(AudioClip {
                audio_bytes,
                duration: entry.duration,
                sample_rate: entry.sample_rate,
                text: text.to_string(),
            }),
            Err(_) => {
                debug!("Dropping stale audio cache entry {}", key);
                manifest.remove(&key);
                if let Err(e) = self.save(&manifest).await {
                    warn!("Failed to save audio cache manifest: {}", e);
                }
                None
            }
        }
    }

    /// Stores a clip and returns the path of its WAV file.
    pub async fn put(
        &self,
        text: &str,
        voice: &str,
        language: &str,
        clip: &AudioClip,
    ) -> Result<PathBuf, EngineError> {
        let key = Self::key(text, voice, language);
        let filename = format!("{}.wav", key);
        let path = self.dir.join(&filename);

        tokio::fs::write(&path, &clip.audio_bytes)
            .await
            .map_err(|e| EngineError::io(&path, e))?;

        let mut manifest = self.manifest.lock().await;
        manifest.insert(
            key,
            CacheEntry {
                filename,
                duration: clip.duration,
                sample_rate: clip.sample_rate,
                text_preview: text.chars().take(PREVIEW_CHARS).collect(),
                voice: voice.to_string(),
                language: language.to_string(),
            },
        );
        self.save(&manifest).await?;
        Ok(path)
    }

    /// True when the key has a manifest record and its file exists.
    pub async fn has(&self, text: &str, voice: &str, language: &str) -> bool {
        let key = Self::key(text, voice, language);
        let manifest = self.manifest.lock().await;
        match manifest.get(&key) {
            Some(entry) => tokio::fs::try_exists(self.dir.join(&entry.filename))
                .await
                .unwrap_or(false),
            None => false,
        }
    }

    /// Removes one entry and its file.
    pub async fn invalidate(&self, text: &str, voice: &str, language: &str) -> Result<(), EngineError> {
        let key = Self::key(text, voice, language);
        let mut manifest = self.manifest.lock().await;
        if let Some(entry) = manifest.remove(&key) {
            let _ = tokio::fs::remove_file(self.dir.join(&entry.filename)).await;
            self.save(&manifest).await?;
        }
        Ok(())
    }

    /// Removes every entry and file.
    pub async fn clear(&self) -> Result<(), EngineError> {
        let mut manifest = self.manifest.lock().await;
        for entry in manifest.values() {
            let _ = tokio::fs::remove_file(self.dir.join(&entry.filename)).await;
        }
        manifest.clear();
        self.save(&manifest).await
    }

    pub async fn len(&self) -> usize {
        self.manifest.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(text: &str) -> AudioClip {
        AudioClip {
            audio_bytes: vec![1, 2, 3, 4],
            duration: 1.25,
            sample_rate: 22050,
            text: text.to_string(),
        }
    }

    #[test]
    fn key_depends_on_every_part() {
        let base = AudioCache::key("hello", "shubh", "en");
        assert_eq!(base.len(), 64);
        assert_eq!(base, AudioCache::key("hello", "shubh", "en"));
        assert_ne!(base, AudioCache::key("hello", "shubh", "hi"));
        assert_ne!(base, AudioCache::key("hello", "meera", "en"));
        assert_ne!(base, AudioCache::key("hello!", "shubh", "en"));
    }

    #[tokio::test]
    async fn put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AudioCache::open(dir.path()).await.unwrap();
        assert!(cache.get("hello", "shubh", "en").await.is_none());

        let path = cache.put("hello", "shubh", "en", &clip("hello")).await.unwrap();
        assert!(path.ends_with(format!("{}.wav", AudioCache::key("hello", "shubh", "en"))));

        let hit = cache.get("hello", "shubh", "en").await.unwrap();
        assert_eq!(hit.audio_bytes, vec![1, 2, 3, 4]);
        assert_eq!(hit.duration, 1.25);
        assert!(cache.has("hello", "shubh", "en").await);
        assert!(cache.get("hello", "shubh", "hi").await.is_none());
    }

    #[tokio::test]
    async fn manifest_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let cache = AudioCache::open(dir.path()).await.unwrap();
            cache.put("persist", "shubh", "en", &clip("persist")).await.unwrap();
        }

        let reopened = AudioCache::open(dir.path()).await.unwrap();
        assert_eq!(reopened.len().await, 1);
        assert!(reopened.get("persist", "shubh", "en").await.is_some());

        let raw = std::fs::read_to_string(dir.path().join("manifest.json")).unwrap();
        let manifest: Manifest = serde_json::from_str(&raw).unwrap();
        let entry = manifest.values().next().unwrap();
        assert_eq!(entry.text_preview, "persist");
        assert_eq!(entry.voice, "shubh");
    }

    #[tokio::test]
    async fn missing_file_drops_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AudioCache::open(dir.path()).await.unwrap();
        let path = cache.put("gone", "shubh", "en", &clip("gone")).await.unwrap();
        std::fs::remove_file(path).unwrap();

        assert!(!cache.has("gone", "shubh", "en").await);
        assert!(cache.get("gone", "shubh", "en").await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn invalidate_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AudioCache::open(dir.path()).await.unwrap();
        cache.put("a", "v", "en", &clip("a")).await.unwrap();
        cache.put("b", "v", "en", &clip("b")).await.unwrap();

        cache.invalidate("a", "v", "en").await.unwrap();
        assert_eq!(cache.len().await, 1);
        assert!(!cache.has("a", "v", "en").await);

        cache.clear().await.unwrap();
        assert!(cache.is_empty().await);
        assert!(!dir.path().join(format!("{}.wav", AudioCache::key("b", "v", "en"))).exists());
    }

    #[tokio::test]
    async fn corrupt_manifest_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("manifest.json"), "{not json").unwrap();
        let cache = AudioCache::open(dir.path()).await.unwrap();
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn long_text_preview_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AudioCache::open(dir.path()).await.unwrap();
        let text = "é".repeat(150);
        cache.put(&text, "v", "en", &clip(&text)).await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join("manifest.json")).unwrap();
        let manifest: Manifest = serde_json::from_str(&raw).unwrap();
        assert_eq!(manifest.values().next().unwrap().text_preview.chars().count(), 100);
    }
}
