//! Cloudflare R2 uploads for finished videos and generated plans.
//!
//! R2 speaks the S3 API, so this is a thin wrapper over `aws-sdk-s3` pointed
//! at `https://<account>.r2.cloudflarestorage.com` with region `auto`.

use std::path::Path;

use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use mathviz_config::Settings;
use mathviz_core::EngineError;
use tracing::info;

const VIDEO_PREFIX: &str = "videos";

/// Object key for an uploaded video file.
pub fn video_key(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{}/{}", VIDEO_PREFIX, name)
}

/// Object key for a job's saved plan.
pub fn plan_key(job_id: &str) -> String {
    format!("plans/{}.json", job_id)
}

/// Endpoint URL for an R2 account.
pub fn endpoint_for(account_id: &str) -> String {
    format!("https://{}.r2.cloudflarestorage.com", account_id)
}

fn storage_err(e: impl std::fmt::Display) -> EngineError {
    EngineError::Storage(e.to_string())
}

/// Uploads objects to one R2 bucket.
#[derive(Debug, Clone)]
pub struct R2Storage {
    client: S3Client,
    bucket: String,
    public_url: String,
}

impl R2Storage {
    pub async fn new(
        account_id: &str,
        access_key_id: &str,
        secret_access_key: &str,
        bucket: &str,
        public_url: &str,
    ) -> Self {
        let credentials = Credentials::new(access_key_id, secret_access_key, None, None, "mathviz-r2");
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new("auto"))
            .endpoint_url(endpoint_for(account_id))
            .credentials_provider(credentials)
            .load()
            .await;
        let config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(true)
            .build();

        Self {
            client: S3Client::from_conf(config),
            bucket: bucket.to_string(),
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    /// Storage for the configured bucket, or None when any R2 setting is missing.
    pub async fn from_settings(settings: &Settings) -> Option<Self> {
        if !settings.r2_enabled() {
            return None;
        }
        Some(
            Self::new(
                &settings.r2_account_id,
                &settings.r2_access_key_id,
                &settings.r2_secret_access_key,
                &settings.r2_bucket_name,
                &settings.r2_public_url,
            )
            .await,
        )
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Public URL an object is served from.
    pub fn public_url_for(&self, key: &str) -> String {
        format!("{}/{}", self.public_url, key)
    }

    async fn put(&self, key: &str, body: ByteStream, content_type: &str) -> Result<String, EngineError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| storage_err(format!("Failed to upload '{}': {}", key, e)))?;

        let url = self.public_url_for(key);
        info!("Uploaded {} -> {}", key, url);
        Ok(url)
    }

    /// Uploads an MP4 under `videos/<file name>` and returns its public URL.
    pub async fn upload_video(&self, path: &Path) -> Result<String, EngineError> {
        let body = ByteStream::from_path(path).await.map_err(storage_err)?;
        self.put(&video_key(path), body, "video/mp4").await
    }

    /// Uploads pretty-printed JSON under `key` and returns its public URL.
    pub async fn upload_json(&self, value: &serde_json::Value, key: &str) -> Result<String, EngineError> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.put(key, ByteStream::from(bytes), "application/json").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn storage(public_url: &str) -> R2Storage {
        R2Storage::new("acct123", "key", "secret", "mathviz", public_url).await
    }

    #[test]
    fn keys_and_endpoint() {
        assert_eq!(video_key(Path::new("/data/final/abc123.mp4")), "videos/abc123.mp4");
        assert_eq!(plan_key("abc123"), "plans/abc123.json");
        assert_eq!(endpoint_for("acct123"), "https://acct123.r2.cloudflarestorage.com");
    }

    #[tokio::test]
    async fn public_url_drops_trailing_slash() {
        let r2 = storage("https://cdn.example.com/").await;
        assert_eq!(r2.public_url_for("videos/a.mp4"), "https://cdn.example.com/videos/a.mp4");
        assert_eq!(r2.bucket(), "mathviz");
    }

    #[tokio::test]
    async fn disabled_without_full_settings() {
        let settings = Settings::default();
        assert!(R2Storage::from_settings(&settings).await.is_none());
    }
}
