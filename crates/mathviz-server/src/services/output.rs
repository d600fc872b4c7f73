//! Resolving download names to files in the final directory.

use std::path::{Path, PathBuf};

/// The file a download request refers to, or None when it must 404.
///
/// Only the last path component of `filename` is used and it must be an
/// existing `.mp4` directly inside `final_dir`.
pub async fn resolve(final_dir: &Path, filename: &str) -> Option<(PathBuf, String)> {
    let name = Path::new(filename).file_name()?.to_str()?.to_string();
    if !name.ends_with(".mp4") {
        return None;
    }
    let path = final_dir.join(&name);
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => Some((path, name)),
        _ => None,
    }
}
