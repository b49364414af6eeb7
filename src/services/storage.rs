use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Bucket {
    IssuePhotos,
    IssueVideos,
    VoiceNotes,
    Avatars,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::IssuePhotos => "issue-photos",
            Bucket::IssueVideos => "issue-videos",
            Bucket::VoiceNotes => "voice-notes",
            Bucket::Avatars => "avatars",
        }
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    pub cache_control_secs: u32,
    pub upsert: bool,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            cache_control_secs: 3600,
            upsert: false,
        }
    }
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Stores `bytes` at `path` inside `bucket` and returns the stored path.
    async fn upload(
        &self,
        bucket: Bucket,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        options: &UploadOptions,
    ) -> Result<String, BackendError>;

    fn public_url(&self, bucket: Bucket, path: &str) -> String;
}

pub fn file_extension(file_name: &str) -> Option<&str> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext)
}

pub fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_extension(file_name)
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "ogg" => "audio/ogg",
        "wav" => "audio/wav",
        _ => "application/octet-stream",
    }
}

/// Encodes each path segment while keeping the `/` separators.
pub fn encode_object_path(path: &str) -> String {
    path.trim_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
