use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use tracing::debug;

use super::{build_url, send_json, SupabaseClient, STORAGE_PATH};
use crate::error::BackendError;
use crate::services::storage::{encode_object_path, Bucket, ObjectStorage, UploadOptions};

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(rename = "Key")]
    key: Option<String>,
}

#[async_trait]
impl ObjectStorage for SupabaseClient {
    async fn upload(
        &self,
        bucket: Bucket,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        options: &UploadOptions,
    ) -> Result<String, BackendError> {
        let object_path = path.trim_matches('/');
        let url_path = format!(
            "{STORAGE_PATH}/object/{}/{}",
            bucket.as_str(),
            encode_object_path(object_path)
        );
        let size = bytes.len();
        let request = self
            .build_request(Method::POST, &url_path)
            .header(
                reqwest::header::CACHE_CONTROL,
                format!("max-age={}", options.cache_control_secs),
            )
            .header("x-upsert", options.upsert.to_string())
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes);

        let response: UploadResponse = send_json(request).await?;
        debug!(%bucket, path = object_path, size, key = ?response.key, "uploaded object");
        Ok(object_path.to_string())
    }

    fn public_url(&self, bucket: Bucket, path: &str) -> String {
        build_url(
            &self.base_url,
            &format!(
                "{STORAGE_PATH}/object/public/{}/{}",
                bucket.as_str(),
                encode_object_path(path)
            ),
        )
    }
}
