use std::sync::atomic::{AtomicUsize, Ordering};

use time::OffsetDateTime;
use tracing::{error, info};

use crate::cancel::CancelToken;
use crate::error::ClientError;
use crate::notify::Notice;
use crate::services::storage::{content_type_for, file_extension, Bucket, UploadOptions};
use crate::state::ClientState;

/// A picked file, already read into memory.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl FileUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
            content_type: None,
        }
    }
}

pub struct FileUploader {
    state: ClientState,
    in_flight: AtomicUsize,
}

struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn start(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn default_object_path(user_id: uuid::Uuid, file_name: &str) -> String {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    match file_extension(file_name) {
        Some(ext) => format!("{user_id}/{millis}.{ext}"),
        None => format!("{user_id}/{millis}"),
    }
}

impl FileUploader {
    pub fn new(state: ClientState) -> Self {
        Self {
            state,
            in_flight: AtomicUsize::new(0),
        }
    }

    pub fn is_uploading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Uploads `file` and returns its public URL. Without `path` the object
    /// lands at `<user id>/<unix millis>.<extension>`.
    pub async fn upload_file(
        &self,
        file: FileUpload,
        bucket: Bucket,
        path: Option<String>,
        cancel: &CancelToken,
    ) -> Result<String, ClientError> {
        let Some(user_id) = self.state.session.user_id() else {
            self.state.notifier.notify(Notice::error(
                "Authentication required",
                "Please log in to upload files.",
            ));
            return Err(ClientError::AuthenticationRequired);
        };

        let _in_flight = InFlight::start(&self.in_flight);
        let object_path = path.unwrap_or_else(|| default_object_path(user_id, &file.file_name));
        let content_type = file
            .content_type
            .clone()
            .unwrap_or_else(|| content_type_for(&file.file_name).to_string());
        let size = file.bytes.len();
        let options = UploadOptions::default();

        let upload = self.state.storage.upload(
            bucket,
            &object_path,
            file.bytes,
            &content_type,
            &options,
        );
        match cancel.run(upload).await {
            Ok(stored_path) => {
                let url = self.state.storage.public_url(bucket, &stored_path);
                info!(%bucket, path = %stored_path, size, "file uploaded");
                Ok(url)
            }
            Err(err) => {
                if !err.is_cancelled() {
                    error!(?err, %bucket, path = %object_path, "upload failed");
                    self.state
                        .notifier
                        .notify(Notice::error("Upload failed", err.to_string()));
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::mock_db::{MockBackend, MOCK_BASE_URL};
    use crate::state::test_support::{signed_in_client, test_client};

    #[tokio::test]
    async fn anonymous_upload_is_rejected_before_network() {
        let client = test_client(MockBackend::default());
        let uploader = FileUploader::new(client.state.clone());

        let err = uploader
            .upload_file(
                FileUpload::new("pothole.jpg", vec![0xff, 0xd8]),
                Bucket::IssuePhotos,
                None,
                &CancelToken::never(),
            )
            .await
            .expect_err("anonymous");

        assert!(matches!(err, ClientError::AuthenticationRequired));
        assert_eq!(client.backend.calls(), 0);
        assert_eq!(client.notifier.titles(), vec!["Authentication required"]);
    }

    #[tokio::test]
    async fn default_path_is_scoped_to_user() {
        let (client, user_id) = signed_in_client(MockBackend::default()).await;
        let uploader = FileUploader::new(client.state.clone());

        let url = uploader
            .upload_file(
                FileUpload::new("pothole.JPG", vec![1, 2, 3]),
                Bucket::IssuePhotos,
                None,
                &CancelToken::never(),
            )
            .await
            .expect("upload");

        let prefix = format!("{MOCK_BASE_URL}/storage/v1/object/public/issue-photos/{user_id}/");
        assert!(url.starts_with(&prefix), "unexpected url {url}");
        assert!(url.ends_with(".JPG"));

        let objects = client.backend.objects.lock().unwrap().clone();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].content_type, "image/jpeg");
        assert!(!uploader.is_uploading());
    }

    #[tokio::test]
    async fn failed_upload_notifies_and_returns_error() {
        let (client, _) = signed_in_client(MockBackend::default()).await;
        client.backend.set_failing(true);
        let uploader = FileUploader::new(client.state.clone());

        let err = uploader
            .upload_file(
                FileUpload::new("note.m4a", vec![9]),
                Bucket::VoiceNotes,
                Some("fixed/path.m4a".into()),
                &CancelToken::never(),
            )
            .await
            .expect_err("fails");

        assert!(matches!(err, ClientError::Backend(_)));
        assert_eq!(client.notifier.titles(), vec!["Upload failed"]);
        assert!(!uploader.is_uploading());
    }
}
