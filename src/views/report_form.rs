use tracing::warn;

use super::{FormPhase, Route};
use crate::accessors::{FileUpload, FileUploader, IssueAccessor};
use crate::cancel::CancelToken;
use crate::error::{ClientError, ValidationError};
use crate::geolocation::{resolve_location, GeoProvider, LocationInput};
use crate::models::issue::{CreateIssueData, Issue, IssueCategory};
use crate::notify::{Notice, Notifier};
use crate::services::storage::Bucket;

/// The "Report an Issue" screen.
#[derive(Debug, Clone, Default)]
pub struct ReportForm {
    pub title: String,
    pub description: String,
    pub category: Option<IssueCategory>,
    pub location: LocationInput,
    pub photo: Option<FileUpload>,
    phase: FormPhase,
}

impl ReportForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &FormPhase {
        &self.phase
    }

    pub fn set_location_text(&mut self, text: &str) {
        let coordinates = self.location.coordinates;
        self.location = LocationInput::manual(text);
        self.location.coordinates = coordinates;
    }

    /// "Use Current Location": keeps whatever text was typed as a fallback.
    pub async fn use_current_location(
        &mut self,
        provider: Option<&dyn GeoProvider>,
        notifier: &dyn Notifier,
    ) {
        let typed = self.location.address.clone().unwrap_or_default();
        let resolved = resolve_location(provider, &typed, notifier).await;
        if resolved.coordinates.is_some() || self.location.coordinates.is_none() {
            self.location = resolved;
        }
    }

    /// Checks required fields without touching the network.
    pub fn validate(&self) -> Result<CreateIssueData, ValidationError> {
        let mut missing = Vec::new();
        let title = self.title.trim();
        if title.is_empty() {
            missing.push("title");
        }
        if self.category.is_none() {
            missing.push("category");
        }
        if self.location.is_empty() {
            missing.push("location");
        }
        let Some(category) = self.category.filter(|_| missing.is_empty()) else {
            return Err(ValidationError::MissingFields(missing));
        };

        let mut data = CreateIssueData::new(title, category);
        let description = self.description.trim();
        if !description.is_empty() {
            data.description = Some(description.to_string());
        }
        if let Some(coords) = self.location.coordinates {
            data.location_lat = Some(coords.latitude);
            data.location_lng = Some(coords.longitude);
        }
        data.location_address = self.location.address.clone();
        Ok(data)
    }

    fn fail(&mut self, message: String) {
        self.phase = FormPhase::Idle {
            error: Some(message),
        };
    }

    /// Idle -> Submitting -> (reset, navigate home) | (idle with error).
    /// A photo that fails to upload is dropped and the report still goes out.
    pub async fn submit(
        &mut self,
        issues: &IssueAccessor,
        uploader: &FileUploader,
        notifier: &dyn Notifier,
        cancel: &CancelToken,
    ) -> Result<(Issue, Route), ClientError> {
        let mut data = match self.validate() {
            Ok(data) => data,
            Err(err) => {
                notifier.notify(Notice::error(
                    "Missing Information",
                    "Please fill in all required fields",
                ));
                self.fail(err.to_string());
                return Err(err.into());
            }
        };

        self.phase = FormPhase::Submitting;

        if let Some(photo) = self.photo.clone() {
            match uploader
                .upload_file(photo, Bucket::IssuePhotos, None, cancel)
                .await
            {
                Ok(url) => data.photo_url = Some(url),
                Err(ClientError::Cancelled) => {
                    self.phase = FormPhase::default();
                    return Err(ClientError::Cancelled);
                }
                Err(err) => warn!(?err, "submitting report without its photo"),
            }
        }

        match issues.create_issue(data, cancel).await {
            Ok(issue) => {
                *self = ReportForm::default();
                Ok((issue, Route::Home))
            }
            Err(ClientError::Cancelled) => {
                self.phase = FormPhase::default();
                Err(ClientError::Cancelled)
            }
            Err(err) => {
                self.fail(err.to_string());
                Err(err)
            }
        }
    }
}
