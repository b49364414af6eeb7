use reqwest::StatusCode;
use thiserror::Error;

use crate::geolocation::GeoError;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend responded with status {status}: {message}")]
    Api {
        status: StatusCode,
        message: String,
        code: Option<String>,
    },
    #[error("backend returned an invalid response: {0}")]
    InvalidResponse(String),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl BackendError {
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            BackendError::Api { status, .. }
                if *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN
        )
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            BackendError::Api { status, .. } => Some(*status),
            BackendError::Http(err) => err.status(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("authentication required")]
    AuthenticationRequired,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("location unavailable: {0}")]
    Geolocation(#[from] GeoError),
    #[error("request cancelled")]
    Cancelled,
}

impl ClientError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClientError::Cancelled)
    }
}
