use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::models::issue::Coordinates;
use crate::notify::{Notice, Notifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeoError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("position unavailable")]
    Unavailable,
    #[error("location request timed out")]
    Timeout,
    #[error("geolocation is not supported on this device")]
    Unsupported,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GeoProvider: Send + Sync {
    async fn current_position(&self) -> Result<Coordinates, GeoError>;
}

/// Location entered on the report form: device coordinates, a typed
/// address or landmark, or both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationInput {
    pub coordinates: Option<Coordinates>,
    pub address: Option<String>,
}

impl LocationInput {
    pub fn manual(address: impl Into<String>) -> Self {
        let address: String = address.into();
        Self {
            coordinates: None,
            address: Some(address.trim().to_string()).filter(|a| !a.is_empty()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_none() && self.address.is_none()
    }
}

/// Tries the device position and falls back to whatever the user typed.
/// A failed lookup only produces a notice.
pub async fn resolve_location(
    provider: Option<&dyn GeoProvider>,
    manual: &str,
    notifier: &dyn Notifier,
) -> LocationInput {
    let mut input = LocationInput::manual(manual);

    let Some(provider) = provider else {
        notifier.notify(Notice::error(
            "Location unavailable",
            GeoError::Unsupported.to_string(),
        ));
        return input;
    };

    match provider.current_position().await {
        Ok(coords) => input.coordinates = Some(coords),
        Err(err) => {
            warn!(?err, "falling back to manual location entry");
            notifier.notify(Notice::error(
                "Location unavailable",
                format!("{err}. Please enter the location manually."),
            ));
        }
    }
    input
}
