use async_trait::async_trait;
use uuid::Uuid;

use crate::error::BackendError;
use crate::models::profile::Profile;

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_profile(&self, user_id: Uuid) -> Result<Option<Profile>, BackendError>;
}
