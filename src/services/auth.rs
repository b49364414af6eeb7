use async_trait::async_trait;

use crate::error::BackendError;
use crate::models::user::{Session, SignUpOutcome, SignUpRequest};

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn sign_up(&self, request: SignUpRequest) -> Result<SignUpOutcome, BackendError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, BackendError>;

    /// Ends the session. Local credentials are dropped even if the remote
    /// call fails.
    async fn sign_out(&self) -> Result<(), BackendError>;

    async fn current_session(&self) -> Result<Option<Session>, BackendError>;
}
