use async_trait::async_trait;
use uuid::Uuid;

use crate::error::BackendError;
use crate::models::issue::{CreateIssueData, Issue};

#[async_trait]
pub trait IssueRepository: Send + Sync {
    /// Issues ordered newest first, optionally restricted to one owner.
    async fn list_issues(&self, owner: Option<Uuid>) -> Result<Vec<Issue>, BackendError>;

    async fn insert_issue(
        &self,
        user_id: Uuid,
        data: &CreateIssueData,
    ) -> Result<Issue, BackendError>;

    /// Atomic server-side increment. Returns the new count when the
    /// procedure reports one.
    async fn increment_upvotes(&self, issue_id: Uuid) -> Result<Option<u64>, BackendError>;
}
