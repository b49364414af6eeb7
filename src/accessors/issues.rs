use dashmap::DashMap;
use time::OffsetDateTime;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::cache::{QueryFamily, QueryKey};
use crate::cancel::CancelToken;
use crate::error::{ClientError, ValidationError};
use crate::models::issue::{CreateIssueData, Issue, Tracked};
use crate::notify::Notice;
use crate::state::ClientState;

#[derive(Debug, Clone)]
struct PendingReport {
    issue: Issue,
    started_at: OffsetDateTime,
}

/// Reads and writes issue rows through the query cache.
pub struct IssueAccessor {
    state: ClientState,
    pending_reports: DashMap<Uuid, PendingReport>,
    pending_upvotes: DashMap<Uuid, usize>,
}

/// Removes a pending report when the create call finishes or is dropped.
struct ReportGuard<'a> {
    map: &'a DashMap<Uuid, PendingReport>,
    local_id: Uuid,
}

impl Drop for ReportGuard<'_> {
    fn drop(&mut self) {
        self.map.remove(&self.local_id);
    }
}

struct UpvoteGuard<'a> {
    map: &'a DashMap<Uuid, usize>,
    issue_id: Uuid,
}

impl<'a> UpvoteGuard<'a> {
    fn new(map: &'a DashMap<Uuid, usize>, issue_id: Uuid) -> Self {
        *map.entry(issue_id).or_insert(0) += 1;
        Self { map, issue_id }
    }
}

impl Drop for UpvoteGuard<'_> {
    fn drop(&mut self) {
        if let Some(mut count) = self.map.get_mut(&self.issue_id) {
            *count = count.saturating_sub(1);
        }
        self.map.remove_if(&self.issue_id, |_, count| *count == 0);
    }
}

impl IssueAccessor {
    pub fn new(state: ClientState) -> Self {
        Self {
            state,
            pending_reports: DashMap::new(),
            pending_upvotes: DashMap::new(),
        }
    }

    fn report_load_failure(&self, err: &ClientError) {
        if !err.is_cancelled() {
            self.state
                .notifier
                .notify(Notice::error("Failed to load issues", err.to_string()));
        }
    }

    async fn fetch(&self, key: QueryKey, cancel: &CancelToken) -> Result<Vec<Issue>, ClientError> {
        if let Some(cached) = self.state.cache.get::<Vec<Issue>>(&key) {
            return Ok(cached);
        }

        let owner = match key {
            QueryKey::MyIssues(owner) => Some(owner),
            _ => None,
        };
        let ticket = self.state.cache.begin(key);
        let result = cancel.run(self.state.issues.list_issues(owner)).await;
        match result {
            Ok(issues) => {
                self.state.cache.store(ticket, issues.clone());
                Ok(issues)
            }
            Err(err) => {
                warn!(?err, ?key, "failed to fetch issues");
                self.report_load_failure(&err);
                Err(err)
            }
        }
    }

    /// Every issue, newest first.
    pub async fn list_issues(&self, cancel: &CancelToken) -> Result<Vec<Issue>, ClientError> {
        self.fetch(QueryKey::Issues, cancel).await
    }

    /// The signed-in user's issues, newest first. Empty when nobody is
    /// signed in.
    pub async fn list_my_issues(&self, cancel: &CancelToken) -> Result<Vec<Issue>, ClientError> {
        match self.state.session.user_id() {
            Some(user_id) => self.fetch(QueryKey::MyIssues(user_id), cancel).await,
            None => Ok(Vec::new()),
        }
    }

    pub async fn create_issue(
        &self,
        data: CreateIssueData,
        cancel: &CancelToken,
    ) -> Result<Issue, ClientError> {
        let Some(user_id) = self.state.session.user_id() else {
            self.state.notifier.notify(Notice::error(
                "Failed to report issue",
                "Must be logged in to create issues",
            ));
            return Err(ClientError::AuthenticationRequired);
        };
        if data.title.trim().is_empty() {
            return Err(ValidationError::MissingFields(vec!["title"]).into());
        }

        let local_id = Uuid::new_v4();
        self.pending_reports.insert(
            local_id,
            PendingReport {
                issue: Issue::provisional(local_id, user_id, &data),
                started_at: OffsetDateTime::now_utc(),
            },
        );
        let _guard = ReportGuard {
            map: &self.pending_reports,
            local_id,
        };

        let result = cancel
            .run(self.state.issues.insert_issue(user_id, &data))
            .await;
        match result {
            Ok(issue) => {
                self.state.cache.invalidate(QueryFamily::Issues);
                self.state.cache.invalidate(QueryFamily::MyIssues);
                // Server-side scoring may have changed.
                self.state.cache.invalidate(QueryFamily::Profile);
                info!(issue_id = %issue.id, %user_id, category = issue.category.as_str(), "issue reported");
                self.state.notifier.notify(Notice::info(
                    "Issue reported successfully!",
                    "Your civic issue has been submitted and will be reviewed soon.",
                ));
                Ok(issue)
            }
            Err(err) => {
                if !err.is_cancelled() {
                    error!(?err, %user_id, "failed to create issue");
                    self.state
                        .notifier
                        .notify(Notice::error("Failed to report issue", err.to_string()));
                }
                Err(err)
            }
        }
    }

    /// Asks the backend to increment the count atomically. The count is never
    /// computed locally.
    pub async fn upvote_issue(
        &self,
        issue_id: Uuid,
        cancel: &CancelToken,
    ) -> Result<Option<u64>, ClientError> {
        let _guard = UpvoteGuard::new(&self.pending_upvotes, issue_id);

        let result = cancel
            .run(self.state.issues.increment_upvotes(issue_id))
            .await;
        match result {
            Ok(count) => {
                self.state.cache.invalidate(QueryFamily::Issues);
                self.state.cache.invalidate(QueryFamily::MyIssues);
                info!(%issue_id, upvotes = ?count, "issue upvoted");
                Ok(count)
            }
            Err(err) => {
                if !err.is_cancelled() {
                    warn!(?err, %issue_id, "upvote failed");
                    self.state
                        .notifier
                        .notify(Notice::error("Upvote failed", err.to_string()));
                }
                Err(err)
            }
        }
    }

    /// Cached issues plus reports still being submitted. Issues with an
    /// upvote in flight are tagged pending.
    pub fn tracked_issues(&self) -> Vec<Tracked<Issue>> {
        let mut pending: Vec<PendingReport> = self
            .pending_reports
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        pending.sort_by(|a, b| b.started_at.cmp(&a.started_at));

        let committed = self
            .state
            .cache
            .get::<Vec<Issue>>(&QueryKey::Issues)
            .unwrap_or_default();

        pending
            .into_iter()
            .map(|report| Tracked::pending(report.issue))
            .chain(committed.into_iter().map(|issue| {
                if self.pending_upvotes.contains_key(&issue.id) {
                    Tracked::pending(issue)
                } else {
                    Tracked::committed(issue)
                }
            }))
            .collect()
    }

    pub fn has_pending_writes(&self) -> bool {
        !self.pending_reports.is_empty() || !self.pending_upvotes.is_empty()
    }
}
