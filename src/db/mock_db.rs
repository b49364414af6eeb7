//! In-memory backend used by tests and offline demos. Implements every
//! collaborator seam over mutex-guarded collections.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use time::OffsetDateTime;
use uuid::Uuid;

use super::issue_repository::IssueRepository;
use super::profile_repository::ProfileRepository;
use crate::error::BackendError;
use crate::models::issue::{CreateIssueData, Issue, IssuePriority, IssueStatus};
use crate::models::profile::{Profile, REPORT_REWARD_POINTS};
use crate::models::user::{Session, SignUpOutcome, SignUpRequest, User};
use crate::services::auth::AuthService;
use crate::services::storage::{encode_object_path, Bucket, ObjectStorage, UploadOptions};

pub const MOCK_BASE_URL: &str = "https://mock.supabase.local";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bucket: Bucket,
    pub path: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Clone)]
struct Account {
    password: String,
    user: User,
}

#[derive(Debug, Default)]
pub struct MockBackend {
    pub issues: Mutex<Vec<Issue>>,
    pub profiles: Mutex<HashMap<Uuid, Profile>>,
    pub objects: Mutex<Vec<StoredObject>>,
    accounts: Mutex<HashMap<String, Account>>,
    session: Mutex<Option<Session>>,
    /// Every request fails with a 503 while set.
    pub should_fail: AtomicBool,
    /// Sign-up leaves the account unconfirmed and returns no session.
    pub require_email_confirmation: bool,
    /// Simulated round-trip time for every call.
    pub latency: Option<Duration>,
    calls: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockBackend {
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Default::default()
        }
    }

    /// Sign-up returns no session until the address is confirmed.
    pub fn requiring_email_confirmation() -> Self {
        Self {
            require_email_confirmation: true,
            ..Default::default()
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.should_fail.store(failing, Ordering::SeqCst);
    }

    /// Number of calls that reached the backend.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn issue(&self, id: Uuid) -> Option<Issue> {
        lock(&self.issues).iter().find(|i| i.id == id).cloned()
    }

    /// Registers a confirmed account without going through sign-up.
    pub fn register_user(&self, email: &str, password: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
            user_metadata: serde_json::json!({}),
        };
        lock(&self.accounts).insert(
            email.to_ascii_lowercase(),
            Account {
                password: password.to_string(),
                user: user.clone(),
            },
        );
        self.ensure_profile(&user, None);
        user
    }

    pub fn set_status(&self, issue_id: Uuid, status: IssueStatus) {
        if let Some(issue) = lock(&self.issues).iter_mut().find(|i| i.id == issue_id) {
            issue.status = status;
            issue.updated_at = OffsetDateTime::now_utc();
        }
    }

    fn ensure_profile(&self, user: &User, full_name: Option<String>) {
        let now = OffsetDateTime::now_utc();
        lock(&self.profiles).entry(user.id).or_insert_with(|| Profile {
            id: Uuid::new_v4(),
            user_id: user.id,
            full_name,
            phone: None,
            avatar_url: None,
            citizen_score: 0,
            total_reports: 0,
            resolved_reports: 0,
            created_at: now,
            updated_at: now,
        });
    }

    async fn round_trip(&self) -> Result<(), BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(BackendError::Api {
                status: StatusCode::SERVICE_UNAVAILABLE,
                message: "Mock backend failure".into(),
                code: None,
            });
        }
        Ok(())
    }

    fn unauthorized(message: &str) -> BackendError {
        BackendError::Api {
            status: StatusCode::UNAUTHORIZED,
            message: message.to_string(),
            code: None,
        }
    }

    fn issue_session(&self, user: &User) -> Session {
        let session = Session {
            access_token: format!("mock-token-{}", Uuid::new_v4()),
            refresh_token: Some(format!("mock-refresh-{}", Uuid::new_v4())),
            expires_in: Some(3600),
            token_type: Some("bearer".into()),
            user: user.clone(),
        };
        *lock(&self.session) = Some(session.clone());
        session
    }
}

#[async_trait]
impl IssueRepository for MockBackend {
    async fn list_issues(&self, owner: Option<Uuid>) -> Result<Vec<Issue>, BackendError> {
        self.round_trip().await?;
        let mut issues: Vec<Issue> = lock(&self.issues)
            .iter()
            .rev()
            .filter(|issue| owner.map_or(true, |owner| issue.user_id == owner))
            .cloned()
            .collect();
        issues.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(issues)
    }

    async fn insert_issue(
        &self,
        user_id: Uuid,
        data: &CreateIssueData,
    ) -> Result<Issue, BackendError> {
        self.round_trip().await?;
        let now = OffsetDateTime::now_utc();
        let issue = Issue {
            id: Uuid::new_v4(),
            user_id,
            title: data.title.clone(),
            description: data.description.clone(),
            category: data.category,
            status: IssueStatus::Reported,
            priority: IssuePriority::Medium,
            location_lat: data.location_lat,
            location_lng: data.location_lng,
            location_address: data.location_address.clone(),
            photo_url: data.photo_url.clone(),
            video_url: data.video_url.clone(),
            voice_note_url: data.voice_note_url.clone(),
            upvotes: 0,
            department_assigned: None,
            assigned_to: None,
            estimated_resolution_date: None,
            actual_resolution_date: None,
            created_at: now,
            updated_at: now,
        };
        lock(&self.issues).push(issue.clone());

        // Mirrors the scoring trigger that runs server-side on insert.
        if let Some(profile) = lock(&self.profiles).get_mut(&user_id) {
            profile.total_reports += 1;
            profile.citizen_score += REPORT_REWARD_POINTS;
            profile.updated_at = now;
        }
        Ok(issue)
    }

    async fn increment_upvotes(&self, issue_id: Uuid) -> Result<Option<u64>, BackendError> {
        self.round_trip().await?;
        // Read and write under one lock, like the server-side procedure.
        let mut issues = lock(&self.issues);
        let issue = issues
            .iter_mut()
            .find(|issue| issue.id == issue_id)
            .ok_or_else(|| BackendError::Api {
                status: StatusCode::NOT_FOUND,
                message: format!("issue {issue_id} not found"),
                code: None,
            })?;
        issue.upvotes += 1;
        Ok(Some(issue.upvotes))
    }
}

#[async_trait]
impl ProfileRepository for MockBackend {
    async fn find_profile(&self, user_id: Uuid) -> Result<Option<Profile>, BackendError> {
        self.round_trip().await?;
        Ok(lock(&self.profiles).get(&user_id).cloned())
    }
}

#[async_trait]
impl AuthService for MockBackend {
    async fn sign_up(&self, request: SignUpRequest) -> Result<SignUpOutcome, BackendError> {
        self.round_trip().await?;
        let key = request.email.trim().to_ascii_lowercase();
        if lock(&self.accounts).contains_key(&key) {
            return Err(BackendError::Api {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                message: "User already registered".into(),
                code: Some("user_already_exists".into()),
            });
        }

        let user = User {
            id: Uuid::new_v4(),
            email: Some(request.email.trim().to_string()),
            user_metadata: serde_json::to_value(&request.metadata)
                .map_err(|err| BackendError::InvalidResponse(err.to_string()))?,
        };
        lock(&self.accounts).insert(
            key,
            Account {
                password: request.password,
                user: user.clone(),
            },
        );
        self.ensure_profile(&user, Some(request.metadata.full_name));

        let session = if self.require_email_confirmation {
            None
        } else {
            Some(self.issue_session(&user))
        };
        Ok(SignUpOutcome { user, session })
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, BackendError> {
        self.round_trip().await?;
        let account = lock(&self.accounts)
            .get(&email.trim().to_ascii_lowercase())
            .cloned();
        match account {
            Some(account) if account.password == password => Ok(self.issue_session(&account.user)),
            _ => Err(Self::unauthorized("Invalid login credentials")),
        }
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        let had_session = lock(&self.session).take().is_some();
        if had_session {
            self.round_trip().await?;
        }
        Ok(())
    }

    async fn current_session(&self) -> Result<Option<Session>, BackendError> {
        Ok(lock(&self.session).clone())
    }
}

#[async_trait]
impl ObjectStorage for MockBackend {
    async fn upload(
        &self,
        bucket: Bucket,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        options: &UploadOptions,
    ) -> Result<String, BackendError> {
        self.round_trip().await?;
        let path = path.trim_matches('/').to_string();
        let mut objects = lock(&self.objects);
        if let Some(pos) = objects
            .iter()
            .position(|o| o.bucket == bucket && o.path == path)
        {
            if !options.upsert {
                return Err(BackendError::Api {
                    status: StatusCode::CONFLICT,
                    message: "The resource already exists".into(),
                    code: Some("Duplicate".into()),
                });
            }
            objects.remove(pos);
        }
        objects.push(StoredObject {
            bucket,
            path: path.clone(),
            bytes,
            content_type: content_type.to_string(),
        });
        Ok(path)
    }

    fn public_url(&self, bucket: Bucket, path: &str) -> String {
        format!(
            "{MOCK_BASE_URL}/storage/v1/object/public/{}/{}",
            bucket.as_str(),
            encode_object_path(path)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::issue::IssueCategory;
    use crate::models::user::SignUpMetadata;
    use std::sync::Arc;

    #[tokio::test]
    async fn insert_bumps_owner_profile() {
        let backend = MockBackend::default();
        let user = backend.register_user("a@example.com", "pw");
        backend
            .insert_issue(user.id, &CreateIssueData::new("Leak", IssueCategory::Water))
            .await
            .expect("insert");

        let profile = backend.find_profile(user.id).await.unwrap().unwrap();
        assert_eq!(profile.total_reports, 1);
        assert_eq!(profile.citizen_score, REPORT_REWARD_POINTS);
    }

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let backend = Arc::new(MockBackend::with_latency(Duration::from_millis(5)));
        let data = CreateIssueData::new("Dark lane", IssueCategory::Streetlights);
        let issue_id = backend
            .insert_issue(Uuid::new_v4(), &data)
            .await
            .expect("insert")
            .id;

        let mut handles = Vec::new();
        for _ in 0..16 {
            let backend = backend.clone();
            handles.push(tokio::spawn(async move {
                backend.increment_upvotes(issue_id).await
            }));
        }
        for handle in handles {
            handle.await.expect("join").expect("upvote");
        }

        assert_eq!(backend.issue(issue_id).unwrap().upvotes, 16);
    }

    #[tokio::test]
    async fn duplicate_sign_up_is_rejected() {
        let backend = MockBackend::default();
        backend.register_user("taken@example.com", "pw");
        let err = backend
            .sign_up(SignUpRequest {
                email: "Taken@example.com".into(),
                password: "pw".into(),
                metadata: SignUpMetadata::default(),
                email_redirect_to: None,
            })
            .await
            .expect_err("duplicate");
        assert_eq!(err.status(), Some(StatusCode::UNPROCESSABLE_ENTITY));
    }

    #[tokio::test]
    async fn failing_backend_counts_calls() {
        let backend = MockBackend::default();
        backend.set_failing(true);
        assert!(backend.list_issues(None).await.is_err());
        assert_eq!(backend.calls(), 1);
    }
}
