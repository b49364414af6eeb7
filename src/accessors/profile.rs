use tracing::warn;
use uuid::Uuid;

use crate::cache::QueryKey;
use crate::cancel::CancelToken;
use crate::error::ClientError;
use crate::models::profile::Profile;
use crate::notify::Notice;
use crate::state::ClientState;

pub struct ProfileReader {
    state: ClientState,
}

impl ProfileReader {
    pub fn new(state: ClientState) -> Self {
        Self { state }
    }

    /// The signed-in user's profile; `None` when signed out or when the
    /// backend has not created the row yet.
    pub async fn current_profile(
        &self,
        cancel: &CancelToken,
    ) -> Result<Option<Profile>, ClientError> {
        match self.state.session.user_id() {
            Some(user_id) => self.profile_for(user_id, cancel).await,
            None => Ok(None),
        }
    }

    pub async fn profile_for(
        &self,
        user_id: Uuid,
        cancel: &CancelToken,
    ) -> Result<Option<Profile>, ClientError> {
        let key = QueryKey::Profile(user_id);
        if let Some(cached) = self.state.cache.get::<Option<Profile>>(&key) {
            return Ok(cached);
        }

        let ticket = self.state.cache.begin(key);
        match cancel.run(self.state.profiles.find_profile(user_id)).await {
            Ok(profile) => {
                self.state.cache.store(ticket, profile.clone());
                Ok(profile)
            }
            Err(err) => {
                if !err.is_cancelled() {
                    warn!(?err, %user_id, "failed to load profile");
                    self.state
                        .notifier
                        .notify(Notice::error("Failed to load profile", err.to_string()));
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessors::issues::IssueAccessor;
    use crate::db::mock_db::MockBackend;
    use crate::models::issue::{CreateIssueData, IssueCategory};
    use crate::models::profile::REPORT_REWARD_POINTS;
    use crate::state::test_support::{signed_in_client, test_client};

    #[tokio::test]
    async fn signed_out_reader_returns_none_without_network() {
        let client = test_client(MockBackend::default());
        let reader = ProfileReader::new(client.state.clone());

        let profile = reader
            .current_profile(&CancelToken::never())
            .await
            .expect("no error");

        assert!(profile.is_none());
        assert_eq!(client.backend.calls(), 0);
    }

    #[tokio::test]
    async fn reporting_an_issue_refreshes_score() {
        let (client, _) = signed_in_client(MockBackend::default()).await;
        let reader = ProfileReader::new(client.state.clone());
        let issues = IssueAccessor::new(client.state.clone());
        let never = CancelToken::never();

        let before = reader.current_profile(&never).await.unwrap().unwrap();
        assert_eq!(before.citizen_score, 0);

        issues
            .create_issue(
                CreateIssueData::new("Garbage not collected", IssueCategory::Garbage),
                &never,
            )
            .await
            .unwrap();

        let after = reader.current_profile(&never).await.unwrap().unwrap();
        assert_eq!(after.citizen_score, REPORT_REWARD_POINTS);
        assert_eq!(after.total_reports, 1);
    }

    #[tokio::test]
    async fn load_failure_is_surfaced() {
        let (client, user_id) = signed_in_client(MockBackend::default()).await;
        client.backend.set_failing(true);
        let reader = ProfileReader::new(client.state.clone());

        let err = reader
            .profile_for(user_id, &CancelToken::never())
            .await
            .expect_err("fails");

        assert!(matches!(err, ClientError::Backend(_)));
        assert_eq!(client.notifier.titles(), vec!["Failed to load profile"]);
    }
}
