use std::sync::Arc;

use crate::cache::QueryCache;
use crate::config::Config;
use crate::db::{issue_repository::IssueRepository, profile_repository::ProfileRepository};
use crate::error::BackendError;
use crate::notify::{Notifier, TracingNotifier};
use crate::services::storage::ObjectStorage;
use crate::services::supabase::SupabaseClient;
use crate::session::AuthSession;

/// Everything the accessors share for one signed-in (or anonymous) session.
#[derive(Clone)]
pub struct ClientState {
    pub issues: Arc<dyn IssueRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub storage: Arc<dyn ObjectStorage>,
    pub session: Arc<AuthSession>,
    pub cache: Arc<QueryCache>,
    pub notifier: Arc<dyn Notifier>,
}

impl ClientState {
    pub fn live(config: &Config) -> Result<Self, BackendError> {
        let client = Arc::new(SupabaseClient::new(config)?);
        let cache = Arc::new(QueryCache::new(config.cache_ttl));
        Ok(Self {
            issues: client.clone(),
            profiles: client.clone(),
            storage: client.clone(),
            session: Arc::new(AuthSession::new(client, cache.clone())),
            cache,
            notifier: Arc::new(TracingNotifier),
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::db::mock_db::MockBackend;
    use crate::notify::RecordingNotifier;
    use uuid::Uuid;

    pub struct TestClient {
        pub state: ClientState,
        pub backend: Arc<MockBackend>,
        pub notifier: Arc<RecordingNotifier>,
    }

    pub fn test_client(backend: MockBackend) -> TestClient {
        let backend = Arc::new(backend);
        let notifier = Arc::new(RecordingNotifier::default());
        let cache = Arc::new(QueryCache::default());
        let state = ClientState {
            issues: backend.clone(),
            profiles: backend.clone(),
            storage: backend.clone(),
            session: Arc::new(AuthSession::new(backend.clone(), cache.clone())),
            cache,
            notifier: notifier.clone(),
        };
        TestClient {
            state,
            backend,
            notifier,
        }
    }

    /// A client with a registered, signed-in user.
    pub async fn signed_in_client(backend: MockBackend) -> (TestClient, Uuid) {
        let client = test_client(backend);
        let user = client
            .backend
            .register_user("rajesh@example.com", "password123");
        client
            .state
            .session
            .sign_in("rajesh@example.com", "password123")
            .await
            .expect("sign in");
        (client, user.id)
    }
}
