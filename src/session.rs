use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cache::QueryCache;
use crate::error::{BackendError, ClientError};
use crate::models::user::{SignUpOutcome, SignUpRequest, User};
use crate::services::auth::AuthService;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub user: Option<User>,
    /// True until the stored session has been read, and while a sign-in,
    /// sign-up or sign-out is in flight.
    pub loading: bool,
}

/// Holds the current identity and publishes changes to subscribers.
pub struct AuthSession {
    auth: Arc<dyn AuthService>,
    cache: Arc<QueryCache>,
    state: watch::Sender<SessionState>,
}

impl AuthSession {
    pub fn new(auth: Arc<dyn AuthService>, cache: Arc<QueryCache>) -> Self {
        let (state, _rx) = watch::channel(SessionState {
            user: None,
            loading: true,
        });
        Self { auth, cache, state }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.state.borrow().user.as_ref().map(|user| user.id)
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn require_user(&self) -> Result<User, ClientError> {
        self.current_user().ok_or(ClientError::AuthenticationRequired)
    }

    fn set_loading(&self, loading: bool) {
        self.state.send_modify(|state| state.loading = loading);
    }

    fn set_user(&self, user: Option<User>) {
        let previous = self.user_id();
        let next = user.as_ref().map(|u| u.id);
        if previous != next {
            self.cache.clear();
        }
        self.state.send_replace(SessionState {
            user,
            loading: false,
        });
    }

    /// Picks up a session the auth collaborator already holds.
    pub async fn restore(&self) -> Result<Option<User>, BackendError> {
        let result = self.auth.current_session().await;
        match result {
            Ok(session) => {
                let user = session.map(|s| s.user);
                self.set_user(user.clone());
                Ok(user)
            }
            Err(err) => {
                warn!(?err, "failed to restore session");
                self.set_loading(false);
                Err(err)
            }
        }
    }

    pub async fn sign_up(&self, request: SignUpRequest) -> Result<SignUpOutcome, BackendError> {
        self.set_loading(true);
        match self.auth.sign_up(request).await {
            Ok(outcome) => {
                match &outcome.session {
                    Some(session) => self.set_user(Some(session.user.clone())),
                    None => self.set_loading(false),
                }
                Ok(outcome)
            }
            Err(err) => {
                self.set_loading(false);
                Err(err)
            }
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, BackendError> {
        self.set_loading(true);
        match self.auth.sign_in_with_password(email, password).await {
            Ok(session) => {
                self.set_user(Some(session.user.clone()));
                Ok(session.user)
            }
            Err(err) => {
                self.set_loading(false);
                Err(err)
            }
        }
    }

    /// Local state is cleared regardless of the remote result.
    pub async fn sign_out(&self) -> Result<(), BackendError> {
        self.set_loading(true);
        let result = self.auth.sign_out().await;
        self.set_user(None);
        info!("signed out");
        result
    }
}
