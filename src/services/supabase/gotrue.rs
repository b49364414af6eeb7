use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::{send_json, send_raw, SupabaseClient, AUTH_PATH};
use crate::error::BackendError;
use crate::models::user::{Session, SignUpOutcome, SignUpRequest, User};
use crate::services::auth::AuthService;

fn parse_signup_response(value: Value) -> Result<SignUpOutcome, BackendError> {
    let invalid = |err: serde_json::Error| BackendError::InvalidResponse(err.to_string());

    if value.get("access_token").is_some() {
        let session: Session = serde_json::from_value(value).map_err(invalid)?;
        return Ok(SignUpOutcome {
            user: session.user.clone(),
            session: Some(session),
        });
    }

    // With email confirmation enabled the endpoint answers with the bare
    // user, sometimes wrapped in `{ "user": ... }`.
    let user_value = match value.get("user") {
        Some(user) if user.is_object() => user.clone(),
        _ => value,
    };
    let user: User = serde_json::from_value(user_value).map_err(invalid)?;
    Ok(SignUpOutcome {
        user,
        session: None,
    })
}

#[async_trait]
impl AuthService for SupabaseClient {
    async fn sign_up(&self, request: SignUpRequest) -> Result<SignUpOutcome, BackendError> {
        let mut builder = self
            .build_request(Method::POST, &format!("{AUTH_PATH}/signup"))
            .json(&json!({
                "email": request.email,
                "password": request.password,
                "data": request.metadata,
            }));
        if let Some(redirect) = request
            .email_redirect_to
            .as_ref()
            .or(self.email_redirect_url.as_ref())
        {
            builder = builder.query(&[("redirect_to", redirect)]);
        }

        let value: Value = send_json(builder).await?;
        let outcome = parse_signup_response(value)?;
        if let Some(session) = outcome.session.clone() {
            self.store_session(Some(session));
        }
        info!(user_id = %outcome.user.id, confirmed = outcome.session.is_some(), "signed up");
        Ok(outcome)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, BackendError> {
        let request = self
            .build_request(Method::POST, &format!("{AUTH_PATH}/token"))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));

        let session: Session = send_json(request).await?;
        self.store_session(Some(session.clone()));
        info!(user_id = %session.user.id, "signed in");
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        if self.access_token().is_none() {
            return Ok(());
        }
        // Built while the token is still stored so the logout call carries it.
        let request = self.build_request(Method::POST, &format!("{AUTH_PATH}/logout"));
        self.store_session(None);

        match send_raw(request).await {
            Ok(_) => Ok(()),
            Err(err) => {
                warn!(?err, "remote sign-out failed; local session already cleared");
                Err(err)
            }
        }
    }

    async fn current_session(&self) -> Result<Option<Session>, BackendError> {
        Ok(self.stored_session())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::models::user::SignUpMetadata;
    use httpmock::prelude::*;

    const USER_ID: &str = "0b7e2f64-1a0c-4a55-8c5e-2b0e6a3f4c22";

    fn signup_request() -> SignUpRequest {
        SignUpRequest {
            email: "rajesh@example.com".into(),
            password: "hunter22".into(),
            metadata: SignUpMetadata {
                full_name: "Rajesh Kumar".into(),
                phone: Some("+91 98765 43210".into()),
            },
            email_redirect_to: Some("https://janmitr.app/".into()),
        }
    }

    #[tokio::test]
    async fn sign_in_stores_token_for_later_requests() {
        let server = MockServer::start();
        let login = server.mock(|when, then| {
            when.method(POST)
                .path("/auth/v1/token")
                .query_param("grant_type", "password")
                .json_body(json!({ "email": "rajesh@example.com", "password": "hunter22" }));
            then.status(200).json_body(session_json("user-token", USER_ID));
        });
        let rows = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/issues")
                .header("authorization", "Bearer user-token");
            then.status(200).json_body(json!([]));
        });

        let client = client_for(&server);
        let session = client
            .sign_in_with_password("rajesh@example.com", "hunter22")
            .await
            .expect("session");
        assert_eq!(session.user.id.to_string(), USER_ID);

        crate::db::issue_repository::IssueRepository::list_issues(&client, None)
            .await
            .expect("issues");

        login.assert();
        rows.assert();
        assert!(client.current_session().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn bad_credentials_surface_error_description() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/auth/v1/token");
            then.status(400).json_body(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            }));
        });

        let client = client_for(&server);
        let err = client
            .sign_in_with_password("rajesh@example.com", "wrong")
            .await
            .expect_err("rejected");

        assert!(err.to_string().contains("Invalid login credentials"));
        assert!(client.current_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sign_up_without_session_awaits_confirmation() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/auth/v1/signup")
                .query_param("redirect_to", "https://janmitr.app/")
                .json_body(json!({
                    "email": "rajesh@example.com",
                    "password": "hunter22",
                    "data": { "full_name": "Rajesh Kumar", "phone": "+91 98765 43210" }
                }));
            then.status(200)
                .json_body(user_json(USER_ID, "rajesh@example.com"));
        });

        let client = client_for(&server);
        let outcome = client.sign_up(signup_request()).await.expect("sign up");

        mock.assert();
        assert!(outcome.session.is_none());
        assert_eq!(outcome.user.full_name(), Some("Rajesh Kumar"));
        assert!(client.current_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sign_up_with_autoconfirm_returns_session() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/auth/v1/signup");
            then.status(200).json_body(session_json("fresh", USER_ID));
        });

        let client = client_for(&server);
        let outcome = client.sign_up(signup_request()).await.expect("sign up");
        assert_eq!(
            outcome.session.map(|s| s.access_token).as_deref(),
            Some("fresh")
        );
        assert!(client.current_session().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn sign_out_clears_session_even_when_remote_fails() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/auth/v1/token");
            then.status(200).json_body(session_json("user-token", USER_ID));
        });
        let logout = server.mock(|when, then| {
            when.method(POST)
                .path("/auth/v1/logout")
                .header("authorization", "Bearer user-token");
            then.status(500).body("boom");
        });

        let client = client_for(&server);
        client
            .sign_in_with_password("rajesh@example.com", "hunter22")
            .await
            .expect("session");

        assert!(client.sign_out().await.is_err());
        logout.assert();
        assert!(client.current_session().await.unwrap().is_none());
    }
}
