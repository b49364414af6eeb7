//! HTTP client for the hosted backend (rows, remote procedures, auth and
//! object storage). One instance is shared by every repository seam so the
//! signed-in user's access token is attached to all requests.

mod gotrue;
mod postgrest;
mod storage;

use std::sync::RwLock;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::Config;
use crate::error::BackendError;
use crate::models::user::Session;

pub const REST_PATH: &str = "/rest/v1";
pub const AUTH_PATH: &str = "/auth/v1";
pub const STORAGE_PATH: &str = "/storage/v1";

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
    email_redirect_url: Option<String>,
    session: RwLock<Option<Session>>,
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

pub(crate) fn build_url(base: &str, path: &str) -> String {
    let trimmed_base = base.trim_end_matches('/');
    let trimmed_path = path.trim_start_matches('/');
    format!("{}/{}", trimmed_base, trimmed_path)
}

impl SupabaseClient {
    pub fn new(config: &Config) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(config.http_timeout).build()?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: &Config) -> Self {
        Self {
            client,
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
            email_redirect_url: config.email_redirect_url.clone(),
            session: RwLock::new(None),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn access_token(&self) -> Option<String> {
        self.session
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .map(|session| session.access_token.clone())
    }

    fn store_session(&self, session: Option<Session>) {
        *self
            .session
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = session;
    }

    fn stored_session(&self) -> Option<Session> {
        self.session
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn build_request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = build_url(&self.base_url, path);
        let bearer = self.access_token().unwrap_or_else(|| self.anon_key.clone());
        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }
}

/// Reads the body, turning non-success statuses into [`BackendError::Api`].
async fn read_body(response: Response) -> Result<String, BackendError> {
    let status = response.status();
    let body = response.text().await?;

    if status.is_success() {
        return Ok(body);
    }

    let parsed = serde_json::from_str::<Value>(&body).ok();
    let message = parsed
        .as_ref()
        .and_then(|json| {
            ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|field| json.get(*field).and_then(Value::as_str))
        })
        .map(|msg| msg.trim().to_string())
        .filter(|msg| !msg.is_empty())
        .or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("backend request failed")
                .to_string()
        });
    let code = parsed.as_ref().and_then(|json| match json.get("code") {
        Some(Value::String(code)) => Some(code.clone()),
        Some(Value::Number(code)) => Some(code.to_string()),
        _ => json
            .get("error_code")
            .and_then(Value::as_str)
            .map(str::to_string),
    });

    Err(BackendError::Api {
        status,
        message,
        code,
    })
}

async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, BackendError> {
    let response = request.send().await?;
    let body = read_body(response).await?;
    serde_json::from_str::<T>(&body).map_err(|err| BackendError::InvalidResponse(err.to_string()))
}

async fn send_raw(request: RequestBuilder) -> Result<String, BackendError> {
    let response = request.send().await?;
    read_body(response).await
}
