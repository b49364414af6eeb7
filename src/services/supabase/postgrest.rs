use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use super::{send_json, send_raw, SupabaseClient, REST_PATH};
use crate::db::issue_repository::IssueRepository;
use crate::db::profile_repository::ProfileRepository;
use crate::error::BackendError;
use crate::models::issue::{CreateIssueData, Issue, NewIssueRow};
use crate::models::profile::Profile;

const ISSUES_TABLE: &str = "issues";
const PROFILES_TABLE: &str = "profiles";
const UPVOTE_PROCEDURE: &str = "increment_upvotes";
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

fn table_path(table: &str) -> String {
    format!("{REST_PATH}/{table}")
}

fn non_negative_count(value: &Value) -> Result<u64, BackendError> {
    value
        .as_u64()
        .ok_or_else(|| BackendError::InvalidResponse(format!("invalid upvote count: {value}")))
}

/// Interprets the body of a remote procedure that may return a count or
/// nothing at all. Negative or fractional counts are rejected.
fn parse_count(body: &str) -> Result<Option<u64>, BackendError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let value: Value = serde_json::from_str(trimmed)
        .map_err(|err| BackendError::InvalidResponse(err.to_string()))?;
    match &value {
        Value::Number(_) => non_negative_count(&value).map(Some),
        Value::Object(map) => match map.get("upvotes") {
            None | Some(Value::Null) => Ok(None),
            Some(count) => non_negative_count(count).map(Some),
        },
        _ => Ok(None),
    }
}

#[async_trait]
impl IssueRepository for SupabaseClient {
    async fn list_issues(&self, owner: Option<Uuid>) -> Result<Vec<Issue>, BackendError> {
        let mut query = vec![
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
        ];
        if let Some(owner) = owner {
            query.push(("user_id", format!("eq.{owner}")));
        }

        let request = self
            .build_request(Method::GET, &table_path(ISSUES_TABLE))
            .query(&query);
        let issues: Vec<Issue> = send_json(request).await?;
        debug!(count = issues.len(), owner = ?owner, "fetched issues");
        Ok(issues)
    }

    async fn insert_issue(
        &self,
        user_id: Uuid,
        data: &CreateIssueData,
    ) -> Result<Issue, BackendError> {
        let request = self
            .build_request(Method::POST, &table_path(ISSUES_TABLE))
            .header("Prefer", "return=representation")
            .header(reqwest::header::ACCEPT, SINGLE_OBJECT)
            .json(&NewIssueRow { user_id, data });
        send_json(request).await
    }

    async fn increment_upvotes(&self, issue_id: Uuid) -> Result<Option<u64>, BackendError> {
        let path = format!("{REST_PATH}/rpc/{UPVOTE_PROCEDURE}");
        let request = self
            .build_request(Method::POST, &path)
            .json(&json!({ "issue_id": issue_id }));
        let body = send_raw(request).await?;
        parse_count(&body)
    }
}

#[async_trait]
impl ProfileRepository for SupabaseClient {
    async fn find_profile(&self, user_id: Uuid) -> Result<Option<Profile>, BackendError> {
        let request = self
            .build_request(Method::GET, &table_path(PROFILES_TABLE))
            .query(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{user_id}")),
                ("limit", "1".to_string()),
            ]);
        let mut rows: Vec<Profile> = send_json(request).await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }
}
