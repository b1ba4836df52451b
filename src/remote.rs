//! Remote task service client
//!
//! `TaskApi` is the seam the polling loop talks to; `RemoteClient` is the HTTP
//! implementation that routes every call through the account's proxied session.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{PinpollError, Result};
use crate::session::AccountSession;

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://prod-api.pinai.tech";

pub const CALL_PROFILE: &str = "profile";
pub const CALL_TASK_LIST: &str = "task list";
pub const CALL_CLAIM: &str = "claim";

/// Longest slice of an error body kept in a failure cause
const MAX_BODY_EXCERPT: usize = 200;

/// Operations the polling loop needs from the remote service
#[async_trait]
pub trait TaskApi: Send + Sync {
    /// Fetch the account's profile summary
    async fn fetch_profile(&self) -> Result<ProfileSnapshot>;

    /// Fetch the currently offered tasks; a malformed payload is an empty list
    async fn list_tasks(&self) -> Result<Vec<Task>>;

    /// Claim one task. Not idempotent: a retry after an ambiguous failure may double-claim.
    async fn claim_task(&self, id: &TaskId) -> Result<()>;
}

#[async_trait]
impl<T: TaskApi + ?Sized> TaskApi for Arc<T> {
    async fn fetch_profile(&self) -> Result<ProfileSnapshot> {
        (**self).fetch_profile().await
    }

    async fn list_tasks(&self) -> Result<Vec<Task>> {
        (**self).list_tasks().await
    }

    async fn claim_task(&self, id: &TaskId) -> Result<()> {
        (**self).claim_task(id).await
    }
}

/// Read-only projection of the `/home` response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileSnapshot {
    pub name: Option<String>,
    pub checked_in_today: bool,
    pub level: Option<String>,
    pub points: Option<String>,
}

impl fmt::Display for ProfileSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Name: {} | Today check-in: {} | Current level: {} | Pin points: {}",
            self.name.as_deref().unwrap_or("N/A"),
            if self.checked_in_today { "Yes" } else { "No" },
            self.level.as_deref().unwrap_or("N/A"),
            self.points.as_deref().unwrap_or("N/A"),
        )
    }
}

/// Task identifier as sent back in the claim path; the service uses both strings and integers
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.trim().is_empty() => Some(Self(s.trim().to_string())),
            Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A claimable task entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
}

#[derive(Debug, Deserialize)]
struct HomeResponse {
    user_info: Option<UserInfo>,
    is_today_checkin: Option<Value>,
    current_model: Option<CurrentModel>,
    pin_points: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    name: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct CurrentModel {
    current_level: Option<Value>,
}

fn display_value(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
        Some(Value::Null) | None => false,
    }
}

/// Decode a `/home` body into a profile snapshot
pub fn parse_profile(body: &str) -> Result<ProfileSnapshot> {
    let home: HomeResponse = serde_json::from_str(body).map_err(|e| PinpollError::decoding(CALL_PROFILE, e))?;

    Ok(ProfileSnapshot {
        name: display_value(home.user_info.as_ref().and_then(|u| u.name.as_ref())),
        checked_in_today: truthy(home.is_today_checkin.as_ref()),
        level: display_value(home.current_model.as_ref().and_then(|m| m.current_level.as_ref())),
        points: display_value(home.pin_points.as_ref()),
    })
}

/// Extract claimable tasks from a task-list body.
///
/// Anything that is not `{ "data": [...] }` yields no tasks; entries without an id are skipped.
pub fn parse_task_list(body: &str) -> Vec<Task> {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return Vec::new();
    };

    value
        .get("data")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry.get("id").and_then(TaskId::from_value))
                .map(|id| Task { id })
                .collect()
        })
        .unwrap_or_default()
}

/// Flatten an error body onto one line and cap its length so it fits in a log record
pub fn body_excerpt(body: &str) -> String {
    let flat = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= MAX_BODY_EXCERPT {
        return flat;
    }
    let mut excerpt: String = flat.chars().take(MAX_BODY_EXCERPT).collect();
    excerpt.push_str("...");
    excerpt
}

/// HTTP implementation of `TaskApi` for one account
#[derive(Debug)]
pub struct RemoteClient {
    session: AccountSession,
    base_url: String,
}

impl RemoteClient {
    pub fn new(session: AccountSession, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { session, base_url }
    }

    pub fn session(&self) -> &AccountSession {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and return the body of a successful response
    async fn send(&self, call: &'static str, request: reqwest::RequestBuilder) -> Result<String> {
        let response = request
            .send()
            .await
            .map_err(|e| PinpollError::transport(call, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let excerpt = body_excerpt(&body);
            let cause = if excerpt.is_empty() {
                format!("HTTP {}", status.as_u16())
            } else {
                format!("HTTP {}: {}", status.as_u16(), excerpt)
            };
            return Err(PinpollError::transport(call, cause));
        }

        response.text().await.map_err(|e| PinpollError::transport(call, e))
    }
}

#[async_trait]
impl TaskApi for RemoteClient {
    async fn fetch_profile(&self) -> Result<ProfileSnapshot> {
        let body = self
            .send(CALL_PROFILE, self.session.http().get(self.url("/home")))
            .await?;
        parse_profile(&body)
    }

    async fn list_tasks(&self) -> Result<Vec<Task>> {
        let body = self
            .send(CALL_TASK_LIST, self.session.http().get(self.url("/task/random_task_list")))
            .await?;
        let tasks = parse_task_list(&body);
        debug!("account {}: task list returned {} claimable tasks", self.session.index() + 1, tasks.len());
        Ok(tasks)
    }

    async fn claim_task(&self, id: &TaskId) -> Result<()> {
        let path = format!("/task/{}/claim", id);
        self.send(CALL_CLAIM, self.session.http().post(self.url(&path))).await?;
        Ok(())
    }
}
