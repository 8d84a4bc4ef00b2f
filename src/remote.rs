//! HTTP client for the remote task store and its auth service.

use chrono::{Local, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::Task;
use crate::storage::decode_tasks;

/// Partial update for `PUT /tasks/{id}`; unset fields are left alone.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct ExistsResponse {
    #[serde(default)]
    exists: bool,
}

/// Client for the remote task store.
///
/// When a bearer token is set it is attached to `/sync` and to the
/// single-task write endpoints; without one those calls go out
/// unauthenticated and may be rejected.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    base_url: String,
    token: Option<String>,
    http: Client,
}

impl RemoteClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = Client::builder().build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            http,
        })
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn check(resp: Response) -> Result<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(Error::Status {
            status: status.as_u16(),
            body,
        })
    }

    /// Lightweight liveness check (`GET /ping`).
    pub async fn ping(&self) -> Result<()> {
        let resp = self.http.get(self.url("/ping")).send().await?;
        Self::check(resp).await?;
        Ok(())
    }

    /// Full or date-filtered snapshot (`GET /tasks[?date=D]`), normalized the
    /// same way local data is on load.
    pub async fn fetch_tasks(&self, date: Option<&str>) -> Result<Vec<Task>> {
        let mut req = self.http.get(self.url("/tasks"));
        if let Some(date) = date {
            req = req.query(&[("date", date)]);
        }
        let resp = Self::check(req.send().await?).await?;
        let raw: Vec<Value> = resp.json().await?;
        let (tasks, migrated) = decode_tasks(raw, Local::now().date_naive(), Utc::now());
        if migrated {
            debug!(count = tasks.len(), "normalized remote snapshot");
        }
        Ok(tasks)
    }

    /// Creates or replaces one task by id (`POST /tasks`).
    pub async fn upsert_task(&self, task: &Task) -> Result<()> {
        let req = self.authorize(self.http.post(self.url("/tasks")).json(task));
        Self::check(req.send().await?).await?;
        Ok(())
    }

    /// Applies a partial update (`PUT /tasks/{id}`).
    pub async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<()> {
        let req = self.authorize(self.http.put(self.url(&format!("/tasks/{}", id))).json(patch));
        Self::check(req.send().await?).await?;
        Ok(())
    }

    pub async fn delete_task(&self, id: &str) -> Result<()> {
        let req = self.authorize(self.http.delete(self.url(&format!("/tasks/{}", id))));
        Self::check(req.send().await?).await?;
        Ok(())
    }

    /// Atomically replaces the entire remote collection (`POST /sync`).
    pub async fn replace_all(&self, tasks: &[Task]) -> Result<()> {
        let req = self.authorize(self.http.post(self.url("/sync")).json(tasks));
        Self::check(req.send().await?).await?;
        Ok(())
    }

    /// Whether any account has been registered (`GET /auth/exists`).
    pub async fn users_exist(&self) -> Result<bool> {
        let resp = Self::check(self.http.get(self.url("/auth/exists")).send().await?).await?;
        let body: ExistsResponse = resp.json().await?;
        Ok(body.exists)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<String> {
        self.request_token("/auth/login", username, password).await
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<String> {
        self.request_token("/auth/register", username, password).await
    }

    async fn request_token(&self, path: &str, username: &str, password: &str) -> Result<String> {
        let resp = self
            .http
            .post(self.url(path))
            .json(&Credentials { username, password })
            .send()
            .await?;
        let resp = Self::check(resp).await?;
        let body: TokenResponse = resp.json().await?;
        match body.token {
            Some(token) => Ok(token),
            None => Err(Error::Status {
                status: 200,
                body: body.error.unwrap_or_else(|| "no token in response".into()),
            }),
        }
    }
}
