//! REST backend access.
//!
//! [`ChallengeApi`] returns raw JSON bodies; turning them into canonical
//! records is left to `studyhub_shared::normalize` so there is exactly one
//! place that understands wire shapes. [`HttpApi`] is the reqwest-backed
//! implementation.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::debug;

use studyhub_shared::protocol::{error_detail, ChallengeDraft};
use studyhub_shared::{ChallengeId, CommentId, UserId};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

#[async_trait]
pub trait ChallengeApi: Send + Sync {
    /// `GET /challenges`
    async fn list_challenges(&self) -> Result<Value>;

    /// `GET /challenges/{id}`, with per-user context when `viewer` is set.
    async fn get_challenge(&self, id: ChallengeId, viewer: Option<UserId>) -> Result<Value>;

    /// `POST /challenges`
    async fn create_challenge(&self, draft: &ChallengeDraft) -> Result<Value>;

    /// `PUT /challenges/{id}`
    async fn update_challenge(&self, id: ChallengeId, draft: &ChallengeDraft) -> Result<Value>;

    /// `DELETE /challenges/{id}`
    async fn delete_challenge(&self, id: ChallengeId) -> Result<Value>;

    /// `POST /challenges/{id}/join?user_id=…`
    async fn join(&self, id: ChallengeId, user: UserId) -> Result<Value>;

    /// `DELETE /challenges/{id}/leave?user_id=…`
    async fn leave(&self, id: ChallengeId, user: UserId) -> Result<Value>;

    /// `PATCH /challenges/{id}/task-toggle?user_id=…&task_index=…`
    async fn toggle_task(&self, id: ChallengeId, user: UserId, task_index: usize) -> Result<Value>;

    /// `GET /challenges/{id}/leaderboard`
    async fn leaderboard(&self, id: ChallengeId) -> Result<Value>;

    /// `GET /challenges/{id}/comments`
    async fn list_comments(&self, id: ChallengeId) -> Result<Value>;

    /// `POST /challenges/{id}/comments?user_id=…&content=…`
    async fn add_comment(&self, id: ChallengeId, user: UserId, content: &str) -> Result<Value>;

    /// `PATCH /challenges/comments/{comment_id}?content=…`
    async fn edit_comment(&self, comment: CommentId, content: &str) -> Result<Value>;

    /// `DELETE /challenges/comments/{comment_id}`
    async fn delete_comment(&self, comment: CommentId) -> Result<Value>;
}

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct HttpApi {
    http: Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send the request and return its JSON body.
    ///
    /// Success bodies that are empty or not JSON become `Value::Null`.
    /// Non-success statuses become [`ClientError::Rejected`] carrying the
    /// body's `detail` / `message`, or a generic text with the status code.
    async fn send(&self, request: RequestBuilder) -> Result<Value> {
        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let body: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        debug!(status = status.as_u16(), "backend response");

        if !status.is_success() {
            return Err(ClientError::Rejected {
                status: status.as_u16(),
                message: error_detail(&body)
                    .unwrap_or_else(|| format!("Request failed (status {})", status.as_u16())),
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl ChallengeApi for HttpApi {
    async fn list_challenges(&self) -> Result<Value> {
        self.send(self.http.get(self.url("/challenges"))).await
    }

    async fn get_challenge(&self, id: ChallengeId, viewer: Option<UserId>) -> Result<Value> {
        let url = self.url(&format!("/challenges/{id}"));
        let Some(user) = viewer else {
            return self.send(self.http.get(&url)).await;
        };

        // older deployments reject the per-user query; retry without it
        match self
            .send(self.http.get(&url).query(&[("current_user_id", user.0)]))
            .await
        {
            Err(ClientError::Rejected { status, .. }) => {
                debug!(challenge = %id, status, "retrying challenge fetch without viewer");
                self.send(self.http.get(&url)).await
            }
            other => other,
        }
    }

    async fn create_challenge(&self, draft: &ChallengeDraft) -> Result<Value> {
        self.send(self.http.post(self.url("/challenges")).json(draft))
            .await
    }

    async fn update_challenge(&self, id: ChallengeId, draft: &ChallengeDraft) -> Result<Value> {
        self.send(self.http.put(self.url(&format!("/challenges/{id}"))).json(draft))
            .await
    }

    async fn delete_challenge(&self, id: ChallengeId) -> Result<Value> {
        self.send(self.http.delete(self.url(&format!("/challenges/{id}"))))
            .await
    }

    async fn join(&self, id: ChallengeId, user: UserId) -> Result<Value> {
        let url = self.url(&format!("/challenges/{id}/join"));
        self.send(self.http.post(url).query(&[("user_id", user.0)]))
            .await
    }

    async fn leave(&self, id: ChallengeId, user: UserId) -> Result<Value> {
        let url = self.url(&format!("/challenges/{id}/leave"));
        self.send(self.http.delete(url).query(&[("user_id", user.0)]))
            .await
    }

    async fn toggle_task(&self, id: ChallengeId, user: UserId, task_index: usize) -> Result<Value> {
        let url = self.url(&format!("/challenges/{id}/task-toggle"));
        let query = [("user_id", user.0.to_string()), ("task_index", task_index.to_string())];
        self.send(self.http.patch(url).query(&query)).await
    }

    async fn leaderboard(&self, id: ChallengeId) -> Result<Value> {
        self.send(self.http.get(self.url(&format!("/challenges/{id}/leaderboard"))))
            .await
    }

    async fn list_comments(&self, id: ChallengeId) -> Result<Value> {
        self.send(self.http.get(self.url(&format!("/challenges/{id}/comments"))))
            .await
    }

    async fn add_comment(&self, id: ChallengeId, user: UserId, content: &str) -> Result<Value> {
        let url = self.url(&format!("/challenges/{id}/comments"));
        let query = [("user_id", user.0.to_string()), ("content", content.to_string())];
        self.send(self.http.post(url).query(&query)).await
    }

    async fn edit_comment(&self, comment: CommentId, content: &str) -> Result<Value> {
        let url = self.url(&format!("/challenges/comments/{comment}"));
        self.send(self.http.patch(url).query(&[("content", content)]))
            .await
    }

    async fn delete_comment(&self, comment: CommentId) -> Result<Value> {
        let url = self.url(&format!("/challenges/comments/{comment}"));
        self.send(self.http.delete(url)).await
    }
}
