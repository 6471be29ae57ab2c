//! In-process backend double for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Notify;

use studyhub_shared::protocol::ChallengeDraft;
use studyhub_shared::{ChallengeId, CommentId, UserId};

use crate::api::ChallengeApi;
use crate::error::{ClientError, Result};

#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Ok(Value),
    Reject(u16, &'static str),
}

impl Default for Reply {
    fn default() -> Self {
        Self::Ok(json!({}))
    }
}

impl Reply {
    fn into_result(self) -> Result<Value> {
        match self {
            Self::Ok(v) => Ok(v),
            Self::Reject(status, message) => Err(ClientError::Rejected {
                status,
                message: message.to_string(),
            }),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Calls {
    pub list: AtomicUsize,
    pub get: AtomicUsize,
    pub join: AtomicUsize,
    pub leave: AtomicUsize,
    pub toggle: AtomicUsize,
    pub write: AtomicUsize,
    pub comments: AtomicUsize,
    pub comment_writes: AtomicUsize,
}

impl Calls {
    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeApi {
    pub list: Mutex<Value>,
    pub detail: Mutex<Value>,
    pub membership: Mutex<Reply>,
    pub toggle: Mutex<Reply>,
    pub comments: Mutex<Value>,
    pub comment_write: Mutex<Reply>,
    pub leaderboard: Mutex<Value>,
    /// When set, join/leave wait on it before answering.
    pub gate: Option<Arc<Notify>>,
    /// When set, challenge detail fetches wait on it before answering.
    pub detail_gate: Option<Arc<Notify>>,
    /// When set, comment list fetches wait on it before answering.
    pub comments_gate: Option<Arc<Notify>>,
    pub last_toggle_index: Mutex<Option<usize>>,
    pub calls: Calls,
}

impl FakeApi {
    pub fn with_list(list: Value) -> Self {
        Self {
            list: Mutex::new(list),
            ..Self::default()
        }
    }

    pub fn set<T>(slot: &Mutex<T>, value: T) {
        *slot.lock().unwrap() = value;
    }

    async fn hold(&self) {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
    }
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

#[async_trait]
impl ChallengeApi for FakeApi {
    async fn list_challenges(&self) -> Result<Value> {
        bump(&self.calls.list);
        Ok(self.list.lock().unwrap().clone())
    }

    async fn get_challenge(&self, _id: ChallengeId, _viewer: Option<UserId>) -> Result<Value> {
        bump(&self.calls.get);
        if let Some(gate) = &self.detail_gate {
            gate.notified().await;
        }
        Ok(self.detail.lock().unwrap().clone())
    }

    async fn create_challenge(&self, draft: &ChallengeDraft) -> Result<Value> {
        bump(&self.calls.write);
        Ok(serde_json::to_value(draft).unwrap_or_default())
    }

    async fn update_challenge(&self, _id: ChallengeId, draft: &ChallengeDraft) -> Result<Value> {
        bump(&self.calls.write);
        Ok(serde_json::to_value(draft).unwrap_or_default())
    }

    async fn delete_challenge(&self, _id: ChallengeId) -> Result<Value> {
        bump(&self.calls.write);
        Ok(json!({"message": "Challenge deleted"}))
    }

    async fn join(&self, _id: ChallengeId, _user: UserId) -> Result<Value> {
        bump(&self.calls.join);
        self.hold().await;
        self.membership.lock().unwrap().clone().into_result()
    }

    async fn leave(&self, _id: ChallengeId, _user: UserId) -> Result<Value> {
        bump(&self.calls.leave);
        self.hold().await;
        self.membership.lock().unwrap().clone().into_result()
    }

    async fn toggle_task(&self, _id: ChallengeId, _user: UserId, task_index: usize) -> Result<Value> {
        bump(&self.calls.toggle);
        *self.last_toggle_index.lock().unwrap() = Some(task_index);
        self.toggle.lock().unwrap().clone().into_result()
    }

    async fn leaderboard(&self, _id: ChallengeId) -> Result<Value> {
        Ok(self.leaderboard.lock().unwrap().clone())
    }

    async fn list_comments(&self, _id: ChallengeId) -> Result<Value> {
        bump(&self.calls.comments);
        if let Some(gate) = &self.comments_gate {
            gate.notified().await;
        }
        Ok(self.comments.lock().unwrap().clone())
    }

    async fn add_comment(&self, _id: ChallengeId, _user: UserId, _content: &str) -> Result<Value> {
        bump(&self.calls.comment_writes);
        self.comment_write.lock().unwrap().clone().into_result()
    }

    async fn edit_comment(&self, _comment: CommentId, _content: &str) -> Result<Value> {
        bump(&self.calls.comment_writes);
        self.comment_write.lock().unwrap().clone().into_result()
    }

    async fn delete_comment(&self, _comment: CommentId) -> Result<Value> {
        bump(&self.calls.comment_writes);
        self.comment_write.lock().unwrap().clone().into_result()
    }
}
