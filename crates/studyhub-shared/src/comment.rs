//! Comment threads and leaderboard rows attached to a challenge.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::protocol::{decode_each, WireId};
use crate::types::{CommentId, UserId};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Comment {
    pub id: CommentId,
    pub user_id: Option<UserId>,
    pub user_name: String,
    pub content: String,
    pub timestamp: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LeaderRow {
    pub user_id: Option<UserId>,
    pub name: String,
    pub progress: f64,
}

#[derive(Deserialize)]
struct WireComment {
    id: WireId,
    #[serde(default)]
    user_id: Option<WireId>,
    #[serde(default)]
    user_name: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
}

#[derive(Deserialize)]
struct WireLeaderRow {
    #[serde(default)]
    id: Option<WireId>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    progress: Option<f64>,
}

impl Comment {
    fn from_parts(wire: WireComment) -> Option<Self> {
        let user_id = wire.user_id.and_then(|u| u.coerce()).map(UserId);
        Some(Self {
            id: CommentId(wire.id.coerce()?),
            user_name: wire
                .user_name
                .or_else(|| user_id.map(|u| format!("User {u}")))
                .unwrap_or_default(),
            user_id,
            content: wire.content.unwrap_or_default(),
            timestamp: wire.timestamp.as_deref().and_then(parse_timestamp),
        })
    }
}

/// Decode a comment list, oldest first. Entries without a usable id are
/// dropped.
pub fn normalize_comments(raw: &Value) -> Vec<Comment> {
    let mut comments: Vec<Comment> = decode_each::<WireComment>(raw)
        .into_iter()
        .filter_map(Comment::from_parts)
        .collect();
    comments.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
    comments
}

/// Decode leaderboard rows, best progress first.
pub fn normalize_leaderboard(raw: &Value) -> Vec<LeaderRow> {
    let mut rows: Vec<LeaderRow> = decode_each::<WireLeaderRow>(raw)
        .into_iter()
        .map(|row| LeaderRow {
            user_id: row.id.and_then(|i| i.coerce()).map(UserId),
            name: row.name.unwrap_or_default(),
            progress: row.progress.filter(|p| p.is_finite()).unwrap_or(0.0),
        })
        .collect();
    rows.sort_by(|a, b| b.progress.total_cmp(&a.progress));
    rows
}

// The backend emits naive ISO timestamps; other deployments send RFC 3339.
fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc()))
}
