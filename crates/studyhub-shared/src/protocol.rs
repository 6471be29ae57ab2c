//! Wire shapes accepted from the StudyHub REST backend.
//!
//! Several server versions are in the wild and they disagree on the shape of
//! the same field: participants arrive as bare ids or as member objects,
//! tasks as labels or objects, progress as a percentage or per-task flags.
//! Every accepted variant is listed here as an untagged enum and decoded one
//! entry at a time, so a single malformed entry never poisons a whole record.
//! Nothing outside [`crate::challenge`] and [`crate::comment`] should look at
//! these types.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{Level, UserId};

/// A JSON scalar used as an identifier.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum WireId {
    Int(i64),
    Float(f64),
    Text(String),
}

impl WireId {
    /// Coerce to an integer id, the way `Number(x)` would, but rejecting
    /// anything that is not a finite whole number.
    pub fn coerce(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Float(f) => float_to_id(*f),
            Self::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return None;
                }
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(float_to_id))
            }
        }
    }
}

fn float_to_id(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// One entry of a `participants` list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireParticipant {
    /// `7` or `"7"`
    Id(WireId),
    /// `{ "id": 7, "name": "Sara" }` or `{ "user_id": 7 }`
    Member {
        #[serde(default)]
        id: Option<WireId>,
        #[serde(default)]
        user_id: Option<WireId>,
        #[serde(default)]
        name: Option<Value>,
    },
}

impl WireParticipant {
    pub fn user_id(&self) -> Option<UserId> {
        let raw = match self {
            Self::Id(id) => Some(id),
            // `id` wins when present, even if it does not coerce
            Self::Member { id, user_id, .. } => id.as_ref().or(user_id.as_ref()),
        };
        raw.and_then(WireId::coerce).map(UserId)
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Id(_) => None,
            Self::Member { name, .. } => name.as_ref().and_then(Value::as_str),
        }
    }
}

/// One entry of a `tasks` list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireTask {
    Label(String),
    Item {
        #[serde(default)]
        id: Option<WireId>,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        done: Option<bool>,
    },
}

/// One value of the `progress` map.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireProgress {
    Percent(f64),
    Flags(Vec<bool>),
}

/// Body of a successful join / leave response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MembershipResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub participants: Option<Value>,
}

/// Body of a successful task toggle response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToggleResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub user_progress: Option<f64>,
    #[serde(default)]
    pub group_progress: Option<f64>,
}

/// Payload for creating or updating a challenge.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChallengeDraft {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,
    pub creator_id: UserId,
    pub creator_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_participants: Option<u32>,
    pub tasks: Vec<String>,
}

/// Decode `value` into `T`, or `None` if it has another shape.
pub fn decode<T: DeserializeOwned>(value: &Value) -> Option<T> {
    T::deserialize(value).ok()
}

/// Decode every element of a JSON array that has the shape of `T`,
/// silently skipping the rest. Non-arrays yield an empty list.
pub fn decode_each<T: DeserializeOwned>(value: &Value) -> Vec<T> {
    match value {
        Value::Array(items) => items.iter().filter_map(decode).collect(),
        _ => Vec::new(),
    }
}

/// Human-readable message from an error body (`detail`, then `message`).
///
/// FastAPI validation errors carry a list in `detail`; the first entry's
/// `msg` is used for those.
pub fn error_detail(body: &Value) -> Option<String> {
    for key in ["detail", "message"] {
        match body.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.clone()),
            Some(Value::Array(items)) => {
                if let Some(msg) = items
                    .first()
                    .and_then(|i| i.get("msg"))
                    .and_then(Value::as_str)
                {
                    return Some(msg.to_string());
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_id_coercion() {
        assert_eq!(WireId::Int(4).coerce(), Some(4));
        assert_eq!(WireId::Float(4.0).coerce(), Some(4));
        assert_eq!(WireId::Float(4.5).coerce(), None);
        assert_eq!(WireId::Float(f64::NAN).coerce(), None);
        assert_eq!(WireId::Text(" 12 ".into()).coerce(), Some(12));
        assert_eq!(WireId::Text("x".into()).coerce(), None);
        assert_eq!(WireId::Text(String::new()).coerce(), None);
    }

    #[test]
    fn test_participant_shapes() {
        let entries: Vec<WireParticipant> =
            decode_each(&json!([3, "8", {"id": "5", "name": "Sara"}, {"user_id": 9}, {"id": "x"}, null]));
        let ids: Vec<Option<UserId>> = entries.iter().map(WireParticipant::user_id).collect();

        assert_eq!(
            ids,
            vec![Some(UserId(3)), Some(UserId(8)), Some(UserId(5)), Some(UserId(9)), None]
        );
        assert_eq!(entries[2].name(), Some("Sara"));
    }

    #[test]
    fn test_id_takes_precedence_over_user_id() {
        let p: WireParticipant = decode(&json!({"id": "x", "user_id": 4})).unwrap();
        assert_eq!(p.user_id(), None);
    }

    #[test]
    fn test_decode_each_skips_bad_entries() {
        let progress: Vec<WireProgress> = decode_each(&json!([50, [true, false], "nope", [1, 2]]));
        assert_eq!(progress.len(), 2);
        assert!(decode_each::<WireTask>(&json!({"not": "a list"})).is_empty());
    }

    #[test]
    fn test_error_detail() {
        assert_eq!(
            error_detail(&json!({"detail": "Challenge full"})).as_deref(),
            Some("Challenge full")
        );
        assert_eq!(
            error_detail(&json!({"message": "Nope"})).as_deref(),
            Some("Nope")
        );
        assert_eq!(
            error_detail(&json!({"detail": [{"loc": ["query"], "msg": "field required"}]})).as_deref(),
            Some("field required")
        );
        assert_eq!(error_detail(&json!({})), None);
        assert_eq!(error_detail(&Value::Null), None);
    }

    #[test]
    fn test_draft_omits_missing_fields() {
        let draft = ChallengeDraft {
            title: "Read daily".into(),
            description: None,
            level: Some(Level::Easy),
            creator_id: UserId(1),
            creator_name: "Sara".into(),
            start_date: None,
            end_date: None,
            max_participants: Some(5),
            tasks: vec!["Chapter 1".into()],
        };
        let v = serde_json::to_value(&draft).unwrap();
        assert_eq!(v["level"], "Easy");
        assert!(v.get("description").is_none());
        assert_eq!(v["tasks"], json!(["Chapter 1"]));
    }
}
