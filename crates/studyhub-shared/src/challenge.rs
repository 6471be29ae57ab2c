//! Canonical in-memory challenge records.
//!
//! [`normalize`] is the only place raw server JSON is turned into a
//! [`Challenge`]. It never fails: fields that are missing or have an
//! unexpected shape fall back to empty / zero defaults.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::protocol::{decode, decode_each, WireId, WireParticipant, WireProgress, WireTask};
use crate::types::{ChallengeId, ChallengeStatus, Level, UserId};

/// A requirement item inside a challenge.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Task {
    pub id: Option<i64>,
    pub title: String,
    pub done: bool,
}

/// One user's completion of a challenge.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserProgress {
    /// 0..=100, as computed by the server
    pub percent: f64,
    /// Per-task flags, when the server reports them
    pub flags: Option<Vec<bool>>,
}

/// How a caller points at a task: by position or by server id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRef {
    Index(usize),
    Id(i64),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Challenge {
    pub id: ChallengeId,
    pub title: String,
    pub description: Option<String>,
    pub level: Option<Level>,
    pub creator_id: Option<UserId>,
    pub creator_name: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub max_participants: Option<u32>,

    /// Deduplicated member ids.
    pub participant_ids: BTreeSet<UserId>,
    /// Display names, when the server sends member objects.
    pub participant_names: Vec<String>,
    pub participants_count: u32,

    pub tasks: Vec<Task>,
    pub progress: BTreeMap<UserId, UserProgress>,
    pub group_progress: f64,

    pub status: ChallengeStatus,
    /// Per-user context returned when fetched with `current_user_id`.
    pub is_joined: Option<bool>,
}

/// Members decoded from a `participants` field.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Participants {
    pub ids: BTreeSet<UserId>,
    pub names: Vec<String>,
    /// Set when the field was a bare count instead of a list.
    pub count: Option<u32>,
}

impl Participants {
    pub fn from_wire(value: Option<&Value>) -> Self {
        match value {
            Some(list @ Value::Array(_)) => {
                let entries: Vec<WireParticipant> = decode_each(list);
                let mut names = Vec::new();
                for entry in &entries {
                    if let Some(name) = entry.name() {
                        if !names.iter().any(|n| n == name) {
                            names.push(name.to_string());
                        }
                    }
                }
                Self {
                    ids: entries.iter().filter_map(WireParticipant::user_id).collect(),
                    names,
                    count: None,
                }
            }
            Some(Value::Number(n)) => Self {
                count: n.as_u64().and_then(|c| u32::try_from(c).ok()),
                ..Self::default()
            },
            _ => Self::default(),
        }
    }

    fn len(&self) -> u32 {
        self.count
            .unwrap_or_else(|| u32::try_from(self.ids.len()).unwrap_or(u32::MAX))
    }
}

/// Turn one raw challenge record into its canonical shape.
///
/// `today` drives the date-based status when the server does not send one.
pub fn normalize(raw: &Value, today: NaiveDate) -> Challenge {
    let empty = Map::new();
    let obj = raw.as_object().unwrap_or(&empty);

    let participants = Participants::from_wire(obj.get("participants"));
    let explicit_count = obj
        .get("participants_count")
        .and_then(Value::as_u64)
        .and_then(|c| u32::try_from(c).ok());

    let start_date = date_field(obj, "start_date");
    let end_date = date_field(obj, "end_date");

    let status = obj
        .get("status")
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| ChallengeStatus::from_dates(today, start_date, end_date));

    Challenge {
        id: ChallengeId(id_field(obj, "id").unwrap_or_default()),
        title: str_field(obj, "title").unwrap_or_default(),
        description: str_field(obj, "description"),
        level: str_field(obj, "level").and_then(|l| l.parse().ok()),
        creator_id: id_field(obj, "creator_id").map(UserId),
        creator_name: str_field(obj, "creator_name").unwrap_or_default(),
        start_date,
        end_date,
        max_participants: id_field(obj, "max_participants").and_then(|m| u32::try_from(m).ok()),
        participants_count: explicit_count.unwrap_or_else(|| participants.len()),
        participant_ids: participants.ids,
        participant_names: participants.names,
        tasks: tasks_field(obj.get("tasks")),
        progress: progress_field(obj.get("progress")),
        group_progress: obj
            .get("group_progress")
            .and_then(Value::as_f64)
            .filter(|p| p.is_finite())
            .unwrap_or(0.0),
        status,
        is_joined: obj.get("is_joined").and_then(Value::as_bool),
    }
}

/// Normalize a `GET /challenges` body. Anything but a list of objects
/// yields an empty list.
pub fn normalize_all(raw: &Value, today: NaiveDate) -> Vec<Challenge> {
    match raw {
        Value::Array(items) => items
            .iter()
            .filter(|item| item.is_object())
            .map(|item| normalize(item, today))
            .collect(),
        _ => Vec::new(),
    }
}

impl Challenge {
    pub fn is_member(&self, user: UserId) -> bool {
        self.participant_ids.contains(&user) || self.is_joined == Some(true)
    }

    pub fn is_owner(&self, user: UserId) -> bool {
        self.creator_id == Some(user)
    }

    /// A capacity of zero means "no limit".
    pub fn is_full(&self) -> bool {
        matches!(self.max_participants, Some(max) if max > 0 && self.participants_count >= max)
    }

    pub fn user_percent(&self, user: UserId) -> f64 {
        self.progress.get(&user).map_or(0.0, |p| p.percent)
    }

    /// Position of the referenced task, if it exists.
    pub fn resolve_task(&self, task: TaskRef) -> Option<usize> {
        match task {
            TaskRef::Index(i) if i < self.tasks.len() => Some(i),
            TaskRef::Index(_) => None,
            TaskRef::Id(id) => self.tasks.iter().position(|t| t.id == Some(id)),
        }
    }

    /// Optimistic join: add `user` and bump the count. Returns `false` when
    /// the user was already listed (nothing changes then).
    pub fn apply_join(&mut self, user: UserId) -> bool {
        self.is_joined = Some(true);
        if !self.participant_ids.insert(user) {
            return false;
        }
        self.participants_count = self.participants_count.saturating_add(1);
        true
    }

    /// Optimistic leave: remove `user` and decrement the count, floored at
    /// zero. Returns `false` when the user was not listed.
    pub fn apply_leave(&mut self, user: UserId) -> bool {
        self.is_joined = Some(false);
        if !self.participant_ids.remove(&user) {
            return false;
        }
        self.participants_count = self.participants_count.saturating_sub(1);
        true
    }

    /// Replace membership with what the server reported after a join/leave.
    ///
    /// A bare count only updates `participants_count`; the optimistic member
    /// set stays until the next full fetch.
    pub fn apply_members(&mut self, members: Participants, user: UserId) {
        self.participants_count = members.len();
        if members.count.is_some() {
            return;
        }
        self.is_joined = Some(members.ids.contains(&user));
        self.participant_ids = members.ids;
        if !members.names.is_empty() {
            self.participant_names = members.names;
        }
    }
}

/// Challenges the user created or joined.
pub fn mine(challenges: &[Challenge], user: UserId) -> Vec<&Challenge> {
    challenges
        .iter()
        .filter(|c| c.is_owner(user) || c.participant_ids.contains(&user))
        .collect()
}

fn str_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

fn id_field(obj: &Map<String, Value>, key: &str) -> Option<i64> {
    obj.get(key)
        .and_then(decode::<WireId>)
        .and_then(|id| id.coerce())
}

// Accepts `2025-01-31` as well as full timestamps starting with a date.
fn date_field(obj: &Map<String, Value>, key: &str) -> Option<NaiveDate> {
    let s = obj.get(key)?.as_str()?.trim();
    NaiveDate::parse_from_str(s.get(..10)?, "%Y-%m-%d").ok()
}

fn tasks_field(value: Option<&Value>) -> Vec<Task> {
    let entries: Vec<WireTask> = match value {
        Some(list @ Value::Array(_)) => decode_each(list),
        // some deployments store the list as a JSON-encoded string
        Some(Value::String(s)) => serde_json::from_str::<Value>(s)
            .map(|v| decode_each(&v))
            .unwrap_or_default(),
        _ => Vec::new(),
    };

    entries
        .into_iter()
        .map(|entry| match entry {
            WireTask::Label(title) => Task {
                id: None,
                title,
                done: false,
            },
            WireTask::Item { id, title, done } => Task {
                id: id.and_then(|i| i.coerce()),
                title: title.unwrap_or_default(),
                done: done.unwrap_or(false),
            },
        })
        .collect()
}

fn progress_field(value: Option<&Value>) -> BTreeMap<UserId, UserProgress> {
    let Some(Value::Object(map)) = value else {
        return BTreeMap::new();
    };

    map.iter()
        .filter_map(|(key, value)| {
            let user = key.parse::<UserId>().ok()?;
            let progress = match decode::<WireProgress>(value)? {
                WireProgress::Percent(p) if p.is_finite() => UserProgress {
                    percent: p,
                    flags: None,
                },
                WireProgress::Percent(_) => return None,
                WireProgress::Flags(flags) => UserProgress {
                    percent: flags_percent(&flags),
                    flags: Some(flags),
                },
            };
            Some((user, progress))
        })
        .collect()
}

/// Share of completed flags as a percentage, rounded to 2 decimals.
pub fn flags_percent(flags: &[bool]) -> f64 {
    if flags.is_empty() {
        return 0.0;
    }
    let done = flags.iter().filter(|f| **f).count() as f64;
    (done / flags.len() as f64 * 10_000.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn today() -> NaiveDate {
        d("2025-01-05")
    }

    fn ids(v: &[i64]) -> BTreeSet<UserId> {
        v.iter().copied().map(UserId).collect()
    }

    #[test]
    fn test_bare_ids_are_deduplicated() {
        let c = normalize(&json!({"id": 1, "participants": [3, 7, 7]}), today());
        assert_eq!(c.participant_ids, ids(&[3, 7]));
        assert_eq!(c.participants_count, 2);
    }

    #[test]
    fn test_member_objects_drop_non_numeric_ids() {
        let c = normalize(&json!({"participants": [{"id": "5"}, {"id": "x"}]}), today());
        assert_eq!(c.participant_ids, ids(&[5]));
        assert_eq!(c.participants_count, 1);
    }

    #[test]
    fn test_member_objects_keep_names() {
        let c = normalize(
            &json!({"participants": [{"id": 1, "name": "Sara"}, {"user_id": 2, "name": "Omar"}, {"id": 1, "name": "Sara"}]}),
            today(),
        );
        assert_eq!(c.participant_ids, ids(&[1, 2]));
        assert_eq!(c.participant_names, vec!["Sara".to_string(), "Omar".to_string()]);
    }

    #[test]
    fn test_explicit_count_wins() {
        let c = normalize(&json!({"participants": [1, 2], "participants_count": 9}), today());
        assert_eq!(c.participants_count, 9);

        let c = normalize(&json!({"participants": [1, 2], "participants_count": -3}), today());
        assert_eq!(c.participants_count, 2);
    }

    #[test]
    fn test_participants_as_bare_count() {
        let c = normalize(&json!({"participants": 4}), today());
        assert!(c.participant_ids.is_empty());
        assert_eq!(c.participants_count, 4);
    }

    #[test]
    fn test_status_from_dates_and_server() {
        let c = normalize(
            &json!({"start_date": "2025-01-01", "end_date": "2025-01-10"}),
            today(),
        );
        assert_eq!(c.status, ChallengeStatus::Active);

        let c = normalize(
            &json!({"start_date": "2025-01-01", "end_date": "2025-01-10", "status": "Ended"}),
            today(),
        );
        assert_eq!(c.status, ChallengeStatus::Ended);

        // unknown server strings fall back to the dates
        let c = normalize(
            &json!({"start_date": "2025-02-01T00:00:00", "end_date": "2025-03-01", "status": "soon"}),
            today(),
        );
        assert_eq!(c.status, ChallengeStatus::Upcoming);
    }

    #[test]
    fn test_malformed_record_degrades_to_defaults() {
        let c = normalize(
            &json!({
                "id": "abc",
                "title": 42,
                "participants": "everyone",
                "tasks": 7,
                "progress": [1, 2],
                "group_progress": "high",
                "start_date": "someday",
                "max_participants": -1
            }),
            today(),
        );
        assert_eq!(c.id, ChallengeId(0));
        assert_eq!(c.title, "");
        assert!(c.participant_ids.is_empty());
        assert_eq!(c.participants_count, 0);
        assert!(c.tasks.is_empty());
        assert!(c.progress.is_empty());
        assert_eq!(c.group_progress, 0.0);
        assert_eq!(c.start_date, None);
        assert_eq!(c.max_participants, None);

        let c = normalize(&Value::Null, today());
        assert_eq!(c.status, ChallengeStatus::Active);
    }

    #[test]
    fn test_task_shapes() {
        let c = normalize(
            &json!({"tasks": ["Read", {"id": 4, "title": "Write", "done": true}, {"title": "Draw"}, null]}),
            today(),
        );
        assert_eq!(
            c.tasks,
            vec![
                Task { id: None, title: "Read".into(), done: false },
                Task { id: Some(4), title: "Write".into(), done: true },
                Task { id: None, title: "Draw".into(), done: false },
            ]
        );

        let c = normalize(&json!({"tasks": "[\"A\", \"B\"]"}), today());
        assert_eq!(c.tasks.len(), 2);
    }

    #[test]
    fn test_progress_shapes() {
        let c = normalize(
            &json!({"progress": {"3": 40, "7": [true, false, false], "x": 10, "9": "half"}}),
            today(),
        );
        assert_eq!(c.progress.len(), 2);
        assert_eq!(c.user_percent(UserId(3)), 40.0);
        assert_eq!(c.user_percent(UserId(7)), 33.33);
        assert_eq!(c.progress[&UserId(7)].flags, Some(vec![true, false, false]));
        assert_eq!(c.user_percent(UserId(9)), 0.0);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let raw = json!({
            "id": 2,
            "title": "Deep work",
            "level": "Medium",
            "participants": [{"id": 3}, 3, "4"],
            "tasks": ["a", "b"],
            "progress": {"3": [true, false]},
            "start_date": "2025-01-01",
            "end_date": "2025-01-10"
        });
        assert_eq!(normalize(&raw, today()), normalize(&raw, today()));
    }

    #[test]
    fn test_join_then_leave_restores_count() {
        let mut c = normalize(&json!({"participants": [3, 7]}), today());
        let before = c.participants_count;

        assert!(c.apply_join(UserId(11)));
        assert_eq!(c.participants_count, before + 1);
        assert!(c.is_member(UserId(11)));

        assert!(c.apply_leave(UserId(11)));
        assert_eq!(c.participants_count, before);
        assert!(!c.is_member(UserId(11)));
    }

    #[test]
    fn test_leave_floors_at_zero() {
        let mut c = normalize(&json!({"participants_count": 0}), today());
        c.participant_ids.insert(UserId(1));
        c.apply_leave(UserId(1));
        assert_eq!(c.participants_count, 0);
    }

    #[test]
    fn test_apply_members_replaces_optimistic_state() {
        let mut c = normalize(&json!({"participants": [3]}), today());
        c.apply_join(UserId(5));

        c.apply_members(Participants::from_wire(Some(&json!([3, 5, 8]))), UserId(5));
        assert_eq!(c.participant_ids, ids(&[3, 5, 8]));
        assert_eq!(c.participants_count, 3);
        assert_eq!(c.is_joined, Some(true));
    }

    #[test]
    fn test_apply_members_with_bare_count_keeps_membership() {
        let mut c = normalize(&json!({"participants": [3]}), today());
        c.apply_join(UserId(5));

        c.apply_members(Participants::from_wire(Some(&json!(4))), UserId(5));
        assert_eq!(c.participant_ids, ids(&[3, 5]));
        assert_eq!(c.participants_count, 4);
        assert_eq!(c.is_joined, Some(true));
        assert!(c.is_member(UserId(5)));
    }

    #[test]
    fn test_is_full_and_mine() {
        let full = normalize(&json!({"id": 1, "participants": [1, 2], "max_participants": 2}), today());
        let open = normalize(&json!({"id": 2, "participants": [1], "max_participants": 0, "creator_id": 9}), today());
        assert!(full.is_full());
        assert!(!open.is_full());

        let all = vec![full, open];
        let mine_ids: Vec<ChallengeId> = mine(&all, UserId(9)).iter().map(|c| c.id).collect();
        assert_eq!(mine_ids, vec![ChallengeId(2)]);
        assert_eq!(mine(&all, UserId(2)).len(), 1);
    }

    #[test]
    fn test_resolve_task() {
        let c = normalize(&json!({"tasks": [{"id": 10, "title": "a"}, {"id": 11, "title": "b"}]}), today());
        assert_eq!(c.resolve_task(TaskRef::Index(1)), Some(1));
        assert_eq!(c.resolve_task(TaskRef::Index(2)), None);
        assert_eq!(c.resolve_task(TaskRef::Id(11)), Some(1));
        assert_eq!(c.resolve_task(TaskRef::Id(99)), None);
    }

    #[test]
    fn test_normalize_all_skips_non_objects() {
        let list = normalize_all(&json!([{"id": 1}, 5, {"id": 2}]), today());
        assert_eq!(list.len(), 2);
        assert!(normalize_all(&json!({"detail": "oops"}), today()).is_empty());
    }
}
