//! In-memory client state: who is logged in and the loaded challenge list.
//!
//! The [`Board`] is wrapped in a `Mutex` by the reconciler. The lock is
//! never held across an `.await`; instead each challenge with a request in
//! flight is marked pending, and no second mutation for it starts until the
//! first settles.

use std::collections::HashSet;

use studyhub_shared::{Challenge, ChallengeId, UserId};

use crate::error::{ClientError, Result};

/// The logged-in user, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    user_id: Option<UserId>,
    user_name: String,
}

impl Session {
    /// A zero id is treated as "not logged in".
    pub fn new(user_id: Option<UserId>, user_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.filter(|u| !u.is_anonymous()),
            user_name: user_name.into(),
        }
    }

    pub fn anonymous() -> Self {
        Self::new(None, studyhub_shared::constants::GUEST_NAME)
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    /// The user id, or [`ClientError::Unauthenticated`].
    pub fn require_user(&self) -> Result<UserId> {
        self.user_id.ok_or(ClientError::Unauthenticated)
    }
}

/// Challenges currently shown, plus the ids with a request in flight.
#[derive(Debug, Default)]
pub struct Board {
    challenges: Vec<Challenge>,
    pending: HashSet<ChallengeId>,
}

impl Board {
    pub fn challenges(&self) -> &[Challenge] {
        &self.challenges
    }

    pub fn get(&self, id: ChallengeId) -> Option<&Challenge> {
        self.challenges.iter().find(|c| c.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: ChallengeId) -> Option<&mut Challenge> {
        self.challenges.iter_mut().find(|c| c.id == id)
    }

    /// Replace the list with a fresh server copy. Challenges with a request
    /// in flight keep their local version until that request settles.
    pub fn replace_all(&mut self, fresh: Vec<Challenge>) {
        let mut next = fresh;
        for slot in next.iter_mut() {
            if self.pending.contains(&slot.id) {
                if let Some(local) = self.challenges.iter().find(|c| c.id == slot.id) {
                    *slot = local.clone();
                }
            }
        }
        self.challenges = next;
    }

    /// Insert or replace a single challenge.
    pub fn upsert(&mut self, challenge: Challenge) {
        match self.get_mut(challenge.id) {
            Some(slot) => *slot = challenge,
            None => self.challenges.push(challenge),
        }
    }

    pub fn remove(&mut self, id: ChallengeId) {
        self.challenges.retain(|c| c.id != id);
    }

    /// Whether the controls for this challenge should be disabled.
    pub fn is_pending(&self, id: ChallengeId) -> bool {
        self.pending.contains(&id)
    }

    /// Mark `id` pending. Returns `false` if it already was.
    pub(crate) fn begin(&mut self, id: ChallengeId) -> bool {
        self.pending.insert(id)
    }

    pub(crate) fn finish(&mut self, id: ChallengeId) {
        self.pending.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn challenge(id: i64, participants: serde_json::Value) -> Challenge {
        let today = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        studyhub_shared::normalize(&json!({"id": id, "participants": participants}), today)
    }

    #[test]
    fn test_session_zero_is_anonymous() {
        assert_eq!(Session::new(Some(UserId(0)), "x").user_id(), None);
        assert!(matches!(
            Session::anonymous().require_user(),
            Err(ClientError::Unauthenticated)
        ));
        assert_eq!(Session::new(Some(UserId(4)), "x").require_user().unwrap(), UserId(4));
    }

    #[test]
    fn test_replace_all_keeps_pending_local_copy() {
        let mut board = Board::default();
        board.replace_all(vec![challenge(1, json!([1])), challenge(2, json!([2]))]);

        assert!(board.begin(ChallengeId(1)));
        assert!(!board.begin(ChallengeId(1)));
        board.get_mut(ChallengeId(1)).unwrap().apply_join(UserId(9));

        board.replace_all(vec![challenge(1, json!([1])), challenge(2, json!([2, 3]))]);
        assert_eq!(board.get(ChallengeId(1)).unwrap().participants_count, 2);
        assert_eq!(board.get(ChallengeId(2)).unwrap().participants_count, 2);

        board.finish(ChallengeId(1));
        assert!(!board.is_pending(ChallengeId(1)));
    }

    #[test]
    fn test_upsert_and_remove() {
        let mut board = Board::default();
        board.upsert(challenge(1, json!([])));
        board.upsert(challenge(1, json!([5])));
        assert_eq!(board.challenges().len(), 1);
        assert_eq!(board.get(ChallengeId(1)).unwrap().participants_count, 1);

        board.remove(ChallengeId(1));
        assert!(board.challenges().is_empty());
    }
}
