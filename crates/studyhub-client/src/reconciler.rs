//! Challenge membership & progress reconciler.
//!
//! Keeps the locally displayed challenge list consistent with the server
//! while giving immediate feedback on join/leave. Every mutating action is
//! an [`Optimistic`] transaction:
//!
//! 1. snapshot the challenge and apply the local patch,
//! 2. send the request,
//! 3. on success replace the patch with what the server reported,
//!    on failure restore the snapshot verbatim.
//!
//! Only one transaction per challenge may be open at a time; a second
//! action on the same challenge is refused with [`ClientError::InFlight`]
//! without touching the network.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{Local, NaiveDate};
use tracing::{debug, info, warn};

use studyhub_shared::protocol::{decode, ChallengeDraft, MembershipResponse, ToggleResponse};
use studyhub_shared::{
    comment, normalize, normalize_all, Challenge, ChallengeId, ChallengeStatus, LeaderRow,
    Participants, TaskRef, UserId,
};

use crate::api::ChallengeApi;
use crate::error::{ClientError, Result};
use crate::events::Notifier;
use crate::state::{Board, Session};

/// Why a task toggle did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotMember,
    Ended,
    UnknownTask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskToggle {
    Applied,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Membership {
    Join,
    Leave,
}

pub struct Reconciler<A> {
    api: Arc<A>,
    session: Session,
    board: Arc<Mutex<Board>>,
    notifier: Notifier,
    today: fn() -> NaiveDate,
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

fn lock(board: &Mutex<Board>) -> MutexGuard<'_, Board> {
    board.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<A: ChallengeApi> Reconciler<A> {
    pub fn new(api: Arc<A>, session: Session, notifier: Notifier) -> Self {
        Self {
            api,
            session,
            board: Arc::new(Mutex::new(Board::default())),
            notifier,
            today: local_today,
        }
    }

    /// Override the clock used for date-based status.
    pub fn with_today(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn api(&self) -> Arc<A> {
        Arc::clone(&self.api)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Copy of the loaded challenges.
    pub fn challenges(&self) -> Vec<Challenge> {
        lock(&self.board).challenges().to_vec()
    }

    pub fn challenge(&self, id: ChallengeId) -> Option<Challenge> {
        lock(&self.board).get(id).cloned()
    }

    /// Challenges the current user created or joined.
    pub fn my_challenges(&self) -> Vec<Challenge> {
        let Some(user) = self.session.user_id() else {
            return Vec::new();
        };
        let board = lock(&self.board);
        studyhub_shared::challenge::mine(board.challenges(), user)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Whether join/leave/toggle controls for `id` should be disabled.
    pub fn is_pending(&self, id: ChallengeId) -> bool {
        lock(&self.board).is_pending(id)
    }

    // ------------------------------------------------------------------
    // Fetching
    // ------------------------------------------------------------------

    /// Re-fetch the whole list.
    pub async fn refresh(&self) -> Result<()> {
        let body = match self.api.list_challenges().await {
            Ok(body) => body,
            Err(e) => return Err(self.fail("Failed to load challenges", e)),
        };
        let fresh = normalize_all(&body, (self.today)());
        debug!(count = fresh.len(), "challenge list refreshed");
        lock(&self.board).replace_all(fresh);
        Ok(())
    }

    /// Fetch one challenge (with the current user's context) into the board.
    pub async fn open(&self, id: ChallengeId) -> Result<Challenge> {
        let challenge = match self.fetch_one(id).await {
            Ok(c) => c,
            Err(e) => return Err(self.fail("Failed to load challenge", e)),
        };
        let mut board = lock(&self.board);
        if !board.is_pending(id) {
            board.upsert(challenge.clone());
        }
        Ok(challenge)
    }

    /// Replace the local copy with a fresh server record, unless another
    /// action on it started meanwhile. Failures only log.
    async fn reload(&self, id: ChallengeId) {
        match self.fetch_one(id).await {
            Ok(fresh) => {
                let mut board = lock(&self.board);
                if !board.is_pending(id) {
                    board.upsert(fresh);
                }
            }
            Err(e) => warn!(challenge = %id, error = %e, "re-fetch after update failed"),
        }
    }

    async fn fetch_one(&self, id: ChallengeId) -> Result<Challenge> {
        let body = self.api.get_challenge(id, self.session.user_id()).await?;
        Ok(normalize(&body, (self.today)()))
    }

    // ------------------------------------------------------------------
    // Membership
    // ------------------------------------------------------------------

    pub async fn join(&self, id: ChallengeId) -> Result<()> {
        self.change_membership(id, Membership::Join).await
    }

    pub async fn leave(&self, id: ChallengeId) -> Result<()> {
        self.change_membership(id, Membership::Leave).await
    }

    async fn change_membership(&self, id: ChallengeId, action: Membership) -> Result<()> {
        let user = match self.session.require_user() {
            Ok(u) => u,
            Err(e) => return Err(self.fail("", e)),
        };

        let txn = Optimistic::begin(&self.board, id, |c| match action {
            Membership::Join => {
                c.apply_join(user);
            }
            Membership::Leave => {
                c.apply_leave(user);
            }
        });
        let txn = match txn {
            Ok(txn) => txn,
            Err(e) => return Err(self.fail("", e)),
        };

        info!(challenge = %id, user = %user, ?action, "membership change requested");

        let result = match action {
            Membership::Join => self.api.join(id, user).await,
            Membership::Leave => self.api.leave(id, user).await,
        };

        let body = match result {
            Ok(body) => body,
            Err(e) => {
                drop(txn);
                warn!(challenge = %id, error = %e, ?action, "membership change failed, rolled back");
                let fallback = match action {
                    Membership::Join => "Failed to join",
                    Membership::Leave => "Failed to leave",
                };
                return Err(self.fail(fallback, e));
            }
        };

        // the server accepted the change, so nothing below may roll it back
        let response: MembershipResponse = decode(&body).unwrap_or_default();
        let members = response
            .participants
            .as_ref()
            .filter(|p| p.is_array() || p.is_number())
            .map(|p| Participants::from_wire(Some(p)));
        let reload = members.is_none();
        txn.commit(|c| {
            if let Some(members) = members {
                c.apply_members(members, user);
            }
        });

        if reload {
            // no member list in the body; ask for the full record
            self.reload(id).await;
        }

        self.notifier.success(match action {
            Membership::Join => "Joined successfully!",
            Membership::Leave => "Left challenge",
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------

    /// Flip one of the current user's tasks.
    ///
    /// Does nothing unless the user is a member and the challenge has not
    /// ended. Progress is never recomputed locally: on success the whole
    /// challenge is re-fetched so per-user and group percentages come from
    /// the server.
    pub async fn toggle_task(&self, id: ChallengeId, task: TaskRef) -> Result<TaskToggle> {
        let user = match self.session.require_user() {
            Ok(u) => u,
            Err(e) => return Err(self.fail("", e)),
        };

        let Some(challenge) = self.challenge(id) else {
            return Err(self.fail("", ClientError::NotLoaded(id)));
        };
        if let Some(reason) = toggle_blocker(&challenge, user) {
            debug!(challenge = %id, ?reason, "task toggle skipped");
            return Ok(TaskToggle::Skipped(reason));
        }
        let Some(index) = challenge.resolve_task(task) else {
            debug!(challenge = %id, ?task, "task toggle skipped, no such task");
            return Ok(TaskToggle::Skipped(SkipReason::UnknownTask));
        };

        let txn = match Optimistic::begin(&self.board, id, |_| {}) {
            Ok(txn) => txn,
            Err(e) => return Err(self.fail("", e)),
        };

        let body = match self.api.toggle_task(id, user, index).await {
            Ok(body) => body,
            Err(e) => {
                drop(txn);
                return Err(self.fail("Failed to update tasks", e));
            }
        };

        if let Some(resp) = decode::<ToggleResponse>(&body) {
            debug!(
                challenge = %id,
                user_progress = ?resp.user_progress,
                group_progress = ?resp.group_progress,
                "task toggled"
            );
        }

        txn.commit(|_| {});
        self.reload(id).await;
        Ok(TaskToggle::Applied)
    }

    // ------------------------------------------------------------------
    // Challenge CRUD
    // ------------------------------------------------------------------

    /// Create a challenge owned by the current user, then reload the list.
    pub async fn create(&self, mut draft: ChallengeDraft) -> Result<()> {
        let user = match self.session.require_user() {
            Ok(u) => u,
            Err(e) => return Err(self.fail("", e)),
        };
        draft.creator_id = user;
        draft.creator_name = self.session.user_name().to_string();

        if let Err(e) = self.api.create_challenge(&draft).await {
            return Err(self.fail("Save failed", e));
        }
        self.notifier.success("Saved");
        self.refresh().await
    }

    pub async fn update(&self, id: ChallengeId, mut draft: ChallengeDraft) -> Result<()> {
        let user = match self.session.require_user() {
            Ok(u) => u,
            Err(e) => return Err(self.fail("", e)),
        };
        draft.creator_id = user;
        draft.creator_name = self.session.user_name().to_string();

        if let Err(e) = self.api.update_challenge(id, &draft).await {
            return Err(self.fail("Save failed", e));
        }
        self.notifier.success("Saved");
        self.refresh().await
    }

    pub async fn delete(&self, id: ChallengeId) -> Result<()> {
        if let Err(e) = self.api.delete_challenge(id).await {
            return Err(self.fail("Delete failed", e));
        }
        lock(&self.board).remove(id);
        self.notifier.success("Deleted");
        self.refresh().await
    }

    // ------------------------------------------------------------------
    // Leaderboard
    // ------------------------------------------------------------------

    pub async fn leaderboard(&self, id: ChallengeId) -> Result<Vec<LeaderRow>> {
        match self.api.leaderboard(id).await {
            Ok(body) => Ok(comment::normalize_leaderboard(&body)),
            Err(e) => Err(self.fail("Failed to load leaderboard", e)),
        }
    }

    /// Turn an error into a notice and hand it back to the caller.
    ///
    /// `fallback` replaces messages for transport failures; server
    /// rejections always show the server's own text.
    fn fail(&self, fallback: &str, e: ClientError) -> ClientError {
        match &e {
            // the control is disabled, nothing to tell the user
            ClientError::InFlight(id) => debug!(challenge = %id, "action ignored, request in flight"),
            ClientError::Transport(_) if !fallback.is_empty() => self.notifier.error(fallback),
            _ => self.notifier.error(e.user_message()),
        }
        e
    }
}

fn toggle_blocker(challenge: &Challenge, user: UserId) -> Option<SkipReason> {
    if !challenge.is_member(user) {
        Some(SkipReason::NotMember)
    } else if challenge.status == ChallengeStatus::Ended {
        Some(SkipReason::Ended)
    } else {
        None
    }
}

/// An open optimistic update on one challenge.
///
/// Dropping it without [`Optimistic::commit`] restores the snapshot taken in
/// [`Optimistic::begin`], so an early return, an error or a cancelled future
/// all roll back the same way.
struct Optimistic<'a> {
    board: &'a Mutex<Board>,
    id: ChallengeId,
    snapshot: Option<Challenge>,
}

impl<'a> Optimistic<'a> {
    fn begin(board: &'a Mutex<Board>, id: ChallengeId, patch: impl FnOnce(&mut Challenge)) -> Result<Self> {
        let mut guard = lock(board);
        if guard.is_pending(id) {
            return Err(ClientError::InFlight(id));
        }
        let challenge = guard.get_mut(id).ok_or(ClientError::NotLoaded(id))?;
        let snapshot = challenge.clone();
        patch(challenge);
        guard.begin(id);

        Ok(Self {
            board,
            id,
            snapshot: Some(snapshot),
        })
    }

    /// Settle with server truth applied on top of the current local copy.
    fn commit(mut self, reconcile: impl FnOnce(&mut Challenge)) {
        self.snapshot = None;
        let mut guard = lock(self.board);
        if let Some(challenge) = guard.get_mut(self.id) {
            reconcile(challenge);
        }
        guard.finish(self.id);
    }
}

impl Drop for Optimistic<'_> {
    fn drop(&mut self) {
        let mut guard = lock(self.board);
        if let Some(snapshot) = self.snapshot.take() {
            match guard.get_mut(self.id) {
                Some(challenge) => *challenge = snapshot,
                None => guard.upsert(snapshot),
            }
            debug!(challenge = %self.id, "optimistic update rolled back");
        }
        guard.finish(self.id);
    }
}
