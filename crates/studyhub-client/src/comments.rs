//! Comment thread of one challenge, with optional background polling.
//!
//! Every fetch carries the thread's generation number. [`CommentThread::close`]
//! bumps the generation, so a response that arrives after the thread was
//! closed is dropped instead of applied.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use studyhub_shared::comment::normalize_comments;
use studyhub_shared::{ChallengeId, Comment, CommentId};

use crate::api::ChallengeApi;
use crate::error::{ClientError, Result};
use crate::events::Notifier;
use crate::state::Session;

#[derive(Debug, Default)]
struct ThreadState {
    comments: Vec<Comment>,
    generation: u64,
    closed: bool,
}

struct Poller {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

pub struct CommentThread<A> {
    api: Arc<A>,
    session: Session,
    challenge: ChallengeId,
    notifier: Notifier,
    state: Arc<Mutex<ThreadState>>,
    poller: Mutex<Option<Poller>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<A: ChallengeApi + 'static> CommentThread<A> {
    pub fn new(api: Arc<A>, session: Session, challenge: ChallengeId, notifier: Notifier) -> Self {
        Self {
            api,
            session,
            challenge,
            notifier,
            state: Arc::new(Mutex::new(ThreadState::default())),
            poller: Mutex::new(None),
        }
    }

    pub fn challenge(&self) -> ChallengeId {
        self.challenge
    }

    /// Comments currently shown, oldest first.
    pub fn comments(&self) -> Vec<Comment> {
        lock(&self.state).comments.clone()
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }

    /// Re-fetch the thread.
    pub async fn refresh(&self) -> Result<()> {
        load(self.api.as_ref(), self.challenge, &self.state)
            .await
            .map_err(|e| {
                self.notifier.error(e.user_message());
                e
            })
    }

    pub async fn add(&self, content: &str) -> Result<()> {
        let content = content.trim();
        if content.is_empty() {
            return Err(self.fail(ClientError::InvalidInput("Comment cannot be empty".into())));
        }
        let user = self.session.require_user().map_err(|e| self.fail(e))?;

        self.api
            .add_comment(self.challenge, user, content)
            .await
            .map_err(|e| self.fail(e))?;
        info!(challenge = %self.challenge, user = %user, "comment added");
        self.notifier.success("Comment added");
        self.refresh().await
    }

    pub async fn edit(&self, comment: CommentId, content: &str) -> Result<()> {
        let content = content.trim();
        if content.is_empty() {
            return Err(self.fail(ClientError::InvalidInput("Comment cannot be empty".into())));
        }
        self.session.require_user().map_err(|e| self.fail(e))?;

        self.api
            .edit_comment(comment, content)
            .await
            .map_err(|e| self.fail(e))?;
        self.notifier.success("Comment updated");
        self.refresh().await
    }

    pub async fn delete(&self, comment: CommentId) -> Result<()> {
        self.session.require_user().map_err(|e| self.fail(e))?;
        self.api
            .delete_comment(comment)
            .await
            .map_err(|e| self.fail(e))?;
        self.notifier.success("Comment deleted");
        self.refresh().await
    }

    /// Re-fetch the thread every `every` until [`Self::close`]. Replaces a
    /// poller that is already running.
    pub fn start_polling(&self, every: Duration) {
        if self.is_closed() {
            return;
        }
        let (stop, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(poll_loop(
            Arc::clone(&self.api),
            self.challenge,
            Arc::clone(&self.state),
            stop_rx,
            every,
        ));
        if let Some(old) = lock(&self.poller).replace(Poller { stop, handle }) {
            old.halt();
        }
        debug!(challenge = %self.challenge, ?every, "comment polling started");
    }

    fn fail(&self, e: ClientError) -> ClientError {
        self.notifier.error(e.user_message());
        e
    }
}

impl<A> CommentThread<A> {
    /// Stop polling and discard any response still on its way.
    pub fn close(&self) {
        {
            let mut state = lock(&self.state);
            if state.closed {
                return;
            }
            state.closed = true;
            state.generation += 1;
        }
        if let Some(poller) = lock(&self.poller).take() {
            poller.halt();
        }
        debug!(challenge = %self.challenge, "comment thread closed");
    }
}

impl<A> Drop for CommentThread<A> {
    fn drop(&mut self) {
        self.close();
    }
}

impl Poller {
    fn halt(self) {
        // the receiver may already be gone if the task ended
        let _ = self.stop.send(true);
        self.handle.abort();
    }
}

async fn load<A: ChallengeApi + ?Sized>(
    api: &A,
    challenge: ChallengeId,
    state: &Mutex<ThreadState>,
) -> Result<()> {
    let generation = {
        let state = lock(state);
        if state.closed {
            return Ok(());
        }
        state.generation
    };

    let body = api.list_comments(challenge).await?;
    let comments = normalize_comments(&body);

    let mut state = lock(state);
    if state.closed || state.generation != generation {
        debug!(challenge = %challenge, "stale comment response dropped");
        return Ok(());
    }
    state.comments = comments;
    Ok(())
}

async fn poll_loop<A: ChallengeApi>(
    api: Arc<A>,
    challenge: ChallengeId,
    state: Arc<Mutex<ThreadState>>,
    mut stop: watch::Receiver<bool>,
    every: Duration,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately; the caller already loaded once
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = stop.changed() => break,
        }
        if *stop.borrow() {
            break;
        }
        if let Err(e) = load(api.as_ref(), challenge, &state).await {
            warn!(challenge = %challenge, error = %e, "comment poll failed");
        }
    }
    debug!(challenge = %challenge, "comment poller stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Calls, FakeApi, Reply};
    use serde_json::json;
    use studyhub_shared::UserId;
    use tokio::sync::Notify;

    fn thread(api: FakeApi) -> (CommentThread<FakeApi>, Arc<FakeApi>, tokio::sync::mpsc::UnboundedReceiver<crate::events::Notice>) {
        let api = Arc::new(api);
        let (notifier, rx) = Notifier::channel();
        let t = CommentThread::new(
            Arc::clone(&api),
            Session::new(Some(UserId(5)), "Sara"),
            ChallengeId(1),
            notifier,
        );
        (t, api, rx)
    }

    fn one_comment(text: &str) -> serde_json::Value {
        json!([{"id": 1, "user_id": 5, "content": text, "timestamp": "2025-03-10T09:00:00"}])
    }

    #[tokio::test]
    async fn test_add_refetches_and_notifies() {
        let api = FakeApi::default();
        FakeApi::set(&api.comments, one_comment("hello"));
        let (t, api, mut rx) = thread(api);

        t.add("  hello ").await.unwrap();

        assert_eq!(Calls::count(&api.calls.comment_writes), 1);
        assert_eq!(t.comments()[0].content, "hello");
        assert_eq!(rx.try_recv().unwrap().text, "Comment added");
    }

    #[tokio::test]
    async fn test_empty_comment_is_refused() {
        let (t, api, mut rx) = thread(FakeApi::default());

        let err = t.add("   ").await.unwrap_err();

        assert!(matches!(err, ClientError::InvalidInput(_)));
        assert_eq!(Calls::count(&api.calls.comment_writes), 0);
        assert_eq!(rx.try_recv().unwrap().text, "Comment cannot be empty");
    }

    #[tokio::test]
    async fn test_anonymous_cannot_comment() {
        let api = Arc::new(FakeApi::default());
        let t = CommentThread::new(Arc::clone(&api), Session::anonymous(), ChallengeId(1), Notifier::silent());

        assert!(matches!(t.add("hi").await, Err(ClientError::Unauthenticated)));
        assert!(matches!(
            t.edit(CommentId(1), "changed").await,
            Err(ClientError::Unauthenticated)
        ));
        assert!(matches!(t.delete(CommentId(1)).await, Err(ClientError::Unauthenticated)));
        assert_eq!(Calls::count(&api.calls.comment_writes), 0);
    }

    #[tokio::test]
    async fn test_rejected_delete_keeps_thread() {
        let api = FakeApi::default();
        FakeApi::set(&api.comments, one_comment("keep me"));
        FakeApi::set(&api.comment_write, Reply::Reject(404, "Comment not found"));
        let (t, _api, mut rx) = thread(api);
        t.refresh().await.unwrap();

        assert!(t.delete(CommentId(1)).await.is_err());

        assert_eq!(t.comments().len(), 1);
        assert_eq!(rx.try_recv().unwrap().text, "Comment not found");
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_stops_on_close() {
        let api = FakeApi::default();
        FakeApi::set(&api.comments, one_comment("first"));
        let (t, api, _rx) = thread(api);

        t.start_polling(Duration::from_secs(10));
        tokio::time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(Calls::count(&api.calls.comments), 1);
        assert_eq!(t.comments()[0].content, "first");

        t.close();
        FakeApi::set(&api.comments, one_comment("late"));
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(Calls::count(&api.calls.comments), 1);
        assert_eq!(t.comments()[0].content, "first");
    }

    #[tokio::test]
    async fn test_response_after_close_is_dropped() {
        let gate = Arc::new(Notify::new());
        let api = FakeApi {
            comments_gate: Some(Arc::clone(&gate)),
            ..FakeApi::default()
        };
        FakeApi::set(&api.comments, one_comment("late"));
        let (t, _api, _rx) = thread(api);

        let (result, _) = tokio::join!(t.refresh(), async {
            t.close();
            gate.notify_one();
        });

        assert!(result.is_ok());
        assert!(t.comments().is_empty());
    }
}
