//! `studyhub` subcommand handlers.
//!
//! Each sub-module groups related commands by domain. Handlers print their
//! result to stdout; notifications raised along the way are printed by
//! [`Context::flush_notices`] after every command.

pub mod challenges;
pub mod comments;
pub mod focus;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;

use studyhub_client::{
    ClientConfig, CommentThread, HttpApi, Notice, NoticeKind, Notifier, Reconciler, Session,
};
use studyhub_shared::ChallengeId;
use studyhub_store::{Counters, Database};

/// Everything a command needs, built once from [`ClientConfig`].
pub struct Context {
    pub config: ClientConfig,
    pub reconciler: Reconciler<HttpApi>,
    notices: mpsc::UnboundedReceiver<Notice>,
}

impl Context {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let api = Arc::new(HttpApi::new(&config)?);
        let session = Session::new(config.user_id, config.user_name.clone());
        let (notifier, notices) = Notifier::channel();

        tracing::debug!(api = %config.api_url, user = ?session.user_id(), "client context ready");

        Ok(Self {
            reconciler: Reconciler::new(api, session, notifier),
            config,
            notices,
        })
    }

    pub fn comment_thread(&self, challenge: ChallengeId) -> CommentThread<HttpApi> {
        CommentThread::new(
            self.reconciler.api(),
            self.reconciler.session().clone(),
            challenge,
            self.reconciler.notifier().clone(),
        )
    }

    /// Open the local store holding the streak and plant counters.
    pub fn counters(&self) -> Result<Counters<Database>> {
        let db = match &self.config.db_path {
            Some(path) => Database::open_at(path)?,
            None => Database::new()?,
        };
        Ok(Counters::new(db))
    }

    /// Print every notification emitted so far.
    pub fn flush_notices(&mut self) {
        while let Ok(notice) = self.notices.try_recv() {
            match notice.kind {
                NoticeKind::Success => println!("✔ {}", notice.text),
                NoticeKind::Error => eprintln!("✖ {}", notice.text),
            }
        }
    }
}
