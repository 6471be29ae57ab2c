//! # studyhub-client
//!
//! Client side of StudyHub+: talks to the REST backend, keeps the loaded
//! challenge list consistent with the server across optimistic join/leave
//! updates, follows comment threads, and drives the `studyhub` CLI.

pub mod api;
pub mod comments;
pub mod config;
pub mod error;
pub mod events;
pub mod reconciler;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{ChallengeApi, HttpApi};
pub use comments::CommentThread;
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use events::{Notice, NoticeKind, Notifier};
pub use reconciler::{Reconciler, SkipReason, TaskToggle};
pub use state::{Board, Session};

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global tracing subscriber, writing to stderr.
///
/// `RUST_LOG` wins when set; otherwise `verbose` selects between the
/// crate-scoped debug and info defaults.
pub fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("studyhub_client=debug,studyhub_store=debug,warn")
        } else {
            EnvFilter::new("studyhub_client=info,studyhub_store=info,warn")
        }
    });

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
