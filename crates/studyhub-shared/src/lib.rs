//! # studyhub-shared
//!
//! Domain types shared by the StudyHub+ store and client crates: challenge
//! records in their canonical in-memory shape, the decoder that turns every
//! accepted server payload shape into that canonical form, and the small
//! date-keyed rules (lifecycle status, login streak, plant growth).

pub mod challenge;
pub mod comment;
pub mod constants;
pub mod error;
pub mod growth;
pub mod protocol;
pub mod streak;
pub mod types;

pub use challenge::{normalize, normalize_all, Challenge, Participants, Task, TaskRef, UserProgress};
pub use comment::{Comment, LeaderRow};
pub use error::SharedError;
pub use types::{ChallengeId, ChallengeStatus, CommentId, Level, UserId};
