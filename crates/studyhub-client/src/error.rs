use thiserror::Error;

use studyhub_shared::ChallengeId;
use studyhub_store::StoreError;

#[derive(Debug, Error)]
pub enum ClientError {
    /// No user is logged in; nothing was sent.
    #[error("Not logged in")]
    Unauthenticated,

    /// Another join/leave/toggle for this challenge is still running.
    #[error("A request for challenge {0} is already in flight")]
    InFlight(ChallengeId),

    /// The challenge is not in the locally loaded list.
    #[error("Challenge {0} is not loaded")]
    NotLoaded(ChallengeId),

    /// The server answered with a non-success status.
    #[error("Server rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Request timed out")]
    Timeout,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(e.to_string())
        }
    }
}

impl ClientError {
    /// Text for the transient notification shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthenticated => "Please login first".into(),
            Self::InFlight(_) => "Please wait for the previous action to finish".into(),
            Self::NotLoaded(_) => "Challenge not found".into(),
            Self::Rejected { message, .. } => message.clone(),
            Self::Timeout => "The server took too long to answer, please retry".into(),
            Self::Transport(_) => "Could not reach the server, please retry".into(),
            Self::InvalidInput(msg) => msg.clone(),
            Self::Store(_) => "Local storage error".into(),
        }
    }

    /// Whether simply repeating the action may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::Transport(_) | Self::InFlight(_) => true,
            Self::Rejected { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_shows_server_detail() {
        let e = ClientError::Rejected {
            status: 400,
            message: "Challenge full".into(),
        };
        assert_eq!(e.user_message(), "Challenge full");
        assert!(!e.is_retryable());
    }

    #[test]
    fn test_retryable_classes() {
        assert!(ClientError::Timeout.is_retryable());
        assert!(ClientError::Transport("reset".into()).is_retryable());
        assert!(ClientError::Rejected { status: 503, message: String::new() }.is_retryable());
        assert!(!ClientError::Unauthenticated.is_retryable());
    }
}
