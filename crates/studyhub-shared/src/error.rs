use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SharedError {
    #[error("Unknown challenge level: {0}")]
    UnknownLevel(String),

    #[error("Unknown challenge status: {0}")]
    UnknownStatus(String),

    #[error("Invalid identifier: {0}")]
    InvalidId(String),
}
