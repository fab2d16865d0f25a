use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("could not connect: {0}")]
    Connect(String),
    #[error("could not publish {label}: {reason}")]
    Publish { label: String, reason: String },
    #[error("could not toggle speaker: {0}")]
    Speaker(String),
    #[error("session is not running")]
    NotRunning,
}
