//! Error taxonomy for a recommendation run
//!
//! Information Hiding:
//! - Collaborator-specific failures (HTTP, JSON, auth) collapse into a handful of kinds
//! - The collection loop only decides on the kind, never on the underlying cause

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecommendError {
    /// Network or HTTP failure talking to the catalog or the suggestion engine.
    #[error("transport error: {0}")]
    Transport(String),

    /// Engine output could not be read as structured data, even after cleanup.
    #[error("parse error: {0}")]
    Parse(String),

    /// A single suggested entry is missing a required field.
    #[error("validation error: {0}")]
    Validation(String),

    /// The conversation invariant was violated. Always fatal to the run.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Settings the run cannot start with, such as a zero target.
    #[error("configuration error: {0}")]
    Config(String),
}

impl RecommendError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Protocol(_) | Self::Config(_))
    }
}

impl From<reqwest::Error> for RecommendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Transport(format!("request timed out: {}", e))
        } else {
            Self::Transport(e.to_string())
        }
    }
}

pub type RecommendResult<T> = std::result::Result<T, RecommendError>;
