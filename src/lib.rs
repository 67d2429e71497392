//! Tunesmith - LLM-driven music recommendations
//!
//! This library seeds a chat-completion model with a sample of the user's liked
//! songs, verifies every suggestion against the music catalog, filters out songs the
//! user already knows or was already offered, and publishes the result to two
//! playlists.

pub mod catalog;
mod config;
pub mod core;
pub mod recommend;
pub mod utils;

pub mod cli;

pub use crate::config::{
    CatalogConfig, Credentials, LLMConfig, LoggingConfig, PacingConfig, RecommendConfig, Settings,
};
pub use crate::core::errors::{RecommendError, RecommendResult};
pub use crate::core::llm::{ChatMessage, LLMClient, Role, SuggestionEngine};
pub use recommend::{run_session, RunOutcome};
