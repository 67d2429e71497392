//! Conversation state and prompt construction for the suggestion engine
//!
//! The seed turn carries the output-format contract and a sample of liked songs.
//! Every follow-up turn asks for a fresh batch and echoes back, verbatim, everything
//! the engine has already suggested this session.

use super::model::Candidate;
use crate::catalog::TrackRef;
use crate::core::llm::{ChatMessage, Role};
use std::fmt::Display;

pub const NONE_SUGGESTED_PLACEHOLDER: &str = "(None previously suggested in this session)";

/// Ordered user/assistant turns. Grows by one entry per turn and is never pruned.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(content));
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn ends_with_user(&self) -> bool {
        matches!(self.messages.last(), Some(m) if m.role == Role::User)
    }
}

fn song_lines<T: Display>(songs: &[T]) -> String {
    songs
        .iter()
        .map(|s| format!("- {}", s))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn initial_prompt(seed: &[TrackRef], target: usize) -> String {
    format!(
        "You are a music recommendation assistant. I will provide you with a list of songs I like.\n\
         Based on this list, please recommend {target} additional songs that I might enjoy.\n\
         It's important that your response is ONLY a valid JSON array of objects, where each object has a \"track\" key (song title) and an \"artist\" key (artist name). \
         A JSON object with a single key whose value is that array is also acceptable.\n\
         Do not include any other text, explanations, or markdown formatting outside of the JSON.\n\n\
         Here are some songs I like:\n\
         {songs}\n\n\
         Please provide {target} new song recommendations in the specified JSON format.",
        target = target,
        songs = song_lines(seed),
    )
}

pub fn follow_up_prompt(session_suggestions: &[Candidate], target: usize) -> String {
    let avoid = if session_suggestions.is_empty() {
        NONE_SUGGESTED_PLACEHOLDER.to_string()
    } else {
        song_lines(session_suggestions)
    };

    format!(
        "Okay, thank you. Now, please provide {target} MORE unique song recommendations based on the initial list of songs I like (provided at the start of our conversation).\n\
         It is very important that these new recommendations are different from any songs you've already suggested to me in this conversation. \
         For reference, here are the songs you've suggested so far (please avoid these):\n\
         {avoid}\n\n\
         Also, ensure these new recommendations are different from the initial list of liked songs I provided.\n\
         Your response must be ONLY a valid JSON array of objects, with \"track\" and \"artist\" keys, as before.",
        target = target,
        avoid = avoid,
    )
}
