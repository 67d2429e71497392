use super::conversation::Conversation;
use super::parser::{parse_reply, ReplyContent};
use crate::core::errors::{RecommendError, RecommendResult};
use crate::core::llm::SuggestionEngine;

/// A reply obtained from the engine: the raw text plus what could be read from it.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineReply {
    pub raw: String,
    pub content: ReplyContent,
}

/// Send the conversation to the engine and parse the reply.
///
/// The conversation must end with a user turn; anything else is a `Protocol` error
/// raised before any network traffic. Transport failures are returned as `Err` and
/// leave the conversation untouched. Parse failures are *not* errors here: the raw
/// text comes back so the caller can record it as an assistant turn.
pub async fn request_suggestions(
    engine: &dyn SuggestionEngine,
    conversation: &Conversation,
) -> RecommendResult<EngineReply> {
    if !conversation.ends_with_user() {
        return Err(RecommendError::Protocol(
            "conversation is empty or does not end with a user turn".to_string(),
        ));
    }

    let raw = engine.complete(conversation.messages()).await?;
    let content = parse_reply(&raw);

    if let ReplyContent::ParseFailure(reason) = &content {
        tracing::warn!("[SuggestionEngine] {}", RecommendError::Parse(reason.clone()));
        tracing::debug!("[SuggestionEngine] Raw reply:\n{}", raw);
    }

    Ok(EngineReply { raw, content })
}
