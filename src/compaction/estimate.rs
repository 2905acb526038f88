//! Token estimation over conversation messages.

use super::CHARS_PER_TOKEN;
use crate::conversation::ConversationMessage;

/// Estimated tokens for one message: its character weight divided by the
/// chars-per-token constant, rounded up.
pub fn estimate_message_tokens(message: &ConversationMessage) -> usize {
    message.estimated_chars().div_ceil(CHARS_PER_TOKEN)
}

/// Estimated tokens for a whole transcript.
///
/// Summed per message so the figure matches what the prune walk sees; the
/// result carries the usual safety margin of over-counting a few tokens on
/// message boundaries.
pub fn estimate_tokens(messages: &[ConversationMessage]) -> usize {
    messages.iter().map(estimate_message_tokens).sum()
}
