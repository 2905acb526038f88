//! Conversation message types for the review agent loop.
//!
//! A session transcript is an ordered `Vec<ConversationMessage>`. Each
//! message carries a role and a list of typed content parts mirroring the
//! model provider's content-block shape, so tool traffic stays structured
//! all the way to the compactor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who authored a message in the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// One typed block inside a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },

    Thinking { text: String },

    ToolCall {
        name: String,
        #[serde(default)]
        arguments: Value,
        #[serde(default)]
        id: String,
    },

    ToolResult {
        name: String,
        output: String,
        #[serde(default)]
        is_error: bool,
    },
}

impl ContentPart {
    /// Character weight of this part for context estimation. Textual and
    /// thinking parts count their text; structured parts fall back to the
    /// length of their serialized form.
    pub fn estimated_chars(&self) -> usize {
        match self {
            ContentPart::Text { text } | ContentPart::Thinking { text } => text.chars().count(),
            other => serde_json::to_string(other).map(|s| s.len()).unwrap_or(0),
        }
    }

    /// Visible text of this part, if it has any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentPart::Text { text } | ContentPart::Thinking { text } => Some(text),
            ContentPart::ToolResult { output, .. } => Some(output),
            ContentPart::ToolCall { .. } => None,
        }
    }
}

/// A single turn in the session transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub parts: Vec<ContentPart>,
    pub timestamp: DateTime<Utc>,
}

impl ConversationMessage {
    pub fn new(role: Role, parts: Vec<ContentPart>) -> Self {
        Self {
            role,
            parts,
            timestamp: Utc::now(),
        }
    }

    /// Convenience constructor for a plain text message.
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self::new(role, vec![ContentPart::Text { text: text.into() }])
    }

    /// Character weight of the whole message for context estimation.
    pub fn estimated_chars(&self) -> usize {
        self.parts.iter().map(ContentPart::estimated_chars).sum()
    }

    /// All visible text joined with newlines. Empty string when the message
    /// has no textual parts.
    pub fn joined_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(ContentPart::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
