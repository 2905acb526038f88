//! Strict entity types for source-control provider data.
//!
//! Everything the reconciliation core consumes from a host is normalized
//! into these types at the boundary (see `super::normalize`); downstream
//! logic never branches on provider-specific field presence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Change status of a file in a diff listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    Modified,
    Removed,
    Renamed,
    Copied,
    Changed,
}

/// One file in a PR or comparison diff listing.
///
/// Immutable once fetched; scoped subsets are cloned, never mutated in
/// place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangedFile {
    /// Unique key within a listing.
    pub filename: String,
    /// Prior path for renames.
    #[serde(default)]
    pub previous_filename: Option<String>,
    pub status: FileStatus,
    pub additions: u32,
    pub deletions: u32,
    pub changes: u32,
    /// Unified-diff text; absent for binary or too-large files.
    #[serde(default)]
    pub patch: Option<String>,
}

/// Which side of a diff a review comment anchors to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Left,
    Right,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Left => write!(f, "LEFT"),
            Side::Right => write!(f, "RIGHT"),
        }
    }
}

impl std::str::FromStr for Side {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "LEFT" => Ok(Side::Left),
            "RIGHT" => Ok(Side::Right),
            other => anyhow::bail!("unknown diff side: {other}"),
        }
    }
}

/// Whether a comment came through the issue or the review channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentKind {
    Issue,
    Review,
}

/// A comment already present on the PR at session start.
///
/// Fetched fresh every session; never mutated by this core, only read to
/// build indices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExistingComment {
    /// Provider-assigned id, unique across the PR.
    pub id: u64,
    pub author: String,
    pub body: String,
    pub url: String,
    pub kind: CommentKind,
    /// Review comments only.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub side: Option<Side>,
    /// Root comment id this one replies to, if any.
    #[serde(default)]
    pub in_reply_to: Option<u64>,
    /// Used for activity ordering.
    pub updated_at: DateTime<Utc>,
}

impl ExistingComment {
    /// True for review comments without a reply parent.
    pub fn is_review_root(&self) -> bool {
        self.kind == CommentKind::Review && self.in_reply_to.is_none()
    }
}

/// A provider-side discussion thread: a root review comment plus replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewThread {
    pub id: String,
    pub path: String,
    #[serde(default)]
    pub line: Option<u32>,
    pub side: Side,
    pub is_outdated: bool,
    pub is_resolved: bool,
    pub last_updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_actor: Option<String>,
    #[serde(default)]
    pub root_comment_id: Option<u64>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Ancestry relationship reported by a base..head comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareStatus {
    /// head is ahead of base.
    Ahead,
    /// head is behind base.
    Behind,
    /// Both sides carry unique commits.
    Diverged,
    /// Nothing between the refs.
    Identical,
}

/// Result of comparing the recorded checkpoint against the current head.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comparison {
    pub status: CompareStatus,
    pub files: Vec<ChangedFile>,
}

/// Provider acknowledgement of a created comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedComment {
    pub id: u64,
    pub url: String,
}
