//! Session-scoped reconciliation state.
//!
//! Everything a review session accumulates lives in one [`SessionState`]
//! owned by the caller and passed by reference into each operation, never
//! process-wide statics, so parallel sessions (and tests) cannot leak
//! state into one another. A session dies with its run; the only thing
//! carried forward is the checkpoint marker embedded in the posted summary.

use std::collections::{BTreeSet, HashSet};
use uuid::Uuid;

/// Accumulated token/cost figures, rendered into the summary footer's
/// billing line.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
}

impl TokenUsage {
    pub fn add(&mut self, other: TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.cost_usd += other.cost_usd;
    }

    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Running counters the compactor reports in its state-summary message.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionCounters {
    pub inline_comments: u32,
    pub suggestions: u32,
    pub summary_posted: bool,
}

/// File paths touched over the session, grouped by how they were consumed.
/// Consulted (not owned) by the compactor when synthesizing its
/// state-summary message.
#[derive(Debug, Clone, Default)]
pub struct ContextState {
    pub files_read: BTreeSet<String>,
    pub files_diffed: BTreeSet<String>,
    /// Reads that were cut short by output limits.
    pub files_truncated: BTreeSet<String>,
    /// Reads that covered only a slice of the file.
    pub files_partial: BTreeSet<String>,
}

impl ContextState {
    pub fn record_read(&mut self, path: impl Into<String>) {
        self.files_read.insert(path.into());
    }

    pub fn record_diff(&mut self, path: impl Into<String>) {
        self.files_diffed.insert(path.into());
    }

    pub fn record_truncated_read(&mut self, path: impl Into<String>) {
        let path = path.into();
        self.files_truncated.insert(path.clone());
        self.files_read.insert(path);
    }

    pub fn record_partial_read(&mut self, path: impl Into<String>) {
        let path = path.into();
        self.files_partial.insert(path.clone());
        self.files_read.insert(path);
    }
}

/// All mutable state for one review session.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Correlation id for log lines.
    pub session_id: Uuid,
    /// Head commit under review; embedded in the summary marker as the next
    /// session's checkpoint.
    pub head_sha: String,
    /// Dedup keys of comments posted this session plus those recovered from
    /// the pre-session listing.
    pub posted_keys: HashSet<String>,
    pub counters: SessionCounters,
    pub context: ContextState,
    pub usage: TokenUsage,
}

impl SessionState {
    pub fn new(head_sha: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            head_sha: head_sha.into(),
            posted_keys: HashSet::new(),
            counters: SessionCounters::default(),
            context: ContextState::default(),
            usage: TokenUsage::default(),
        }
    }
}
