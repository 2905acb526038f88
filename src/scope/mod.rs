//! Review scope resolution across re-runs.
//!
//! Given the checkpoint recorded by a prior session (recovered from the
//! hidden marker in its summary comment) and the current head, decide
//! whether there is new, reviewable content and what it is. History
//! rewrites (force-push, rebase, merge) surface as a vanished comparison
//! base and are tolerated, not failed.
//!
//! ## Decision matrix
//!
//! | Condition                       | Action        | Reason                |
//! |---------------------------------|---------------|-----------------------|
//! | checkpoint == head              | SkipConfident | BaseEqualsHead        |
//! | no checkpoint recorded          | Review        | NoPreviousCheckpoint  |
//! | comparison base not found       | Review        | CompareNotFound       |
//! | comparison reports no files     | Review        | CompareEmpty          |
//! | clean ancestor relationship     | Review        | Scoped                |
//! | histories diverged              | Review        | DivergedScoped        |
//!
//! On a scoped match the returned entries come from the fallback (PR) list,
//! never from the comparison: a diverged comparison range may include
//! unrelated base-branch commits, so the comparison determines *which
//! filenames* are new since the checkpoint while the PR's own diff supplies
//! the hunks.

use crate::errors::ProviderError;
use crate::provider::{ChangedFile, CompareStatus, PullRequestHost};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Whether to launch a review session at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeAction {
    Review,
    SkipConfident,
}

/// Closed reason-code set for scope decisions; exhaustiveness is checked at
/// compile time wherever decisions are consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeReason {
    BaseEqualsHead,
    NoPreviousCheckpoint,
    CompareNotFound,
    CompareEmpty,
    Scoped,
    DivergedScoped,
}

impl std::fmt::Display for ScopeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = match self {
            ScopeReason::BaseEqualsHead => "base_equals_head_skip",
            ScopeReason::NoPreviousCheckpoint => "no_previous_checkpoint_review_full",
            ScopeReason::CompareNotFound => "compare_not_found_review_full",
            ScopeReason::CompareEmpty => "compare_empty_review_full",
            ScopeReason::Scoped => "scoped_review",
            ScopeReason::DivergedScoped => "diverged_scoped_review",
        };
        write!(f, "{code}")
    }
}

/// The resolver's verdict for this run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeDecision {
    pub action: ScopeAction,
    pub reason: ScopeReason,
    /// Human-readable explanation for the run log.
    pub detail: String,
    /// Files to review; empty exactly when `action` is `SkipConfident`.
    pub files: Vec<ChangedFile>,
    pub warning: Option<String>,
}

impl ScopeDecision {
    fn new(action: ScopeAction, reason: ScopeReason, detail: impl Into<String>) -> Self {
        Self {
            action,
            reason,
            detail: detail.into(),
            files: Vec::new(),
            warning: None,
        }
    }

    fn with_files(mut self, files: Vec<ChangedFile>) -> Self {
        self.files = files;
        self
    }

    fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warning = Some(warning.into());
        self
    }

    /// Body for the "nothing new to review" notice the caller posts when
    /// the session is skipped.
    pub fn notice_body(&self) -> String {
        format!(
            "No new changes since the last review ({}). Skipping this run.",
            self.detail
        )
    }
}

/// Resolve what this session should review.
///
/// `fallback` is the PR's own diff listing, fetched by the caller before
/// resolution. Comparison failures other than a vanished base propagate
/// unchanged.
pub async fn resolve_scope(
    host: &dyn PullRequestHost,
    checkpoint: Option<&str>,
    head: &str,
    fallback: &[ChangedFile],
) -> Result<ScopeDecision, ProviderError> {
    let checkpoint = match checkpoint {
        Some(cp) if cp == head => {
            info!(head, "checkpoint equals head, skipping review");
            return Ok(ScopeDecision::new(
                ScopeAction::SkipConfident,
                ScopeReason::BaseEqualsHead,
                format!("head {head} already reviewed"),
            ));
        }
        Some(cp) => cp,
        None => {
            info!(head, "no previous checkpoint, reviewing full PR diff");
            return Ok(ScopeDecision::new(
                ScopeAction::Review,
                ScopeReason::NoPreviousCheckpoint,
                "first review of this pull request",
            )
            .with_files(fallback.to_vec()));
        }
    };

    let comparison = match host.compare(checkpoint, head).await {
        Ok(comparison) => comparison,
        Err(err) if err.is_not_found() => {
            warn!(checkpoint, "comparison base vanished, reviewing full PR diff");
            return Ok(ScopeDecision::new(
                ScopeAction::Review,
                ScopeReason::CompareNotFound,
                format!("checkpoint {checkpoint} is no longer reachable"),
            )
            .with_files(fallback.to_vec())
            .with_warning(
                "previous checkpoint no longer exists; reviewing full PR diff",
            ));
        }
        Err(err) => return Err(err),
    };

    if comparison.files.is_empty() {
        info!(checkpoint, head, "comparison reported no changed files");
        return Ok(ScopeDecision::new(
            ScopeAction::Review,
            ScopeReason::CompareEmpty,
            format!("comparison {checkpoint}..{head} reported no files"),
        )
        .with_files(fallback.to_vec()));
    }

    let compared: std::collections::HashSet<&str> = comparison
        .files
        .iter()
        .map(|f| f.filename.as_str())
        .collect();
    let scoped: Vec<ChangedFile> = fallback
        .iter()
        .filter(|f| compared.contains(f.filename.as_str()))
        .cloned()
        .collect();

    if comparison.status == CompareStatus::Diverged {
        // A diverged comparison with no overlap usually means prior PR
        // files were reverted upstream; fall back to the full PR diff so
        // the run still reviews something visible.
        let files = if scoped.is_empty() {
            fallback.to_vec()
        } else {
            scoped
        };
        info!(
            checkpoint,
            head,
            files = files.len(),
            "histories diverged, scoping to current PR diff"
        );
        return Ok(ScopeDecision::new(
            ScopeAction::Review,
            ScopeReason::DivergedScoped,
            format!("histories diverged since {checkpoint}"),
        )
        .with_files(files)
        .with_warning("scoped to current PR diff"));
    }

    info!(
        checkpoint,
        head,
        files = scoped.len(),
        "scoped review of files changed since checkpoint"
    );
    Ok(ScopeDecision::new(
        ScopeAction::Review,
        ScopeReason::Scoped,
        format!("{} file(s) changed since {checkpoint}", scoped.len()),
    )
    .with_files(scoped))
}
