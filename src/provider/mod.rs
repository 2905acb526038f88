//! Collaborator interfaces for the source-control host and model provider.
//!
//! The reconciliation core never talks HTTP itself. Host adapters implement
//! [`PullRequestHost`] on top of whatever REST/GraphQL client they own and
//! are expected to wrap each network call in `crate::retry::with_retries`;
//! this module consumes their typed results only.
//!
//! ## Components
//!
//! - [`types`]: strict entity types (files, comments, threads, comparisons)
//! - [`normalize`]: boundary conversion from loosely-typed provider JSON

pub mod normalize;
pub mod types;

pub use types::{
    ChangedFile, CommentKind, CompareStatus, Comparison, CreatedComment, ExistingComment,
    FileStatus, ReviewThread, Side,
};

use crate::errors::ProviderError;
use async_trait::async_trait;
use tracing::debug;

/// Source-control host operations the core depends on.
///
/// All listing calls return the full (pre-paginated) result set; pagination
/// is the adapter's concern.
#[async_trait]
pub trait PullRequestHost: Send + Sync {
    /// Diff listing for the whole pull request.
    async fn list_pr_files(&self) -> Result<Vec<ChangedFile>, ProviderError>;

    /// Diff listing for a base..head comparison. Fails with
    /// `ProviderError::NotFound` when `base` is no longer reachable.
    async fn compare(&self, base: &str, head: &str) -> Result<Comparison, ProviderError>;

    async fn list_issue_comments(&self) -> Result<Vec<ExistingComment>, ProviderError>;

    async fn list_review_comments(&self) -> Result<Vec<ExistingComment>, ProviderError>;

    /// Thread listing, when the host can serve it. `Ok(None)` signals that
    /// thread data is unavailable and threads must be synthesized from the
    /// flat review-comment list.
    async fn list_review_threads(&self) -> Result<Option<Vec<ReviewThread>>, ProviderError>;

    /// Create a new top-level review comment anchored at a diff location.
    async fn create_review_comment(
        &self,
        path: &str,
        line: u32,
        side: Side,
        body: &str,
    ) -> Result<CreatedComment, ProviderError>;

    /// Reply under an existing review comment's thread.
    async fn reply_to_comment(
        &self,
        comment_id: u64,
        body: &str,
    ) -> Result<CreatedComment, ProviderError>;

    /// Create a PR-level (issue) comment.
    async fn create_issue_comment(&self, body: &str) -> Result<CreatedComment, ProviderError>;
}

/// Minimal completion interface used for compaction summarization.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// The three read-only listings fetched once at session start.
#[derive(Debug, Clone, Default)]
pub struct SessionListings {
    pub issue_comments: Vec<ExistingComment>,
    pub review_comments: Vec<ExistingComment>,
    /// `None` when the host cannot serve thread data.
    pub threads: Option<Vec<ReviewThread>>,
}

impl SessionListings {
    /// All comments, issue and review, in one iterator.
    pub fn all_comments(&self) -> impl Iterator<Item = &ExistingComment> {
        self.issue_comments.iter().chain(self.review_comments.iter())
    }
}

/// Fetch the session-start listings concurrently and merge after all three
/// resolve. Any failure fails the whole fetch.
pub async fn fetch_session_listings(
    host: &dyn PullRequestHost,
) -> Result<SessionListings, ProviderError> {
    let (issue_comments, review_comments, threads) = futures::try_join!(
        host.list_issue_comments(),
        host.list_review_comments(),
        host.list_review_threads(),
    )?;

    debug!(
        issue = issue_comments.len(),
        review = review_comments.len(),
        threads = threads.as_ref().map(Vec::len),
        "fetched session listings"
    );

    Ok(SessionListings {
        issue_comments,
        review_comments,
        threads,
    })
}
