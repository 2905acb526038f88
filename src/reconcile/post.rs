//! Comment and suggestion posting with session-wide dedup.
//!
//! Every posting path funnels through one delivery routine: compute the
//! dedup key, resolve the target (an existing thread root or a fresh
//! top-level comment), issue exactly one host call, then record the key and
//! bump the session counters. Expected non-success outcomes (duplicate,
//! ambiguous location, unknown thread) are result variants, not errors;
//! the agent is expected to act on them and try again with more context.

use super::index::CommentIndex;
use super::marker;
use crate::errors::ProviderError;
use crate::provider::types::{ReviewThread, Side};
use crate::provider::{PullRequestHost, SessionListings};
use crate::session::SessionState;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

/// One competing thread surfaced in an ambiguity result.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadCandidate {
    pub id: String,
    pub side: Side,
    pub is_resolved: bool,
    pub is_outdated: bool,
    pub last_updated_at: DateTime<Utc>,
}

impl From<&ReviewThread> for ThreadCandidate {
    fn from(thread: &ReviewThread) -> Self {
        Self {
            id: thread.id.clone(),
            side: thread.side,
            is_resolved: thread.is_resolved,
            is_outdated: thread.is_outdated,
            last_updated_at: thread.last_updated_at,
        }
    }
}

/// Outcome of a posting operation. `Ambiguous` and `NotFound` are
/// actionable control flow, not faults: the caller should supply `side`,
/// supply `thread_id`, or set `allow_new_thread` and retry.
#[derive(Debug, Clone, PartialEq)]
pub enum PostOutcome {
    Posted { id: u64, url: String },
    /// Suppressed: the same comment was already delivered this session or
    /// existed before it.
    Duplicate,
    Ambiguous { candidates: Vec<ThreadCandidate> },
    NotFound { what: String },
}

/// An intended inline comment.
#[derive(Debug, Clone)]
pub struct CommentRequest {
    pub path: String,
    pub line: u32,
    pub side: Option<Side>,
    pub body: String,
    /// Reply into this specific thread instead of matching by location.
    pub thread_id: Option<String>,
    /// Skip thread matching entirely and open a new top-level comment.
    pub allow_new_thread: bool,
}

impl CommentRequest {
    pub fn new(path: impl Into<String>, line: u32, body: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            line,
            side: None,
            body: body.into(),
            thread_id: None,
            allow_new_thread: false,
        }
    }

    pub fn with_side(mut self, side: Side) -> Self {
        self.side = Some(side);
        self
    }

    pub fn in_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn allow_new_thread(mut self) -> Self {
        self.allow_new_thread = true;
        self
    }
}

/// Render a suggestion body: optional lead-in prose plus the fenced
/// replacement block the host turns into an applyable suggestion.
pub fn render_suggestion(lead_in: Option<&str>, replacement: &str) -> String {
    let fence = format!("```suggestion\n{replacement}\n```");
    match lead_in {
        Some(text) if !text.trim().is_empty() => format!("{}\n\n{fence}", text.trim_end()),
        _ => fence,
    }
}

enum Target {
    Reply(u64),
    CreateNew(Side),
    Ambiguous(Vec<ThreadCandidate>),
    NotFound(String),
}

enum PostKind {
    Inline,
    Suggestion,
}

/// Session-scoped reconciler over the listings fetched at session start.
pub struct Reconciler<'h> {
    host: &'h dyn PullRequestHost,
    index: CommentIndex,
    /// Dedup keys of comments present before this session.
    existing_keys: std::collections::HashSet<String>,
    attribution: String,
}

impl<'h> Reconciler<'h> {
    pub fn new(host: &'h dyn PullRequestHost, listings: &SessionListings) -> Self {
        let existing_keys = listings
            .review_comments
            .iter()
            .filter_map(|c| {
                let path = c.path.as_deref()?;
                Some(dedup_key(path, c.line?, &c.body))
            })
            .collect();
        Self {
            host,
            index: CommentIndex::build(listings),
            existing_keys,
            attribution: marker::DEFAULT_ATTRIBUTION.to_string(),
        }
    }

    pub fn with_attribution(mut self, attribution: impl Into<String>) -> Self {
        self.attribution = attribution.into();
        self
    }

    /// Discussion threads anchored at a location (real or synthesized).
    pub fn threads_at(&self, path: &str, line: u32) -> Vec<&ReviewThread> {
        self.index.threads_at(path, line)
    }

    /// Post an inline review comment.
    pub async fn post_comment(
        &self,
        session: &mut SessionState,
        request: CommentRequest,
    ) -> Result<PostOutcome, ProviderError> {
        self.deliver(session, request, PostKind::Inline).await
    }

    /// Post a suggestion: the request `body` is the replacement text, which
    /// gets wrapped in a fenced suggestion block before delivery.
    pub async fn post_suggestion(
        &self,
        session: &mut SessionState,
        mut request: CommentRequest,
        lead_in: Option<&str>,
    ) -> Result<PostOutcome, ProviderError> {
        request.body = render_suggestion(lead_in, &request.body);
        self.deliver(session, request, PostKind::Suggestion).await
    }

    /// Reply under the thread containing a specific comment id.
    pub async fn reply(
        &self,
        session: &mut SessionState,
        comment_id: u64,
        body: &str,
    ) -> Result<PostOutcome, ProviderError> {
        if body.trim().is_empty() {
            return Err(ProviderError::Validation("reply body is empty".into()));
        }
        let Some(comment) = self.index.comment(comment_id) else {
            return Ok(PostOutcome::NotFound {
                what: format!("comment {comment_id}"),
            });
        };

        let (path, line) = (
            comment.path.clone().unwrap_or_default(),
            comment.line.unwrap_or(0),
        );
        let key = dedup_key(&path, line, body);
        if self.is_duplicate(session, &key) {
            debug!(comment_id, "suppressing duplicate reply");
            return Ok(PostOutcome::Duplicate);
        }

        let root = self.index.root_of(comment_id);
        let created = self.host.reply_to_comment(root, body).await?;
        session.posted_keys.insert(key);
        session.counters.inline_comments += 1;
        Ok(PostOutcome::Posted {
            id: created.id,
            url: created.url,
        })
    }

    /// Post the terminating session summary, at most once per session.
    ///
    /// The posted flag is flipped before the host call is awaited so a
    /// second "post summary" issued in quick succession short-circuits
    /// instead of racing the first.
    pub async fn post_summary(
        &self,
        session: &mut SessionState,
        body: &str,
    ) -> Result<PostOutcome, ProviderError> {
        if body.trim().is_empty() {
            return Err(ProviderError::Validation("summary body is empty".into()));
        }
        if session.counters.summary_posted {
            debug!("summary already posted this session");
            return Ok(PostOutcome::Duplicate);
        }
        session.counters.summary_posted = true;

        let body = marker::complete_footer(
            body,
            &self.attribution,
            &session.usage,
            &session.head_sha,
        );
        let created = self.host.create_issue_comment(&body).await?;
        info!(id = created.id, "posted session summary");
        Ok(PostOutcome::Posted {
            id: created.id,
            url: created.url,
        })
    }

    async fn deliver(
        &self,
        session: &mut SessionState,
        request: CommentRequest,
        kind: PostKind,
    ) -> Result<PostOutcome, ProviderError> {
        if request.path.trim().is_empty() {
            return Err(ProviderError::Validation("comment path is empty".into()));
        }
        if request.line == 0 {
            return Err(ProviderError::Validation(
                "comment line must be positive".into(),
            ));
        }
        if request.body.trim().is_empty() {
            return Err(ProviderError::Validation("comment body is empty".into()));
        }

        let key = dedup_key(&request.path, request.line, &request.body);
        if self.is_duplicate(session, &key) {
            debug!(path = %request.path, line = request.line, "suppressing duplicate comment");
            return Ok(PostOutcome::Duplicate);
        }

        let created = match self.resolve_target(&request) {
            Target::Reply(root) => self.host.reply_to_comment(root, &request.body).await?,
            Target::CreateNew(side) => {
                self.host
                    .create_review_comment(&request.path, request.line, side, &request.body)
                    .await?
            }
            Target::Ambiguous(candidates) => {
                debug!(
                    path = %request.path,
                    line = request.line,
                    candidates = candidates.len(),
                    "location is ambiguous, asking the caller to disambiguate"
                );
                return Ok(PostOutcome::Ambiguous { candidates });
            }
            Target::NotFound(what) => return Ok(PostOutcome::NotFound { what }),
        };

        session.posted_keys.insert(key);
        match kind {
            PostKind::Inline => session.counters.inline_comments += 1,
            PostKind::Suggestion => session.counters.suggestions += 1,
        }
        Ok(PostOutcome::Posted {
            id: created.id,
            url: created.url,
        })
    }

    fn is_duplicate(&self, session: &SessionState, key: &str) -> bool {
        session.posted_keys.contains(key) || self.existing_keys.contains(key)
    }

    fn resolve_target(&self, request: &CommentRequest) -> Target {
        if let Some(thread_id) = &request.thread_id {
            return match self.index.find_thread(thread_id) {
                Some(thread) => match thread.root_comment_id {
                    Some(root) => Target::Reply(root),
                    None => Target::NotFound(format!("thread {thread_id} has no resolvable root")),
                },
                None => Target::NotFound(format!("thread {thread_id}")),
            };
        }

        if request.allow_new_thread {
            return Target::CreateNew(request.side.unwrap_or(Side::Right));
        }

        if self.index.has_thread_data() {
            let threads = self.index.threads_at(&request.path, request.line);
            if threads.is_empty() {
                return Target::CreateNew(request.side.unwrap_or(Side::Right));
            }
            let matching: Vec<&&ReviewThread> = match request.side {
                Some(side) => threads.iter().filter(|t| t.side == side).collect(),
                None => threads.iter().collect(),
            };
            return match matching.as_slice() {
                [] => Target::CreateNew(request.side.unwrap_or(Side::Right)),
                [only] => match only.root_comment_id {
                    Some(root) => Target::Reply(root),
                    None => Target::CreateNew(request.side.unwrap_or(only.side)),
                },
                many => Target::Ambiguous(many.iter().map(|t| ThreadCandidate::from(**t)).collect()),
            };
        }

        // No thread-level data: rank flat roots by aggregate activity.
        match self
            .index
            .most_active_root_at(&request.path, request.line, request.side)
        {
            Some(root) => Target::Reply(root),
            None => Target::CreateNew(request.side.unwrap_or(Side::Right)),
        }
    }
}

/// Dedup key over (path, line, normalized body): whitespace collapsed,
/// case-insensitive, hashed and truncated for compact storage.
pub fn dedup_key(path: &str, line: u32, body: &str) -> String {
    let normalized = body
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    let digest = Sha256::digest(format!("{path}\n{line}\n{normalized}"));
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    hex[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::types::{CommentKind, CreatedComment, ExistingComment};
    use crate::provider::{ChangedFile, Comparison};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;

    #[derive(Debug, PartialEq)]
    enum Call {
        CreateReview(String, u32, Side, String),
        Reply(u64, String),
        CreateIssue(String),
    }

    #[derive(Default)]
    struct RecordingHost {
        calls: Mutex<Vec<Call>>,
    }

    impl RecordingHost {
        fn calls(&self) -> std::sync::MutexGuard<'_, Vec<Call>> {
            self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl PullRequestHost for RecordingHost {
        async fn list_pr_files(&self) -> Result<Vec<ChangedFile>, ProviderError> {
            Ok(Vec::new())
        }

        async fn compare(&self, _: &str, _: &str) -> Result<Comparison, ProviderError> {
            unreachable!("reconciler never compares refs")
        }

        async fn list_issue_comments(&self) -> Result<Vec<ExistingComment>, ProviderError> {
            Ok(Vec::new())
        }

        async fn list_review_comments(&self) -> Result<Vec<ExistingComment>, ProviderError> {
            Ok(Vec::new())
        }

        async fn list_review_threads(
            &self,
        ) -> Result<Option<Vec<ReviewThread>>, ProviderError> {
            Ok(None)
        }

        async fn create_review_comment(
            &self,
            path: &str,
            line: u32,
            side: Side,
            body: &str,
        ) -> Result<CreatedComment, ProviderError> {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Call::CreateReview(path.into(), line, side, body.into()));
            Ok(CreatedComment {
                id: 1000 + calls.len() as u64,
                url: "https://example.invalid/new".into(),
            })
        }

        async fn reply_to_comment(
            &self,
            comment_id: u64,
            body: &str,
        ) -> Result<CreatedComment, ProviderError> {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Call::Reply(comment_id, body.into()));
            Ok(CreatedComment {
                id: 2000 + calls.len() as u64,
                url: "https://example.invalid/reply".into(),
            })
        }

        async fn create_issue_comment(
            &self,
            body: &str,
        ) -> Result<CreatedComment, ProviderError> {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Call::CreateIssue(body.into()));
            Ok(CreatedComment {
                id: 3000 + calls.len() as u64,
                url: "https://example.invalid/summary".into(),
            })
        }
    }

    fn ts(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 1, 12, minute, 0).unwrap()
    }

    fn review_comment(
        id: u64,
        path: &str,
        line: u32,
        side: Side,
        in_reply_to: Option<u64>,
        minute: u32,
    ) -> ExistingComment {
        ExistingComment {
            id,
            author: "octocat".into(),
            body: format!("existing {id}"),
            url: format!("https://example.invalid/c/{id}"),
            kind: CommentKind::Review,
            path: Some(path.into()),
            line: Some(line),
            side: Some(side),
            in_reply_to,
            updated_at: ts(minute),
        }
    }

    fn thread(id: &str, path: &str, line: u32, side: Side, root: Option<u64>) -> ReviewThread {
        ReviewThread {
            id: id.into(),
            path: path.into(),
            line: Some(line),
            side,
            is_outdated: false,
            is_resolved: false,
            last_updated_at: ts(0),
            last_actor: None,
            root_comment_id: root,
            url: None,
        }
    }

    fn empty_listings() -> SessionListings {
        SessionListings::default()
    }

    #[tokio::test]
    async fn test_second_identical_post_is_duplicate_no_op() {
        let host = RecordingHost::default();
        let reconciler = Reconciler::new(&host, &empty_listings());
        let mut session = SessionState::new("head1");

        let req = CommentRequest::new("src/lib.rs", 10, "Missing error handling here.");
        let first = reconciler.post_comment(&mut session, req.clone()).await.unwrap();
        assert!(matches!(first, PostOutcome::Posted { .. }));

        let second = reconciler.post_comment(&mut session, req).await.unwrap();
        assert_eq!(second, PostOutcome::Duplicate);
        assert_eq!(host.calls().len(), 1);
        assert_eq!(session.counters.inline_comments, 1);
    }

    #[tokio::test]
    async fn test_dedup_normalizes_whitespace_and_case() {
        let host = RecordingHost::default();
        let reconciler = Reconciler::new(&host, &empty_listings());
        let mut session = SessionState::new("head1");

        let first = CommentRequest::new("a.rs", 3, "Check   the bounds");
        let second = CommentRequest::new("a.rs", 3, "check the\nbounds");
        reconciler.post_comment(&mut session, first).await.unwrap();
        let outcome = reconciler.post_comment(&mut session, second).await.unwrap();
        assert_eq!(outcome, PostOutcome::Duplicate);
        assert_eq!(host.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_pre_existing_comment_suppresses_post() {
        let host = RecordingHost::default();
        let mut listings = empty_listings();
        let mut existing = review_comment(50, "a.rs", 3, Side::Right, None, 0);
        existing.body = "Check the bounds".into();
        listings.review_comments.push(existing);

        let reconciler = Reconciler::new(&host, &listings);
        let mut session = SessionState::new("head1");

        let outcome = reconciler
            .post_comment(&mut session, CommentRequest::new("a.rs", 3, "check the bounds"))
            .await
            .unwrap();
        assert_eq!(outcome, PostOutcome::Duplicate);
        assert!(host.calls().is_empty());
    }

    #[tokio::test]
    async fn test_two_sided_threads_without_side_is_ambiguous() {
        let host = RecordingHost::default();
        let mut listings = empty_listings();
        listings.threads = Some(vec![
            thread("t-left", "a.rs", 3, Side::Left, Some(1)),
            thread("t-right", "a.rs", 3, Side::Right, Some(2)),
        ]);
        let reconciler = Reconciler::new(&host, &listings);
        let mut session = SessionState::new("head1");

        let outcome = reconciler
            .post_comment(&mut session, CommentRequest::new("a.rs", 3, "which side?"))
            .await
            .unwrap();

        match outcome {
            PostOutcome::Ambiguous { candidates } => {
                let ids: Vec<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
                assert_eq!(ids, vec!["t-left", "t-right"]);
            }
            other => panic!("expected Ambiguous, got {other:?}"),
        }
        assert!(host.calls().is_empty());
        assert_eq!(session.counters.inline_comments, 0);
    }

    #[tokio::test]
    async fn test_side_disambiguates_to_single_thread() {
        let host = RecordingHost::default();
        let mut listings = empty_listings();
        listings.threads = Some(vec![
            thread("t-left", "a.rs", 3, Side::Left, Some(11)),
            thread("t-right", "a.rs", 3, Side::Right, Some(22)),
        ]);
        let reconciler = Reconciler::new(&host, &listings);
        let mut session = SessionState::new("head1");

        let outcome = reconciler
            .post_comment(
                &mut session,
                CommentRequest::new("a.rs", 3, "left side note").with_side(Side::Left),
            )
            .await
            .unwrap();

        assert!(matches!(outcome, PostOutcome::Posted { .. }));
        assert_eq!(
            *host.calls(),
            vec![Call::Reply(11, "left side note".into())]
        );
    }

    #[tokio::test]
    async fn test_unknown_thread_id_is_not_found() {
        let host = RecordingHost::default();
        let reconciler = Reconciler::new(&host, &empty_listings());
        let mut session = SessionState::new("head1");

        let outcome = reconciler
            .post_comment(
                &mut session,
                CommentRequest::new("a.rs", 3, "note").in_thread("PRRT_missing"),
            )
            .await
            .unwrap();
        assert!(matches!(outcome, PostOutcome::NotFound { .. }));
        assert!(host.calls().is_empty());
    }

    #[tokio::test]
    async fn test_flat_fallback_replies_to_most_recent_activity_root() {
        let host = RecordingHost::default();
        let mut listings = empty_listings();
        // Root 1 updated directly at :05; root 2 updated at :00 but a reply
        // at :10 carries its aggregate activity past root 1.
        listings.review_comments = vec![
            review_comment(1, "a.rs", 3, Side::Right, None, 5),
            review_comment(2, "a.rs", 3, Side::Right, None, 0),
            review_comment(3, "a.rs", 3, Side::Right, Some(2), 10),
        ];
        let reconciler = Reconciler::new(&host, &listings);
        let mut session = SessionState::new("head1");

        let outcome = reconciler
            .post_comment(
                &mut session,
                CommentRequest::new("a.rs", 3, "follow-up").with_side(Side::Right),
            )
            .await
            .unwrap();

        assert!(matches!(outcome, PostOutcome::Posted { .. }));
        assert_eq!(*host.calls(), vec![Call::Reply(2, "follow-up".into())]);
    }

    #[tokio::test]
    async fn test_empty_location_creates_new_comment_on_right() {
        let host = RecordingHost::default();
        let reconciler = Reconciler::new(&host, &empty_listings());
        let mut session = SessionState::new("head1");

        let outcome = reconciler
            .post_comment(&mut session, CommentRequest::new("new.rs", 7, "fresh spot"))
            .await
            .unwrap();
        assert!(matches!(outcome, PostOutcome::Posted { .. }));
        assert_eq!(
            *host.calls(),
            vec![Call::CreateReview("new.rs".into(), 7, Side::Right, "fresh spot".into())]
        );
    }

    #[tokio::test]
    async fn test_allow_new_thread_skips_matching() {
        let host = RecordingHost::default();
        let mut listings = empty_listings();
        listings.threads = Some(vec![thread("t1", "a.rs", 3, Side::Right, Some(1))]);
        let reconciler = Reconciler::new(&host, &listings);
        let mut session = SessionState::new("head1");

        let outcome = reconciler
            .post_comment(
                &mut session,
                CommentRequest::new("a.rs", 3, "separate point").allow_new_thread(),
            )
            .await
            .unwrap();
        assert!(matches!(outcome, PostOutcome::Posted { .. }));
        assert!(matches!(host.calls()[0], Call::CreateReview(..)));
    }

    #[tokio::test]
    async fn test_suggestion_wraps_fenced_block_and_counts() {
        let host = RecordingHost::default();
        let reconciler = Reconciler::new(&host, &empty_listings());
        let mut session = SessionState::new("head1");

        let outcome = reconciler
            .post_suggestion(
                &mut session,
                CommentRequest::new("a.rs", 3, "let x = y?;"),
                Some("Propagate instead of unwrapping:"),
            )
            .await
            .unwrap();
        assert!(matches!(outcome, PostOutcome::Posted { .. }));
        assert_eq!(session.counters.suggestions, 1);
        assert_eq!(session.counters.inline_comments, 0);

        match &host.calls()[0] {
            Call::CreateReview(_, _, _, body) => {
                assert!(body.starts_with("Propagate instead of unwrapping:"));
                assert!(body.contains("```suggestion\nlet x = y?;\n```"));
            }
            other => panic!("expected CreateReview, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reply_targets_root_of_reply_chain() {
        let host = RecordingHost::default();
        let mut listings = empty_listings();
        listings.review_comments = vec![
            review_comment(1, "a.rs", 3, Side::Right, None, 0),
            review_comment(2, "a.rs", 3, Side::Right, Some(1), 1),
        ];
        let reconciler = Reconciler::new(&host, &listings);
        let mut session = SessionState::new("head1");

        let outcome = reconciler.reply(&mut session, 2, "agreed").await.unwrap();
        assert!(matches!(outcome, PostOutcome::Posted { .. }));
        assert_eq!(*host.calls(), vec![Call::Reply(1, "agreed".into())]);

        let missing = reconciler.reply(&mut session, 404, "ghost").await.unwrap();
        assert!(matches!(missing, PostOutcome::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_summary_posts_once_with_footer() {
        let host = RecordingHost::default();
        let reconciler = Reconciler::new(&host, &empty_listings());
        let mut session = SessionState::new("abc1234");
        session.usage.input_tokens = 10;

        let first = reconciler
            .post_summary(&mut session, "## Review\n\nAll clear.")
            .await
            .unwrap();
        assert!(matches!(first, PostOutcome::Posted { .. }));
        assert!(session.counters.summary_posted);

        let second = reconciler.post_summary(&mut session, "again").await.unwrap();
        assert_eq!(second, PostOutcome::Duplicate);

        let calls = host.calls();
        assert_eq!(calls.len(), 1);
        match &calls[0] {
            Call::CreateIssue(body) => {
                assert!(body.contains(marker::DEFAULT_ATTRIBUTION));
                assert!(body.contains("<!-- magpie:last-reviewed-sha:abc1234 -->"));
                assert!(body.contains("10 tokens in"));
            }
            other => panic!("expected CreateIssue, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_validation_rejects_malformed_requests() {
        let host = RecordingHost::default();
        let reconciler = Reconciler::new(&host, &empty_listings());
        let mut session = SessionState::new("head1");

        let bad_line = reconciler
            .post_comment(&mut session, CommentRequest::new("a.rs", 0, "x"))
            .await;
        assert!(matches!(bad_line, Err(ProviderError::Validation(_))));

        let bad_path = reconciler
            .post_comment(&mut session, CommentRequest::new("  ", 1, "x"))
            .await;
        assert!(matches!(bad_path, Err(ProviderError::Validation(_))));

        let bad_body = reconciler
            .post_comment(&mut session, CommentRequest::new("a.rs", 1, " "))
            .await;
        assert!(matches!(bad_body, Err(ProviderError::Validation(_))));
        assert!(host.calls().is_empty());
    }

    #[test]
    fn test_render_suggestion_without_lead_in() {
        assert_eq!(
            render_suggestion(None, "return Ok(());"),
            "```suggestion\nreturn Ok(());\n```"
        );
    }

    #[test]
    fn test_dedup_key_is_location_sensitive() {
        let a = dedup_key("a.rs", 3, "same body");
        let b = dedup_key("a.rs", 4, "same body");
        let c = dedup_key("b.rs", 3, "same body");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, dedup_key("a.rs", 3, "  SAME   body "));
    }
}
