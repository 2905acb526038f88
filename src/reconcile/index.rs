//! Indices over the session-start comment and thread listings.
//!
//! Built once per session and never refreshed; the reconciler assumes it is
//! the only writer for the PR within its session, so listings cannot go
//! stale underneath it.

use crate::provider::types::{ExistingComment, ReviewThread, Side};
use crate::provider::SessionListings;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Prefix for thread ids synthesized from the flat comment list.
pub const SYNTHETIC_THREAD_PREFIX: &str = "synthetic:";

/// Lookup structures for everything already on the PR.
#[derive(Debug, Default)]
pub struct CommentIndex {
    comments_by_id: HashMap<u64, ExistingComment>,
    /// (path, line, side) → review-comment roots at that location.
    roots_by_location: HashMap<(String, u32, Side), Vec<u64>>,
    /// Root id → most recent `updated_at` across the root and its replies.
    activity: HashMap<u64, DateTime<Utc>>,
    /// Thread data as served by the host, when available.
    threads: Option<Vec<ReviewThread>>,
    /// Threads synthesized from the flat listing, used when the host serves
    /// no thread data.
    synthesized: Vec<ReviewThread>,
}

impl CommentIndex {
    pub fn build(listings: &SessionListings) -> Self {
        let mut index = Self {
            threads: listings.threads.clone(),
            ..Self::default()
        };

        for comment in listings.review_comments.iter().chain(&listings.issue_comments) {
            index.comments_by_id.insert(comment.id, comment.clone());
        }

        for comment in &listings.review_comments {
            let root_id = comment.in_reply_to.unwrap_or(comment.id);
            let last = index.activity.entry(root_id).or_insert(comment.updated_at);
            if comment.updated_at > *last {
                *last = comment.updated_at;
            }

            if comment.is_review_root() {
                if let (Some(path), Some(line)) = (&comment.path, comment.line) {
                    let side = comment.side.unwrap_or(Side::Right);
                    index
                        .roots_by_location
                        .entry((path.clone(), line, side))
                        .or_default()
                        .push(comment.id);
                }
            }
        }

        index.synthesized = index.synthesize_threads(&listings.review_comments);
        index
    }

    /// Whether the host served real thread data.
    pub fn has_thread_data(&self) -> bool {
        self.threads.is_some()
    }

    /// Threads anchored at a location. Real thread data when available,
    /// synthesized threads otherwise.
    pub fn threads_at(&self, path: &str, line: u32) -> Vec<&ReviewThread> {
        self.all_threads()
            .iter()
            .filter(|t| t.path == path && t.line == Some(line))
            .collect()
    }

    /// Resolve a thread by id, accepting both host ids and synthesized ids.
    pub fn find_thread(&self, id: &str) -> Option<&ReviewThread> {
        self.all_threads().iter().find(|t| t.id == id)
    }

    fn all_threads(&self) -> &[ReviewThread] {
        self.threads.as_deref().unwrap_or(&self.synthesized)
    }

    pub fn comment(&self, id: u64) -> Option<&ExistingComment> {
        self.comments_by_id.get(&id)
    }

    /// Root of the reply chain containing `id`. Review replies point
    /// directly at their root, so one hop suffices.
    pub fn root_of(&self, id: u64) -> u64 {
        self.comments_by_id
            .get(&id)
            .and_then(|c| c.in_reply_to)
            .unwrap_or(id)
    }

    /// Aggregate last-activity timestamp for a root.
    pub fn activity_of(&self, root_id: u64) -> Option<DateTime<Utc>> {
        self.activity.get(&root_id).copied()
    }

    /// The root with the most recent aggregate activity at a location,
    /// optionally restricted to one diff side.
    pub fn most_active_root_at(
        &self,
        path: &str,
        line: u32,
        side: Option<Side>,
    ) -> Option<u64> {
        let candidates: Vec<u64> = match side {
            Some(side) => self
                .roots_by_location
                .get(&(path.to_string(), line, side))
                .cloned()
                .unwrap_or_default(),
            None => [Side::Left, Side::Right]
                .into_iter()
                .filter_map(|s| self.roots_by_location.get(&(path.to_string(), line, s)))
                .flatten()
                .copied()
                .collect(),
        };

        candidates
            .into_iter()
            .max_by_key(|id| self.activity_of(*id).unwrap_or(DateTime::<Utc>::UNIX_EPOCH))
    }

    /// Build per-root threads out of the flat review-comment list: entries
    /// without a reply parent are roots, replies attach by `in_reply_to`.
    fn synthesize_threads(&self, review_comments: &[ExistingComment]) -> Vec<ReviewThread> {
        let mut threads = Vec::new();
        for root in review_comments.iter().filter(|c| c.is_review_root()) {
            let Some(path) = root.path.clone() else {
                continue;
            };
            threads.push(ReviewThread {
                id: format!("{SYNTHETIC_THREAD_PREFIX}{}", root.id),
                path,
                line: root.line,
                side: root.side.unwrap_or(Side::Right),
                is_outdated: false,
                is_resolved: false,
                last_updated_at: self.activity_of(root.id).unwrap_or(root.updated_at),
                last_actor: None,
                root_comment_id: Some(root.id),
                url: Some(root.url.clone()),
            });
        }
        threads
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::types::CommentKind;
    use chrono::TimeZone;

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
            body: format!("comment {id}"),
            url: format!("https://example.invalid/c/{id}"),
            kind: CommentKind::Review,
            path: Some(path.into()),
            line: Some(line),
            side: Some(side),
            in_reply_to,
            updated_at: ts(minute),
        }
    }

    fn listings(review: Vec<ExistingComment>) -> SessionListings {
        SessionListings {
            issue_comments: Vec::new(),
            review_comments: review,
            threads: None,
        }
    }

    #[test]
    fn test_activity_aggregates_replies() {
        // Root 1 updated at :05; root 2 updated at :00 but replied to at :10.
        let index = CommentIndex::build(&listings(vec![
            review_comment(1, "a.rs", 3, Side::Right, None, 5),
            review_comment(2, "a.rs", 3, Side::Right, None, 0),
            review_comment(3, "a.rs", 3, Side::Right, Some(2), 10),
        ]));

        assert_eq!(index.activity_of(1), Some(ts(5)));
        assert_eq!(index.activity_of(2), Some(ts(10)));
        // The reply pushes root 2 ahead of root 1.
        assert_eq!(index.most_active_root_at("a.rs", 3, Some(Side::Right)), Some(2));
    }

    #[test]
    fn test_most_active_root_respects_side() {
        let index = CommentIndex::build(&listings(vec![
            review_comment(1, "a.rs", 3, Side::Left, None, 30),
            review_comment(2, "a.rs", 3, Side::Right, None, 5),
        ]));

        assert_eq!(index.most_active_root_at("a.rs", 3, Some(Side::Right)), Some(2));
        // Without a side, the newest across both wins.
        assert_eq!(index.most_active_root_at("a.rs", 3, None), Some(1));
        assert_eq!(index.most_active_root_at("a.rs", 99, None), None);
    }

    #[test]
    fn test_synthesized_threads_group_by_root() {
        let index = CommentIndex::build(&listings(vec![
            review_comment(1, "a.rs", 3, Side::Right, None, 1),
            review_comment(2, "a.rs", 3, Side::Right, Some(1), 8),
            review_comment(3, "b.rs", 7, Side::Left, None, 2),
        ]));

        assert!(!index.has_thread_data());
        let threads = index.threads_at("a.rs", 3);
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].id, "synthetic:1");
        assert_eq!(threads[0].root_comment_id, Some(1));
        // Reply activity rolls up into the synthesized thread.
        assert_eq!(threads[0].last_updated_at, ts(8));

        assert!(index.find_thread("synthetic:3").is_some());
    }

    #[test]
    fn test_real_thread_data_preferred_over_synthesis() {
        let mut l = listings(vec![review_comment(1, "a.rs", 3, Side::Right, None, 1)]);
        l.threads = Some(vec![ReviewThread {
            id: "PRRT_x".into(),
            path: "a.rs".into(),
            line: Some(3),
            side: Side::Right,
            is_outdated: false,
            is_resolved: false,
            last_updated_at: ts(1),
            last_actor: None,
            root_comment_id: Some(1),
            url: None,
        }]);
        let index = CommentIndex::build(&l);

        assert!(index.has_thread_data());
        let threads = index.threads_at("a.rs", 3);
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].id, "PRRT_x");
        assert!(index.find_thread("synthetic:1").is_none());
    }

    #[test]
    fn test_root_of_follows_reply_parent() {
        let index = CommentIndex::build(&listings(vec![
            review_comment(1, "a.rs", 3, Side::Right, None, 1),
            review_comment(2, "a.rs", 3, Side::Right, Some(1), 2),
        ]));
        assert_eq!(index.root_of(2), 1);
        assert_eq!(index.root_of(1), 1);
        // Unknown ids are their own root.
        assert_eq!(index.root_of(99), 99);
    }
}
