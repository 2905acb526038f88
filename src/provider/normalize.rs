//! Boundary normalization of loosely-typed provider records.
//!
//! Host adapters hand over raw JSON in whatever shape their REST/GraphQL
//! layer produced. Everything is converted here, once, into the strict
//! entities in `super::types` so reconciliation logic never has to probe
//! for optional provider fields. Records missing the essentials (id, body,
//! timestamp) are dropped with a log line rather than poisoning the
//! indices.

use super::types::{CommentKind, ExistingComment, ReviewThread, Side};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

/// Normalize a raw comment record. Returns `None` when the record lacks an
/// id or body.
pub fn comment_from_value(value: &Value, kind: CommentKind) -> Option<ExistingComment> {
    let id = field_u64(value, &["id", "databaseId", "database_id"])?;
    let body = field_str(value, &["body"])?.to_string();

    let author = value
        .pointer("/user/login")
        .or_else(|| value.pointer("/author/login"))
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();

    let url = field_str(value, &["html_url", "htmlUrl", "url"])
        .unwrap_or_default()
        .to_string();

    let updated_at = field_timestamp(value, &["updated_at", "updatedAt"])
        .or_else(|| field_timestamp(value, &["created_at", "createdAt"]))
        .unwrap_or_else(|| DateTime::<Utc>::UNIX_EPOCH);

    let side = field_str(value, &["side"]).and_then(|s| s.parse::<Side>().ok());

    Some(ExistingComment {
        id,
        author,
        body,
        url,
        kind,
        path: field_str(value, &["path"]).map(str::to_string),
        line: field_u64(value, &["line", "original_line", "originalLine"]).map(|l| l as u32),
        side,
        in_reply_to: field_u64(value, &["in_reply_to_id", "inReplyToId", "in_reply_to"]),
        updated_at,
    })
}

/// Normalize a raw review-thread record. Returns `None` when the record
/// lacks an id or path.
pub fn thread_from_value(value: &Value) -> Option<ReviewThread> {
    let id = field_str(value, &["id", "node_id", "nodeId"])?.to_string();
    let path = field_str(value, &["path"])?.to_string();

    let side = field_str(value, &["side", "diffSide", "diff_side"])
        .and_then(|s| s.parse::<Side>().ok())
        .unwrap_or(Side::Right);

    let root = value
        .pointer("/comments/nodes/0")
        .or_else(|| value.pointer("/comments/0"));

    let last_updated_at = field_timestamp(value, &["last_updated_at", "lastUpdatedAt"])
        .or_else(|| root.and_then(|r| field_timestamp(r, &["updated_at", "updatedAt"])))
        .unwrap_or_else(|| DateTime::<Utc>::UNIX_EPOCH);

    Some(ReviewThread {
        id,
        path,
        line: field_u64(value, &["line", "original_line", "originalLine"]).map(|l| l as u32),
        side,
        is_outdated: field_bool(value, &["is_outdated", "isOutdated", "outdated"]),
        is_resolved: field_bool(value, &["is_resolved", "isResolved", "resolved"]),
        last_updated_at,
        last_actor: value
            .pointer("/last_actor/login")
            .or_else(|| value.pointer("/lastActor/login"))
            .and_then(Value::as_str)
            .map(str::to_string),
        root_comment_id: root
            .and_then(|r| field_u64(r, &["id", "databaseId", "database_id"]))
            .or_else(|| field_u64(value, &["root_comment_id", "rootCommentId"])),
        url: field_str(value, &["html_url", "htmlUrl", "url"]).map(str::to_string),
    })
}

/// Normalize a batch, dropping malformed records.
pub fn comments_from_values(values: &[Value], kind: CommentKind) -> Vec<ExistingComment> {
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        match comment_from_value(value, kind) {
            Some(comment) => out.push(comment),
            None => debug!("dropping malformed comment record: {value}"),
        }
    }
    out
}

fn field_str<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| value.get(k).and_then(Value::as_str))
}

fn field_u64(value: &Value, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|k| value.get(k).and_then(Value::as_u64))
}

fn field_bool(value: &Value, keys: &[&str]) -> bool {
    keys.iter()
        .find_map(|k| value.get(k).and_then(Value::as_bool))
        .unwrap_or(false)
}

fn field_timestamp(value: &Value, keys: &[&str]) -> Option<DateTime<Utc>> {
    field_str(value, keys)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rest_style_comment() {
        let raw = json!({
            "id": 77,
            "user": {"login": "octocat"},
            "body": "consider a guard clause",
            "html_url": "https://example.invalid/c/77",
            "path": "src/scope/mod.rs",
            "line": 42,
            "side": "RIGHT",
            "in_reply_to_id": 70,
            "updated_at": "2026-07-02T08:30:00Z"
        });
        let comment = comment_from_value(&raw, CommentKind::Review).unwrap();
        assert_eq!(comment.id, 77);
        assert_eq!(comment.author, "octocat");
        assert_eq!(comment.side, Some(Side::Right));
        assert_eq!(comment.in_reply_to, Some(70));
    }

    #[test]
    fn test_graphql_style_comment() {
        let raw = json!({
            "databaseId": 91,
            "author": {"login": "hubot"},
            "body": "lgtm",
            "url": "https://example.invalid/c/91",
            "updatedAt": "2026-07-03T10:00:00Z"
        });
        let comment = comment_from_value(&raw, CommentKind::Issue).unwrap();
        assert_eq!(comment.id, 91);
        assert_eq!(comment.author, "hubot");
        assert!(comment.path.is_none());
    }

    #[test]
    fn test_comment_without_id_is_dropped() {
        let raw = json!({"body": "orphan"});
        assert!(comment_from_value(&raw, CommentKind::Issue).is_none());

        let batch = comments_from_values(&[raw], CommentKind::Issue);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_thread_with_graphql_comment_nodes() {
        let raw = json!({
            "id": "PRRT_abc",
            "path": "src/lib.rs",
            "line": 8,
            "diffSide": "LEFT",
            "isResolved": true,
            "isOutdated": false,
            "comments": {"nodes": [
                {"databaseId": 500, "updatedAt": "2026-07-04T09:00:00Z"}
            ]}
        });
        let thread = thread_from_value(&raw).unwrap();
        assert_eq!(thread.id, "PRRT_abc");
        assert_eq!(thread.side, Side::Left);
        assert!(thread.is_resolved);
        assert_eq!(thread.root_comment_id, Some(500));
        assert_eq!(
            thread.last_updated_at,
            "2026-07-04T09:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[test]
    fn test_thread_defaults_to_right_side() {
        let raw = json!({"id": "t1", "path": "a.rs"});
        let thread = thread_from_value(&raw).unwrap();
        assert_eq!(thread.side, Side::Right);
        assert!(!thread.is_resolved);
    }
}
