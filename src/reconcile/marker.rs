//! Summary footer assembly and checkpoint marker handling.
//!
//! The summary comment carries three footer parts: an attribution line, a
//! billing line, and a hidden HTML-comment marker embedding the head commit
//! the session reviewed. The marker is the sole state carried between
//! sessions; the next run's scope resolver recovers its checkpoint from
//! it. Footer completion is idempotent: parts already present in the
//! caller-supplied body are left alone and only the missing ones are
//! appended.

use crate::provider::types::ExistingComment;
use crate::session::TokenUsage;
use std::sync::OnceLock;

/// Opening of the hidden checkpoint marker.
pub const MARKER_PREFIX: &str = "<!-- magpie:last-reviewed-sha:";

/// Default attribution line; overridable through configuration.
pub const DEFAULT_ATTRIBUTION: &str = "_Automated review by Magpie._";

/// Stable lead-in for the billing line, also used to detect its presence.
const BILLING_PREFIX: &str = "_Usage:";

/// Render the hidden marker for a head commit.
pub fn checkpoint_marker(head_sha: &str) -> String {
    format!("{MARKER_PREFIX}{head_sha} -->")
}

/// Render the billing line from accumulated usage.
pub fn billing_line(usage: &TokenUsage) -> String {
    format!(
        "{BILLING_PREFIX} {} tokens in, {} tokens out, ${:.4}_",
        usage.input_tokens, usage.output_tokens, usage.cost_usd
    )
}

/// Extract the checkpoint sha from a comment body, if it carries a marker.
pub fn extract_checkpoint(body: &str) -> Option<String> {
    marker_regex()
        .captures(body)
        .map(|c| c[1].to_string())
}

/// Recover the most recent checkpoint from prior comments, newest first.
pub fn extract_checkpoint_from_comments(comments: &[ExistingComment]) -> Option<String> {
    let mut ordered: Vec<&ExistingComment> = comments.iter().collect();
    ordered.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    ordered.iter().find_map(|c| extract_checkpoint(&c.body))
}

/// Append the footer parts missing from `body`: attribution, billing line,
/// and checkpoint marker, in that order.
pub fn complete_footer(
    body: &str,
    attribution: &str,
    usage: &TokenUsage,
    head_sha: &str,
) -> String {
    let mut out = body.trim_end().to_string();

    if !out.contains(attribution) {
        out.push_str("\n\n");
        out.push_str(attribution);
    }
    if !out.contains(BILLING_PREFIX) {
        out.push('\n');
        out.push_str(&billing_line(usage));
    }
    if !out.contains(MARKER_PREFIX) {
        out.push('\n');
        out.push_str(&checkpoint_marker(head_sha));
    }
    out
}

fn marker_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(r"<!-- magpie:last-reviewed-sha:([0-9a-fA-F]{7,40}) -->")
            .expect("marker regex is valid")
    })
}
