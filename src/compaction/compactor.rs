//! The compaction transform.

use super::estimate::{estimate_message_tokens, estimate_tokens};
use super::{
    COMPACT_TRIGGER_RATIO, FALLBACK_ASSISTANT_TEXTS, KEEP_RATIO, STATE_LISTING_CAP,
    SUMMARY_SOURCE_CHAR_CAP,
};
use crate::conversation::{ConversationMessage, Role};
use crate::provider::ModelClient;
use crate::session::SessionState;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Compacts a transcript against one model's context window.
///
/// The optional [`ModelClient`] is a distinct compaction-capable model; the
/// instance handed in is expected to carry its own retry wrapping. Without
/// one, or when its output is unusable, a deterministic fallback summary is
/// built from the pruned assistant turns.
pub struct Compactor<'c> {
    window_tokens: usize,
    client: Option<&'c dyn ModelClient>,
}

impl<'c> Compactor<'c> {
    pub fn new(window_tokens: usize) -> Self {
        Self {
            window_tokens,
            client: None,
        }
    }

    pub fn with_client(mut self, client: &'c dyn ModelClient) -> Self {
        self.client = Some(client);
        self
    }

    /// Whether the transcript has grown past the compaction trigger.
    pub fn should_compact(&self, messages: &[ConversationMessage]) -> bool {
        let estimate = estimate_tokens(messages);
        estimate as f64 >= self.window_tokens as f64 * COMPACT_TRIGGER_RATIO
    }

    /// Transform the transcript before the next model call.
    ///
    /// Below the trigger the input is returned unchanged. Otherwise the
    /// newest messages within the keep budget survive verbatim and the rest
    /// are replaced by `[state_summary, prose_summary]`.
    pub async fn transform(
        &self,
        messages: Vec<ConversationMessage>,
        session: &SessionState,
    ) -> Vec<ConversationMessage> {
        if !self.should_compact(&messages) {
            return messages;
        }

        let keep_budget = (self.window_tokens as f64 * KEEP_RATIO) as usize;
        let mut kept_tokens = 0usize;
        let mut split = messages.len();
        for (i, message) in messages.iter().enumerate().rev() {
            let tokens = estimate_message_tokens(message);
            if kept_tokens + tokens > keep_budget {
                break;
            }
            kept_tokens += tokens;
            split = i;
        }

        if split == 0 {
            // The whole history fits in the keep budget; nothing to prune.
            return messages;
        }

        let mut pruned = messages;
        let kept = pruned.split_off(split);
        info!(
            pruned = pruned.len(),
            kept = kept.len(),
            kept_tokens,
            "compacting transcript"
        );

        let prose = self.summarize(&pruned).await;
        let state = self.state_summary(pruned.len(), session);

        let mut out = Vec::with_capacity(kept.len() + 2);
        out.push(ConversationMessage::text(Role::User, state));
        out.push(ConversationMessage::text(Role::User, prose));
        out.extend(kept);
        out
    }

    /// Produce the prose summary of the pruned prefix.
    async fn summarize(&self, pruned: &[ConversationMessage]) -> String {
        if let Some(client) = self.client {
            match client.complete(&summarization_prompt(pruned)).await {
                Ok(text) if !text.trim().is_empty() => {
                    return format!("Summary of earlier conversation:\n\n{}", text.trim());
                }
                Ok(_) => warn!("compaction model returned empty summary, using fallback"),
                Err(err) => warn!(%err, "compaction summarization failed, using fallback"),
            }
        } else {
            debug!("no compaction model configured, using deterministic summary");
        }
        fallback_summary(pruned)
    }

    /// Synthesize the state-summary message from the session's accumulated
    /// context.
    fn state_summary(&self, pruned_count: usize, session: &SessionState) -> String {
        let ctx = &session.context;
        let counters = &session.counters;
        let mut lines = vec![format!(
            "[context state] {pruned_count} earlier message(s) were pruned to stay within the context window."
        )];
        lines.push(render_listing("Files read", &ctx.files_read));
        lines.push(render_listing("Files diffed", &ctx.files_diffed));
        lines.push(render_listing("Partially read", &ctx.files_partial));
        lines.push(render_listing("Truncated reads", &ctx.files_truncated));
        lines.push(format!(
            "Posted so far: {} inline comment(s), {} suggestion(s); summary posted: {}",
            counters.inline_comments,
            counters.suggestions,
            if counters.summary_posted { "yes" } else { "no" }
        ));
        lines.join("\n")
    }
}

/// Render one pruned message as `[role] text`, capped per message.
fn render_source_line(message: &ConversationMessage) -> String {
    let text = message.joined_text();
    let mut snippet: String = text.chars().take(SUMMARY_SOURCE_CHAR_CAP).collect();
    if text.chars().count() > SUMMARY_SOURCE_CHAR_CAP {
        snippet.push_str("...");
    }
    format!("[{}] {}", message.role, snippet.replace('\n', " "))
}

fn summarization_prompt(pruned: &[ConversationMessage]) -> String {
    let rendered: Vec<String> = pruned.iter().map(render_source_line).collect();
    format!(
        "The following are earlier turns of a pull-request review conversation that \
         must be compacted.\n\n{}\n\nSummarize them as concise bullets covering: \
         findings so far, decisions made, outstanding issues, and files discussed. \
         Keep it short.",
        rendered.join("\n")
    )
}

/// Deterministic summary used when no compaction model is configured or its
/// output is unusable: the last few assistant-authored texts, verbatim.
fn fallback_summary(pruned: &[ConversationMessage]) -> String {
    let recent: Vec<String> = pruned
        .iter()
        .rev()
        .filter(|m| m.role == Role::Assistant)
        .map(|m| m.joined_text())
        .filter(|t| !t.trim().is_empty())
        .take(FALLBACK_ASSISTANT_TEXTS)
        .collect();

    if recent.is_empty() {
        return "Summary of earlier conversation: earlier turns were pruned; no assistant \
                notes were available to summarize."
            .to_string();
    }

    let bullets: Vec<String> = recent
        .iter()
        .rev()
        .map(|t| format!("- {}", truncate_chars(t, SUMMARY_SOURCE_CHAR_CAP)))
        .collect();
    format!(
        "Summary of earlier conversation (latest assistant notes):\n\n{}",
        bullets.join("\n")
    )
}

fn render_listing(label: &str, paths: &BTreeSet<String>) -> String {
    if paths.is_empty() {
        return format!("{label}: none");
    }
    let shown: Vec<&str> = paths.iter().take(STATE_LISTING_CAP).map(String::as_str).collect();
    let overflow = paths.len().saturating_sub(STATE_LISTING_CAP);
    if overflow > 0 {
        format!(
            "{label} ({}): {} (+{overflow} more)",
            paths.len(),
            shown.join(", ")
        )
    } else {
        format!("{label} ({}): {}", paths.len(), shown.join(", "))
    }
}

fn truncate_chars(text: &str, cap: usize) -> String {
    let mut out: String = text.chars().take(cap).collect();
    if text.chars().count() > cap {
        out.push_str("...");
    }
    out.replace('\n', " ")
}
