//! Retry execution with profile-based exponential backoff.
//!
//! Every remote call the core issues goes through [`with_retries`]. Two
//! fixed delay profiles exist: the standard profile for ordinary transient
//! failures and an elongated quota profile for rate-limit/quota errors,
//! which get a materially larger time and attempt budget. Provider-supplied
//! retry hints (explicit durations, `Retry-After`-style text, or structured
//! payloads with `{seconds, nanos}`) raise the computed delay; an elapsed
//! ceiling per profile stops the controller from sleeping past its budget.
//!
//! Sleeps are cooperative (`tokio::time::sleep`), so a long quota backoff
//! occupies its logical task without blocking other work. Elapsed time is
//! measured on the tokio clock, which keeps the ceiling honest under
//! `start_paused` tests.

use crate::errors::ProviderError;
use std::future::Future;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Delay profile applied between failed attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryProfile {
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Never sleep less than this, even after jitter.
    pub min_delay: Duration,
    /// Multiplicative jitter, symmetric around the computed delay.
    pub jitter_ratio: f64,
    /// Total wall-clock budget; the controller raises the last error rather
    /// than sleep past it.
    pub max_elapsed: Duration,
    /// Attempt floor this profile guarantees regardless of what the caller
    /// asked for.
    pub min_attempts: u32,
}

impl RetryProfile {
    /// Profile for ordinary transient failures.
    pub const fn standard() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
            min_delay: Duration::ZERO,
            jitter_ratio: 0.2,
            max_elapsed: Duration::from_secs(60),
            min_attempts: 0,
        }
    }

    /// Profile for quota/rate-limit failures.
    pub const fn quota() -> Self {
        Self {
            base_delay: Duration::from_secs(30),
            max_delay: Duration::from_secs(300),
            min_delay: Duration::from_secs(30),
            jitter_ratio: 0.2,
            max_elapsed: Duration::from_secs(3600),
            min_attempts: 12,
        }
    }

    /// Exponential delay for the given 0-based failure index, clamped
    /// between the profile floor and cap. Jitter and hints are applied by
    /// the caller.
    fn delay_for(&self, failure_index: u32) -> Duration {
        let exp = self.base_delay.as_secs_f64() * 2f64.powi(failure_index.min(32) as i32);
        let capped = exp.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped.max(self.min_delay.as_secs_f64()))
    }
}

/// The pair of profiles a controller run selects from. Quota budget and
/// attempt floor are configurable; see `crate::config`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryProfiles {
    pub standard: RetryProfile,
    pub quota: RetryProfile,
}

impl Default for RetryProfiles {
    fn default() -> Self {
        Self {
            standard: RetryProfile::standard(),
            quota: RetryProfile::quota(),
        }
    }
}

impl RetryProfiles {
    /// Override the quota profile's elapsed ceiling and attempt floor.
    pub fn with_quota_overrides(
        mut self,
        max_elapsed: Option<Duration>,
        min_attempts: Option<u32>,
    ) -> Self {
        if let Some(max_elapsed) = max_elapsed {
            self.quota.max_elapsed = max_elapsed;
        }
        if let Some(min_attempts) = min_attempts {
            self.quota.min_attempts = min_attempts;
        }
        self
    }
}

/// Execute `op` with retries under the default profiles.
///
/// `base_attempts` is the caller's total attempt budget for ordinary
/// failures; a quota-classified error upgrades the budget to the quota
/// profile's floor if that is higher. Errors rejected by `should_retry` are
/// raised immediately without consuming backoff.
pub async fn with_retries<T, F, Fut, P>(
    op: F,
    base_attempts: u32,
    should_retry: P,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
    P: Fn(&ProviderError) -> bool,
{
    with_retries_using(&RetryProfiles::default(), op, base_attempts, should_retry).await
}

/// [`with_retries`] with explicit profiles.
pub async fn with_retries_using<T, F, Fut, P>(
    profiles: &RetryProfiles,
    mut op: F,
    base_attempts: u32,
    should_retry: P,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
    P: Fn(&ProviderError) -> bool,
{
    let started = Instant::now();
    let mut budget = base_attempts.max(1);
    let mut profile = profiles.standard;
    let mut failures: u32 = 0;

    loop {
        let error = match op().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if !should_retry(&error) {
            return Err(error);
        }

        if error.is_quota() && profile != profiles.quota {
            profile = profiles.quota;
            budget = budget.max(profiles.quota.min_attempts);
            debug!(budget, "quota-classified error, switching to quota profile");
        }

        failures += 1;
        if failures >= budget {
            warn!(failures, "retry budget exhausted");
            return Err(error);
        }

        let mut delay = profile.delay_for(failures - 1);
        if let Some(hint) = error.retry_hint() {
            delay = delay.max(hint);
        }
        delay = apply_jitter(delay, profile.jitter_ratio).max(profile.min_delay);

        if started.elapsed() + delay > profile.max_elapsed {
            warn!(
                elapsed_s = started.elapsed().as_secs(),
                delay_s = delay.as_secs(),
                "elapsed ceiling would be exceeded, giving up"
            );
            return Err(error);
        }

        debug!(attempt = failures, delay_ms = delay.as_millis() as u64, "backing off");
        tokio::time::sleep(delay).await;
    }
}

/// Symmetric multiplicative jitter: `delay * (1 ± ratio)`.
fn apply_jitter(delay: Duration, ratio: f64) -> Duration {
    if ratio <= 0.0 {
        return delay;
    }
    let factor = 1.0 + ratio * (2.0 * pseudo_random() - 1.0);
    Duration::from_secs_f64((delay.as_secs_f64() * factor).max(0.0))
}

/// Cheap pseudo-random value in [0, 1) for jitter. Mixes wall-clock nanos
/// with a process-wide counter so concurrent callers do not stampede.
fn pseudo_random() -> f64 {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    let count = COUNTER.fetch_add(1, Ordering::Relaxed);

    let mut mixed = now.wrapping_mul(0x517c_c1b7_2722_0a95).wrapping_add(count);
    mixed ^= mixed >> 33;
    mixed = mixed.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    mixed ^= mixed >> 33;

    (mixed >> 11) as f64 / (1u64 << 53) as f64
}

/// Parse a retry hint out of an error message.
///
/// Understands delay phrases ("retry after 30s", "try again in 2.5
/// seconds", "retry-after: 90") and structured payloads embedded in the
/// text: a `retryDelay` string ("30s"), a numeric `retry_after` field, or a
/// `{seconds, nanos}` object anywhere in the payload.
pub fn parse_retry_hint(message: &str) -> Option<Duration> {
    if let Some(object) = extract_json_object(message) {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&object) {
            if let Some(hint) = hint_from_payload(&value) {
                return Some(hint);
            }
        }
    }

    let captures = hint_regex().captures(message)?;
    let amount: f64 = captures.get(1)?.as_str().parse().ok()?;
    let unit = captures.get(2).map(|m| m.as_str().to_lowercase());
    match unit.as_deref() {
        Some("ms") | Some("millisecond") | Some("milliseconds") => {
            Some(Duration::from_secs_f64(amount / 1000.0))
        }
        _ => Some(Duration::from_secs_f64(amount)),
    }
}

fn hint_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(
            r"(?i)(?:retry[ -]?after|try again in|retry in)[:\s]*([0-9]+(?:\.[0-9]+)?)\s*(ms|milliseconds?|s|secs?|seconds?)?",
        )
        .expect("hint regex is valid")
    })
}

/// Walk a structured error payload for a retry delay.
fn hint_from_payload(value: &serde_json::Value) -> Option<Duration> {
    match value {
        serde_json::Value::Object(map) => {
            // Google-style RetryInfo: {"seconds": 30, "nanos": 500000000}
            if let Some(seconds) = map.get("seconds").and_then(|v| v.as_f64()) {
                let nanos = map.get("nanos").and_then(|v| v.as_f64()).unwrap_or(0.0);
                return Some(Duration::from_secs_f64(seconds + nanos / 1e9));
            }
            if let Some(delay) = map.get("retryDelay").and_then(|v| v.as_str()) {
                let trimmed = delay.trim_end_matches('s');
                if let Ok(seconds) = trimmed.parse::<f64>() {
                    return Some(Duration::from_secs_f64(seconds));
                }
            }
            for key in ["retry_after", "retryAfter", "retry_after_seconds"] {
                if let Some(seconds) = map.get(key).and_then(|v| v.as_f64()) {
                    return Some(Duration::from_secs_f64(seconds));
                }
            }
            map.values().find_map(hint_from_payload)
        }
        serde_json::Value::Array(items) => items.iter().find_map(hint_from_payload),
        _ => None,
    }
}

/// Find the outermost brace-balanced JSON object in free text.
fn extract_json_object(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let mut depth = 0;
    for (i, ch) in text[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[start..start + i + 1].to_string());
                }
            }
            _ => {}
        }
    }
    None
}
