//! Typed error hierarchy for the Magpie reconciliation core.
//!
//! One top-level enum covers every failure a remote collaborator can hand
//! back:
//! - `ProviderError::Transient` — network/5xx-class failures, retried on the
//!   standard backoff profile
//! - `ProviderError::Quota` — rate-limit/quota exhaustion, retried on the
//!   elongated quota profile
//! - `ProviderError::NotFound` — 404-class; for ref comparisons this is a
//!   recognized scope-resolution branch, not a fault
//! - `ProviderError::Validation` — malformed location/body/ids, fails fast
//!
//! Errors outside the taxonomy ride along in `Other` and propagate unchanged
//! once the retry budget is exhausted.

use std::time::Duration;
use thiserror::Error;

/// Failures surfaced by remote collaborators (source-control host, model
/// provider). Classification drives retry behavior; see `crate::retry`.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transient provider failure (status {status:?}): {message}")]
    Transient {
        /// HTTP status if the adapter observed one.
        status: Option<u16>,
        message: String,
        /// Retry-After style hint captured at the boundary, if any.
        retry_after: Option<Duration>,
    },

    #[error("provider quota exhausted: {message}")]
    Quota {
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Message fragments that mark an error as quota/rate-limit related even
/// when the adapter could not classify it from a status code.
const QUOTA_PATTERNS: &[&str] = &[
    "quota",
    "resource exhausted",
    "resource_exhausted",
    "rate limit",
    "rate-limit",
    "rate_limit",
    "ratelimit",
    "too many requests",
    "429",
];

impl ProviderError {
    /// Build a transient error without status or hint.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            status: None,
            message: message.into(),
            retry_after: None,
        }
    }

    /// Build an error from an HTTP status code, classifying 404 and 429
    /// into their dedicated variants.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            404 => Self::NotFound(message),
            429 => Self::Quota {
                message,
                retry_after: None,
            },
            _ => Self::Transient {
                status: Some(status),
                message,
                retry_after: None,
            },
        }
    }

    /// Build a quota error with an explicit retry hint.
    pub fn quota(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self::Quota {
            message: message.into(),
            retry_after,
        }
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transient { status, .. } => *status,
            Self::Quota { .. } => Some(429),
            Self::NotFound(_) => Some(404),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether this error should be granted the elongated quota retry
    /// profile. True for the `Quota` variant, a 429 status, or any of the
    /// known quota message patterns.
    pub fn is_quota(&self) -> bool {
        match self {
            Self::Quota { .. } => true,
            Self::Transient {
                status, message, ..
            } => {
                *status == Some(429) || {
                    let lower = message.to_lowercase();
                    QUOTA_PATTERNS.iter().any(|p| lower.contains(p))
                }
            }
            Self::Other(err) => {
                let lower = err.to_string().to_lowercase();
                QUOTA_PATTERNS.iter().any(|p| lower.contains(p))
            }
            _ => false,
        }
    }

    /// Whether the error is worth retrying at all. Validation failures and
    /// missing resources are terminal; everything else gets a backoff.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Validation(_) | Self::NotFound(_))
    }

    /// Provider-supplied retry hint, if one can be recovered.
    ///
    /// Sources, in order: the explicit hint captured at the boundary, a
    /// delay embedded in the message text ("retry after 30s"), or a
    /// structured error payload carried inside the message expressing
    /// seconds or `{seconds, nanos}`.
    pub fn retry_hint(&self) -> Option<Duration> {
        let (explicit, message) = match self {
            Self::Transient {
                retry_after,
                message,
                ..
            } => (*retry_after, message.as_str()),
            Self::Quota {
                retry_after,
                message,
            } => (*retry_after, message.as_str()),
            _ => return None,
        };
        if explicit.is_some() {
            return explicit;
        }
        crate::retry::parse_retry_hint(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_status_maps_404_to_not_found() {
        let err = ProviderError::from_status(404, "ref gone");
        assert!(err.is_not_found());
        assert!(!err.is_retryable());
    }

    #[test]
    fn from_status_maps_429_to_quota() {
        let err = ProviderError::from_status(429, "slow down");
        assert!(matches!(err, ProviderError::Quota { .. }));
        assert!(err.is_quota());
        assert_eq!(err.status(), Some(429));
    }

    #[test]
    fn quota_detected_from_message_pattern() {
        let err = ProviderError::transient("RESOURCE_EXHAUSTED: per-minute quota");
        assert!(err.is_quota());

        let err = ProviderError::transient("rate limit exceeded, try later");
        assert!(err.is_quota());
    }

    #[test]
    fn plain_transient_is_not_quota() {
        let err = ProviderError::from_status(503, "upstream connect error");
        assert!(!err.is_quota());
        assert!(err.is_retryable());
    }

    #[test]
    fn validation_is_terminal() {
        let err = ProviderError::Validation("line must be positive".into());
        assert!(!err.is_retryable());
        assert!(err.status().is_none());
    }

    #[test]
    fn explicit_retry_after_wins_over_message() {
        let err = ProviderError::Quota {
            message: "retry after 5s".into(),
            retry_after: Some(Duration::from_secs(90)),
        };
        assert_eq!(err.retry_hint(), Some(Duration::from_secs(90)));
    }

    #[test]
    fn other_errors_carry_no_hint() {
        let err = ProviderError::Other(anyhow::anyhow!("boom"));
        assert!(err.retry_hint().is_none());
    }
}
