//! Configuration for the Magpie reconciliation core.
//!
//! Reads `.magpie/magpie.toml` with sensible defaults and environment
//! overrides layered on top (file → environment). The embedding binary owns
//! credential loading and CLI parsing; only the knobs the core itself
//! consumes live here.
//!
//! # Configuration File Format
//!
//! ```toml
//! [model]
//! context_window_tokens = 200000
//! compaction_model = "small-summarizer"
//!
//! [retry]
//! attempts = 3
//! quota_max_elapsed_secs = 3600
//! quota_min_attempts = 12
//!
//! [summary]
//! attribution = "_Automated review by Magpie._"
//! ```

use crate::reconcile::marker::DEFAULT_ATTRIBUTION;
use crate::retry::RetryProfiles;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Model-related settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSection {
    /// Context window of the review model, in tokens.
    #[serde(default = "default_context_window_tokens")]
    pub context_window_tokens: usize,
    /// Distinct compaction-capable model, if any. When unset, compaction
    /// falls back to its deterministic summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compaction_model: Option<String>,
}

fn default_context_window_tokens() -> usize {
    200_000
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            context_window_tokens: default_context_window_tokens(),
            compaction_model: None,
        }
    }
}

/// Retry settings; see `crate::retry` for the profile semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySection {
    /// Base attempt budget for ordinary transient failures.
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    /// Elapsed ceiling for the quota profile, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quota_max_elapsed_secs: Option<u64>,
    /// Attempt floor for the quota profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quota_min_attempts: Option<u32>,
}

fn default_attempts() -> u32 {
    3
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            quota_max_elapsed_secs: None,
            quota_min_attempts: None,
        }
    }
}

/// Summary footer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarySection {
    /// Attribution line appended to the session summary.
    #[serde(default = "default_attribution")]
    pub attribution: String,
}

fn default_attribution() -> String {
    DEFAULT_ATTRIBUTION.to_string()
}

impl Default for SummarySection {
    fn default() -> Self {
        Self {
            attribution: default_attribution(),
        }
    }
}

/// Root configuration loaded from `.magpie/magpie.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MagpieToml {
    #[serde(default)]
    pub model: ModelSection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub summary: SummarySection,
}

impl MagpieToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse magpie.toml")
    }

    /// Load configuration from the default location (.magpie/magpie.toml).
    /// Returns default configuration if the file doesn't exist.
    pub fn load_or_default(magpie_dir: &Path) -> Result<Self> {
        let config_path = magpie_dir.join("magpie.toml");
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize magpie.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Compaction model name, with fallback to environment variable.
    pub fn compaction_model(&self) -> Option<String> {
        self.model
            .compaction_model
            .clone()
            .or_else(|| std::env::var("MAGPIE_COMPACTION_MODEL").ok())
    }

    /// Retry profiles with any configured quota overrides applied.
    pub fn retry_profiles(&self) -> RetryProfiles {
        RetryProfiles::default().with_quota_overrides(
            self.retry.quota_max_elapsed_secs.map(Duration::from_secs),
            self.retry.quota_min_attempts,
        )
    }
}
