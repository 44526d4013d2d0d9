//! Repository configuration.

use serde::Deserialize;

use crate::document::DEFAULT_FAKE_ID_PREFIX;

/// What to do with optimistic local state when the matching remote write fails.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteFailurePolicy {
    /// Leave the optimistic entry (or its absence) in place. The next snapshot
    /// from the remote store is the only correction.
    #[default]
    Keep,
    /// Undo the optimistic change: drop failed adds, restore the previous data
    /// of failed modifies and re-insert the entries of failed deletes.
    Rollback,
}

/// Settings for one repository instance.
///
/// ```
/// use optimistic_repository::{RepositoryConfig, WriteFailurePolicy};
///
/// let config = RepositoryConfig::default()
///     .with_fake_id_prefix("tmp-")
///     .with_write_failure_policy(WriteFailurePolicy::Rollback);
/// assert_eq!(config.fake_id_prefix(), "tmp-");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    fake_id_prefix: String,
    on_write_failure: WriteFailurePolicy,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            fake_id_prefix: DEFAULT_FAKE_ID_PREFIX.to_string(),
            on_write_failure: WriteFailurePolicy::Keep,
        }
    }
}

impl RepositoryConfig {
    /// Set the prefix used for locally generated placeholder ids.
    ///
    /// The prefix must not be a possible prefix of ids assigned by the remote
    /// store, otherwise fake ids may collide with real ones.
    pub fn with_fake_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.fake_id_prefix = prefix.into();
        self
    }

    /// Set the policy applied when a remote write fails.
    pub fn with_write_failure_policy(mut self, policy: WriteFailurePolicy) -> Self {
        self.on_write_failure = policy;
        self
    }

    pub fn fake_id_prefix(&self) -> &str {
        &self.fake_id_prefix
    }

    pub fn write_failure_policy(&self) -> WriteFailurePolicy {
        self.on_write_failure
    }
}
