//! Placeholder ids for documents the remote store has not confirmed yet.

use uuid::Uuid;

use super::RepositoryDocument;

/// `~` never appears in ids generated by the remote store.
pub const DEFAULT_FAKE_ID_PREFIX: &str = "~local-";

/// Generator for session-unique placeholder ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeIds {
    prefix: String,
}

impl Default for FakeIds {
    fn default() -> Self {
        Self::new(DEFAULT_FAKE_ID_PREFIX)
    }
}

impl FakeIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn generate(&self) -> String {
        format!("{}{}", self.prefix, Uuid::new_v4().simple())
    }

    pub fn is_fake(&self, id: &str) -> bool {
        id.starts_with(&self.prefix)
    }
}

/// Replace the entry addressed by `fake_id` with one addressed by `confirmed_id`.
///
/// Returns `None` when there is nothing to do: the fake entry is gone (deleted,
/// or replaced by a snapshot) and must not come back. When `confirmed_id` is
/// already present, the fake entry is dropped so ids stay unique.
pub fn reconcile<T: Clone>(
    documents: &[RepositoryDocument<T>],
    fake_id: &str,
    confirmed_id: &str,
) -> Option<Vec<RepositoryDocument<T>>> {
    let position = documents.iter().position(|doc| doc.id == fake_id)?;

    let mut next = documents.to_vec();
    if documents.iter().any(|doc| doc.id == confirmed_id) {
        next.remove(position);
    } else {
        next[position].confirm(confirmed_id);
    }
    Some(next)
}
