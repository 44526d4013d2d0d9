//! Snapshot adapter - turns raw live-query snapshots into typed documents.

use std::marker::PhantomData;

use tracing::warn;

use crate::document::{Collection, RepositoryDocument};
use crate::remote::RawDocument;

/// Decodes remote snapshots into the ordered list a repository exposes.
///
/// Every decoded document is synced: anything delivered by the live query has
/// by definition been acknowledged by the remote store. Entries that do not
/// decode into `T` are skipped.
pub struct SnapshotAdapter<T> {
    path: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Collection> SnapshotAdapter<T> {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    /// Decode `raw`, keeping the delivered order.
    pub fn decode(&self, raw: Vec<RawDocument>) -> Vec<RepositoryDocument<T>> {
        raw.into_iter()
            .filter_map(|RawDocument { id, data }| match serde_json::from_value::<T>(data) {
                Ok(data) => Some(RepositoryDocument::synced(id, data)),
                Err(e) => {
                    warn!(
                        collection = %self.path,
                        id = %id,
                        error = %e,
                        "Skipping undecodable document"
                    );
                    None
                }
            })
            .collect()
    }
}
