//! Remote store - the live-synced document database the repository caches.
//!
//! The repository only needs two things from the remote side: a live query
//! that pushes ordered snapshots, and three independently failable writes.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────┐   subscribe(query, callback)   ┌─────────────────────┐
//! │ Repository<T, S>             │ ─────────────────────────────▶ │ RemoteStore         │
//! │  - local list (optimistic)   │ ◀───────── snapshots ───────── │  subscribe / add /  │
//! │  - spawned writes            │ ─── add / update / delete ───▶ │  update / delete    │
//! └──────────────────────────────┘                                └─────────────────────┘
//!                                                                    │            │
//!                                                         ┌──────────┘            └────────────┐
//!                                                         ▼                                    ▼
//!                                                 InMemoryRemoteStore                 SDK-backed store
//!                                                    (included)                          (external)
//! ```

#[cfg(feature = "in-memory")]
mod in_memory;
mod query;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::document::FieldMap;

#[cfg(feature = "in-memory")]
pub use in_memory::InMemoryRemoteStore;
pub use query::{Direction, Filter, OrderBy, Query};

/// A document exactly as the remote store delivers it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    pub id: String,
    pub data: Value,
}

impl RawDocument {
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}

/// Errors reported by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("remote store unavailable: {0}")]
    Unavailable(String),
    #[error("document not found: {path}/{id}")]
    NotFound { path: String, id: String },
    #[error("write rejected: {0}")]
    Rejected(String),
}

/// One delivery of a live query: the full ordered result, or an error.
pub type SnapshotResult = Result<Vec<RawDocument>, RemoteError>;

/// Callback invoked on every snapshot of a live query.
pub type SnapshotCallback = Arc<dyn Fn(SnapshotResult) + Send + Sync>;

/// A live-synced remote document database.
#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    /// Start a live query. `on_snapshot` receives the full ordered result set
    /// every time it changes. The query stops when the returned handle is dropped.
    fn subscribe(
        &self,
        query: &Query,
        on_snapshot: SnapshotCallback,
    ) -> Result<Subscription, RemoteError>;

    /// Create a document in the collection at `path`, returning its assigned id.
    async fn add(&self, path: &str, data: Value) -> Result<String, RemoteError>;

    /// Set the given top-level fields of an existing document.
    async fn update(&self, path: &str, id: &str, fields: FieldMap) -> Result<(), RemoteError>;

    /// Delete a document.
    async fn delete(&self, path: &str, id: &str) -> Result<(), RemoteError>;
}

/// Handle to a live query. Dropping it unsubscribes.
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Wrap the store-specific teardown for a live query.
    pub fn new<F>(unsubscribe: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// A subscription with nothing to tear down.
    pub fn detached() -> Self {
        Self { unsubscribe: None }
    }

    pub fn unsubscribe(mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}
