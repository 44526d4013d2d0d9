//! Repository - an optimistic, live-synced cache of one remote collection.
//!
//! A repository mirrors the result of a live query as an ordered list and
//! lets callers mutate that list immediately. The matching remote write is
//! spawned in the background; the next remote snapshot replaces the list
//! wholesale, so the remote store stays the source of truth.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐  add / modify / delete   ┌──────────────────────┐
//! │ RepositoryHandler    │ ───────────────────────▶ │ local list           │──▶ on_change listeners
//! │  (cloneable)         │                          │  Arc<Vec<RepoDoc>>   │
//! └──────────┬───────────┘                          └──────────▲───────────┘
//!            │ spawn remote write                              │ snapshot replaces list
//!            ▼                                                 │
//! ┌──────────────────────┐                          ┌──────────┴───────────┐
//! │ PendingWrite<R>      │ ◀──── confirmed id ───── │ RemoteStore          │
//! │  (await to confirm)  │                          │  live query + writes │
//! └──────────────────────┘                          └──────────────────────┘
//! ```
//!
//! ## Identity
//!
//! An add appears locally under a fake id (`~local-…`) with `synced_id ==
//! false`. When the remote add confirms, the entry takes the remote id and
//! becomes synced. Modifies and deletes issued against a fake id wait for that
//! confirmation before touching the remote store.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use optimistic_repository::{Collection, InMemoryRemoteStore, Patch, Repository};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Serialize, Deserialize, Collection, Patch)]
//! struct Deck {
//!     name: String,
//! }
//!
//! let store = Arc::new(InMemoryRemoteStore::new());
//! let decks = Repository::<Deck, _>::collection(store)?;
//! let handler = decks.handler();
//!
//! let write = handler.add_document(Deck { name: "Spanish".into() })?;
//! // Visible right away, unsynced.
//! assert!(!decks.documents().unwrap()[0].synced_id());
//!
//! let id = write.await?;
//! handler.modify_document(&id, &DeckPatch::new().name("Español"))?;
//! ```

mod handler;
mod pending;
mod shared;

use std::sync::{Arc, Weak};

use tokio::runtime::Handle;
use tracing::debug;

use crate::config::RepositoryConfig;
use crate::document::{Collection, RepositoryDocument};
use crate::error::RepositoryError;
use crate::observer::ListenerGuard;
use crate::remote::{Query, RemoteError, RemoteStore, SnapshotCallback, Subscription};

pub use handler::RepositoryHandler;
pub use pending::PendingWrite;

use shared::Shared;

/// The list a repository exposes. Every change produces a new `Arc`, so
/// pointer comparison is enough to detect an update.
pub type Documents<T> = Arc<Vec<RepositoryDocument<T>>>;

/// Live, optimistic view of the documents matched by one query.
///
/// Owns the live query: dropping the repository (or calling
/// [`close`](Self::close)) unsubscribes. Writes already in flight keep running.
pub struct Repository<T: Collection, S: RemoteStore> {
    shared: Arc<Shared<T, S>>,
    subscription: Option<Subscription>,
}

impl<T: Collection, S: RemoteStore> Repository<T, S> {
    /// Subscribe to `query` on `store`.
    ///
    /// Must be called from within a tokio runtime; remote writes are spawned
    /// on it. A failing subscription does not fail `open`: the error is
    /// available through [`last_error`](Self::last_error) and the documents
    /// stay `None`.
    pub fn open(
        store: Arc<S>,
        query: Query,
        config: RepositoryConfig,
    ) -> Result<Self, RepositoryError> {
        let runtime =
            Handle::try_current().map_err(|e| RepositoryError::NoRuntime(e.to_string()))?;
        let shared = Arc::new(Shared::new(store, query, config, runtime));

        let weak: Weak<Shared<T, S>> = Arc::downgrade(&shared);
        let on_snapshot: SnapshotCallback = Arc::new(move |snapshot| {
            if let Some(shared) = weak.upgrade() {
                shared.apply_snapshot(snapshot);
            }
        });

        let subscription = match shared.store.subscribe(&shared.query, on_snapshot) {
            Ok(subscription) => subscription,
            Err(error) => {
                shared.record_subscription_error(error);
                Subscription::detached()
            }
        };
        debug!(collection = shared.path(), "Opened repository");

        Ok(Self {
            shared,
            subscription: Some(subscription),
        })
    }

    /// Open the whole collection `T` is bound to, with the default config.
    pub fn collection(store: Arc<S>) -> Result<Self, RepositoryError> {
        Self::open(store, Query::collection::<T>(), RepositoryConfig::default())
    }

    /// Current list, `None` until the first snapshot has arrived.
    pub fn documents(&self) -> Option<Documents<T>> {
        self.shared
            .read("documents", |state| state.documents.clone())
            .ok()
            .flatten()
    }

    /// The local entry with `id`, synced or not.
    pub fn document(&self, id: &str) -> Option<RepositoryDocument<T>> {
        self.shared
            .read("document", |state| {
                state
                    .documents
                    .as_ref()?
                    .iter()
                    .find(|doc| doc.id == id)
                    .cloned()
            })
            .ok()
            .flatten()
    }

    pub fn handler(&self) -> RepositoryHandler<T, S> {
        RepositoryHandler::new(Arc::clone(&self.shared))
    }

    /// Call `listener` with the new list after every change, local or remote.
    pub fn on_change<F>(&self, listener: F) -> ListenerGuard
    where
        F: Fn(&Option<Documents<T>>) + Send + Sync + 'static,
    {
        self.shared.observers.on(listener)
    }

    /// The most recent subscription error, cleared by the next snapshot.
    pub fn last_error(&self) -> Option<RemoteError> {
        self.shared
            .read("last_error", |state| state.last_error.clone())
            .ok()
            .flatten()
    }

    pub fn query(&self) -> &Query {
        &self.shared.query
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.shared.config
    }

    /// Stop the live query. Handlers stay usable and in-flight writes finish.
    pub fn close(mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        debug!(collection = self.shared.path(), "Closed repository");
    }
}
