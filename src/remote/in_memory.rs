//! InMemoryRemoteStore - HashMap-backed remote store for testing and development.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use async_trait::async_trait;
use rand::distr::Alphanumeric;
use rand::Rng;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::document::FieldMap;

use super::{
    Query, RawDocument, RemoteError, RemoteStore, SnapshotCallback, SnapshotResult, Subscription,
};

const GENERATED_ID_LEN: usize = 20;

struct Subscriber {
    id: u64,
    query: Query,
    callback: SnapshotCallback,
    /// A snapshot was due while deliveries were held.
    missed: bool,
}

#[derive(Default)]
struct State {
    /// Collection path -> documents in insertion order.
    collections: HashMap<String, Vec<RawDocument>>,
    subscribers: Vec<Subscriber>,
    next_subscriber: u64,
    queued_ids: VecDeque<String>,
    write_failures: VecDeque<RemoteError>,
    subscription_failure: Option<RemoteError>,
    holding_snapshots: bool,
}

type Delivery = (SnapshotCallback, SnapshotResult);

impl State {
    fn evaluate(&self, query: &Query) -> Vec<RawDocument> {
        match self.collections.get(query.collection_path()) {
            Some(documents) => query.evaluate(documents),
            None => Vec::new(),
        }
    }

    /// Snapshots owed to subscribers of `path` after a write.
    fn deliveries_for(&mut self, path: &str) -> Vec<Delivery> {
        let holding = self.holding_snapshots;
        let mut due = Vec::new();
        for (index, subscriber) in self.subscribers.iter_mut().enumerate() {
            if subscriber.query.collection_path() != path {
                continue;
            }
            if holding {
                subscriber.missed = true;
            } else {
                due.push(index);
            }
        }

        due.into_iter()
            .map(|index| {
                let subscriber = &self.subscribers[index];
                (
                    Arc::clone(&subscriber.callback),
                    Ok(self.evaluate(&subscriber.query)),
                )
            })
            .collect()
    }
}

fn deliver(deliveries: Vec<Delivery>) {
    for (callback, snapshot) in deliveries {
        callback(snapshot);
    }
}

fn generate_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_ID_LEN)
        .map(char::from)
        .collect()
}

/// In-memory remote store.
///
/// Behaves like a live-synced document database: adds get generated ids,
/// every write pushes a fresh snapshot to the live queries on the written
/// collection, and subscribing delivers the current result straight away.
///
/// Clone-friendly via `Arc`; clones share the same data and subscribers.
///
/// Test controls:
/// - [`pause_writes`](Self::pause_writes) / [`resume_writes`](Self::resume_writes)
///   simulate going offline: writes wait until resumed.
/// - [`hold_snapshots`](Self::hold_snapshots) / [`release_snapshots`](Self::release_snapshots)
///   delay snapshot delivery; each subscriber that missed one gets the latest on release.
/// - [`queue_ids`](Self::queue_ids) fixes the ids of upcoming adds.
/// - [`fail_next_write`](Self::fail_next_write), [`fail_subscriptions`](Self::fail_subscriptions)
///   and [`drop_subscriptions`](Self::drop_subscriptions) inject failures.
#[derive(Clone)]
pub struct InMemoryRemoteStore {
    state: Arc<Mutex<State>>,
    online: Arc<watch::Sender<bool>>,
}

impl Default for InMemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        let (online, _) = watch::channel(true);
        Self {
            state: Arc::new(Mutex::new(State::default())),
            online: Arc::new(online),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert a document directly, bypassing paused writes and injected failures.
    pub fn seed(&self, path: &str, id: impl Into<String>, data: Value) {
        let deliveries = {
            let mut state = self.lock();
            state
                .collections
                .entry(path.to_string())
                .or_default()
                .push(RawDocument::new(id, data));
            state.deliveries_for(path)
        };
        deliver(deliveries);
    }

    /// Current documents of a collection, in insertion order.
    pub fn documents(&self, path: &str) -> Vec<RawDocument> {
        self.lock().collections.get(path).cloned().unwrap_or_default()
    }

    pub fn document(&self, path: &str, id: &str) -> Option<RawDocument> {
        self.lock()
            .collections
            .get(path)
            .and_then(|docs| docs.iter().find(|doc| doc.id == id).cloned())
    }

    /// Number of live queries.
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Make writes wait until [`resume_writes`](Self::resume_writes) is called.
    pub fn pause_writes(&self) {
        self.online.send_replace(false);
    }

    pub fn resume_writes(&self) {
        self.online.send_replace(true);
    }

    /// Stop delivering snapshots until [`release_snapshots`](Self::release_snapshots).
    pub fn hold_snapshots(&self) {
        self.lock().holding_snapshots = true;
    }

    /// Resume snapshot delivery, sending the current result to every live
    /// query that missed a snapshot while held.
    pub fn release_snapshots(&self) {
        let deliveries: Vec<Delivery> = {
            let mut state = self.lock();
            state.holding_snapshots = false;

            let missed: Vec<usize> = state
                .subscribers
                .iter()
                .enumerate()
                .filter(|(_, s)| s.missed)
                .map(|(index, _)| index)
                .collect();

            missed
                .into_iter()
                .map(|index| {
                    state.subscribers[index].missed = false;
                    let subscriber = &state.subscribers[index];
                    (
                        Arc::clone(&subscriber.callback),
                        Ok(state.evaluate(&subscriber.query)),
                    )
                })
                .collect()
        };
        debug!(count = deliveries.len(), "Releasing held snapshots");
        deliver(deliveries);
    }

    /// Use these ids, in order, for the next adds.
    pub fn queue_ids<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock().queued_ids.extend(ids.into_iter().map(Into::into));
    }

    /// Make the next write fail with `error`. Calls queue up.
    pub fn fail_next_write(&self, error: RemoteError) {
        self.lock().write_failures.push_back(error);
    }

    /// Make every new live query fail with `error` until cleared.
    pub fn fail_subscriptions(&self, error: RemoteError) {
        self.lock().subscription_failure = Some(error);
    }

    pub fn clear_subscription_failure(&self) {
        self.lock().subscription_failure = None;
    }

    /// Terminate every live query with `error`.
    pub fn drop_subscriptions(&self, error: RemoteError) {
        let callbacks: Vec<SnapshotCallback> = {
            let mut state = self.lock();
            state.subscribers.drain(..).map(|s| s.callback).collect()
        };
        for callback in callbacks {
            callback(Err(error.clone()));
        }
    }

    async fn wait_online(&self) -> Result<(), RemoteError> {
        let mut online = self.online.subscribe();
        online
            .wait_for(|online| *online)
            .await
            .map(|_| ())
            .map_err(|_| RemoteError::Unavailable("store shut down".into()))
    }

    fn take_write_failure(state: &mut State) -> Result<(), RemoteError> {
        match state.write_failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn remove_subscriber(state: &Weak<Mutex<State>>, id: u64) {
    if let Some(state) = state.upgrade() {
        let mut state = state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.subscribers.retain(|s| s.id != id);
        trace!(subscriber = id, "Removed subscriber");
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    fn subscribe(
        &self,
        query: &Query,
        on_snapshot: SnapshotCallback,
    ) -> Result<Subscription, RemoteError> {
        let (id, initial) = {
            let mut state = self.lock();

            if let Some(error) = state.subscription_failure.clone() {
                drop(state);
                on_snapshot(Err(error));
                return Ok(Subscription::detached());
            }

            let id = state.next_subscriber;
            state.next_subscriber += 1;

            let holding = state.holding_snapshots;
            let initial = if holding {
                None
            } else {
                Some(state.evaluate(query))
            };

            state.subscribers.push(Subscriber {
                id,
                query: query.clone(),
                callback: Arc::clone(&on_snapshot),
                missed: holding,
            });
            (id, initial)
        };

        trace!(subscriber = id, path = query.collection_path(), "Added subscriber");
        if let Some(snapshot) = initial {
            on_snapshot(Ok(snapshot));
        }

        let state = Arc::downgrade(&self.state);
        Ok(Subscription::new(move || remove_subscriber(&state, id)))
    }

    async fn add(&self, path: &str, data: Value) -> Result<String, RemoteError> {
        self.wait_online().await?;

        if !data.is_object() {
            return Err(RemoteError::Rejected("document data must be an object".into()));
        }

        let (id, deliveries) = {
            let mut state = self.lock();
            Self::take_write_failure(&mut state)?;

            let id = match state.queued_ids.pop_front() {
                Some(id) => id,
                None => generate_id(),
            };

            let documents = state.collections.entry(path.to_string()).or_default();
            if documents.iter().any(|doc| doc.id == id) {
                let message = format!("document {}/{} already exists", path, id);
                return Err(RemoteError::Rejected(message));
            }
            documents.push(RawDocument::new(id.clone(), data));

            (id, state.deliveries_for(path))
        };

        trace!(path, id = %id, "Added document");
        deliver(deliveries);
        Ok(id)
    }

    async fn update(&self, path: &str, id: &str, fields: FieldMap) -> Result<(), RemoteError> {
        self.wait_online().await?;

        let deliveries = {
            let mut state = self.lock();
            Self::take_write_failure(&mut state)?;

            let not_found = || RemoteError::NotFound {
                path: path.to_string(),
                id: id.to_string(),
            };

            let document = state
                .collections
                .get_mut(path)
                .and_then(|docs| docs.iter_mut().find(|doc| doc.id == id))
                .ok_or_else(not_found)?;

            let Value::Object(current) = &mut document.data else {
                return Err(RemoteError::Rejected("stored document is not an object".into()));
            };
            for (field, value) in fields {
                current.insert(field, value);
            }

            state.deliveries_for(path)
        };

        trace!(path, id, "Updated document");
        deliver(deliveries);
        Ok(())
    }

    async fn delete(&self, path: &str, id: &str) -> Result<(), RemoteError> {
        self.wait_online().await?;

        let deliveries = {
            let mut state = self.lock();
            Self::take_write_failure(&mut state)?;

            let removed = match state.collections.get_mut(path) {
                Some(documents) => {
                    let before = documents.len();
                    documents.retain(|doc| doc.id != id);
                    documents.len() != before
                }
                None => false,
            };

            if removed {
                state.deliveries_for(path)
            } else {
                Vec::new()
            }
        };

        trace!(path, id, "Deleted document");
        deliver(deliveries);
        Ok(())
    }
}
