//! State shared by a repository, its handlers and its in-flight writes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::config::{RepositoryConfig, WriteFailurePolicy};
use crate::document::{reconcile, Collection, FakeIds, FieldRevert, RepositoryDocument};
use crate::error::RepositoryError;
use crate::observer::Observers;
use crate::remote::{Query, RemoteError, SnapshotResult};
use crate::subscription::SnapshotAdapter;

use super::pending::{AddOutcome, RemoteTarget};
use super::Documents;

pub(crate) struct State<T> {
    /// `None` until the first snapshot (or optimistic add) arrives.
    pub documents: Option<Documents<T>>,
    /// Fake id -> outcome of its in-flight add.
    pub pending_adds: HashMap<String, watch::Receiver<AddOutcome>>,
    pub last_error: Option<RemoteError>,
}

impl<T> Default for State<T> {
    fn default() -> Self {
        Self {
            documents: None,
            pending_adds: HashMap::new(),
            last_error: None,
        }
    }
}

impl<T: Clone> State<T> {
    /// Copy of the current list, for building the next one.
    pub fn list(&self) -> Vec<RepositoryDocument<T>> {
        self.documents
            .as_deref()
            .map(|docs| docs.to_vec())
            .unwrap_or_default()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.documents.as_ref()?.iter().position(|doc| doc.id == id)
    }

    /// Where writes against the local `document` must be sent.
    pub fn remote_target(&self, document: &RepositoryDocument<T>) -> RemoteTarget {
        if document.synced_id() {
            return RemoteTarget::Confirmed(document.id.clone());
        }
        match self.pending_adds.get(&document.id) {
            Some(outcome) => RemoteTarget::Pending {
                fake_id: document.id.clone(),
                outcome: outcome.clone(),
            },
            None => RemoteTarget::Orphaned(document.id.clone()),
        }
    }
}

pub(crate) struct Shared<T, S> {
    pub store: Arc<S>,
    pub query: Query,
    pub config: RepositoryConfig,
    pub fake_ids: FakeIds,
    pub runtime: Handle,
    pub adapter: SnapshotAdapter<T>,
    pub observers: Observers<Option<Documents<T>>>,
    state: Mutex<State<T>>,
}

impl<T: Collection, S> Shared<T, S> {
    pub fn new(store: Arc<S>, query: Query, config: RepositoryConfig, runtime: Handle) -> Self {
        Self {
            fake_ids: FakeIds::new(config.fake_id_prefix()),
            adapter: SnapshotAdapter::new(query.collection_path()),
            store,
            query,
            config,
            runtime,
            observers: Observers::new(),
            state: Mutex::new(State::default()),
        }
    }

    pub fn path(&self) -> &str {
        self.query.collection_path()
    }

    /// Run `f` against the state under the lock.
    pub fn read<R>(
        &self,
        op: &'static str,
        f: impl FnOnce(&State<T>) -> R,
    ) -> Result<R, RepositoryError> {
        let state = self
            .state
            .lock()
            .map_err(|_| RepositoryError::LockPoisoned(op))?;
        Ok(f(&*state))
    }

    /// Run `f` under the lock. When it returns a new list, that list replaces
    /// the current one (as a new `Arc`) and observers are notified after the
    /// lock is released.
    pub fn mutate<F>(&self, op: &'static str, f: F) -> Result<bool, RepositoryError>
    where
        F: FnOnce(&mut State<T>) -> Result<Option<Vec<RepositoryDocument<T>>>, RepositoryError>,
    {
        let published = {
            let mut state = self
                .state
                .lock()
                .map_err(|_| RepositoryError::LockPoisoned(op))?;
            match f(&mut *state)? {
                Some(next) => {
                    let next = Some(Arc::new(next));
                    state.documents = next.clone();
                    Some(next)
                }
                None => None,
            }
        };

        match published {
            Some(documents) => {
                self.observers.emit(&documents);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Mutation from a background task: failures can only be logged.
    fn mutate_in_background<F>(&self, op: &'static str, f: F)
    where
        F: FnOnce(&mut State<T>) -> Result<Option<Vec<RepositoryDocument<T>>>, RepositoryError>,
    {
        if let Err(e) = self.mutate(op, f) {
            warn!(collection = self.path(), error = %e, "Failed to update local state");
        }
    }

    /// Replace the list with a remote snapshot, or record a subscription error.
    pub fn apply_snapshot(&self, snapshot: SnapshotResult) {
        match snapshot {
            Ok(raw) => {
                let documents = self.adapter.decode(raw);
                debug!(collection = self.path(), count = documents.len(), "Applied snapshot");
                self.mutate_in_background("apply_snapshot", |state| {
                    state.last_error = None;
                    Ok(Some(documents))
                });
            }
            Err(error) => self.record_subscription_error(error),
        }
    }

    pub fn record_subscription_error(&self, error: RemoteError) {
        warn!(collection = self.path(), error = %error, "Subscription failed");
        self.mutate_in_background("subscription_error", |state| {
            state.last_error = Some(error);
            Ok(None)
        });
    }

    /// Settle an add: reconcile the fake id on success, apply the failure
    /// policy otherwise.
    pub fn finish_add(&self, fake_id: &str, result: &Result<String, RepositoryError>) {
        let rollback = self.config.write_failure_policy() == WriteFailurePolicy::Rollback;

        self.mutate_in_background("finish_add", |state| {
            state.pending_adds.remove(fake_id);
            let Some(documents) = state.documents.as_deref() else {
                return Ok(None);
            };

            match result {
                Ok(confirmed_id) => {
                    let next = reconcile(documents, fake_id, confirmed_id);
                    if next.is_some() {
                        trace!(collection = self.path(), fake_id, id = %confirmed_id, "Reconciled");
                    } else {
                        trace!(collection = self.path(), fake_id, "Fake id already gone");
                    }
                    Ok(next)
                }
                Err(error) => {
                    warn!(collection = self.path(), fake_id, error = %error, "Remote add failed");
                    if !rollback || !documents.iter().any(|doc| doc.id == fake_id) {
                        return Ok(None);
                    }
                    warn!(collection = self.path(), fake_id, "Rolling back optimistic add");
                    Ok(Some(
                        documents
                            .iter()
                            .filter(|doc| doc.id != fake_id)
                            .cloned()
                            .collect(),
                    ))
                }
            }
        });
    }

    /// Undo a failed modify on the fields it set, unless something newer
    /// (usually a snapshot) has replaced them since.
    pub fn finish_failed_modify(
        &self,
        local_id: &str,
        remote_id: Option<&str>,
        revert: FieldRevert,
        error: &RepositoryError,
    ) {
        warn!(collection = self.path(), id = local_id, error = %error, "Remote modify failed");
        if self.config.write_failure_policy() != WriteFailurePolicy::Rollback {
            return;
        }

        self.mutate_in_background("rollback_modify", |state| {
            let addressed = |doc: &RepositoryDocument<T>| {
                doc.id == local_id || Some(doc.id.as_str()) == remote_id
            };
            let Some(position) = state
                .documents
                .as_ref()
                .and_then(|docs| docs.iter().position(|doc| addressed(doc)))
            else {
                return Ok(None);
            };

            let mut next = state.list();
            if !revert.revert(&mut next[position].data)? {
                return Ok(None);
            }
            warn!(collection = self.path(), id = local_id, "Rolling back optimistic modify");
            Ok(Some(next))
        });
    }

    /// Re-insert documents whose remote delete failed.
    ///
    /// Entries whose add never confirmed are not restored: there is no
    /// remote document behind them to come back to.
    pub fn finish_failed_delete(
        &self,
        failed: Vec<(usize, RepositoryDocument<T>, RepositoryError)>,
    ) {
        for (_, document, error) in &failed {
            warn!(
                collection = self.path(),
                id = %document.id,
                error = %error,
                "Remote delete failed"
            );
        }
        if self.config.write_failure_policy() != WriteFailurePolicy::Rollback {
            return;
        }

        self.mutate_in_background("rollback_delete", |state| {
            let mut next = state.list();
            let mut restored = 0;
            for (index, document, error) in failed {
                if matches!(error, RepositoryError::Unconfirmed { .. }) {
                    trace!(collection = self.path(), id = %document.id, "Not restored");
                    continue;
                }
                if next.iter().any(|doc| doc.id == document.id) {
                    continue;
                }
                let index = index.min(next.len());
                next.insert(index, document);
                restored += 1;
            }

            if restored == 0 {
                return Ok(None);
            }
            warn!(collection = self.path(), count = restored, "Rolling back optimistic delete");
            Ok(Some(next))
        });
    }
}
