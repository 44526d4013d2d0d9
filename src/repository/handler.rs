//! Optimistic mutations.
//!
//! Every operation changes the local list and notifies observers first, then
//! spawns the remote write and hands back a [`PendingWrite`]. The remote write
//! runs to completion whether or not the handle is awaited.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::watch;
use tracing::trace;

use crate::document::{Collection, FieldRevert, Patch, RepositoryDocument};
use crate::error::RepositoryError;
use crate::remote::RemoteStore;

use super::pending::{PendingWrite, RemoteTarget};
use super::shared::Shared;

/// Mutation surface of a repository: add, modify and delete documents.
///
/// Cheap to clone. A handler keeps working after its [`Repository`](super::Repository)
/// is closed; only the live query stops.
pub struct RepositoryHandler<T, S> {
    shared: Arc<Shared<T, S>>,
}

impl<T, S> Clone for RepositoryHandler<T, S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Collection, S: RemoteStore> RepositoryHandler<T, S> {
    pub(crate) fn new(shared: Arc<Shared<T, S>>) -> Self {
        Self { shared }
    }

    /// Append `data` under a fresh fake id and create it remotely.
    ///
    /// The entry is visible, unsynced, as soon as this returns. The pending
    /// write resolves with the id assigned by the remote store, by which time
    /// the entry has been reconciled to that id (unless it was deleted or
    /// replaced by a snapshot in the meantime).
    pub fn add_document(&self, data: T) -> Result<PendingWrite<String>, RepositoryError> {
        let payload = serde_json::to_value(&data)?;
        let fake_id = self.shared.fake_ids.generate();
        let (outcome_tx, outcome_rx) = watch::channel(None);

        self.shared.mutate("add_document", |state| {
            let mut next = state.list();
            next.push(RepositoryDocument::unsynced(fake_id.clone(), data));
            state.pending_adds.insert(fake_id.clone(), outcome_rx);
            Ok(Some(next))
        })?;
        trace!(collection = self.shared.path(), fake_id = %fake_id, "Added document locally");

        let shared = Arc::clone(&self.shared);
        let task_fake_id = fake_id.clone();
        let handle = self.shared.runtime.spawn(async move {
            let result = shared
                .store
                .add(shared.path(), payload)
                .await
                .map_err(RepositoryError::from);
            outcome_tx.send_replace(Some(result.clone()));
            shared.finish_add(&task_fake_id, &result);
            result
        });

        Ok(PendingWrite::new(vec![fake_id], handle))
    }

    /// Merge `patch` into the document `id` and send the same fields remotely.
    ///
    /// Returns `Ok(None)` without touching anything when `id` is not in the
    /// local list. The pending write resolves with the remote id that was updated.
    pub fn modify_document<P>(
        &self,
        id: &str,
        patch: &P,
    ) -> Result<Option<PendingWrite<String>>, RepositoryError>
    where
        P: Patch<T> + ?Sized,
    {
        let fields = patch.fields()?;
        let mut change = None;

        self.shared.mutate("modify_document", |state| {
            let Some(position) = state.position(id) else {
                return Ok(None);
            };

            let mut next = state.list();
            let previous = next[position].data.clone();
            patch.apply_to(&mut next[position].data)?;
            let revert = FieldRevert::capture(&previous, &next[position].data, &fields)?;
            change = Some((revert, state.remote_target(&next[position])));
            Ok(Some(next))
        })?;

        let Some((revert, target)) = change else {
            trace!(collection = self.shared.path(), id, "Modify of unknown document ignored");
            return Ok(None);
        };
        trace!(collection = self.shared.path(), id, "Modified document locally");

        let shared = Arc::clone(&self.shared);
        let local_id = id.to_string();
        let handle = self.shared.runtime.spawn(async move {
            let remote_id = match target.resolve().await {
                Ok(remote_id) => remote_id,
                Err(e) => {
                    shared.finish_failed_modify(&local_id, None, revert, &e);
                    return Err(e);
                }
            };

            match shared.store.update(shared.path(), &remote_id, fields).await {
                Ok(()) => Ok(remote_id),
                Err(e) => {
                    let e = RepositoryError::from(e);
                    shared.finish_failed_modify(&local_id, Some(&remote_id), revert, &e);
                    Err(e)
                }
            }
        });

        Ok(Some(PendingWrite::new(vec![id.to_string()], handle)))
    }

    /// Remove the document `id` and delete it remotely.
    ///
    /// Returns `Ok(None)` when `id` is not in the local list. The pending write
    /// resolves with the remote id that was deleted.
    pub fn delete_document(
        &self,
        id: &str,
    ) -> Result<Option<PendingWrite<String>>, RepositoryError> {
        let mut removed = None;

        self.shared.mutate("delete_document", |state| {
            let Some(position) = state.position(id) else {
                return Ok(None);
            };

            let mut next = state.list();
            let document = next.remove(position);
            let target = state.remote_target(&document);
            removed = Some((position, document, target));
            Ok(Some(next))
        })?;

        let Some((position, document, target)) = removed else {
            trace!(collection = self.shared.path(), id, "Delete of unknown document ignored");
            return Ok(None);
        };
        trace!(collection = self.shared.path(), id, "Deleted document locally");

        let shared = Arc::clone(&self.shared);
        let handle = self.shared.runtime.spawn(async move {
            let result = delete_remote(&*shared, target).await;
            if let Err(e) = &result {
                shared.finish_failed_delete(vec![(position, document, e.clone())]);
            }
            result
        });

        Ok(Some(PendingWrite::new(vec![id.to_string()], handle)))
    }

    /// Remove every listed document that exists locally and delete them remotely.
    ///
    /// Ids not in the local list are skipped. The remote deletes run
    /// concurrently; the pending write resolves with the deleted remote ids
    /// once all of them succeeded, or with the first failure.
    pub fn delete_documents<I, D>(
        &self,
        ids: I,
    ) -> Result<PendingWrite<Vec<String>>, RepositoryError>
    where
        I: IntoIterator<Item = D>,
        D: AsRef<str>,
    {
        let ids: Vec<String> = ids.into_iter().map(|id| id.as_ref().to_string()).collect();
        let mut removed = Vec::new();

        self.shared.mutate("delete_documents", |state| {
            let current = state.list();
            let mut next = Vec::with_capacity(current.len());
            for (position, document) in current.into_iter().enumerate() {
                if ids.iter().any(|id| *id == document.id) {
                    let target = state.remote_target(&document);
                    removed.push((position, document, target));
                } else {
                    next.push(document);
                }
            }

            if removed.is_empty() {
                Ok(None)
            } else {
                Ok(Some(next))
            }
        })?;

        let local_ids: Vec<String> = removed.iter().map(|(_, doc, _)| doc.id.clone()).collect();
        trace!(
            collection = self.shared.path(),
            count = local_ids.len(),
            "Deleted documents locally"
        );

        let shared = Arc::clone(&self.shared);
        let handle = self.shared.runtime.spawn(async move {
            let (restorable, targets): (Vec<_>, Vec<_>) = removed
                .into_iter()
                .map(|(position, document, target)| ((position, document), target))
                .unzip();

            let deletes = targets.into_iter().map(|target| delete_remote(&*shared, target));
            let results = join_all(deletes).await;

            let mut deleted = Vec::with_capacity(results.len());
            let mut failed = Vec::new();
            let mut first_error = None;
            for (result, entry) in results.into_iter().zip(restorable) {
                match result {
                    Ok(remote_id) => deleted.push(remote_id),
                    Err(e) => {
                        let (position, document) = entry;
                        first_error.get_or_insert_with(|| e.clone());
                        failed.push((position, document, e));
                    }
                }
            }

            match first_error {
                None => Ok(deleted),
                Some(e) => {
                    shared.finish_failed_delete(failed);
                    Err(e)
                }
            }
        });

        Ok(PendingWrite::new(local_ids, handle))
    }
}

async fn delete_remote<T: Collection, S: RemoteStore>(
    shared: &Shared<T, S>,
    target: RemoteTarget,
) -> Result<String, RepositoryError> {
    let remote_id = target.resolve().await?;
    shared.store.delete(shared.path(), &remote_id).await?;
    Ok(remote_id)
}
