//! Awaitable confirmations for optimistic writes.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::RepositoryError;

/// Outcome of a remote add, published once to every write that depends on it.
pub(crate) type AddOutcome = Option<Result<String, RepositoryError>>;

/// A remote write that is already running.
///
/// The local list was updated before this handle was returned. Awaiting it
/// yields the result of the remote write; dropping it does not cancel the write.
#[must_use = "await the pending write to observe its confirmation or failure"]
#[derive(Debug)]
pub struct PendingWrite<R> {
    local_ids: Vec<String>,
    handle: JoinHandle<Result<R, RepositoryError>>,
}

impl<R> PendingWrite<R> {
    pub(crate) fn new(
        local_ids: Vec<String>,
        handle: JoinHandle<Result<R, RepositoryError>>,
    ) -> Self {
        Self { local_ids, handle }
    }

    /// The local id this write was issued for (the fake id of an add).
    pub fn local_id(&self) -> Option<&str> {
        self.local_ids.first().map(String::as_str)
    }

    /// Every local id this write was issued for.
    pub fn local_ids(&self) -> &[String] {
        &self.local_ids
    }

    /// Whether the remote write has completed, successfully or not.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl<R> Future for PendingWrite<R> {
    type Output = Result<R, RepositoryError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.handle).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(join_error)) => {
                Poll::Ready(Err(RepositoryError::TaskAborted(join_error.to_string())))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Where a write against a local id has to go on the remote side.
pub(crate) enum RemoteTarget {
    /// The id is already known to the remote store.
    Confirmed(String),
    /// The id is a fake id whose add is still in flight.
    Pending {
        fake_id: String,
        outcome: watch::Receiver<AddOutcome>,
    },
    /// The id is a fake id whose add is no longer tracked (it failed earlier).
    Orphaned(String),
}

impl RemoteTarget {
    /// Wait until the remote id is known.
    pub(crate) async fn resolve(self) -> Result<String, RepositoryError> {
        match self {
            RemoteTarget::Confirmed(id) => Ok(id),
            RemoteTarget::Orphaned(fake_id) => Err(RepositoryError::Unconfirmed { fake_id }),
            RemoteTarget::Pending {
                fake_id,
                mut outcome,
            } => {
                let confirmed = match outcome.wait_for(Option::is_some).await {
                    Ok(outcome) => match outcome.as_ref() {
                        Some(Ok(id)) => Some(id.clone()),
                        _ => None,
                    },
                    Err(_) => None,
                };
                confirmed.ok_or(RepositoryError::Unconfirmed { fake_id })
            }
        }
    }
}
