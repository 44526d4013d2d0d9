use thiserror::Error;

use crate::document::PatchError;
use crate::remote::RemoteError;

/// Errors returned by repository operations and pending writes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("repository lock poisoned during {0}")]
    LockPoisoned(&'static str),

    #[error("remote store error: {0}")]
    Remote(#[from] RemoteError),

    #[error("patch error: {0}")]
    Patch(#[from] PatchError),

    #[error("serialization error: {0}")]
    Serde(String),

    /// The repository was opened outside a tokio runtime.
    #[error("no async runtime available: {0}")]
    NoRuntime(String),

    /// A spawned remote write panicked or was aborted by runtime shutdown.
    #[error("write task aborted: {0}")]
    TaskAborted(String),

    /// The add this write depended on never produced a confirmed id.
    #[error("pending add {fake_id} was not confirmed")]
    Unconfirmed { fake_id: String },
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serde(err.to_string())
    }
}
