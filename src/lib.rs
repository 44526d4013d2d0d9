//! Optimistic client-side repository over a live-synced remote document store.
//!
//! See [`Repository`] for the main entry point.

mod config;
mod document;
mod error;
pub mod functions;
mod hooks;
mod observer;
mod remote;
mod repository;
mod subscription;

pub use config::{RepositoryConfig, WriteFailurePolicy};
pub use document::{
    patch_fields, reconcile, Collection, Document, FakeIds, FieldMap, FieldPatch, Patch, PatchError,
    RepositoryDocument, DEFAULT_FAKE_ID_PREFIX,
};
pub use error::RepositoryError;
pub use functions::{FunctionBridge, FunctionResponse, FunctionStatus};
pub use hooks::{use_repository, use_repository_document};
pub use observer::{ListenerGuard, Observers};
#[cfg(feature = "in-memory")]
pub use remote::InMemoryRemoteStore;
pub use remote::{
    Direction, Filter, OrderBy, Query, RawDocument, RemoteError, RemoteStore, SnapshotCallback,
    SnapshotResult, Subscription,
};
pub use repository::{Documents, PendingWrite, Repository, RepositoryHandler};
pub use subscription::SnapshotAdapter;

// Derive macros share their trait's name, like serde's.
pub use optimistic_repository_macros::{Collection, Patch};
