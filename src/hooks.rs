//! Hook-style accessors for UI bindings.
//!
//! Both return the current value together with a handler, mirroring how a
//! component reads state and gets the setters in one call. Register
//! [`Repository::on_change`] to be told when to call them again.

use crate::document::{Collection, RepositoryDocument};
use crate::remote::RemoteStore;
use crate::repository::{Documents, Repository, RepositoryHandler};

/// The current list of `repository` and a handler to mutate it.
pub fn use_repository<T, S>(
    repository: &Repository<T, S>,
) -> (Option<Documents<T>>, RepositoryHandler<T, S>)
where
    T: Collection,
    S: RemoteStore,
{
    (repository.documents(), repository.handler())
}

/// The entry `id` of `repository` (if present) and a handler to mutate it.
pub fn use_repository_document<T, S>(
    id: &str,
    repository: &Repository<T, S>,
) -> (Option<RepositoryDocument<T>>, RepositoryHandler<T, S>)
where
    T: Collection,
    S: RemoteStore,
{
    (repository.document(id), repository.handler())
}
