//! Documents - typed payloads paired with their identity.
//!
//! A [`Collection`] type is the payload stored in one remote collection
//! (a deck, a todo, a user profile). The repository holds it wrapped in a
//! [`RepositoryDocument`], which also records whether the remote store has
//! acknowledged the document yet.
//!
//! ## Example
//!
//! ```ignore
//! use optimistic_repository::{Collection, Patch};
//!
//! #[derive(Clone, Serialize, Deserialize, Collection, Patch)]
//! #[collection(name = "decks")]
//! struct Deck {
//!     pub name: String,
//!     pub cards: Vec<Card>,
//! }
//!
//! let patch = DeckPatch::new().name("Renamed");
//! ```

mod identity;
mod patch;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

pub use identity::{reconcile, FakeIds, DEFAULT_FAKE_ID_PREFIX};
pub use patch::{patch_fields, FieldMap, FieldPatch, Patch, PatchError};
pub(crate) use patch::FieldRevert;

/// Trait for payload types stored in a remote collection.
pub trait Collection: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Default collection path for this payload type (e.g. "decks", "todos").
    const COLLECTION: &'static str;
}

/// One record: a payload and the id it is addressed by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document<T> {
    pub id: String,
    pub data: T,
}

impl<T> Document<T> {
    pub fn new(id: impl Into<String>, data: T) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}

/// A document as held by a repository's local list.
///
/// `synced_id` only ever moves from `false` to `true`; the field is private so
/// that only reconciliation can flip it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryDocument<T> {
    pub id: String,
    pub data: T,
    synced_id: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    fake_id: Option<String>,
}

impl<T> RepositoryDocument<T> {
    /// A document observed through a subscription snapshot.
    pub fn synced(id: impl Into<String>, data: T) -> Self {
        Self {
            id: id.into(),
            data,
            synced_id: true,
            fake_id: None,
        }
    }

    /// A document created locally that the remote store has not confirmed.
    /// Its id is the fake id.
    pub fn unsynced(fake_id: impl Into<String>, data: T) -> Self {
        let fake_id = fake_id.into();
        Self {
            id: fake_id.clone(),
            data,
            synced_id: false,
            fake_id: Some(fake_id),
        }
    }

    /// Whether the remote store has acknowledged this document.
    pub fn synced_id(&self) -> bool {
        self.synced_id
    }

    /// The placeholder id used before confirmation, if the document was created locally.
    pub fn fake_id(&self) -> Option<&str> {
        self.fake_id.as_deref()
    }

    /// Mark as confirmed under `confirmed_id`, keeping the fake id for tracing.
    pub(crate) fn confirm(&mut self, confirmed_id: impl Into<String>) {
        self.id = confirmed_id.into();
        self.synced_id = true;
    }

    pub fn as_document(&self) -> Document<&T> {
        Document {
            id: self.id.clone(),
            data: &self.data,
        }
    }
}

impl<T> From<Document<T>> for RepositoryDocument<T> {
    fn from(document: Document<T>) -> Self {
        RepositoryDocument::synced(document.id, document.data)
    }
}

impl<T> From<RepositoryDocument<T>> for Document<T> {
    fn from(document: RepositoryDocument<T>) -> Self {
        Document {
            id: document.id,
            data: document.data,
        }
    }
}
