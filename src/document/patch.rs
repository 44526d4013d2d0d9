//! Partial updates.
//!
//! A [`Patch`] changes some top-level fields of a payload and leaves the rest
//! untouched. The same patch is applied to the local copy and sent to the
//! remote store as a sparse field map, so both sides see the same change.
//!
//! Prefer `#[derive(Patch)]`, which generates a typed patch struct where a
//! misspelled field is a compile error. [`FieldPatch`] covers the cases where
//! field names are only known at runtime and checks them when applied.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Sparse top-level field map sent to the remote store.
pub type FieldMap = serde_json::Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error("unknown field `{0}`")]
    UnknownField(String),
    #[error("patch target is not an object")]
    NotAnObject,
    #[error("patch serialization error: {0}")]
    Serde(String),
}

/// A shallow partial update for payloads of type `T`.
pub trait Patch<T>: Send + Sync {
    /// Merge this patch into `target`.
    fn apply_to(&self, target: &mut T) -> Result<(), PatchError>;

    /// The fields this patch sets, keyed by their serialized names.
    fn fields(&self) -> Result<FieldMap, PatchError>;
}

/// Serialize a patch struct into its field map. Used by `#[derive(Patch)]`.
pub fn patch_fields<P: Serialize + ?Sized>(patch: &P) -> Result<FieldMap, PatchError> {
    match serde_json::to_value(patch).map_err(|e| PatchError::Serde(e.to_string()))? {
        Value::Object(map) => Ok(map),
        _ => Err(PatchError::NotAnObject),
    }
}

/// A patch built from field names and JSON values.
///
/// ```
/// use optimistic_repository::{FieldPatch, Patch};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Todo { title: String, done: bool }
///
/// let mut todo = Todo { title: "Revise".into(), done: false };
/// FieldPatch::new().set("done", true).apply_to(&mut todo).unwrap();
/// assert!(todo.done);
/// assert_eq!(todo.title, "Revise");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldPatch {
    fields: FieldMap,
    /// First value that failed to serialize; the patch is unusable once set.
    error: Option<PatchError>,
}

impl FieldPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `field` to `value`.
    ///
    /// A value that fails to serialize poisons the patch: applying it or
    /// reading its fields returns [`PatchError::Serde`].
    pub fn set(mut self, field: impl Into<String>, value: impl Serialize) -> Self {
        let field = field.into();
        match serde_json::to_value(value) {
            Ok(value) => {
                self.fields.insert(field, value);
            }
            Err(e) => {
                self.error
                    .get_or_insert_with(|| PatchError::Serde(format!("field `{}`: {}", field, e)));
            }
        }
        self
    }

    fn check(&self) -> Result<(), PatchError> {
        match &self.error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<FieldMap> for FieldPatch {
    fn from(fields: FieldMap) -> Self {
        Self {
            fields,
            error: None,
        }
    }
}

impl<T> Patch<T> for FieldPatch
where
    T: Serialize + DeserializeOwned,
{
    fn apply_to(&self, target: &mut T) -> Result<(), PatchError> {
        self.check()?;
        let mut current = match serde_json::to_value(&*target)
            .map_err(|e| PatchError::Serde(e.to_string()))?
        {
            Value::Object(map) => map,
            _ => return Err(PatchError::NotAnObject),
        };

        for (field, value) in &self.fields {
            match current.get_mut(field) {
                Some(slot) => *slot = value.clone(),
                None => return Err(PatchError::UnknownField(field.clone())),
            }
        }

        *target = serde_json::from_value(Value::Object(current))
            .map_err(|e| PatchError::Serde(e.to_string()))?;
        Ok(())
    }

    fn fields(&self) -> Result<FieldMap, PatchError> {
        self.check()?;
        Ok(self.fields.clone())
    }
}

/// The values a patch replaced, kept so a failed remote write can be undone
/// without touching fields the patch never set.
#[derive(Debug, Clone)]
pub(crate) struct FieldRevert {
    previous: FieldMap,
    applied: FieldMap,
}

impl FieldRevert {
    /// Record the patched `keys` as they were in `before` and are in `after`.
    pub(crate) fn capture<T: Serialize>(
        before: &T,
        after: &T,
        keys: &FieldMap,
    ) -> Result<Self, PatchError> {
        let before = patch_fields(before)?;
        let after = patch_fields(after)?;
        let pick = |map: &FieldMap| -> FieldMap {
            keys.keys()
                .filter_map(|key| map.get(key).map(|value| (key.clone(), value.clone())))
                .collect()
        };

        Ok(Self {
            previous: pick(&before),
            applied: pick(&after),
        })
    }

    /// Put back the previous value of every field that still holds the value
    /// the patch set. Returns whether `target` changed.
    pub(crate) fn revert<T>(&self, target: &mut T) -> Result<bool, PatchError>
    where
        T: Serialize + DeserializeOwned,
    {
        let mut current = patch_fields(&*target)?;
        let mut changed = false;

        for (field, applied) in &self.applied {
            let Some(previous) = self.previous.get(field) else {
                continue;
            };
            if let Some(slot) = current.get_mut(field) {
                if slot == applied && slot != previous {
                    *slot = previous.clone();
                    changed = true;
                }
            }
        }

        if changed {
            *target = serde_json::from_value(Value::Object(current))
                .map_err(|e| PatchError::Serde(e.to_string()))?;
        }
        Ok(changed)
    }
}
