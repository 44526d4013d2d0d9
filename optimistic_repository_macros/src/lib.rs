mod collection;
mod patch;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Derive macro that binds a payload type to a remote collection.
///
/// # Usage
///
/// ```ignore
/// #[derive(Clone, Serialize, Deserialize, Collection)]
/// #[collection(name = "decks")]
/// pub struct Deck {
///     pub name: String,
///     pub cards: Vec<Card>,
/// }
/// ```
///
/// Without `#[collection(name = "...")]` the collection name defaults to the
/// snake_case type name with an `s` suffix (`MementoDeck` -> `memento_decks`,
/// `HTTPDeck` -> `http_decks`).
#[proc_macro_derive(Collection, attributes(collection))]
pub fn derive_collection(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    collection::derive_collection(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Derive macro that generates a typed partial-update struct.
///
/// For `struct Deck { name: String, cards: Vec<Card> }` this generates
/// `DeckPatch` with one `Option` per field, a chainable setter per field and
/// an `optimistic_repository::Patch<Deck>` implementation:
///
/// ```ignore
/// let patch = DeckPatch::new().name("Renamed");
/// handler.modify_document("deck-1", &patch)?;
/// ```
///
/// Field `#[serde(rename = "...")]` (including the `rename(serialize = "...")`
/// form) and struct-level `#[serde(rename_all = "...")]` are carried over so
/// the remote field map uses the same keys as the stored document. Fields
/// marked `#[serde(skip)]`, `#[serde(skip_serializing)]` or `#[patch(skip)]`
/// are left out. Fields using `with`, `serialize_with` or `flatten` are a
/// compile error unless marked `#[patch(skip)]`.
#[proc_macro_derive(Patch, attributes(patch))]
pub fn derive_patch(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    patch::derive_patch(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
