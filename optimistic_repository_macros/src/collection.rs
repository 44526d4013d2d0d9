use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, LitStr};

pub fn derive_collection(input: DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let path = collection_path(&input)?;

    Ok(quote! {
        impl #impl_generics optimistic_repository::Collection for #name #ty_generics #where_clause {
            const COLLECTION: &'static str = #path;
        }
    })
}

/// `#[collection(name = "...")]`, or the pluralized snake_case type name.
fn collection_path(input: &DeriveInput) -> syn::Result<String> {
    let mut path = None;
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("collection")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                path = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("expected `name = \"...\"`"))
            }
        })?;
    }

    Ok(path.unwrap_or_else(|| format!("{}s", snake_case(&input.ident.to_string()))))
}

/// `MementoDeck` -> `memento_deck`, `HTTPDeck` -> `http_deck`.
fn snake_case(ident: &str) -> String {
    let chars: Vec<char> = ident.chars().collect();
    let mut out = String::with_capacity(ident.len() + 4);

    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|c| c.is_lowercase());
            let word_start = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if word_start && prev != '_' {
                out.push('_');
            }
        }
        out.extend(ch.to_lowercase());
    }
    out
}
