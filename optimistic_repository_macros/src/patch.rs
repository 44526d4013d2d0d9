use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::meta::ParseNestedMeta;
use syn::{Attribute, Data, DeriveInput, Fields, Ident, LitStr, Type};

/// A payload field the generated patch can set.
struct PatchField {
    ident: Ident,
    ty: Type,
    /// Serialized key when it differs from the field name.
    rename: Option<String>,
}

/// What `#[serde(...)]` on a field means for the patch.
#[derive(Default)]
struct SerdeField {
    skip: bool,
    rename: Option<String>,
}

pub fn derive_patch(input: DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;
    let vis = &input.vis;
    let patch_name = format_ident!("{}Patch", name);

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Patch derive does not support generic types",
        ));
    }

    let named = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Patch derive only supports structs with named fields",
                ))
            }
        },
        _ => return Err(syn::Error::new_spanned(name, "Patch derive only supports structs")),
    };

    let mut fields = Vec::new();
    for field in named {
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        if patch_skip(&field.attrs)? {
            continue;
        }
        let serde = serde_field(&field.attrs)?;
        if serde.skip {
            continue;
        }
        fields.push(PatchField {
            ident,
            ty: field.ty.clone(),
            rename: serde.rename,
        });
    }

    let rename_all = serde_rename_all(&input.attrs)?
        .map(|rule| quote! { #[serde(rename_all = #rule)] });

    let field_defs = fields.iter().map(|PatchField { ident, ty, rename }| {
        let rename = rename.as_ref().map(|r| quote! { #[serde(rename = #r)] });
        quote! {
            #[serde(skip_serializing_if = "Option::is_none")]
            #rename
            pub #ident: Option<#ty>
        }
    });

    let setters = fields.iter().map(|PatchField { ident, ty, .. }| {
        let doc = format!("Set `{}` in this patch.", ident);
        quote! {
            #[doc = #doc]
            pub fn #ident(mut self, value: impl Into<#ty>) -> Self {
                self.#ident = Some(value.into());
                self
            }
        }
    });

    let applies = fields.iter().map(|PatchField { ident, .. }| {
        quote! {
            if let Some(value) = &self.#ident {
                target.#ident = value.clone();
            }
        }
    });

    let unset = fields.iter().map(|PatchField { ident, .. }| quote! { && self.#ident.is_none() });

    let doc = format!("Partial update for [`{}`]; `None` fields are left untouched.", name);

    Ok(quote! {
        #[doc = #doc]
        #[derive(Clone, Default, serde::Serialize)]
        #rename_all
        #vis struct #patch_name {
            #(#field_defs),*
        }

        impl #patch_name {
            /// Create an empty patch.
            pub fn new() -> Self {
                Self::default()
            }

            /// Whether no field is set.
            pub fn is_empty(&self) -> bool {
                true #(#unset)*
            }

            #(#setters)*
        }

        impl optimistic_repository::Patch<#name> for #patch_name {
            fn apply_to(
                &self,
                target: &mut #name,
            ) -> Result<(), optimistic_repository::PatchError> {
                #(#applies)*
                Ok(())
            }

            fn fields(
                &self,
            ) -> Result<optimistic_repository::FieldMap, optimistic_repository::PatchError> {
                optimistic_repository::patch_fields(self)
            }
        }
    })
}

/// Read the serde field attributes that change the serialized key or drop
/// the field. Attributes that change the encoding of the value are rejected,
/// since the patch would serialize the value differently from the document.
fn serde_field(attrs: &[Attribute]) -> syn::Result<SerdeField> {
    let mut out = SerdeField::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") || meta.path.is_ident("skip_serializing") {
                out.skip = true;
                Ok(())
            } else if meta.path.is_ident("rename") {
                if let Some(name) = serialize_name(&meta)? {
                    out.rename = Some(name);
                }
                Ok(())
            } else if ["with", "serialize_with", "flatten"]
                .iter()
                .any(|key| meta.path.is_ident(key))
            {
                let message = "Patch derive cannot mirror this serde attribute; \
                               mark the field #[patch(skip)]";
                Err(meta.error(message))
            } else {
                ignore_meta(&meta)
            }
        })?;
    }
    Ok(out)
}

fn serde_rename_all(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut rule = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                if let Some(value) = serialize_name(&meta)? {
                    rule = Some(value);
                }
                Ok(())
            } else {
                ignore_meta(&meta)
            }
        })?;
    }
    Ok(rule)
}

/// The serialize-side value of `key = "..."` or `key(serialize = "...", deserialize = "...")`.
fn serialize_name(meta: &ParseNestedMeta) -> syn::Result<Option<String>> {
    if meta.input.peek(syn::Token![=]) {
        let value: LitStr = meta.value()?.parse()?;
        return Ok(Some(value.value()));
    }

    let mut name = None;
    meta.parse_nested_meta(|inner| {
        let value: LitStr = inner.value()?.parse()?;
        if inner.path.is_ident("serialize") {
            name = Some(value.value());
        }
        Ok(())
    })?;
    Ok(name)
}

/// Consume a serde attribute that has no bearing on the patch.
fn ignore_meta(meta: &ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(syn::Token![=]) {
        let _: syn::Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|inner| ignore_meta(&inner))?;
    }
    Ok(())
}

fn patch_skip(attrs: &[Attribute]) -> syn::Result<bool> {
    let mut skip = false;
    for attr in attrs.iter().filter(|a| a.path().is_ident("patch")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                skip = true;
                Ok(())
            } else {
                Err(meta.error("expected `skip`"))
            }
        })?;
    }
    Ok(skip)
}
