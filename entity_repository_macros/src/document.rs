use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Field, Fields, LitStr};

pub fn derive_document(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Options given on the struct with `#[document(...)]`.
#[derive(Default)]
struct DocumentOptions {
    collection: Option<String>,
    no_id: bool,
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let type_name = name.to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let options = parse_options(input)?;

    let collection = match &options.collection {
        Some(c) => quote! { ::core::option::Option::Some(#c) },
        None => quote! { ::core::option::Option::None },
    };

    let document_impl = quote! {
        impl #impl_generics ::entity_repository::Document for #name #ty_generics #where_clause {
            const TYPE_NAME: &'static str = #type_name;
            const COLLECTION: ::core::option::Option<&'static str> = #collection;
        }
    };

    let id_field = if options.no_id {
        None
    } else {
        extract_id_field(input)?
    };

    let identified_impl = match id_field {
        Some(field) => {
            let ident = field
                .ident
                .clone()
                .ok_or_else(|| syn::Error::new_spanned(field, "id field must be named"))?;
            let ty = &field.ty;
            let stored_name = serde_rename(field)?.unwrap_or_else(|| ident.to_string());

            Some(quote! {
                impl #impl_generics ::entity_repository::Identified for #name #ty_generics #where_clause {
                    type Id = #ty;
                    const ID_FIELD: &'static str = #stored_name;

                    fn id(&self) -> Self::Id {
                        ::core::clone::Clone::clone(&self.#ident)
                    }

                    fn set_id(&mut self, id: Self::Id) {
                        self.#ident = id;
                    }
                }
            })
        }
        None => None,
    };

    Ok(quote! {
        #document_impl
        #identified_impl
    })
}

fn parse_options(input: &DeriveInput) -> syn::Result<DocumentOptions> {
    let mut options = DocumentOptions::default();

    for attr in &input.attrs {
        if !attr.path().is_ident("document") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("collection") {
                let value: LitStr = meta.value()?.parse()?;
                if value.value().is_empty() {
                    return Err(meta.error("collection name must not be empty"));
                }
                options.collection = Some(value.value());
                Ok(())
            } else if meta.path.is_ident("no_id") {
                options.no_id = true;
                Ok(())
            } else {
                Err(meta.error("expected `collection = \"...\"` or `no_id`"))
            }
        })?;
    }

    Ok(options)
}

fn extract_id_field(input: &DeriveInput) -> syn::Result<Option<&Field>> {
    let Data::Struct(data_struct) = &input.data else {
        return Ok(None);
    };
    let Fields::Named(fields) = &data_struct.fields else {
        return Ok(None);
    };

    for field in &fields.named {
        for attr in &field.attrs {
            if !attr.path().is_ident("document") {
                continue;
            }

            let mut is_id = false;
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("id") {
                    is_id = true;
                    Ok(())
                } else {
                    Err(meta.error("expected `id`"))
                }
            })?;
            if is_id {
                return Ok(Some(field));
            }
        }
    }

    // Default: look for a field named "id"
    Ok(fields
        .named
        .iter()
        .find(|field| field.ident.as_ref().is_some_and(|ident| ident == "id")))
}

fn serde_rename(field: &Field) -> syn::Result<Option<String>> {
    let mut rename = None;
    for attr in &field.attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") && meta.input.peek(syn::Token![=]) {
                let value: LitStr = meta.value()?.parse()?;
                rename = Some(value.value());
            } else if meta.input.peek(syn::Token![=]) {
                // values of unrelated keys such as `default = "..."`
                let _: syn::Expr = meta.value()?.parse()?;
            } else if meta.input.peek(syn::token::Paren) {
                // `rename(serialize = "..")`, `bound(..)`: serde checks these itself
                let _content;
                syn::parenthesized!(_content in meta.input);
            }
            Ok(())
        })?;
    }
    Ok(rename)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand_to_string(input: DeriveInput) -> String {
        expand(&input).unwrap().to_string()
    }

    fn expand_error(input: DeriveInput) -> String {
        match expand(&input) {
            Ok(tokens) => panic!("expected an error, got {tokens}"),
            Err(err) => err.to_string(),
        }
    }

    #[test]
    fn field_named_id_is_identified() {
        let tokens = expand_to_string(syn::parse_quote! {
            struct Category { id: i64, name: String }
        });
        assert!(tokens.contains("Identified for Category"));
        assert!(tokens.contains("type Id = i64"));
    }

    #[test]
    fn no_id_skips_identified() {
        let tokens = expand_to_string(syn::parse_quote! {
            #[document(collection = "tags", no_id)]
            struct Tag { id: String, label: String }
        });
        assert!(tokens.contains("Document for Tag"));
        assert!(tokens.contains("\"tags\""));
        assert!(!tokens.contains("Identified"));
    }

    #[test]
    fn serde_rename_with_nested_options_is_read() {
        let tokens = expand_to_string(syn::parse_quote! {
            struct Person {
                #[serde(rename = "_id", default)]
                #[serde(bound(deserialize = "T: Default"))]
                id: i32,
            }
        });
        assert!(tokens.contains("\"_id\""));
    }

    #[test]
    fn non_string_collection_is_an_error() {
        let message = expand_error(syn::parse_quote! {
            #[document(collection = 5)]
            struct Category { id: i64 }
        });
        assert!(message.contains("expected string literal"), "{message}");
    }

    #[test]
    fn unknown_struct_option_is_an_error() {
        let message = expand_error(syn::parse_quote! {
            #[document(colection = "typo")]
            struct Category { id: i64 }
        });
        assert!(message.contains("expected `collection"), "{message}");
    }

    #[test]
    fn unknown_field_option_is_an_error() {
        let message = expand_error(syn::parse_quote! {
            struct Category {
                #[document(key)]
                code: i64,
            }
        });
        assert!(message.contains("expected `id`"), "{message}");
    }

    #[test]
    fn empty_collection_is_an_error() {
        let message = expand_error(syn::parse_quote! {
            #[document(collection = "")]
            struct Category { id: i64 }
        });
        assert!(message.contains("must not be empty"), "{message}");
    }
}
