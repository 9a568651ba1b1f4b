//! Implementation of `#[derive(RpcType)]`

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Result, parse_quote};

use crate::utils::{ContainerMeta, extract_container_meta, extract_field_meta};

pub fn derive_rpc_type_impl(input: DeriveInput) -> Result<TokenStream> {
    if let Some(lifetime) = input.generics.lifetimes().next() {
        return Err(syn::Error::new_spanned(
            lifetime,
            "RpcType can only be derived for types without lifetime parameters",
        ));
    }

    let container = extract_container_meta(&input.attrs)?;
    let name = &input.ident;

    let mut generics = input.generics.clone();
    for param in generics.type_params_mut() {
        param.bounds.push(parse_quote!(::tether_rpc::RpcType));
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let kind = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Unnamed(fields) if fields.unnamed.len() == 1 && container.is_plain() => {
                let ty = &fields.unnamed[0].ty;
                quote! {
                    ::tether_rpc::TypeKind::Wrapper(<#ty as ::tether_rpc::RpcType>::type_info)
                }
            }
            fields => record_kind(field_infos(fields, None)?, &container),
        },
        Data::Enum(data) => {
            let unit_only = data
                .variants
                .iter()
                .all(|variant| matches!(variant.fields, Fields::Unit));
            if unit_only && container.is_plain() {
                quote! { ::tether_rpc::TypeKind::String }
            } else {
                let mut fields = Vec::new();
                for variant in &data.variants {
                    let prefix = variant.ident.to_string();
                    fields.extend(field_infos(&variant.fields, Some(&prefix))?);
                }
                record_kind(fields, &container)
            }
        }
        Data::Union(data) => {
            return Err(syn::Error::new_spanned(
                data.union_token,
                "RpcType cannot be derived for unions",
            ));
        }
    };

    Ok(quote! {
        impl #impl_generics ::tether_rpc::RpcType for #name #ty_generics #where_clause {
            fn type_info() -> ::tether_rpc::TypeInfo {
                ::tether_rpc::TypeInfo::new::<Self>(#kind)
            }
        }
    })
}

fn record_kind(fields: Vec<TokenStream>, container: &ContainerMeta) -> TokenStream {
    let constructible = !container.no_default;
    let is_abstract = container.opaque;
    quote! {
        ::tether_rpc::TypeKind::Struct(
            ::tether_rpc::StructInfo::new(::std::vec![#(#fields),*])
                .constructible(#constructible)
                .is_abstract(#is_abstract)
        )
    }
}

// One `FieldInfo` expression per field. Enum variant fields are named `Variant.field`.
fn field_infos(fields: &Fields, prefix: Option<&str>) -> Result<Vec<TokenStream>> {
    let mut infos = Vec::new();
    for (index, field) in fields.iter().enumerate() {
        let meta = extract_field_meta(&field.attrs)?;
        let base = match (&meta.rename, &field.ident) {
            (Some(rename), _) => rename.clone(),
            (None, Some(ident)) => syn::ext::IdentExt::unraw(ident).to_string(),
            (None, None) => index.to_string(),
        };
        let field_name = match prefix {
            Some(prefix) => format!("{prefix}.{base}"),
            None => base,
        };

        let ty = &field.ty;
        // Skipped fields never need a descriptor of their own.
        let type_ref = if meta.skipped {
            quote! { <() as ::tether_rpc::RpcType>::type_info }
        } else {
            quote! { <#ty as ::tether_rpc::RpcType>::type_info }
        };
        let readonly = meta.readonly;
        let skipped = meta.skipped;
        infos.push(quote! {
            ::tether_rpc::FieldInfo::new(#field_name, #type_ref)
                .readonly(#readonly)
                .skipped(#skipped)
        });
    }
    Ok(infos)
}
