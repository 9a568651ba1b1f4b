//! Attribute parsing shared by both macros

use syn::meta::ParseNestedMeta;
use syn::{Attribute, Result, Token};

/// Container level `#[rpc(...)]` flags
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ContainerMeta {
    pub opaque: bool,
    pub no_default: bool,
}

impl ContainerMeta {
    pub fn is_plain(&self) -> bool {
        !self.opaque && !self.no_default
    }
}

pub fn extract_container_meta(attrs: &[Attribute]) -> Result<ContainerMeta> {
    let mut container = ContainerMeta::default();
    for attr in attrs {
        if attr.path().is_ident("rpc") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("opaque") {
                    container.opaque = true;
                } else if meta.path.is_ident("no_default") {
                    container.no_default = true;
                } else {
                    return Err(meta.error("expected `opaque` or `no_default`"));
                }
                Ok(())
            })?;
        }
    }
    Ok(container)
}

/// Field level flags from `#[rpc(...)]` and the `serde` attributes that change the wire shape
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FieldMeta {
    pub skipped: bool,
    pub readonly: bool,
    pub rename: Option<String>,
}

pub fn extract_field_meta(attrs: &[Attribute]) -> Result<FieldMeta> {
    let mut field = FieldMeta::default();
    for attr in attrs {
        if attr.path().is_ident("rpc") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    field.skipped = true;
                } else if meta.path.is_ident("readonly") {
                    field.readonly = true;
                } else {
                    return Err(meta.error("expected `skip` or `readonly`"));
                }
                Ok(())
            })?;
        } else if attr.path().is_ident("serde") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    field.skipped = true;
                } else if meta.path.is_ident("skip_deserializing") {
                    field.readonly = true;
                } else if meta.path.is_ident("rename") && meta.input.peek(Token![=]) {
                    let name: syn::LitStr = meta.value()?.parse()?;
                    field.rename = Some(name.value());
                } else {
                    skip_meta(&meta)?;
                }
                Ok(())
            })?;
        }
    }
    Ok(field)
}

/// `#[rpc(name = "...")]` on an interface method
pub fn extract_method_name(attrs: &[Attribute]) -> Result<Option<syn::LitStr>> {
    let mut name = None;
    for attr in attrs {
        if attr.path().is_ident("rpc") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    name = Some(meta.value()?.parse()?);
                    Ok(())
                } else {
                    Err(meta.error("expected `name = \"...\"`"))
                }
            })?;
        }
    }
    Ok(name)
}

/// Whether `name` can appear on either side of the `.` in a wire method name.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

// Consume an attribute entry this crate does not interpret.
fn skip_meta(meta: &ParseNestedMeta) -> Result<()> {
    if meta.input.peek(Token![=]) {
        let _: syn::Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        let content;
        syn::parenthesized!(content in meta.input);
        let _: proc_macro2::TokenStream = content.parse()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_field_meta_reads_serde_attributes() {
        let field: syn::Field = parse_quote! {
            #[serde(default, rename = "userName", skip_serializing_if = "Option::is_none")]
            #[serde(with = "some::module", skip_deserializing)]
            user_name: Option<String>
        };
        let meta = extract_field_meta(&field.attrs).unwrap();
        assert_eq!(meta.rename.as_deref(), Some("userName"));
        assert!(meta.readonly);
        assert!(!meta.skipped);
    }

    #[test]
    fn test_field_meta_nested_serde_lists() {
        let field: syn::Field = parse_quote! {
            #[serde(rename(serialize = "a", deserialize = "b"), skip)]
            cache: u8
        };
        let meta = extract_field_meta(&field.attrs).unwrap();
        assert!(meta.skipped);
        assert_eq!(meta.rename, None);
    }

    #[test]
    fn test_rpc_field_flags() {
        let field: syn::Field = parse_quote! {
            #[rpc(skip, readonly)]
            id: u64
        };
        let meta = extract_field_meta(&field.attrs).unwrap();
        assert!(meta.skipped && meta.readonly);

        let field: syn::Field = parse_quote! {
            #[rpc(hidden)]
            id: u64
        };
        assert!(extract_field_meta(&field.attrs).is_err());
    }

    #[test]
    fn test_container_meta() {
        let input: syn::DeriveInput = parse_quote! {
            #[derive(Debug)]
            #[rpc(opaque, no_default)]
            struct Handle;
        };
        let meta = extract_container_meta(&input.attrs).unwrap();
        assert!(meta.opaque && meta.no_default);
        assert!(!meta.is_plain());
    }

    #[test]
    fn test_method_name() {
        let method: syn::TraitItemFn = parse_quote! {
            #[rpc(name = "listMethods")]
            fn list_methods(&self) -> RpcResult<Vec<String>>;
        };
        let name = extract_method_name(&method.attrs).unwrap().unwrap();
        assert_eq!(name.value(), "listMethods");
    }

    #[test]
    fn test_identifier() {
        assert!(is_identifier("methodSignature"));
        assert!(is_identifier("_private2"));
        assert!(!is_identifier("2fast"));
        assert!(!is_identifier("with.dot"));
        assert!(!is_identifier(""));
    }
}
