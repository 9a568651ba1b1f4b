//! Implementation of the `#[rpc_interface]` attribute macro

use proc_macro2::{Span, TokenStream};
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::{
    FnArg, GenericArgument, ItemTrait, Lit, Meta, PathArguments, Result, ReturnType, Token,
    TraitItem, TraitItemFn, Type, punctuated::Punctuated,
};

use crate::utils::{extract_method_name, is_identifier};

struct RemoteMethod {
    ident: syn::Ident,
    wire_name: String,
    params: Vec<Type>,
    output: ReturnType,
    returns: Type,
}

pub fn rpc_interface_impl(
    args: Punctuated<Meta, Token![,]>,
    mut input: ItemTrait,
) -> Result<TokenStream> {
    let mut interface_name = None;
    for arg in args {
        match arg {
            Meta::NameValue(nv) if nv.path.is_ident("name") => {
                if let syn::Expr::Lit(expr_lit) = &nv.value
                    && let Lit::Str(s) = &expr_lit.lit
                {
                    interface_name = Some(s.value());
                } else {
                    return Err(syn::Error::new_spanned(&nv.value, "expected a string literal"));
                }
            }
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "expected `name = \"...\"`",
                ));
            }
        }
    }

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "capability interfaces cannot be generic",
        ));
    }

    let trait_ident = input.ident.clone();
    let interface_name = interface_name.unwrap_or_else(|| trait_ident.unraw().to_string());

    let mut methods = Vec::new();
    for item in &mut input.items {
        match item {
            TraitItem::Fn(method) => {
                methods.push(remote_method(method)?);
                method.attrs.retain(|attr| !attr.path().is_ident("rpc"));
            }
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "capability interfaces may only declare methods",
                ));
            }
        }
    }

    let descriptor = descriptor_impl(&trait_ident, &interface_name, &methods);
    let serve = serve_impl(&trait_ident, &methods);
    let stub = stub_impl(&trait_ident, &interface_name, &methods);

    Ok(quote! {
        #input
        #descriptor
        #serve
        #stub
    })
}

fn remote_method(method: &TraitItemFn) -> Result<RemoteMethod> {
    let sig = &method.sig;
    if sig.asyncness.is_some() {
        return Err(syn::Error::new_spanned(
            sig.asyncness,
            "remote methods are synchronous",
        ));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            "remote methods cannot be generic",
        ));
    }

    let mut inputs = sig.inputs.iter();
    match inputs.next() {
        Some(FnArg::Receiver(receiver))
            if receiver.reference.is_some() && receiver.mutability.is_none() => {}
        _ => {
            return Err(syn::Error::new_spanned(
                &sig.ident,
                "remote methods must take `&self`",
            ));
        }
    }
    let params = inputs
        .map(|arg| match arg {
            FnArg::Typed(pat_type) => Ok((*pat_type.ty).clone()),
            FnArg::Receiver(receiver) => Err(syn::Error::new_spanned(
                receiver,
                "unexpected receiver",
            )),
        })
        .collect::<Result<Vec<_>>>()?;

    let returns = result_type(&sig.output).ok_or_else(|| {
        syn::Error::new_spanned(
            &sig.output,
            "remote methods must return `RpcResult<T>` or `Result<T, RpcError>`",
        )
    })?;

    let wire_name = match extract_method_name(&method.attrs)? {
        Some(name) if is_identifier(&name.value()) => name.value(),
        Some(name) => {
            return Err(syn::Error::new_spanned(
                name,
                "method names must be identifiers",
            ));
        }
        None => sig.ident.unraw().to_string(),
    };

    Ok(RemoteMethod {
        ident: sig.ident.clone(),
        wire_name,
        params,
        output: sig.output.clone(),
        returns,
    })
}

// `T` out of `RpcResult<T>` or `Result<T, E>`, matched by the last path segment.
fn result_type(output: &ReturnType) -> Option<Type> {
    let ReturnType::Type(_, ty) = output else {
        return None;
    };
    let Type::Path(path) = ty.as_ref() else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != "RpcResult" && segment.ident != "Result" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(ty) => Some(ty.clone()),
        _ => None,
    }
}

fn descriptor_impl(trait_ident: &syn::Ident, name: &str, methods: &[RemoteMethod]) -> TokenStream {
    let descriptors = methods.iter().map(|method| {
        let wire_name = &method.wire_name;
        let params = &method.params;
        let returns = &method.returns;
        quote! {
            ::tether_rpc::MethodDescriptor::new(
                #wire_name,
                ::std::vec![#(<#params as ::tether_rpc::RpcType>::type_info),*],
                <#returns as ::tether_rpc::RpcType>::type_info,
            )
        }
    });

    quote! {
        impl ::tether_rpc::RpcInterface for dyn #trait_ident {
            fn descriptor() -> ::tether_rpc::InterfaceDescriptor {
                ::tether_rpc::InterfaceDescriptor::new(
                    #name,
                    ::std::vec![#(#descriptors),*],
                )
            }
        }
    }
}

fn serve_impl(trait_ident: &syn::Ident, methods: &[RemoteMethod]) -> TokenStream {
    let arms = methods.iter().enumerate().map(|(index, method)| {
        let ident = &method.ident;
        let args: Vec<_> = (0..method.params.len())
            .map(|i| format_ident!("__arg{}", i))
            .collect();
        let params = &method.params;
        let positions = 0..method.params.len();
        quote! {
            #index => {
                #(
                    let #args: #params = __codec.decode_param(__params.next(), #positions)?;
                )*
                let __result = <__H as #trait_ident>::#ident(__handler, #(#args),*)?;
                __codec.encode_result(&__result)
            }
        }
    });

    quote! {
        impl<__H: #trait_ident + ?Sized> ::tether_rpc::Serve<__H> for dyn #trait_ident {
            #[allow(unused_mut, unused_variables)]
            fn invoke(
                __handler: &__H,
                __method: usize,
                __params: ::std::vec::Vec<::tether_rpc::__private::Value>,
                __codec: &::tether_rpc::Codec,
            ) -> ::tether_rpc::RpcResult<::tether_rpc::__private::Value> {
                let mut __params = __params.into_iter();
                match __method {
                    #(#arms)*
                    _ => ::std::result::Result::Err(
                        ::tether_rpc::RemoteError::method_not_found().into(),
                    ),
                }
            }
        }
    }
}

fn stub_impl(trait_ident: &syn::Ident, name: &str, methods: &[RemoteMethod]) -> TokenStream {
    let methods = methods.iter().map(|method| {
        let ident = &method.ident;
        let wire_name = &method.wire_name;
        let output = &method.output;
        let returns = &method.returns;
        let args: Vec<_> = (0..method.params.len())
            .map(|i| format_ident!("__arg{}", i, span = Span::call_site()))
            .collect();
        let params = &method.params;
        let positions = 0..method.params.len();
        quote! {
            fn #ident(&self, #(#args: #params),*) #output {
                let __params = ::std::vec![
                    #(::tether_rpc::RemoteStub::encode_param(self, &#args, #positions)?),*
                ];
                ::tether_rpc::RemoteStub::call::<#returns>(self, #name, #wire_name, __params)
            }
        }
    });

    quote! {
        impl #trait_ident for ::tether_rpc::RemoteStub {
            #(#methods)*
        }
    }
}
