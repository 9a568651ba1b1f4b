//! # tether-rpc derive macros
//!
//! - `#[derive(RpcType)]` - describe a data type ahead of time for validation and signatures
//! - `#[rpc_interface]` - turn a trait into a capability interface: descriptor, server side
//!   dispatch adapter and client stub
//!
//! Generated code refers to the runtime crate as `::tether_rpc`.

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemTrait, Meta, Token, parse_macro_input, punctuated::Punctuated};

mod interface_attr;
mod type_derive;
mod utils;

/// Derive `RpcType` for a struct or enum.
///
/// # Attributes
///
/// - `#[rpc(skip)]` or `#[serde(skip)]` on a field - never serialized, ignored by validation
/// - `#[rpc(readonly)]` or `#[serde(skip_deserializing)]` on a field - cannot be decoded
/// - `#[serde(rename = "...")]` on a field - wire name of the field
/// - `#[rpc(opaque)]` on the type - treated as abstract
/// - `#[rpc(no_default)]` on the type - no construction path for the decoder
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Serialize, Deserialize, RpcType)]
/// struct Point {
///     x: i32,
///     y: i32,
///     #[serde(skip)]
///     cache: Option<String>,
/// }
/// ```
#[proc_macro_derive(RpcType, attributes(rpc))]
pub fn derive_rpc_type(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    type_derive::derive_rpc_type_impl(input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

/// Attribute macro for capability interfaces
///
/// Every method takes `&self`, owned parameters and returns `RpcResult<T>`. The macro implements
/// `RpcInterface` and `Serve<H>` for `dyn Trait` and implements the trait for `RemoteStub`.
///
/// # Attributes
///
/// - `#[rpc_interface(name = "...")]` - interface name (defaults to the trait name)
/// - `#[rpc(name = "...")]` on a method - wire name, may be shared by overloads of
///   different arity
///
/// # Example
///
/// ```rust,ignore
/// #[rpc_interface]
/// pub trait Calculator {
///     fn add(&self, a: i32, b: i32) -> RpcResult<i32>;
///     #[rpc(name = "add")]
///     fn add_three(&self, a: i32, b: i32, c: i32) -> RpcResult<i32>;
/// }
/// ```
#[proc_macro_attribute]
pub fn rpc_interface(args: TokenStream, input: TokenStream) -> TokenStream {
    let args = parse_macro_input!(args with Punctuated::<Meta, Token![,]>::parse_terminated);
    let input = parse_macro_input!(input as ItemTrait);
    interface_attr::rpc_interface_impl(args, input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}
