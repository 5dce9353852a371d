//! Derive macros for Substore action types.
//!
//! This crate provides `#[derive(Action)]`, which generates the
//! `substore_core::action::Action` implementation for a struct or enum:
//! the `as_any` accessor used for dispatch-table downcasting and a `name`
//! tag for tracing and error messages.
//!
//! # Example
//!
//! ```ignore
//! use substore_macros::Action;
//!
//! #[derive(Action, Debug)]
//! struct Rename(String);
//!
//! #[derive(Action, Debug)]
//! enum PanelAction {
//!     SetMessage(String),
//!     Clear,
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, parse_macro_input};

/// Derive macro for action types.
///
/// Generates the `Action` impl with:
/// - `as_any()` — the value as `&dyn Any`, for downcasting at the
///   dispatch-table boundary
/// - `name()` — the type path, used as the action's tag in tracing and
///   error messages
///
/// The deriving type must be `'static` and satisfy the trait's
/// `Send + Sync + Debug` supertraits; violations surface as ordinary
/// compile errors on the generated impl.
#[proc_macro_derive(Action)]
pub fn derive_action(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics ::substore_core::action::Action for #name #ty_generics #where_clause {
            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn name(&self) -> &'static str {
                ::std::any::type_name::<Self>()
            }
        }
    };

    TokenStream::from(expanded)
}
