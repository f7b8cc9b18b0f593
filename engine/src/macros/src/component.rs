use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{DeriveInput, Token, Type, parse::Parse, parse_macro_input};

pub fn derive_component(input: TokenStream) -> TokenStream {
    // Parse the input tokens into a syntax tree
    let ast = parse_macro_input!(input as DeriveInput);

    // Get the struct name we are annotating
    let struct_name = &ast.ident;
    let name_str = struct_name.to_string();

    // Collect the relation lists from the optional `#[component(...)]` attribute:
    // `#[component(requires(A, B), implies(C), conflicts(D))]`
    let mut requires: Vec<Type> = Vec::new();
    let mut implies: Vec<Type> = Vec::new();
    let mut conflicts: Vec<Type> = Vec::new();

    for attr in &ast.attrs {
        if !attr.path().is_ident("component") {
            continue;
        }
        let result = attr.parse_nested_meta(|meta| {
            let list = if meta.path.is_ident("requires") {
                &mut requires
            } else if meta.path.is_ident("implies") {
                &mut implies
            } else if meta.path.is_ident("conflicts") {
                &mut conflicts
            } else {
                return Err(meta.error("expected `requires`, `implies` or `conflicts`"));
            };

            let content;
            syn::parenthesized!(content in meta.input);
            for ty in content.parse_terminated(Type::parse, Token![,])? {
                list.push(ty);
            }
            Ok(())
        });
        if let Err(err) = result {
            return err.to_compile_error().into();
        }
    }

    let requires_fn = relation_fn("requires", &requires);
    let implies_fn = relation_fn("implies", &implies);
    let conflicts_fn = relation_fn("conflicts", &conflicts);

    // Use ::ember_engine::... paths, which work both inside and outside the crate.
    // Inside the crate this works because of `extern crate self as ember_engine;` in lib.rs.
    TokenStream::from(quote! {
        impl ::ember_engine::ecs::component::Component for #struct_name {
            const NAME: &'static str = #name_str;

            #requires_fn
            #implies_fn
            #conflicts_fn
        }

        const _: () = assert!(
            ::std::mem::align_of::<#struct_name>()
                <= ::ember_engine::ecs::component::MAX_COMPONENT_ALIGN,
            "component alignment exceeds the supported maximum",
        );
    })
}

/// Generate one of the relation hooks of the `Component` trait. Empty relation
/// lists keep the trait's default body.
fn relation_fn(name: &str, types: &[Type]) -> TokenStream2 {
    if types.is_empty() {
        return TokenStream2::new();
    }
    let fn_name = proc_macro2::Ident::new(name, proc_macro2::Span::call_site());
    quote! {
        fn #fn_name(
            registry: &::ember_engine::ecs::component::Registry,
        ) -> ::std::vec::Vec<::ember_engine::ecs::component::Id> {
            ::std::vec![#( registry.register::<#types>() ),*]
        }
    }
}
