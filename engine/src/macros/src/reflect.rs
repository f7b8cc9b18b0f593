use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{Data, DataEnum, DataStruct, DeriveInput, Fields, parse_macro_input};

pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);

    let result = match &ast.data {
        Data::Struct(data) => derive_struct(&ast, data),
        Data::Enum(data) => {
            // A fieldless enum gets the name <-> value tables; an enum with
            // payloads is serialized as a tagged union.
            if data.variants.is_empty() {
                Err(syn::Error::new_spanned(
                    &ast.ident,
                    "cannot derive Reflect for an empty enum",
                ))
            } else if data.variants.iter().all(|v| matches!(v.fields, Fields::Unit)) {
                derive_plain_enum(&ast, data)
            } else {
                derive_variant_enum(&ast, data)
            }
        }
        Data::Union(_) => Err(syn::Error::new_spanned(
            &ast.ident,
            "cannot derive Reflect for a union",
        )),
    };

    match result {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn derive_struct(ast: &DeriveInput, data: &DataStruct) -> syn::Result<TokenStream2> {
    let name = &ast.ident;
    let name_str = name.to_string();

    let fields = match &data.fields {
        Fields::Named(fields) => &fields.named,
        _ => {
            return Err(syn::Error::new_spanned(
                &ast.ident,
                "Reflect can only be derived for structs with named fields",
            ));
        }
    };

    let mut idents = Vec::new();
    let mut names = Vec::new();
    let mut types = Vec::new();
    let mut optionals = Vec::new();
    for field in fields {
        let ident = field.ident.clone().expect("named field");
        names.push(ident.to_string());
        idents.push(ident);
        types.push(field.ty.clone());
        optionals.push(field_is_optional(&field.attrs)?);
    }

    Ok(quote! {
        impl ::ember_engine::reflect::Reflect for #name {
            fn write_text(
                &self,
                out: &mut ::ember_engine::reflect::Output,
                options: &::ember_engine::reflect::ToStringOptions,
            ) -> ::ember_engine::reflect::Result<()> {
                let all_short = true
                    #( && <#types as ::ember_engine::reflect::Reflect>::SHORT_REPR )*;
                ::ember_engine::reflect::structs::write_text_fields(out, options, all_short, &mut [
                    #( (#names, &mut |out: &mut ::ember_engine::reflect::Output,
                                      options: &::ember_engine::reflect::ToStringOptions|
                        ::ember_engine::reflect::Reflect::write_text(&self.#idents, out, options)) ),*
                ])
            }

            fn read_text(
                &mut self,
                input: &mut ::ember_engine::reflect::Input<'_>,
                options: &::ember_engine::reflect::FromStringOptions,
            ) -> ::ember_engine::reflect::Result<()> {
                ::ember_engine::reflect::structs::read_text_fields(
                    input,
                    options,
                    &<Self as ::ember_engine::reflect::structs::ReflectStruct>::DESCRIPTOR,
                    &mut [
                        #( &mut |input: &mut ::ember_engine::reflect::Input<'_>,
                                 options: &::ember_engine::reflect::FromStringOptions|
                            ::ember_engine::reflect::Reflect::read_text(&mut self.#idents, input, options) ),*
                    ],
                )
            }

            fn write_binary(
                &self,
                out: &mut ::ember_engine::reflect::Output,
            ) -> ::ember_engine::reflect::Result<()> {
                #( ::ember_engine::reflect::Reflect::write_binary(&self.#idents, out)?; )*
                Ok(())
            }

            fn read_binary(
                &mut self,
                input: &mut ::ember_engine::reflect::Input<'_>,
                options: &::ember_engine::reflect::FromBinaryOptions,
            ) -> ::ember_engine::reflect::Result<()> {
                #( ::ember_engine::reflect::Reflect::read_binary(&mut self.#idents, input, options)?; )*
                Ok(())
            }
        }

        impl ::ember_engine::reflect::structs::ReflectStruct for #name {
            const DESCRIPTOR: ::ember_engine::reflect::structs::StructDescriptor =
                ::ember_engine::reflect::structs::StructDescriptor {
                    name: #name_str,
                    fields: &[
                        #( ::ember_engine::reflect::structs::FieldInfo {
                            name: #names,
                            optional: #optionals,
                        } ),*
                    ],
                };
        }
    })
}

fn field_is_optional(attrs: &[syn::Attribute]) -> syn::Result<bool> {
    let mut optional = false;
    for attr in attrs {
        if !attr.path().is_ident("reflect") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("optional") {
                optional = true;
                Ok(())
            } else {
                Err(meta.error("expected `optional`"))
            }
        })?;
    }
    Ok(optional)
}

fn enum_is_relaxed(attrs: &[syn::Attribute]) -> syn::Result<bool> {
    let mut relaxed = false;
    for attr in attrs {
        if !attr.path().is_ident("reflect") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("relaxed") {
                relaxed = true;
                Ok(())
            } else {
                Err(meta.error("expected `relaxed`"))
            }
        })?;
    }
    Ok(relaxed)
}

/// Find the integer type named in `#[repr(...)]`, defaulting to `i32`.
fn enum_repr(attrs: &[syn::Attribute]) -> syn::Result<proc_macro2::Ident> {
    const INT_REPRS: &[&str] = &[
        "i8", "i16", "i32", "i64", "u8", "u16", "u32", "u64",
    ];
    let mut repr = None;
    for attr in attrs {
        if !attr.path().is_ident("repr") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if let Some(ident) = meta.path.get_ident()
                && INT_REPRS.contains(&ident.to_string().as_str())
            {
                repr = Some(ident.clone());
            }
            Ok(())
        })?;
    }
    Ok(repr.unwrap_or_else(|| format_ident!("i32")))
}

fn derive_plain_enum(ast: &DeriveInput, data: &DataEnum) -> syn::Result<TokenStream2> {
    let name = &ast.ident;
    let repr = enum_repr(&ast.attrs)?;
    let relaxed = enum_is_relaxed(&ast.attrs)?;

    let variants: Vec<_> = data.variants.iter().map(|v| v.ident.clone()).collect();
    let variant_strs: Vec<_> = variants.iter().map(|v| v.to_string()).collect();

    Ok(quote! {
        impl ::ember_engine::reflect::Reflect for #name {
            const SHORT_REPR: bool = true;

            fn write_text(
                &self,
                out: &mut ::ember_engine::reflect::Output,
                options: &::ember_engine::reflect::ToStringOptions,
            ) -> ::ember_engine::reflect::Result<()> {
                ::ember_engine::reflect::enums::write_text(self, out, options)
            }

            fn read_text(
                &mut self,
                input: &mut ::ember_engine::reflect::Input<'_>,
                options: &::ember_engine::reflect::FromStringOptions,
            ) -> ::ember_engine::reflect::Result<()> {
                ::ember_engine::reflect::enums::read_text(self, input, options)
            }

            fn write_binary(
                &self,
                out: &mut ::ember_engine::reflect::Output,
            ) -> ::ember_engine::reflect::Result<()> {
                ::ember_engine::reflect::enums::write_binary(self, out)
            }

            fn read_binary(
                &mut self,
                input: &mut ::ember_engine::reflect::Input<'_>,
                options: &::ember_engine::reflect::FromBinaryOptions,
            ) -> ::ember_engine::reflect::Result<()> {
                ::ember_engine::reflect::enums::read_binary(self, input, options)
            }
        }

        impl ::ember_engine::reflect::enums::ReflectEnum for #name {
            type Repr = #repr;

            fn helper() -> &'static ::ember_engine::reflect::enums::EnumHelper<#repr> {
                static HELPER: ::std::sync::LazyLock<
                    ::ember_engine::reflect::enums::EnumHelper<#repr>,
                > = ::std::sync::LazyLock::new(|| {
                    ::ember_engine::reflect::enums::EnumHelper::new(
                        ::std::vec![#( (#name::#variants as #repr, #variant_strs) ),*],
                        #relaxed,
                    )
                });
                &HELPER
            }

            fn to_repr(&self) -> #repr {
                match self {
                    #( #name::#variants => #name::#variants as #repr ),*
                }
            }

            fn from_repr(value: #repr) -> ::std::option::Option<Self> {
                #( if value == #name::#variants as #repr {
                    return ::std::option::Option::Some(#name::#variants);
                } )*
                ::std::option::Option::None
            }
        }
    })
}

fn derive_variant_enum(ast: &DeriveInput, data: &DataEnum) -> syn::Result<TokenStream2> {
    let name = &ast.ident;

    // The binary tag is a single byte; refuse enums it cannot index.
    if data.variants.len() > 255 {
        return Err(syn::Error::new_spanned(
            &ast.ident,
            "enums with more than 255 variants cannot be serialized",
        ));
    }

    let mut short_terms = Vec::new();
    let mut write_text_arms = Vec::new();
    let mut read_text_arms = Vec::new();
    let mut write_binary_arms = Vec::new();
    let mut read_binary_arms = Vec::new();

    for (index, variant) in data.variants.iter().enumerate() {
        let v_ident = &variant.ident;
        let v_str = v_ident.to_string();
        let tag = index as u8;

        match &variant.fields {
            Fields::Unit => {
                write_text_arms.push(quote! {
                    #name::#v_ident => {
                        ::ember_engine::reflect::variant::write_name(out, options, #v_str);
                        ::ember_engine::reflect::structs::write_text_fields(
                            out, options, true, &mut [])
                    }
                });
                read_text_arms.push(quote! {
                    #v_str => {
                        const DESC: ::ember_engine::reflect::structs::StructDescriptor =
                            ::ember_engine::reflect::structs::StructDescriptor {
                                name: #v_str,
                                fields: &[],
                            };
                        ::ember_engine::reflect::structs::read_text_fields(
                            input, options, &DESC, &mut [])?;
                        *self = #name::#v_ident;
                    }
                });
                write_binary_arms.push(quote! {
                    #name::#v_ident => {
                        out.write_u8(#tag);
                    }
                });
                read_binary_arms.push(quote! {
                    #tag => {
                        *self = #name::#v_ident;
                    }
                });
            }
            Fields::Unnamed(fields) => {
                if fields.unnamed.len() != 1 {
                    return Err(syn::Error::new_spanned(
                        variant,
                        "tuple variants must have exactly one field; use named fields",
                    ));
                }
                let ty = &fields.unnamed.first().expect("one field").ty;
                short_terms.push(quote! { <#ty as ::ember_engine::reflect::Reflect>::SHORT_REPR });
                write_text_arms.push(quote! {
                    #name::#v_ident(inner) => {
                        ::ember_engine::reflect::variant::write_name(out, options, #v_str);
                        ::ember_engine::reflect::Reflect::write_text(inner, out, options)
                    }
                });
                read_text_arms.push(quote! {
                    #v_str => {
                        let mut inner: #ty = ::std::default::Default::default();
                        ::ember_engine::reflect::Reflect::read_text(&mut inner, input, options)?;
                        *self = #name::#v_ident(inner);
                    }
                });
                write_binary_arms.push(quote! {
                    #name::#v_ident(inner) => {
                        out.write_u8(#tag);
                        ::ember_engine::reflect::Reflect::write_binary(inner, out)?;
                    }
                });
                read_binary_arms.push(quote! {
                    #tag => {
                        let mut inner: #ty = ::std::default::Default::default();
                        ::ember_engine::reflect::Reflect::read_binary(&mut inner, input, options)?;
                        *self = #name::#v_ident(inner);
                    }
                });
            }
            Fields::Named(fields) => {
                let f_idents: Vec<_> = fields
                    .named
                    .iter()
                    .map(|f| f.ident.clone().expect("named field"))
                    .collect();
                let f_strs: Vec<_> = f_idents.iter().map(|f| f.to_string()).collect();
                let f_types: Vec<_> = fields.named.iter().map(|f| f.ty.clone()).collect();
                let locals: Vec<_> = f_idents
                    .iter()
                    .map(|f| format_ident!("field_{}", f))
                    .collect();
                for ty in &f_types {
                    short_terms.push(
                        quote! { <#ty as ::ember_engine::reflect::Reflect>::SHORT_REPR },
                    );
                }

                write_text_arms.push(quote! {
                    #name::#v_ident { #( #f_idents ),* } => {
                        ::ember_engine::reflect::variant::write_name(out, options, #v_str);
                        let all_short = true
                            #( && <#f_types as ::ember_engine::reflect::Reflect>::SHORT_REPR )*;
                        ::ember_engine::reflect::structs::write_text_fields(
                            out, options, all_short, &mut [
                                #( (#f_strs, &mut |out: &mut ::ember_engine::reflect::Output,
                                                   options: &::ember_engine::reflect::ToStringOptions|
                                    ::ember_engine::reflect::Reflect::write_text(#f_idents, out, options)) ),*
                            ])
                    }
                });
                read_text_arms.push(quote! {
                    #v_str => {
                        const DESC: ::ember_engine::reflect::structs::StructDescriptor =
                            ::ember_engine::reflect::structs::StructDescriptor {
                                name: #v_str,
                                fields: &[
                                    #( ::ember_engine::reflect::structs::FieldInfo {
                                        name: #f_strs,
                                        optional: false,
                                    } ),*
                                ],
                            };
                        #( let mut #locals: #f_types = ::std::default::Default::default(); )*
                        ::ember_engine::reflect::structs::read_text_fields(
                            input, options, &DESC, &mut [
                                #( &mut |input: &mut ::ember_engine::reflect::Input<'_>,
                                         options: &::ember_engine::reflect::FromStringOptions|
                                    ::ember_engine::reflect::Reflect::read_text(&mut #locals, input, options) ),*
                            ])?;
                        *self = #name::#v_ident { #( #f_idents: #locals ),* };
                    }
                });
                write_binary_arms.push(quote! {
                    #name::#v_ident { #( #f_idents ),* } => {
                        out.write_u8(#tag);
                        #( ::ember_engine::reflect::Reflect::write_binary(#f_idents, out)?; )*
                    }
                });
                read_binary_arms.push(quote! {
                    #tag => {
                        #( let mut #locals: #f_types = ::std::default::Default::default(); )*
                        #( ::ember_engine::reflect::Reflect::read_binary(&mut #locals, input, options)?; )*
                        *self = #name::#v_ident { #( #f_idents: #locals ),* };
                    }
                });
            }
        }
    }

    Ok(quote! {
        impl ::ember_engine::reflect::Reflect for #name {
            const SHORT_REPR: bool = true #( && #short_terms )*;

            fn write_text(
                &self,
                out: &mut ::ember_engine::reflect::Output,
                options: &::ember_engine::reflect::ToStringOptions,
            ) -> ::ember_engine::reflect::Result<()> {
                match self {
                    #( #write_text_arms )*
                }
            }

            fn read_text(
                &mut self,
                input: &mut ::ember_engine::reflect::Input<'_>,
                options: &::ember_engine::reflect::FromStringOptions,
            ) -> ::ember_engine::reflect::Result<()> {
                let name = ::ember_engine::reflect::variant::read_name(input)?;
                input.skip_whitespace_and_comments();
                match name.as_str() {
                    #( #read_text_arms )*
                    _ => {
                        return Err(input.error(
                            ::ember_engine::reflect::ErrorKind::UnknownVariant(name.clone()),
                        ));
                    }
                }
                Ok(())
            }

            fn write_binary(
                &self,
                out: &mut ::ember_engine::reflect::Output,
            ) -> ::ember_engine::reflect::Result<()> {
                match self {
                    #( #write_binary_arms )*
                }
                Ok(())
            }

            fn read_binary(
                &mut self,
                input: &mut ::ember_engine::reflect::Input<'_>,
                options: &::ember_engine::reflect::FromBinaryOptions,
            ) -> ::ember_engine::reflect::Result<()> {
                let tag = input.read_u8()?;
                match tag {
                    #( #read_binary_arms )*
                    _ => {
                        return Err(input.error(
                            ::ember_engine::reflect::ErrorKind::VariantIndexOutOfRange(tag),
                        ));
                    }
                }
                Ok(())
            }
        }
    })
}
