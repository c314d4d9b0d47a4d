use proc_macro::TokenStream;
use quote::quote;
use syn;
pub fn impl_deser_macro(ast: &syn::DeriveInput) -> TokenStream {
    let name = ast.ident.clone();
    let is_tuple_struct = match ast.data {
        syn::Data::Struct(ref data) => match data.fields {
            syn::Fields::Unnamed(_) => true,
            _ => false,
        },
        _ => false,
    };
    let statements: Vec<quote::__private::TokenStream> = match ast.data {
        // syn::Data::Struct(ref data) => &data.fields, //.map(|field| &field.ty),
        syn::Data::Struct(ref data) => data
            .fields
            .iter()
            .zip(0..1_000_000)
            .map(|(field, index)| deserialize_field(field, index))
            .collect(), //.map(|field| &field.ty),
        syn::Data::Enum(ref data) => {
            // Mirrors the leading CompactInt variant tag written by the
            // BtcSerialize derive (see serialize.rs); types with a
            // consensus-specified discriminant implement this trait by hand.
            let arms: Vec<quote::__private::TokenStream> = data
                .variants
                .iter()
                .enumerate()
                .map(|(index, variant)| deserialize_variant(variant, &name, index))
                .collect();

            let expanded: quote::__private::TokenStream = quote! {
                impl BitcoinDeserialize for #name {
                    fn bitcoin_deserialize<R: std::io::Read>(mut target: R) -> Result<Self, SerializationError>
                    {
                        let tag = crate::compactint::CompactInt::bitcoin_deserialize(&mut target)?.value();
                        match tag {
                            #(#arms)*
                            _ => Err(SerializationError::Parse("unknown enum variant tag")),
                        }
                    }
                }
            };
            return TokenStream::from(expanded);
        }
        _ => unimplemented!(),
    };
    let expanded = if is_tuple_struct {
        quote! {
            impl BitcoinDeserialize for #name {
                fn bitcoin_deserialize<R: std::io::Read>(mut target: R) -> Result<Self, SerializationError>
                {
                    Ok(#name (
                        #(#statements)*
                    ))
                }
            }
        }
    } else {
        quote! {
            impl BitcoinDeserialize for #name {
                fn bitcoin_deserialize<R: std::io::Read>(mut target: R) -> Result<Self, SerializationError>
                {
                    Ok(#name {
                        #(#statements)*
                    })
                }
            }
        }
    };

    TokenStream::from(expanded)
}

fn deserialize_field(field: &syn::Field, _index: usize) -> quote::__private::TokenStream {
    let ty = field.ty.clone();
    match field.ident.clone() {
        Some(name) => {
            quote! { #name: <#ty as BitcoinDeserialize>::bitcoin_deserialize(&mut target)?, }
        }
        None => {
            quote! {<#ty>::bitcoin_deserialize(&mut target)?,}
        }
    }

    // let name = field.ident.clone().expect("Missing identifier for field");
    // let ty = field.ty.clone();

    // quote! { #name: 0, }
    // quote! { #name: format!("shared::<{}>::deserialize(target),", #ty)  }
}

fn deserialize_variant(
    variant: &syn::Variant,
    name: &syn::Ident,
    index: usize,
) -> quote::__private::TokenStream {
    let ident = variant.ident.clone();
    let tag = index as u64;

    let has_named_fields = variant.fields.iter().any(|field| field.ident.is_some());

    if has_named_fields {
        let fields: Vec<quote::__private::TokenStream> = variant
            .fields
            .iter()
            .map(|field| {
                let ty = field.ty.clone();
                let field_ident = field
                    .ident
                    .clone()
                    .expect("mixed named/unnamed enum variant fields are unsupported");
                quote! { #field_ident: <#ty as BitcoinDeserialize>::bitcoin_deserialize(&mut target)?, }
            })
            .collect();

        quote! { #tag => Ok(#name::#ident { #(#fields)* }), }
    } else {
        let fields: Vec<quote::__private::TokenStream> = variant
            .fields
            .iter()
            .map(|field| {
                let ty = field.ty.clone();
                quote! { <#ty as BitcoinDeserialize>::bitcoin_deserialize(&mut target)?, }
            })
            .collect();

        quote! { #tag => Ok(#name::#ident ( #(#fields)* )), }
    }
}
