use proc_macro2::{Literal, TokenStream};
use quote::quote;
use syn::{
    ext::IdentExt, parse_quote, spanned::Spanned, DataStruct, DeriveInput, Field, Fields,
    GenericParam,
};

use crate::common::parse_sexp_attributes;

pub fn derive_decode_impl(derive_input: DeriveInput) -> syn::Result<TokenStream> {
    match &derive_input.data {
        syn::Data::Struct(data_struct) => derive_decode_struct(&derive_input, data_struct),
        syn::Data::Enum(_) => Err(syn::Error::new(
            derive_input.span(),
            "Can not derive Decode for enums.",
        )),
        syn::Data::Union(_) => Err(syn::Error::new(
            derive_input.span(),
            "Can not derive Decode for unions.",
        )),
    }
}

fn derive_decode_struct(
    derive_input: &DeriveInput,
    data_struct: &DataStruct,
) -> syn::Result<TokenStream> {
    let struct_ident = &derive_input.ident;
    let struct_name = struct_ident.unraw().to_string();

    if let Fields::Unnamed(_) = data_struct.fields {
        return Err(syn::Error::new_spanned(
            &data_struct.fields,
            "Fields must be named to derive Decode.",
        ));
    }

    // One `FieldPlan` expression per decoded field
    let mut code_plans = Vec::new();

    // The match branch that decodes one occurrence of a field
    let mut code_field_match = Vec::new();

    // The last flat positional field seen so far, which must stay the last positional field.
    let mut flat_positional: Option<&Field> = None;

    for field in &data_struct.fields {
        let Some(field_ident) = &field.ident else {
            return Err(syn::Error::new_spanned(
                field,
                "Fields must be named to derive Decode.",
            ));
        };

        let field_name = field_ident.unraw().to_string();
        let field_data = parse_sexp_attributes(&field.attrs, &field_name)?;

        if field_data.skip {
            continue;
        }

        let mut plan = match &field_data.label {
            Some(label) => quote!(::kisexp::decode::FieldPlan::named(#field_name, #label)),
            None => {
                if field_data.multi {
                    return Err(syn::Error::new_spanned(
                        field,
                        "Multi fields must be named.",
                    ));
                }

                if let Some(flat) = flat_positional {
                    return Err(syn::Error::new_spanned(
                        flat,
                        "Only the last positional field may be flat.",
                    ));
                }

                if field_data.flat {
                    flat_positional = Some(field);
                }

                quote!(::kisexp::decode::FieldPlan::positional(#field_name))
            }
        };

        if field_data.multi {
            plan = quote!(#plan.multi());
        }

        if field_data.flat {
            plan = quote!(#plan.flat());
        }

        let value = if field_data.flat {
            quote!(::kisexp::decode::DecodeFlat::decode_flat(decoder)?)
        } else {
            quote!(::kisexp::decode::Decode::decode(decoder)?)
        };

        let index = Literal::usize_unsuffixed(code_plans.len());

        code_field_match.push(if field_data.multi {
            quote! {
                #index => ::kisexp::decode::Accumulate::accumulate(&mut self.#field_ident, #value),
            }
        } else {
            quote! {
                #index => self.#field_ident = #value,
            }
        });

        code_plans.push(plan);
    }

    // Add a `Decode` bound to every generic type argument, and require the
    // `Default` that a record starts out from.
    let mut modified_generics = derive_input.generics.clone();
    let where_clause = modified_generics.make_where_clause();

    let (_, struct_generics, _) = derive_input.generics.split_for_impl();
    where_clause
        .predicates
        .push(parse_quote!(#struct_ident #struct_generics: ::core::default::Default));

    for param in &derive_input.generics.params {
        if let GenericParam::Type(param) = param {
            let ident = &param.ident;
            where_clause
                .predicates
                .push(parse_quote!(#ident: ::kisexp::decode::Decode));
        }
    }

    let (impl_generics, ty_generics, where_clause) = modified_generics.split_for_impl();

    Ok(quote! {
        #[automatically_derived]
        impl #impl_generics ::kisexp::decode::Record for #struct_ident #ty_generics
        #where_clause {
            const NAME: &'static str = #struct_name;

            const PLANS: &'static [::kisexp::decode::FieldPlan] = &[
                #(#code_plans),*
            ];

            #[allow(unreachable_code, unused_variables)]
            fn decode_field<__R: ::std::io::BufRead>(
                &mut self,
                index: usize,
                decoder: &mut ::kisexp::decode::Decoder<__R>,
            ) -> ::kisexp::decode::Result<()> {
                match index {
                    #(#code_field_match)*
                    _ => {
                        return ::std::result::Result::Err(
                            ::kisexp::decode::DecodeError::field_index::<Self>(index)
                        );
                    }
                }
                ::std::result::Result::Ok(())
            }
        }

        #[automatically_derived]
        impl #impl_generics ::kisexp::decode::Decode for #struct_ident #ty_generics
        #where_clause {
            fn decode<__R: ::std::io::BufRead>(
                decoder: &mut ::kisexp::decode::Decoder<__R>,
            ) -> ::kisexp::decode::Result<Self> {
                ::kisexp::decode::decode_record(decoder)
            }
        }

        #[automatically_derived]
        impl #impl_generics ::kisexp::decode::DecodeFlat for #struct_ident #ty_generics
        #where_clause {
            fn decode_flat<__R: ::std::io::BufRead>(
                decoder: &mut ::kisexp::decode::Decoder<__R>,
            ) -> ::kisexp::decode::Result<Self> {
                ::kisexp::decode::decode_fields(decoder)
            }
        }
    })
}
