use darling::{util::Flag, FromDeriveInput};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{parse_quote, punctuated::Punctuated, DeriveInput, WhereClause};

const MAX_NAME_LEN: usize = 64;

#[derive(Debug, FromDeriveInput)]
#[darling(attributes(extractor), supports(struct_named, enum_any))]
struct ExtractorOpts {
    ident: syn::Ident,
    generics: syn::Generics,
    #[darling(default)]
    name: Option<String>,
    #[darling(default)]
    description: Option<String>,
    validate: Flag,
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

pub(crate) fn extractor_impl(input: TokenStream) -> Result<TokenStream, darling::Error> {
    let input: DeriveInput = syn::parse2(input)?;
    let opts = ExtractorOpts::from_derive_input(&input)?;

    let ident = &opts.ident;
    let (impl_generics, ty_generics, where_clause) = opts.generics.split_for_impl();
    let mut where_clause = where_clause.cloned().unwrap_or_else(|| WhereClause {
        where_token: Default::default(),
        predicates: Punctuated::new(),
    });
    where_clause.predicates.push(parse_quote! {
        #ident #ty_generics: ::orderly::schemars::JsonSchema
            + ::orderly::serde::de::DeserializeOwned
            + ::core::marker::Send
    });

    let name_fn = match &opts.name {
        Some(name) if !is_valid_name(name) => {
            return Err(darling::Error::custom(format!(
                "extractor name '{name}' must match [A-Za-z0-9_-]{{1,{MAX_NAME_LEN}}}"
            ))
            .with_span(ident));
        }
        Some(name) => quote! {
            fn name() -> ::std::string::String {
                ::std::string::String::from(#name)
            }
        },
        None => quote! {},
    };

    let description_fn = opts.description.as_ref().map_or_else(
        || quote! {},
        |description| {
            quote! {
                fn description() -> ::std::option::Option<::std::string::String> {
                    ::std::option::Option::Some(::std::string::String::from(#description))
                }
            }
        },
    );

    let post_decode_fn = if opts.validate.is_present() {
        where_clause.predicates.push(parse_quote! {
            #ident #ty_generics: ::orderly::validation::Validate
        });
        quote! {
            fn post_decode(self) -> ::std::result::Result<Self, ::orderly::validation::ValidationError> {
                ::orderly::validation::check(self)
            }
        }
    } else {
        quote! {}
    };

    Ok(quote! {
        impl #impl_generics ::orderly::completion::Extractor for #ident #ty_generics #where_clause {
            #name_fn
            #description_fn
            #post_decode_fn
        }
    })
}
