use darling::{ast::NestedMeta, FromMeta};
use proc_macro2::TokenStream;
use quote::quote;
use syn::ItemStruct;
use thiserror::Error;

#[derive(Debug, FromMeta, Clone)]
struct ClientConfig {
    provider: String,
    #[darling(default)]
    config: Option<String>,
    #[darling(default)]
    temperature: Option<f64>,
    #[darling(default)]
    max_tokens: Option<usize>,
    #[darling(default)]
    repair_attempts: Option<usize>,
}

#[derive(Debug, Error)]
pub(crate) enum ClientMacroError {
    #[error("Failed to parse client macro: {0}")]
    ParseError(#[from] darling::Error),
    #[error("Invalid provider path '{0}'")]
    InvalidProvider(String),
    #[error("Invalid config json: {0}")]
    InvalidConfig(String),
    #[error("Client '{0}' must be a unit struct")]
    NotUnitStruct(String),
}

fn parse_provider(config: &ClientConfig) -> Result<syn::Path, ClientMacroError> {
    syn::parse_str(&config.provider)
        .map_err(|_| ClientMacroError::InvalidProvider(config.provider.clone()))
}

fn parse_model_config(config: &ClientConfig) -> Result<TokenStream, ClientMacroError> {
    match &config.config {
        Some(json) => {
            serde_json::from_str::<serde_json::Value>(json)
                .map_err(|e| ClientMacroError::InvalidConfig(e.to_string()))?;
            Ok(quote! { ::std::option::Option::Some(#json) })
        }
        None => Ok(quote! { ::std::option::Option::None }),
    }
}

fn client_tuning(config: &ClientConfig) -> TokenStream {
    let mut tuning = quote! {};
    if let Some(temperature) = config.temperature {
        tuning.extend(quote! { let client = client.with_temperature(#temperature); });
    }
    if let Some(max_tokens) = config.max_tokens {
        tuning.extend(quote! { let client = client.with_max_tokens(#max_tokens); });
    }
    if let Some(attempts) = config.repair_attempts {
        tuning.extend(quote! { let client = client.with_repair_attempts(#attempts); });
    }
    tuning
}

pub(crate) fn client_impl(
    args: TokenStream,
    input: TokenStream,
) -> Result<TokenStream, ClientMacroError> {
    let attr_args = NestedMeta::parse_meta_list(args).map_err(darling::Error::from)?;
    let input: ItemStruct = syn::parse2(input).map_err(darling::Error::from)?;
    let config = ClientConfig::from_list(&attr_args)?;

    if !matches!(input.fields, syn::Fields::Unit) {
        return Err(ClientMacroError::NotUnitStruct(input.ident.to_string()));
    }

    let provider = parse_provider(&config)?;
    let model_config = parse_model_config(&config)?;
    let tuning = client_tuning(&config);
    let (struct_ident, struct_vis, struct_attrs) = (&input.ident, &input.vis, &input.attrs);

    Ok(quote! {
        #(#struct_attrs)*
        #struct_vis struct #struct_ident;

        impl #struct_ident {
            #struct_vis fn build(
                preamble: impl AsRef<str>,
            ) -> ::std::result::Result<
                ::orderly::completion::Client<#provider>,
                ::orderly::config::ConfigurationError,
            > {
                use ::orderly::completion::CompletionModel;
                let model = <#provider as CompletionModel>::from_json_config(#model_config)?;
                let client = model.build_client(preamble);
                #tuning
                ::std::result::Result::Ok(client)
            }
        }
    })
}
