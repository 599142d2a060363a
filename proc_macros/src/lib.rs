use proc_macro::TokenStream;
use proc_macro_error::{abort_call_site, proc_macro_error};

mod client;
mod extractor;

/// Implements `orderly::completion::Extractor` for a `JsonSchema + Deserialize` type.
///
/// Accepts `#[extractor(name = "...", description = "...", validate)]`, all optional:
/// - `name`: tool name the schema is sent under, `[A-Za-z0-9_-]{1,64}`
/// - `description`: instructions sent with the schema, the type's doc comment otherwise
/// - `validate`: run the type's `Validate` rules after decoding
#[proc_macro_derive(Extractor, attributes(extractor))]
pub fn derive_extractor(input: TokenStream) -> TokenStream {
    match extractor::extractor_impl(input.into()) {
        Ok(tk_stream) => tk_stream.into(),
        Err(e) => e.write_errors().into(),
    }
}

/// Adds a `build(preamble)` constructor returning an `orderly::completion::Client`.
///
/// ```ignore
/// #[client(
///     provider = "orderly_anthropic::AnthropicCompletionModel",
///     config = r#"{"model": "claude-3-5-sonnet-20240620"}"#,
///     temperature = 0.0,
///     max_tokens = 1024,
///     repair_attempts = 2
/// )]
/// struct OrderClient;
/// ```
#[proc_macro_error]
#[proc_macro_attribute]
pub fn client(args: TokenStream, input: TokenStream) -> TokenStream {
    match client::client_impl(args.into(), input.into()) {
        Ok(tk_stream) => tk_stream.into(),
        Err(e) => abort_call_site!(e.to_string()),
    }
}
