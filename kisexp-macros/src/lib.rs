//! Procedural macros for decoding s-expressions into Rust types.
//! See the `kisexp` crate for more details on the format and on how to use
//! the derive macro.
use syn::{parse_macro_input, DeriveInput};

pub(crate) mod common;
mod decode;

/// Derive the `Decode`, `DecodeFlat` and `Record` traits for a struct with
/// named fields.
///
/// The struct must implement `Default`. Fields are positional unless marked
/// otherwise with `#[sexp(...)]`:
///
/// - `named`: a `(field_name value...)` tuple.
/// - `rename = "label"`: a `(label value...)` tuple.
/// - `multi`: a named field that may occur any number of times.
/// - `flat`: the value's contents are inlined into the enclosing tuple.
/// - `skip`: the field is never decoded.
#[proc_macro_derive(Decode, attributes(sexp))]
pub fn derive_decode(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let derive_input = parse_macro_input!(input as DeriveInput);
    decode::derive_decode_impl(derive_input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
