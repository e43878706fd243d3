//! KiCad-style s-expressions as a data format.
//!
//! # Syntax
//!
//! - **Tuples** are sequences of values, delimited on the outside by `(` and `)`
//!   and separated by whitespace (space, tab, carriage return, newline or NUL).
//!
//! - **Atoms** are either raw or quoted. Raw atoms appear verbatim and end at
//!   whitespace, a paren or `#`. Quoted atoms are enclosed within double
//!   quotes, where the following escapes apply:
//!
//!    - `\"` and `\\` stand for `"` and `\`.
//!    - `\a`, `\b`, `\f`, `\n`, `\r`, `\t` and `\v` stand for the usual control characters.
//!    - `\xHH` stands for the byte with one or two hexadecimal digits `HH`.
//!    - `\NNN` stands for the byte with one to three octal digits `NNN`.
//!
//!   A backslash followed by anything else is kept as is.
//!
//! - **Comments** begin with a `#` outside of a quoted atom and extend to the
//!   end of the line.
//!
//! # Decoding
//!
//! Documents have the form `(name field...)`. The fields are decoded into a
//! [`Record`], usually with `#[derive(Decode)]`:
//!
//! ```rust
//! use kisexp::{document_from_str, Decode};
//!
//! #[derive(Debug, Default, Decode)]
//! struct Net {
//!     number: u32,
//!     name: String,
//! }
//!
//! #[derive(Debug, Default, Decode)]
//! struct Board {
//!     #[sexp(named)]
//!     version: u64,
//!     #[sexp(rename = "net", multi, flat)]
//!     nets: Vec<Net>,
//! }
//!
//! let board: Board = document_from_str(
//!     r#"(kicad_pcb (version 20240108) (net 0 "") (net 1 "GND"))"#,
//!     "kicad_pcb",
//! )
//! .unwrap();
//!
//! assert_eq!(board.version, 20240108);
//! assert_eq!(board.nets[1].name, "GND");
//! ```
//!
//! See the [`decode`] module for the field rules.
//!
//! # Writing
//!
//! The [`Writer`] emits tokens one call at a time and indents nested tuples.

pub mod decode;
pub mod literal;
pub mod options;
pub mod scanner;
pub mod token;
pub mod value;
pub mod writer;

pub use decode::{
    decode_document, decode_document_with_options, decode_value, decode_value_with_options,
    document_from_str, from_str, Decode, DecodeError, DecodeFlat, Decoder, Record,
};
pub use options::{DecodeOptions, DuplicateFields, UnknownFields, WriterOptions};
pub use scanner::{LexError, Scanner};
pub use token::{Token, TokenKind};
pub use value::Value;
pub use writer::{WriteError, Writer};

#[cfg(feature = "macros")]
pub use kisexp_macros::Decode;
