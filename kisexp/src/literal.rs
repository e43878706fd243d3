//! Conversions between atom text and scalar values.
//!
//! These functions look at the text of a single atom and know nothing about
//! the token stream around it.
use logos::Logos;
use std::num::{ParseFloatError, ParseIntError};

use crate::scanner::is_raw_delimiter;

/// Error converting atom text into a scalar.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LiteralError {
    #[error(transparent)]
    Int(#[from] ParseIntError),
    #[error(transparent)]
    Float(#[from] ParseFloatError),
    #[error("invalid boolean")]
    Bool,
    #[error("escaped text is not valid UTF-8")]
    Utf8,
    #[error("value out of range for {0}")]
    OutOfRange(&'static str),
    #[error("unsigned integer with a sign")]
    Sign,
}

/// Lexer token for the body of a quoted atom.
#[derive(Debug, Clone, Logos)]
enum EscapedToken {
    #[token(r#"\a"#, |_| 0x07u8)]
    #[token(r#"\b"#, |_| 0x08u8)]
    #[token(r#"\f"#, |_| 0x0cu8)]
    #[token(r#"\n"#, |_| b'\n')]
    #[token(r#"\r"#, |_| b'\r')]
    #[token(r#"\t"#, |_| b'\t')]
    #[token(r#"\v"#, |_| 0x0bu8)]
    #[token(r#"\\"#, |_| b'\\')]
    #[token(r#"\""#, |_| b'"')]
    Escaped(u8),

    #[regex(r#"\\x[0-9a-fA-F]{1,2}"#, |lex| parse_radix(&lex.slice()[2..], 16))]
    Hex(u8),

    #[regex(r#"\\[0-7]{1,3}"#, |lex| parse_radix(&lex.slice()[1..], 8))]
    Octal(u8),

    /// A backslash that does not start a known escape is kept verbatim.
    #[token("\\")]
    Backslash,

    #[regex(r#"[^\\]+"#)]
    Literal,
}

/// Parses escape digits into a byte; octal values above 255 keep the low byte.
fn parse_radix(digits: &str, radix: u32) -> Option<u8> {
    u32::from_str_radix(digits, radix).ok().map(|value| value as u8)
}

/// Replaces escape sequences in the body of a quoted atom.
pub fn unescape(str: &str) -> Result<String, LiteralError> {
    let mut lexer = EscapedToken::lexer(str);
    let mut output = Vec::with_capacity(str.len());

    while let Some(token) = lexer.next() {
        match token.map_err(|()| LiteralError::Utf8)? {
            EscapedToken::Escaped(byte) | EscapedToken::Hex(byte) | EscapedToken::Octal(byte) => {
                output.push(byte)
            }
            EscapedToken::Backslash => output.push(b'\\'),
            EscapedToken::Literal => output.extend_from_slice(lexer.slice().as_bytes()),
        }
    }

    String::from_utf8(output).map_err(|_| LiteralError::Utf8)
}

/// Strips the delimiters from quoted atom text and resolves its escapes.
pub fn unquote(text: &str) -> Result<String, LiteralError> {
    let inner = text
        .strip_prefix('"')
        .and_then(|text| text.strip_suffix('"'))
        .unwrap_or(text);
    unescape(inner)
}

/// Parses a base-10 signed integer.
///
/// Exponent notation is not accepted.
pub fn parse_int(text: &str) -> Result<i64, LiteralError> {
    Ok(text.parse::<i64>()?)
}

/// Parses an unsigned integer.
///
/// Underscores are ignored anywhere in the text and a `0x` or `0X` prefix
/// selects base 16. No sign is accepted, before or after the prefix.
pub fn parse_uint(text: &str) -> Result<u64, LiteralError> {
    let digits: String = text.chars().filter(|&c| c != '_').collect();
    let (body, radix) = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => (hex, 16),
        None => (digits.as_str(), 10),
    };
    if body.starts_with('+') {
        return Err(LiteralError::Sign);
    }
    Ok(u64::from_str_radix(body, radix)?)
}

pub fn parse_float(text: &str) -> Result<f64, LiteralError> {
    Ok(text.parse::<f64>()?)
}

pub fn parse_bool(text: &str) -> Result<bool, LiteralError> {
    match text {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err(LiteralError::Bool),
    }
}

/// Whether `text` must be written as a quoted atom to survive scanning.
pub fn needs_quotes(text: &str) -> bool {
    text.is_empty() || text.starts_with('"') || text.bytes().any(is_raw_delimiter)
}

/// Wraps `text` in double quotes, escaping the characters the scanner and
/// [`unescape`] treat specially.
pub fn escape_quoted(str: &str) -> String {
    let mut output = String::with_capacity(str.len() + 2);
    output.push('"');

    for c in str.chars() {
        match c {
            '\n' => output.push_str(r#"\n"#),
            '\r' => output.push_str(r#"\r"#),
            '\t' => output.push_str(r#"\t"#),
            '\x0b' => output.push_str(r#"\v"#),
            '"' => output.push_str(r#"\""#),
            '\\' => output.push_str(r#"\\"#),
            c => output.push(c),
        }
    }

    output.push('"');
    output
}
