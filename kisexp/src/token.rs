//! The token vocabulary shared by the scanner, the decoder and the writer.
use smol_str::SmolStr;
use std::fmt;

/// Classification of a single token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// A single opening parenthesis: `(`
    LeftParen,
    /// A single closing parenthesis: `)`
    RightParen,
    /// Unquoted text, for example `B.Cu` or `0xdeadface`.
    RawAtom,
    /// Double-quoted text. The token text includes the quote delimiters.
    QuotedAtom,
    /// Synthetic token marking the end of the input.
    EndOfStream,
    /// A lexing failure. The token text holds the offending byte, if any.
    Invalid,
}

impl TokenKind {
    /// Human-readable label used in diagnostics.
    pub const fn label(self) -> &'static str {
        match self {
            TokenKind::LeftParen => "`(`",
            TokenKind::RightParen => "`)`",
            TokenKind::RawAtom => "raw atom",
            TokenKind::QuotedAtom => "quoted atom",
            TokenKind::EndOfStream => "end of stream",
            TokenKind::Invalid => "invalid token",
        }
    }

    /// Whether tokens of this kind are leaf values.
    #[inline]
    pub const fn is_atom(self) -> bool {
        matches!(self, TokenKind::RawAtom | TokenKind::QuotedAtom)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A token produced by the [`Scanner`](crate::scanner::Scanner).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: SmolStr,
}

impl Token {
    #[inline]
    pub fn new(kind: TokenKind, text: impl Into<SmolStr>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    #[inline]
    pub fn left_paren() -> Self {
        Self::new(TokenKind::LeftParen, "(")
    }

    #[inline]
    pub fn right_paren() -> Self {
        Self::new(TokenKind::RightParen, ")")
    }

    #[inline]
    pub fn end_of_stream() -> Self {
        Self::new(TokenKind::EndOfStream, "")
    }

    #[inline]
    pub fn raw(text: impl Into<SmolStr>) -> Self {
        Self::new(TokenKind::RawAtom, text)
    }

    #[inline]
    pub fn quoted(text: impl Into<SmolStr>) -> Self {
        Self::new(TokenKind::QuotedAtom, text)
    }
}
