//! Write s-expressions token by token.
//!
//! The [`Writer`] is driven by explicit calls rather than by a data shape. It
//! keeps track of nesting so that it can reject unbalanced output, and starts
//! every nested tuple on its own indented line:
//!
//! ```rust
//! use kisexp::Writer;
//!
//! let mut writer = Writer::new(Vec::new());
//! writer.begin_tuple().unwrap();
//! writer.write_raw("net").unwrap();
//! writer.write_raw("1").unwrap();
//! writer.begin_tuple().unwrap();
//! writer.write_raw("name").unwrap();
//! writer.write_string("Net-(R1-Pad2)").unwrap();
//! writer.end_tuple().unwrap();
//! writer.end_tuple().unwrap();
//!
//! let output = writer.close().unwrap();
//! assert_eq!(output, b"(net 1\n  (name \"Net-(R1-Pad2)\"))");
//! ```
use std::io::{self, Write};

use crate::literal::{escape_quoted, needs_quotes};
use crate::options::WriterOptions;
use crate::token::{Token, TokenKind};

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("unbalanced tuple delimiters")]
    Unbalanced,
    #[error("can't begin a second top-level value")]
    SecondTopLevel,
    #[error("{0} unclosed tuple(s)")]
    Unclosed(usize),
    #[error("no value written")]
    Empty,
    #[error("can't write a token of kind {0}")]
    Token(TokenKind),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T, E = WriteError> = std::result::Result<T, E>;

/// What to emit before the next atom or opening paren.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    None,
    Space,
    NewlineIndent,
}

/// Emits tokens into a byte sink with balanced-paren bookkeeping.
pub struct Writer<W> {
    sink: W,
    depth: usize,
    delimiter: Delimiter,
    written_top_level: bool,
    options: WriterOptions,
}

impl<W: Write> Writer<W> {
    pub fn new(sink: W) -> Self {
        Self::with_options(sink, WriterOptions::default())
    }

    pub fn with_options(sink: W, options: WriterOptions) -> Self {
        Self {
            sink,
            depth: 0,
            delimiter: Delimiter::None,
            written_top_level: false,
            options,
        }
    }

    /// Number of currently open tuples.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Writes the `(` that begins a tuple.
    ///
    /// A nested tuple starts on a new line, indented by its depth.
    pub fn begin_tuple(&mut self) -> Result<()> {
        if self.depth > 0 {
            self.newline()?;
        } else if self.written_top_level {
            return Err(WriteError::SecondTopLevel);
        }

        self.write_delimiter()?;
        self.sink.write_all(b"(")?;
        self.depth += 1;
        self.delimiter = Delimiter::None;
        Ok(())
    }

    /// Writes the `)` that ends the innermost open tuple.
    pub fn end_tuple(&mut self) -> Result<()> {
        if self.depth == 0 {
            return Err(WriteError::Unbalanced);
        }

        self.sink.write_all(b")")?;
        self.depth -= 1;
        self.delimiter = Delimiter::Space;
        self.record_value();
        Ok(())
    }

    /// Writes `text` verbatim as a raw atom.
    ///
    /// The caller must make sure that `text` is a valid raw atom, without
    /// whitespace, parens or `#`.
    pub fn write_raw(&mut self, text: &str) -> Result<()> {
        self.write_atom(text)
    }

    /// Writes `text` as a quoted atom.
    pub fn write_quoted(&mut self, text: &str) -> Result<()> {
        self.write_atom(&escape_quoted(text))
    }

    /// Writes `text` as a raw atom when it scans back unchanged, and as a
    /// quoted atom otherwise.
    pub fn write_string(&mut self, text: &str) -> Result<()> {
        if needs_quotes(text) {
            self.write_quoted(text)
        } else {
            self.write_raw(text)
        }
    }

    /// Re-emits a token as produced by the [`Scanner`](crate::scanner::Scanner).
    pub fn write_token(&mut self, token: &Token) -> Result<()> {
        match token.kind {
            TokenKind::LeftParen => self.begin_tuple(),
            TokenKind::RightParen => self.end_tuple(),
            TokenKind::RawAtom | TokenKind::QuotedAtom => self.write_atom(&token.text),
            kind => Err(WriteError::Token(kind)),
        }
    }

    /// Finishes the document, flushing and returning the sink.
    ///
    /// Fails if a tuple is still open or if nothing was written.
    pub fn close(mut self) -> Result<W> {
        if self.depth > 0 {
            return Err(WriteError::Unclosed(self.depth));
        }
        if !self.written_top_level {
            return Err(WriteError::Empty);
        }
        self.sink.flush()?;
        Ok(self.sink)
    }

    fn write_atom(&mut self, text: &str) -> Result<()> {
        if self.written_top_level {
            return Err(WriteError::SecondTopLevel);
        }

        self.write_delimiter()?;
        self.sink.write_all(text.as_bytes())?;
        self.delimiter = Delimiter::Space;
        self.record_value();
        Ok(())
    }

    fn newline(&mut self) -> Result<()> {
        if self.delimiter != Delimiter::NewlineIndent {
            self.sink.write_all(b"\n")?;
            self.delimiter = Delimiter::NewlineIndent;
        }
        Ok(())
    }

    fn write_delimiter(&mut self) -> Result<()> {
        match self.delimiter {
            Delimiter::None => {}
            Delimiter::Space => self.sink.write_all(b" ")?,
            Delimiter::NewlineIndent => {
                let width = self.depth * self.options.indent_width;
                write!(self.sink, "{:width$}", "")?;
            }
        }
        self.delimiter = Delimiter::None;
        Ok(())
    }

    fn record_value(&mut self) {
        if self.depth == 0 {
            self.written_top_level = true;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::scanner::Scanner;
    use rstest::rstest;

    fn written(f: impl FnOnce(&mut Writer<Vec<u8>>) -> Result<()>) -> String {
        let mut writer = Writer::new(Vec::new());
        f(&mut writer).unwrap();
        String::from_utf8(writer.close().unwrap()).unwrap()
    }

    #[test]
    fn test_nested_tuple_indent() {
        let output = written(|w| {
            w.begin_tuple()?;
            w.write_raw("a")?;
            w.begin_tuple()?;
            w.write_raw("b")?;
            w.end_tuple()?;
            w.end_tuple()
        });
        assert_eq!(output, "(a\n  (b))");
    }

    #[test]
    fn test_netlist() {
        let output = written(|w| {
            w.begin_tuple()?;
            w.write_raw("export")?;
            w.begin_tuple()?;
            w.write_raw("version")?;
            w.write_string("D")?;
            w.end_tuple()?;
            w.begin_tuple()?;
            w.write_raw("design")?;
            w.begin_tuple()?;
            w.write_raw("tool")?;
            w.write_quoted(r#"go-kicad test "foo""#)?;
            w.end_tuple()?;
            w.end_tuple()?;
            w.begin_tuple()?;
            w.write_raw("components")?;
            w.begin_tuple()?;
            w.write_raw("comp")?;
            w.begin_tuple()?;
            w.write_raw("value")?;
            w.write_string("1k")?;
            w.end_tuple()?;
            w.begin_tuple()?;
            w.write_raw("footprint")?;
            w.write_string("Resistors SMD:R 1206 HandSoldering")?;
            w.end_tuple()?;
            w.end_tuple()?;
            w.end_tuple()?;
            w.end_tuple()
        });

        let expected = r#"(export
  (version D)
  (design
    (tool "go-kicad test \"foo\""))
  (components
    (comp
      (value 1k)
      (footprint "Resistors SMD:R 1206 HandSoldering"))))"#;
        assert_eq!(output, expected);
    }

    #[test]
    fn test_empty_tuple() {
        let output = written(|w| {
            w.begin_tuple()?;
            w.begin_tuple()?;
            w.end_tuple()?;
            w.end_tuple()
        });
        assert_eq!(output, "(\n  ())");
    }

    #[test]
    fn test_single_atom() {
        assert_eq!(written(|w| w.write_string("hello")), "hello");
        assert_eq!(written(|w| w.write_string("")), r#""""#);
    }

    #[test]
    fn test_indent_width() {
        let mut writer =
            Writer::with_options(Vec::new(), WriterOptions::new().with_indent_width(4));
        writer.begin_tuple().unwrap();
        writer.write_raw("a").unwrap();
        writer.begin_tuple().unwrap();
        writer.write_raw("b").unwrap();
        writer.begin_tuple().unwrap();
        writer.end_tuple().unwrap();
        writer.end_tuple().unwrap();
        writer.end_tuple().unwrap();
        let output = writer.close().unwrap();
        assert_eq!(output, b"(a\n    (b\n        ()))");
    }

    #[rstest]
    #[case("plain", "plain")]
    #[case("F.Cu", "F.Cu")]
    #[case("two words", r#""two words""#)]
    #[case("line\nbreak", r#""line\nbreak""#)]
    #[case("(paren", r#""(paren""#)]
    #[case("#hash", r##""#hash""##)]
    #[case("\"leading", r#""\"leading""#)]
    #[case("back\\slash", "back\\slash")]
    fn test_write_string(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(written(|w| w.write_string(text)), expected);
    }

    #[test]
    fn test_end_tuple_unbalanced() {
        let mut writer = Writer::new(Vec::new());
        assert!(matches!(writer.end_tuple(), Err(WriteError::Unbalanced)));
        assert_eq!(writer.depth(), 0);

        writer.begin_tuple().unwrap();
        writer.end_tuple().unwrap();
        assert!(matches!(writer.end_tuple(), Err(WriteError::Unbalanced)));
        assert_eq!(writer.close().unwrap(), b"()");
    }

    #[test]
    fn test_second_top_level_value() {
        let mut writer = Writer::new(Vec::new());
        writer.begin_tuple().unwrap();
        writer.end_tuple().unwrap();
        assert!(matches!(writer.begin_tuple(), Err(WriteError::SecondTopLevel)));
        assert!(matches!(writer.write_raw("x"), Err(WriteError::SecondTopLevel)));

        let mut writer = Writer::new(Vec::new());
        writer.write_raw("x").unwrap();
        assert!(matches!(writer.write_quoted("y"), Err(WriteError::SecondTopLevel)));
        assert!(matches!(writer.begin_tuple(), Err(WriteError::SecondTopLevel)));
    }

    #[test]
    fn test_close_errors() {
        let writer = Writer::new(Vec::new());
        assert!(matches!(writer.close(), Err(WriteError::Empty)));

        let mut writer = Writer::new(Vec::new());
        writer.begin_tuple().unwrap();
        writer.begin_tuple().unwrap();
        assert!(matches!(writer.close(), Err(WriteError::Unclosed(2))));
    }

    #[test]
    fn test_write_token_rejects_end_of_stream() {
        let mut writer = Writer::new(Vec::new());
        assert!(matches!(
            writer.write_token(&Token::end_of_stream()),
            Err(WriteError::Token(TokenKind::EndOfStream))
        ));
    }

    #[test]
    fn test_rewrite_scanned_tokens() {
        let input = "(kicad_pcb (version 20240108) # comment\n (net 1 \"GND\"))";
        let mut scanner = Scanner::new(input.as_bytes());
        let mut writer = Writer::new(Vec::new());
        loop {
            let token = scanner.read();
            if token.kind == TokenKind::EndOfStream {
                break;
            }
            writer.write_token(&token).unwrap();
        }

        let output = String::from_utf8(writer.close().unwrap()).unwrap();
        assert_eq!(
            output,
            "(kicad_pcb\n  (version 20240108)\n  (net 1 \"GND\"))"
        );
    }
}
