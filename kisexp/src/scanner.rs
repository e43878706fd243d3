//! Incremental tokenizer over a byte stream.
//!
//! The scanner reads only as much input as it needs to find the end of the
//! next token and keeps at most one token of lookahead.
use std::io::{self, BufRead};

use smol_str::SmolStr;

use crate::token::{Token, TokenKind};

/// A fatal lexing failure.
#[derive(Debug, thiserror::Error)]
pub enum LexError {
    #[error("line {line}: unexpected end of stream in quoted atom")]
    UnterminatedQuote { line: usize },
    #[error("line {line}: invalid byte {byte:#04x}")]
    InvalidByte { line: usize, byte: u8 },
    #[error("line {line}: {source}")]
    Io {
        line: usize,
        #[source]
        source: io::Error,
    },
}

impl LexError {
    pub fn line(&self) -> usize {
        match self {
            LexError::UnterminatedQuote { line } => *line,
            LexError::InvalidByte { line, .. } => *line,
            LexError::Io { line, .. } => *line,
        }
    }

    fn offending_text(&self) -> SmolStr {
        match self {
            LexError::InvalidByte { byte, .. } => char::from(*byte).to_string().into(),
            _ => SmolStr::default(),
        }
    }
}

/// Pulls [`Token`]s lazily from a buffered reader.
pub struct Scanner<R> {
    reader: R,
    peeked: Option<Token>,
    line: usize,
    finished: bool,
    error: Option<LexError>,
    scratch: Vec<u8>,
}

impl<R: BufRead> Scanner<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            peeked: None,
            line: 1,
            finished: false,
            error: None,
            scratch: Vec::new(),
        }
    }

    /// Returns the next token without consuming it.
    ///
    /// Repeated calls return the same token until [`Scanner::read`] is called.
    pub fn peek(&mut self) -> Token {
        if let Some(token) = &self.peeked {
            return token.clone();
        }

        if self.finished {
            return Token::end_of_stream();
        }

        let token = match self.scan() {
            Ok(token) => token,
            Err(err) => {
                tracing::debug!(error = %err, "lexing failed");
                let token = Token::new(TokenKind::Invalid, err.offending_text());
                self.error = Some(err);
                self.finished = true;
                token
            }
        };

        if token.kind != TokenKind::EndOfStream {
            self.peeked = Some(token.clone());
        }

        token
    }

    /// Returns and consumes the next token.
    ///
    /// [`TokenKind::EndOfStream`] is never consumed: once reached, every
    /// further call returns it again.
    pub fn read(&mut self) -> Token {
        let token = self.peek();
        self.peeked = None;
        token
    }

    /// Line number of the current scan position, starting at 1.
    #[inline]
    pub fn line(&self) -> usize {
        self.line
    }

    /// Takes the error behind the last [`TokenKind::Invalid`] token.
    pub fn take_error(&mut self) -> Option<LexError> {
        self.error.take()
    }

    /// Consumes the scanner, returning the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn scan(&mut self) -> Result<Token, LexError> {
        loop {
            let Some(byte) = self.peek_byte()? else {
                self.finished = true;
                return Ok(Token::end_of_stream());
            };

            match byte {
                b'\n' => {
                    self.line += 1;
                    self.reader.consume(1);
                }
                b' ' | b'\t' | b'\r' | 0 => self.reader.consume(1),
                b'#' => self.skip_comment()?,
                b'(' => {
                    self.reader.consume(1);
                    return Ok(Token::left_paren());
                }
                b')' => {
                    self.reader.consume(1);
                    return Ok(Token::right_paren());
                }
                b'"' => return self.scan_quoted(),
                _ => return self.scan_raw(),
            }
        }
    }

    fn peek_byte(&mut self) -> Result<Option<u8>, LexError> {
        let buf = fill(&mut self.reader, self.line)?;
        Ok(buf.first().copied())
    }

    /// Skips a `#` comment up to and including the line terminator.
    fn skip_comment(&mut self) -> Result<(), LexError> {
        loop {
            let buf = fill(&mut self.reader, self.line)?;
            if buf.is_empty() {
                return Ok(());
            }

            match buf.iter().position(|&b| b == b'\n' || b == b'\r') {
                Some(end) => {
                    if buf[end] == b'\n' {
                        self.line += 1;
                    }
                    self.reader.consume(end + 1);
                    return Ok(());
                }
                None => {
                    let len = buf.len();
                    self.reader.consume(len);
                }
            }
        }
    }

    fn scan_quoted(&mut self) -> Result<Token, LexError> {
        let start_line = self.line;
        self.scratch.clear();
        self.scratch.push(b'"');
        self.reader.consume(1);

        let mut escaped = false;
        loop {
            let buf = fill(&mut self.reader, self.line)?;
            if buf.is_empty() {
                return Err(LexError::UnterminatedQuote { line: start_line });
            }

            let mut end = None;
            for (index, &byte) in buf.iter().enumerate() {
                if byte == b'\n' {
                    self.line += 1;
                }

                if escaped {
                    escaped = false;
                } else if byte == b'\\' {
                    escaped = true;
                } else if byte == b'"' {
                    end = Some(index + 1);
                    break;
                }
            }

            let len = end.unwrap_or(buf.len());
            self.scratch.extend_from_slice(&buf[..len]);
            self.reader.consume(len);

            if end.is_some() {
                return self.finish_atom(TokenKind::QuotedAtom, start_line);
            }
        }
    }

    fn scan_raw(&mut self) -> Result<Token, LexError> {
        let start_line = self.line;
        self.scratch.clear();

        loop {
            let buf = fill(&mut self.reader, self.line)?;
            if buf.is_empty() {
                break;
            }

            match buf.iter().position(|&b| is_raw_delimiter(b)) {
                Some(end) => {
                    self.scratch.extend_from_slice(&buf[..end]);
                    self.reader.consume(end);
                    break;
                }
                None => {
                    let len = buf.len();
                    self.scratch.extend_from_slice(buf);
                    self.reader.consume(len);
                }
            }
        }

        self.finish_atom(TokenKind::RawAtom, start_line)
    }

    fn finish_atom(&mut self, kind: TokenKind, line: usize) -> Result<Token, LexError> {
        match std::str::from_utf8(&self.scratch) {
            Ok(text) => Ok(Token::new(kind, text)),
            Err(err) => Err(LexError::InvalidByte {
                line,
                byte: self.scratch[err.valid_up_to()],
            }),
        }
    }
}

/// Bytes that end a raw atom.
#[inline]
pub(crate) fn is_raw_delimiter(byte: u8) -> bool {
    matches!(byte, b'\n' | b'\r' | b' ' | b'\t' | 0 | b'(' | b')' | b'#')
}

/// Fills the reader's buffer, retrying interrupted reads.
fn fill<R: BufRead>(reader: &mut R, line: usize) -> Result<&[u8], LexError> {
    loop {
        match reader.fill_buf() {
            Ok(_) => break,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(source) => return Err(LexError::Io { line, source }),
        }
    }

    reader
        .fill_buf()
        .map_err(|source| LexError::Io { line, source })
}
