//! Decode values from s-expression token streams.
//!
//! Decoding is driven by the shape of the target type. Scalars read a single
//! atom, sequences and associative values read a parenthesized list, and
//! records read a list of fields described by a [`Record`] table:
//!
//! - **Positional** fields are filled in declaration order from the leading
//!   values of the list.
//! - **Named** fields appear after the positional ones as `(label value...)`
//!   tuples, in any order. Labels without a matching field are skipped as
//!   configured by [`UnknownFields`].
//! - **Multi** named fields may occur any number of times; each occurrence is
//!   appended to a sequence.
//! - **Flat** fields have no wrapping tuple of their own. A flat sequence or
//!   record takes its elements straight from the enclosing tuple, up to its
//!   closing paren.
//!
//! For example, given
//!
//! ```text
//! (kicad_pcb
//!   (version 20240108)
//!   (layers (0 F.Cu signal) (31 B.Cu signal hide))
//!   (net 0 "")
//!   (net 1 "GND"))
//! ```
//!
//! `layers` is a flat named sequence of records whose last positional field
//! is a flat sequence of flags, and `net` is a flat multi named record.
use delegate::delegate;
use smol_str::SmolStr;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::io::{BufRead, BufReader, Read};

use crate::literal::{self, LiteralError};
use crate::options::{DecodeOptions, DuplicateFields, UnknownFields};
use crate::scanner::{LexError, Scanner};
use crate::token::{Token, TokenKind};

/// A decode error.
///
/// All errors are terminal: the partially decoded value is discarded.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("line {line}: expected {expected}, found {found}")]
    Unexpected {
        line: usize,
        expected: &'static str,
        found: TokenKind,
    },

    #[error("line {line}: unexpected end of stream in {context}")]
    UnexpectedEnd { line: usize, context: &'static str },

    #[error("line {line}: invalid {expected} {text:?}: {source}")]
    Literal {
        line: usize,
        expected: &'static str,
        text: SmolStr,
        #[source]
        source: LiteralError,
    },

    #[error("expected document type {expected:?}, found {found:?}")]
    DocumentName { expected: String, found: SmolStr },

    #[error("line {line}: associative entries must have exactly two elements")]
    MapEntry { line: usize },

    #[error("line {line}: missing closing paren for field `{label}`, found {found}")]
    MissingClose {
        line: usize,
        label: SmolStr,
        found: TokenKind,
    },

    #[error("line {line}: insufficient values for positional fields {fields:?} of `{record}`")]
    MissingPositional {
        line: usize,
        record: &'static str,
        fields: Vec<&'static str>,
    },

    #[error("line {line}: duplicate field `{label}`")]
    DuplicateField { line: usize, label: SmolStr },

    #[error("invalid field `{field}` of `{record}`: {reason}")]
    InvalidShape {
        record: &'static str,
        field: &'static str,
        reason: &'static str,
    },

    #[error("`{record}` has no field with index {index}")]
    FieldIndex { record: &'static str, index: usize },
}

impl DecodeError {
    /// Error for a [`Record::decode_field`] call with an index outside [`Record::PLANS`].
    pub fn field_index<T: Record>(index: usize) -> Self {
        DecodeError::FieldIndex {
            record: T::NAME,
            index,
        }
    }
}

/// Shorthand for a result specialised to decode errors.
pub type Result<T, E = DecodeError> = std::result::Result<T, E>;

/// How a field is matched against the token stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Matched by position, without a label.
    Positional,
    /// Matched by a `(label value...)` tuple.
    Named(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Single,
    /// Every occurrence is appended to a sequence.
    Multi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// The value is read as usual, wrapped in its own tuple if composite.
    Nested,
    /// The value's elements or fields are inlined into the enclosing tuple.
    Flat,
}

/// Decoding plan for one field of a [`Record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPlan {
    /// Name of the field, used in diagnostics.
    pub field: &'static str,
    pub role: Role,
    pub cardinality: Cardinality,
    pub shape: Shape,
}

impl FieldPlan {
    pub const fn positional(field: &'static str) -> Self {
        Self {
            field,
            role: Role::Positional,
            cardinality: Cardinality::Single,
            shape: Shape::Nested,
        }
    }

    pub const fn named(field: &'static str, label: &'static str) -> Self {
        Self {
            field,
            role: Role::Named(label),
            cardinality: Cardinality::Single,
            shape: Shape::Nested,
        }
    }

    pub const fn multi(self) -> Self {
        Self {
            cardinality: Cardinality::Multi,
            ..self
        }
    }

    pub const fn flat(self) -> Self {
        Self {
            shape: Shape::Flat,
            ..self
        }
    }

    #[inline]
    pub fn label(&self) -> Option<&'static str> {
        match self.role {
            Role::Positional => None,
            Role::Named(label) => Some(label),
        }
    }
}

/// Types that can be decoded from a single s-expression value.
pub trait Decode: Sized {
    fn decode<R: BufRead>(decoder: &mut Decoder<R>) -> Result<Self>;
}

/// Types that can be decoded with their contents inlined into an enclosing
/// tuple, reading up to (but not including) that tuple's closing paren.
pub trait DecodeFlat: Sized {
    fn decode_flat<R: BufRead>(decoder: &mut Decoder<R>) -> Result<Self>;
}

/// Record types described by a table of field plans.
///
/// This is usually implemented with `#[derive(Decode)]`. A record starts out
/// as [`Default::default`] and is filled in one field at a time.
pub trait Record: Default {
    /// Name of the type, used in diagnostics.
    const NAME: &'static str;

    /// Field plans in declaration order.
    const PLANS: &'static [FieldPlan];

    /// Decode one occurrence of the field at `index` into [`Record::PLANS`],
    /// honouring its cardinality and shape.
    fn decode_field<R: BufRead>(&mut self, index: usize, decoder: &mut Decoder<R>) -> Result<()>;
}

/// Containers for [`Cardinality::Multi`] fields.
pub trait Accumulate {
    type Item;

    fn accumulate(&mut self, item: Self::Item);
}

impl<T> Accumulate for Vec<T> {
    type Item = T;

    #[inline]
    fn accumulate(&mut self, item: T) {
        self.push(item);
    }
}

/// A decoding session over one token stream.
pub struct Decoder<R> {
    scanner: Scanner<R>,
    options: DecodeOptions,
}

impl<R: BufRead> Decoder<R> {
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, DecodeOptions::default())
    }

    pub fn with_options(reader: R, options: DecodeOptions) -> Self {
        Self {
            scanner: Scanner::new(reader),
            options,
        }
    }

    #[inline]
    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Decode a value of type `T` at the current position.
    #[inline]
    pub fn decode<T: Decode>(&mut self) -> Result<T> {
        T::decode(self)
    }

    /// Decode a `(name field...)` document into the record `T`.
    pub fn document<T: Record>(&mut self, name: &str) -> Result<T> {
        tracing::debug!(document = name, record = T::NAME, "decoding document");

        self.open("`(` opening the document")?;

        let token = self.peek()?;
        if token.kind != TokenKind::RawAtom {
            return Err(self.unexpected("document type name", token.kind));
        }
        if token.text != name {
            return Err(DecodeError::DocumentName {
                expected: name.to_string(),
                found: token.text,
            });
        }
        self.scanner.read();

        let value = decode_fields::<T, R>(self)?;
        self.close("document")?;
        Ok(value)
    }

    /// Returns the next token without consuming it.
    pub fn peek(&mut self) -> Result<Token> {
        let token = self.scanner.peek();
        if token.kind == TokenKind::Invalid {
            return Err(self.lex_error());
        }
        Ok(token)
    }

    /// Returns and consumes the next token.
    pub fn read(&mut self) -> Result<Token> {
        let token = self.peek()?;
        self.scanner.read();
        Ok(token)
    }

    /// Consumes a `(`.
    pub fn open(&mut self, expected: &'static str) -> Result<()> {
        let token = self.peek()?;
        if token.kind != TokenKind::LeftParen {
            return Err(self.unexpected(expected, token.kind));
        }
        self.scanner.read();
        Ok(())
    }

    /// Consumes the `)` that ends `context`.
    pub fn close(&mut self, context: &'static str) -> Result<()> {
        let token = self.peek()?;
        match token.kind {
            TokenKind::RightParen => {
                self.scanner.read();
                Ok(())
            }
            TokenKind::EndOfStream => Err(self.unexpected_end(context)),
            found => Err(self.unexpected("`)`", found)),
        }
    }

    /// Consumes the raw atom that labels a named field.
    pub fn label(&mut self) -> Result<SmolStr> {
        let token = self.peek()?;
        if token.kind != TokenKind::RawAtom {
            return Err(self.unexpected("field label", token.kind));
        }
        self.scanner.read();
        Ok(token.text)
    }

    /// Converts the next atom with `parse` and consumes it.
    pub fn scalar<T, F>(&mut self, expected: &'static str, parse: F) -> Result<T>
    where
        F: FnOnce(&Token) -> Result<T, LiteralError>,
    {
        let token = self.peek()?;
        if !token.kind.is_atom() {
            return Err(self.unexpected(expected, token.kind));
        }
        self.convert(expected, token, parse)
    }

    /// Converts the next atom with `parse` and consumes it. Quoted atoms are
    /// rejected.
    pub fn raw_scalar<T, F>(&mut self, expected: &'static str, parse: F) -> Result<T>
    where
        F: FnOnce(&str) -> Result<T, LiteralError>,
    {
        let token = self.peek()?;
        if token.kind != TokenKind::RawAtom {
            return Err(self.unexpected(expected, token.kind));
        }
        self.convert(expected, token, |token| parse(token.text.as_str()))
    }

    fn convert<T, F>(&mut self, expected: &'static str, token: Token, parse: F) -> Result<T>
    where
        F: FnOnce(&Token) -> Result<T, LiteralError>,
    {
        let value = parse(&token).map_err(|source| DecodeError::Literal {
            line: self.line(),
            expected,
            text: token.text.clone(),
            source,
        })?;
        self.scanner.read();
        Ok(value)
    }

    /// Skips the next value. A tuple is skipped as a whole, including any
    /// nested tuples.
    pub fn skip_value(&mut self) -> Result<()> {
        let token = self.peek()?;
        match token.kind {
            TokenKind::LeftParen => {}
            TokenKind::RightParen | TokenKind::EndOfStream => {
                return Err(self.unexpected("value to skip", token.kind));
            }
            _ => {
                self.scanner.read();
                return Ok(());
            }
        }

        let mut depth = 0usize;
        loop {
            let token = self.read()?;
            match token.kind {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                TokenKind::EndOfStream => return Err(self.unexpected_end("skipped tuple")),
                _ => {}
            }
        }
    }

    /// Consumes the decoder, returning the scanner positioned after the last
    /// decoded token.
    pub fn into_scanner(self) -> Scanner<R> {
        self.scanner
    }

    pub fn unexpected(&self, expected: &'static str, found: TokenKind) -> DecodeError {
        DecodeError::Unexpected {
            line: self.line(),
            expected,
            found,
        }
    }

    pub fn unexpected_end(&self, context: &'static str) -> DecodeError {
        DecodeError::UnexpectedEnd {
            line: self.line(),
            context,
        }
    }

    fn lex_error(&mut self) -> DecodeError {
        match self.scanner.take_error() {
            Some(err) => DecodeError::Lex(err),
            None => self.unexpected("token", TokenKind::Invalid),
        }
    }

    delegate! {
        to self.scanner {
            pub fn line(&self) -> usize;
        }
    }
}

/// Decode a parenthesized record.
pub fn decode_record<T: Record, R: BufRead>(decoder: &mut Decoder<R>) -> Result<T> {
    decoder.open("`(` starting a record")?;
    let value = decode_fields::<T, R>(decoder)?;
    decoder.close(T::NAME)?;
    Ok(value)
}

/// Decode the fields of a record up to the closing paren of the enclosing
/// tuple, which is left unconsumed.
pub fn decode_fields<T: Record, R: BufRead>(decoder: &mut Decoder<R>) -> Result<T> {
    validate_plans::<T>()?;

    let positional: Vec<usize> = T::PLANS
        .iter()
        .enumerate()
        .filter(|(_, plan)| plan.role == Role::Positional)
        .map(|(index, _)| index)
        .collect();
    let mut next_positional = 0;
    let mut seen = vec![false; T::PLANS.len()];
    let mut value = T::default();

    loop {
        let token = decoder.peek()?;
        match token.kind {
            TokenKind::RightParen => break,
            TokenKind::EndOfStream => return Err(decoder.unexpected_end(T::NAME)),
            _ => {}
        }

        if let Some(&index) = positional.get(next_positional) {
            next_positional += 1;
            value.decode_field(index, decoder)?;
            continue;
        }

        decoder.open("`(` starting a named field")?;
        let label = decoder.label()?;

        match T::PLANS
            .iter()
            .position(|plan| plan.label() == Some(label.as_str()))
        {
            Some(index) => {
                if T::PLANS[index].cardinality == Cardinality::Single {
                    if seen[index] && decoder.options().duplicate_fields == DuplicateFields::Reject
                    {
                        return Err(DecodeError::DuplicateField {
                            line: decoder.line(),
                            label,
                        });
                    }
                    seen[index] = true;
                }
                value.decode_field(index, decoder)?;
            }
            None => {
                tracing::trace!(
                    record = T::NAME,
                    %label,
                    line = decoder.line(),
                    "skipping unknown field"
                );
                match decoder.options().unknown_fields {
                    UnknownFields::SkipValue => decoder.skip_value()?,
                    UnknownFields::SkipAll => loop {
                        match decoder.peek()?.kind {
                            TokenKind::RightParen => break,
                            TokenKind::EndOfStream => {
                                return Err(decoder.unexpected_end("unknown field"))
                            }
                            _ => decoder.skip_value()?,
                        }
                    },
                }
            }
        }

        let close = decoder.peek()?;
        if close.kind != TokenKind::RightParen {
            return Err(DecodeError::MissingClose {
                line: decoder.line(),
                label,
                found: close.kind,
            });
        }
        decoder.read()?;
    }

    // A single trailing flat field may legitimately take zero values.
    match &positional[next_positional..] {
        [] => {}
        [index] if T::PLANS[*index].shape == Shape::Flat => {}
        missing => {
            return Err(DecodeError::MissingPositional {
                line: decoder.line(),
                record: T::NAME,
                fields: missing.iter().map(|&index| T::PLANS[index].field).collect(),
            });
        }
    }

    Ok(value)
}

fn validate_plans<T: Record>() -> Result<()> {
    let invalid = |plan: &FieldPlan, reason| DecodeError::InvalidShape {
        record: T::NAME,
        field: plan.field,
        reason,
    };

    let mut positional = T::PLANS
        .iter()
        .filter(|plan| plan.role == Role::Positional)
        .peekable();

    while let Some(plan) = positional.next() {
        if plan.cardinality == Cardinality::Multi {
            return Err(invalid(plan, "multi fields must be named"));
        }
        if plan.shape == Shape::Flat && positional.peek().is_some() {
            return Err(invalid(plan, "only the last positional field may be flat"));
        }
    }

    Ok(())
}

/// Decode sequence elements up to the closing paren, which is left unconsumed.
pub fn decode_elements<T: Decode, R: BufRead>(decoder: &mut Decoder<R>) -> Result<Vec<T>> {
    let mut values = Vec::new();
    loop {
        match decoder.peek()?.kind {
            TokenKind::RightParen => return Ok(values),
            TokenKind::EndOfStream => return Err(decoder.unexpected_end("sequence")),
            _ => values.push(T::decode(decoder)?),
        }
    }
}

/// Decode a tuple of `(key value)` entries, passing each to `insert`.
fn decode_entries<K, V, R, F>(decoder: &mut Decoder<R>, mut insert: F) -> Result<()>
where
    K: Decode,
    V: Decode,
    R: BufRead,
    F: FnMut(K, V),
{
    decoder.open("`(` starting an associative value")?;

    loop {
        match decoder.peek()?.kind {
            TokenKind::RightParen => {
                decoder.read()?;
                return Ok(());
            }
            TokenKind::EndOfStream => return Err(decoder.unexpected_end("associative value")),
            _ => decoder.open("`(` starting an associative entry")?,
        }

        let key = K::decode(decoder)?;

        match decoder.peek()?.kind {
            TokenKind::RightParen => return Err(DecodeError::MapEntry { line: decoder.line() }),
            TokenKind::EndOfStream => return Err(decoder.unexpected_end("associative entry")),
            _ => {}
        }

        let value = V::decode(decoder)?;

        match decoder.peek()?.kind {
            TokenKind::RightParen => {
                decoder.read()?;
            }
            TokenKind::EndOfStream => return Err(decoder.unexpected_end("associative entry")),
            _ => return Err(DecodeError::MapEntry { line: decoder.line() }),
        }

        insert(key, value);
    }
}

fn atom_text(token: &Token) -> Result<String, LiteralError> {
    match token.kind {
        TokenKind::QuotedAtom => literal::unquote(&token.text),
        _ => Ok(token.text.to_string()),
    }
}

impl Decode for String {
    fn decode<R: BufRead>(decoder: &mut Decoder<R>) -> Result<Self> {
        decoder.scalar("string", atom_text)
    }
}

impl Decode for SmolStr {
    fn decode<R: BufRead>(decoder: &mut Decoder<R>) -> Result<Self> {
        decoder.scalar("string", |token| match token.kind {
            TokenKind::QuotedAtom => literal::unquote(&token.text).map(SmolStr::from),
            _ => Ok(token.text.clone()),
        })
    }
}

impl Decode for bool {
    fn decode<R: BufRead>(decoder: &mut Decoder<R>) -> Result<Self> {
        decoder.raw_scalar("boolean", literal::parse_bool)
    }
}

macro_rules! impl_decode_int {
    ($parse:path => $($ty:ty),*) => {
        $(impl Decode for $ty {
            fn decode<R: BufRead>(decoder: &mut Decoder<R>) -> Result<Self> {
                decoder.raw_scalar(stringify!($ty), |text| {
                    <$ty>::try_from($parse(text)?)
                        .map_err(|_| LiteralError::OutOfRange(stringify!($ty)))
                })
            }
        })*
    };
}

impl_decode_int!(literal::parse_int => i8, i16, i32, i64, isize);
impl_decode_int!(literal::parse_uint => u8, u16, u32, u64, usize);

impl Decode for f64 {
    fn decode<R: BufRead>(decoder: &mut Decoder<R>) -> Result<Self> {
        decoder.raw_scalar("f64", literal::parse_float)
    }
}

impl Decode for f32 {
    fn decode<R: BufRead>(decoder: &mut Decoder<R>) -> Result<Self> {
        decoder.raw_scalar("f32", |text| {
            let value = literal::parse_float(text)?;
            let narrowed = value as f32;
            if value.is_finite() && !narrowed.is_finite() {
                return Err(LiteralError::OutOfRange("f32"));
            }
            Ok(narrowed)
        })
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode<R: BufRead>(decoder: &mut Decoder<R>) -> Result<Self> {
        decoder.open("`(` starting a sequence")?;
        let values = decode_elements(decoder)?;
        decoder.close("sequence")?;
        Ok(values)
    }
}

impl<T: Decode> DecodeFlat for Vec<T> {
    fn decode_flat<R: BufRead>(decoder: &mut Decoder<R>) -> Result<Self> {
        decode_elements(decoder)
    }
}

impl<K: Decode + Eq + Hash, V: Decode> Decode for HashMap<K, V> {
    fn decode<R: BufRead>(decoder: &mut Decoder<R>) -> Result<Self> {
        let mut map = HashMap::new();
        decode_entries(decoder, |key, value| {
            map.insert(key, value);
        })?;
        Ok(map)
    }
}

impl<K: Decode + Ord, V: Decode> Decode for BTreeMap<K, V> {
    fn decode<R: BufRead>(decoder: &mut Decoder<R>) -> Result<Self> {
        let mut map = BTreeMap::new();
        decode_entries(decoder, |key, value| {
            map.insert(key, value);
        })?;
        Ok(map)
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode<R: BufRead>(decoder: &mut Decoder<R>) -> Result<Self> {
        Ok(Some(decoder.decode()?))
    }
}

impl<T: DecodeFlat> DecodeFlat for Option<T> {
    fn decode_flat<R: BufRead>(decoder: &mut Decoder<R>) -> Result<Self> {
        Ok(Some(T::decode_flat(decoder)?))
    }
}

impl<T: Decode> Decode for Box<T> {
    fn decode<R: BufRead>(decoder: &mut Decoder<R>) -> Result<Self> {
        Ok(Box::new(decoder.decode()?))
    }
}

impl<T: DecodeFlat> DecodeFlat for Box<T> {
    fn decode_flat<R: BufRead>(decoder: &mut Decoder<R>) -> Result<Self> {
        Ok(Box::new(T::decode_flat(decoder)?))
    }
}

/// Decode a `(name field...)` document from a byte stream into the record `T`.
pub fn decode_document<T: Record, R: Read>(reader: R, name: &str) -> Result<T> {
    decode_document_with_options(reader, name, DecodeOptions::default())
}

pub fn decode_document_with_options<T: Record, R: Read>(
    reader: R,
    name: &str,
    options: DecodeOptions,
) -> Result<T> {
    Decoder::with_options(BufReader::new(reader), options).document(name)
}

/// Decode a single bare value from a byte stream.
pub fn decode_value<T: Decode, R: Read>(reader: R) -> Result<T> {
    decode_value_with_options(reader, DecodeOptions::default())
}

pub fn decode_value_with_options<T: Decode, R: Read>(
    reader: R,
    options: DecodeOptions,
) -> Result<T> {
    Decoder::with_options(BufReader::new(reader), options).decode()
}

/// Decode a single bare value from a string.
pub fn from_str<T: Decode>(source: &str) -> Result<T> {
    Decoder::new(source.as_bytes()).decode()
}

/// Decode a `(name field...)` document from a string.
pub fn document_from_str<T: Record>(source: &str, name: &str) -> Result<T> {
    Decoder::new(source.as_bytes()).document(name)
}
