use smol_str::SmolStr;
use std::io::{BufRead, Write};

use crate::decode::{self, Decode, Decoder};
use crate::literal;
use crate::token::TokenKind;
use crate::writer::{self, Writer};

/// An s-expression represented as a recursive enum.
///
/// Decoding into a `Value` accepts any single value, which makes it useful for
/// inspecting documents without a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Raw(SmolStr),
    /// A quoted atom with its escapes resolved.
    Quoted(String),
    List(Vec<Value>),
}

impl Value {
    /// The text of an atom, or `None` for a list.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Raw(text) => Some(text.as_str()),
            Value::Quoted(text) => Some(text.as_str()),
            Value::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Emits this value through `writer`.
    pub fn write_to<W: Write>(&self, writer: &mut Writer<W>) -> writer::Result<()> {
        // Iterators over the lists being written, outermost first.
        let mut parents = Vec::new();
        let mut items = std::slice::from_ref(self).iter();

        loop {
            match items.next() {
                Some(Value::Raw(text)) => writer.write_raw(text)?,
                Some(Value::Quoted(text)) => writer.write_quoted(text)?,
                Some(Value::List(children)) => {
                    writer.begin_tuple()?;
                    parents.push(std::mem::replace(&mut items, children.iter()));
                }
                None => match parents.pop() {
                    Some(parent) => {
                        writer.end_tuple()?;
                        items = parent;
                    }
                    None => return Ok(()),
                },
            }
        }
    }
}

impl Decode for Value {
    fn decode<R: BufRead>(decoder: &mut Decoder<R>) -> decode::Result<Self> {
        // Lists opened but not yet closed, innermost last.
        let mut open: Vec<Vec<Value>> = Vec::new();

        loop {
            let token = decoder.peek()?;
            let value = match token.kind {
                TokenKind::LeftParen => {
                    decoder.open("`(` starting a list")?;
                    open.push(Vec::new());
                    continue;
                }
                TokenKind::RightParen => match open.pop() {
                    Some(items) => {
                        decoder.close("list")?;
                        Value::List(items)
                    }
                    None => return Err(decoder.unexpected("value", token.kind)),
                },
                TokenKind::RawAtom => {
                    decoder.read()?;
                    Value::Raw(token.text)
                }
                TokenKind::QuotedAtom => Value::Quoted(
                    decoder.scalar("quoted atom", |token| literal::unquote(&token.text))?,
                ),
                TokenKind::EndOfStream if !open.is_empty() => {
                    return Err(decoder.unexpected_end("list"))
                }
                found => return Err(decoder.unexpected("value", found)),
            };

            match open.last_mut() {
                Some(items) => items.push(value),
                None => return Ok(value),
            }
        }
    }
}

impl Drop for Value {
    fn drop(&mut self) {
        let Value::List(items) = self else {
            return;
        };
        // Flatten nested lists so deep trees drop without recursing.
        let mut pending = std::mem::take(items);
        while let Some(mut value) = pending.pop() {
            if let Value::List(items) = &mut value {
                pending.append(items);
            }
        }
    }
}

impl From<SmolStr> for Value {
    fn from(value: SmolStr) -> Self {
        Self::Raw(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Quoted(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::List(value)
    }
}
