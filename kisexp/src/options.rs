//! Configuration for decoding and writing.
//!
//! ```rust
//! use kisexp::{DecodeOptions, DuplicateFields, UnknownFields, WriterOptions};
//!
//! let decode = DecodeOptions::new()
//!     .with_duplicate_fields(DuplicateFields::Reject)
//!     .with_unknown_fields(UnknownFields::SkipAll);
//! let write = WriterOptions::new().with_indent_width(4);
//! # let _ = (decode, write);
//! ```

/// What to do when a single-valued named field occurs more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateFields {
    /// The last occurrence replaces earlier ones.
    #[default]
    LastWins,
    /// A second occurrence is a decode error.
    Reject,
}

/// What to do with a named field whose label matches no field of the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownFields {
    /// Skip exactly one value, then expect the label tuple to close.
    #[default]
    SkipValue,
    /// Skip every value up to the label tuple's closing paren, including none.
    SkipAll,
}

/// Options for the [`Decoder`](crate::decode::Decoder).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeOptions {
    /// Policy for repeated occurrences of single-valued named fields.
    ///
    /// # Default
    ///
    /// [`DuplicateFields::LastWins`]
    pub duplicate_fields: DuplicateFields,

    /// Policy for named fields without a matching field.
    ///
    /// # Default
    ///
    /// [`UnknownFields::SkipValue`]
    pub unknown_fields: UnknownFields,
}

impl DecodeOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_duplicate_fields(mut self, policy: DuplicateFields) -> Self {
        self.duplicate_fields = policy;
        self
    }

    #[must_use]
    pub fn with_unknown_fields(mut self, policy: UnknownFields) -> Self {
        self.unknown_fields = policy;
        self
    }
}

/// Options for the [`Writer`](crate::writer::Writer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterOptions {
    /// Spaces of indentation per nesting level when a tuple starts on a new line.
    ///
    /// # Default
    ///
    /// `2`
    pub indent_width: usize,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self { indent_width: 2 }
    }
}

impl WriterOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_indent_width(mut self, indent_width: usize) -> Self {
        self.indent_width = indent_width;
        self
    }
}
