//! Codec errors for Fudge message encoding and decoding
//!
//! Every failure raised while registering types, sizing, writing or reading a
//! message is a [`CodecError`]. Errors raised for a specific field carry the
//! field's path inside the message (`meta/source`, or `[2]` for a field with
//! no name), so a failure deep inside a nested message can be located without
//! a debugger.

use std::io;

use thiserror::Error;
use types::ValueError;

/// Result alias used across the codec
pub type CodecResult<T> = std::result::Result<T, CodecError>;

/// Broad classes of [`CodecError`], used to decide how a caller reacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Type descriptor problems; fatal to the message
    Registry,
    /// Malformed input or reader misuse; fatal to the message and the reader
    Framing,
    /// Operation not offered by the byte source; recoverable by falling back
    Capability,
    /// Name or value exceeds a wire limit; fatal to the message
    Capacity,
    /// Value component outside its representable range
    Value,
    Io,
}

/// Codec errors with diagnostic context
#[derive(Debug, Error)]
pub enum CodecError {
    /// Descriptor rejected at registration
    #[error("Invalid field type {type_id} ({name}): {reason}")]
    InvalidType {
        type_id: u8,
        name: String,
        reason: String,
    },

    /// No descriptor registered for the value being written
    #[error("Unregistered type at {path}: no descriptor for {detail}")]
    UnregisteredType { path: String, detail: String },

    /// Descriptor cannot encode the supplied value
    #[error("Type mismatch at {path}: {type_name} cannot encode a {value_kind} value")]
    TypeMismatch {
        path: String,
        type_name: String,
        value_kind: String,
    },

    #[error("Field name at {path} is {length} bytes, limit is 255")]
    NameTooLong { path: String, length: usize },

    /// Encoded size does not fit its length field
    #[error("Value at {path} is {size} bytes, exceeds limit {limit}")]
    ValueTooLarge { path: String, size: u64, limit: u64 },

    /// Malformed or truncated input, or nesting beyond the configured limit
    #[error("Framing error at byte {offset}: {reason}")]
    Framing { offset: u64, reason: String },

    /// Capability not supported by the underlying source or descriptor
    #[error("Unsupported operation {operation}: {reason}")]
    UnsupportedOperation {
        operation: &'static str,
        reason: String,
    },

    /// Call made in a state where it is not valid
    #[error("Invalid reader state: {0}")]
    InvalidState(String),

    /// Reader was closed by an earlier failure
    #[error("Reader closed after an earlier failure")]
    ReaderClosed,

    #[error("Invalid value: {0}")]
    Value(#[from] ValueError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CodecError {
    pub fn invalid_type(type_id: u8, name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidType {
            type_id,
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn unregistered_type(detail: impl Into<String>) -> Self {
        Self::UnregisteredType {
            path: String::new(),
            detail: detail.into(),
        }
    }

    pub fn type_mismatch(type_name: impl Into<String>, value_kind: impl Into<String>) -> Self {
        Self::TypeMismatch {
            path: String::new(),
            type_name: type_name.into(),
            value_kind: value_kind.into(),
        }
    }

    pub fn name_too_long(length: usize) -> Self {
        Self::NameTooLong {
            path: String::new(),
            length,
        }
    }

    pub fn value_too_large(size: u64, limit: u64) -> Self {
        Self::ValueTooLarge {
            path: String::new(),
            size,
            limit,
        }
    }

    pub fn framing(offset: u64, reason: impl Into<String>) -> Self {
        Self::Framing {
            offset,
            reason: reason.into(),
        }
    }

    /// Framing error for input that ended before a declared length
    pub fn truncated(offset: u64, context: &str) -> Self {
        Self::framing(offset, format!("input ended while reading {context}"))
    }

    pub fn unsupported(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            operation,
            reason: reason.into(),
        }
    }

    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState(reason.into())
    }

    /// Prefix the field path with an enclosing field's segment
    ///
    /// Errors without a path are returned unchanged.
    pub fn within(mut self, segment: &str) -> Self {
        match &mut self {
            Self::UnregisteredType { path, .. }
            | Self::TypeMismatch { path, .. }
            | Self::NameTooLong { path, .. }
            | Self::ValueTooLarge { path, .. } => {
                *path = if path.is_empty() {
                    segment.to_string()
                } else {
                    format!("{segment}/{path}")
                };
            }
            _ => {}
        }
        self
    }

    /// Rebase a framing error raised against a value slice to a stream offset
    pub fn at_offset(mut self, base: u64) -> Self {
        if let Self::Framing { offset, .. } = &mut self {
            *offset += base;
        }
        self
    }

    /// Field path the error refers to, when it has one
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::UnregisteredType { path, .. }
            | Self::TypeMismatch { path, .. }
            | Self::NameTooLong { path, .. }
            | Self::ValueTooLarge { path, .. } => Some(path),
            _ => None,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidType { .. } | Self::UnregisteredType { .. } | Self::TypeMismatch { .. } => {
                ErrorCategory::Registry
            }
            Self::Framing { .. } | Self::InvalidState(_) | Self::ReaderClosed => {
                ErrorCategory::Framing
            }
            Self::UnsupportedOperation { .. } => ErrorCategory::Capability,
            Self::NameTooLong { .. } | Self::ValueTooLarge { .. } => ErrorCategory::Capacity,
            Self::Value(_) => ErrorCategory::Value,
            Self::Io(_) => ErrorCategory::Io,
        }
    }

    /// Whether the caller can continue after falling back to another strategy
    pub fn is_recoverable(&self) -> bool {
        self.category() == ErrorCategory::Capability
    }

    /// Map an I/O failure at `offset`, treating early end of input as framing
    pub(crate) fn from_read(error: io::Error, offset: u64, context: &str) -> Self {
        if error.kind() == io::ErrorKind::UnexpectedEof {
            Self::truncated(offset, context)
        } else {
            Self::Io(error)
        }
    }
}
