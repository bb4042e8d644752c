//! Lazy sub-message handle
//!
//! An [`EncodedMessage`] holds the undecoded field bytes of a sub-message as
//! captured by [`crate::StreamReader::skip_sub_message`], plus the taxonomy id
//! those bytes were written under and the nesting level they were captured
//! at. It decodes on demand and caches the result; the writer re-emits the
//! captured bytes verbatim when the taxonomy still applies and the handle is
//! written no deeper than it was captured.

use std::fmt;

use bytes::Bytes;
use once_cell::sync::OnceCell;

use crate::builder::decode_fields;
use crate::constants::NO_TAXONOMY;
use crate::context::CodecContext;
use crate::error::CodecResult;
use crate::message::Message;

#[derive(Clone)]
pub struct EncodedMessage {
    bytes: Bytes,
    taxonomy_id: i16,
    depth: usize,
    decoded: OnceCell<Message>,
}

impl EncodedMessage {
    /// Handle for a top-level sub-message
    pub fn new(bytes: Bytes, taxonomy_id: i16) -> Self {
        Self {
            bytes,
            taxonomy_id,
            depth: 1,
            decoded: OnceCell::new(),
        }
    }

    /// Set the nesting level the bytes were captured at (1 for a sub-message
    /// of the envelope)
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth.max(1);
        self
    }

    /// Captured field stream, without any field header of its own
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn taxonomy_id(&self) -> i16 {
        self.taxonomy_id
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Whether the bytes can be written as they are into an envelope using
    /// `taxonomy_id`
    pub fn is_verbatim_for(&self, taxonomy_id: i16) -> bool {
        self.taxonomy_id == NO_TAXONOMY || self.taxonomy_id == taxonomy_id
    }

    /// Decode into a fresh message, bypassing the cache
    pub fn decode(&self, context: &CodecContext) -> CodecResult<Message> {
        decode_fields(self.bytes.clone(), self.taxonomy_id, self.depth, context)
    }

    /// Decode once and keep the result
    pub fn decoded(&self, context: &CodecContext) -> CodecResult<&Message> {
        self.decoded.get_or_try_init(|| self.decode(context))
    }

    pub fn is_decoded(&self) -> bool {
        self.decoded.get().is_some()
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

impl fmt::Debug for EncodedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedMessage")
            .field("len", &self.bytes.len())
            .field("taxonomy_id", &self.taxonomy_id)
            .field("depth", &self.depth)
            .field("decoded", &self.is_decoded())
            .finish()
    }
}

/// Handles compare by their encoded bytes.
impl PartialEq for EncodedMessage {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}
