//! Envelope: the top-level wrapper around one message
//!
//! The 8-byte envelope header carries opaque processing directives, a schema
//! version, the taxonomy id and the total encoded size. Directives are passed
//! through untouched; the codec neither interprets nor rejects any bit.

use crate::constants::NO_TAXONOMY;
use crate::message::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EnvelopeHeader {
    pub directives: u8,
    pub schema_version: u8,
    /// `NO_TAXONOMY` when names travel uncompressed
    pub taxonomy_id: i16,
}

impl EnvelopeHeader {
    pub fn new(directives: u8, schema_version: u8, taxonomy_id: i16) -> Self {
        Self {
            directives,
            schema_version,
            taxonomy_id,
        }
    }

    pub fn with_taxonomy(taxonomy_id: i16) -> Self {
        Self {
            taxonomy_id,
            ..Self::default()
        }
    }

    pub fn has_taxonomy(&self) -> bool {
        self.taxonomy_id != NO_TAXONOMY
    }
}

/// A message together with its envelope metadata
#[derive(Debug, Clone, Default)]
pub struct MessageEnvelope {
    header: EnvelopeHeader,
    message: Message,
    encoded_size: Option<u32>,
}

impl MessageEnvelope {
    /// Envelope with a default header
    pub fn new(message: Message) -> Self {
        Self::with_header(EnvelopeHeader::default(), message)
    }

    pub fn with_header(header: EnvelopeHeader, message: Message) -> Self {
        Self {
            header,
            message,
            encoded_size: None,
        }
    }

    pub(crate) fn decoded(header: EnvelopeHeader, message: Message, encoded_size: u32) -> Self {
        Self {
            header,
            message,
            encoded_size: Some(encoded_size),
        }
    }

    pub fn header(&self) -> &EnvelopeHeader {
        &self.header
    }

    pub fn directives(&self) -> u8 {
        self.header.directives
    }

    pub fn schema_version(&self) -> u8 {
        self.header.schema_version
    }

    pub fn taxonomy_id(&self) -> i16 {
        self.header.taxonomy_id
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn message_mut(&mut self) -> &mut Message {
        &mut self.message
    }

    pub fn into_message(self) -> Message {
        self.message
    }

    /// Total size read off the wire, header included; `None` for envelopes
    /// built in memory
    pub fn encoded_size(&self) -> Option<u32> {
        self.encoded_size
    }
}

/// The encoded size is bookkeeping from the read and does not take part.
impl PartialEq for MessageEnvelope {
    fn eq(&self, other: &Self) -> bool {
        self.header == other.header && self.message == other.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_taxonomy_sentinel() {
        assert!(!EnvelopeHeader::default().has_taxonomy());
        assert!(EnvelopeHeader::with_taxonomy(7).has_taxonomy());
    }

    #[test]
    fn test_equality_ignores_encoded_size() {
        let mut message = Message::new();
        message.add_named("a", 1);
        let header = EnvelopeHeader::new(0xA5, 3, 0);
        let built = MessageEnvelope::with_header(header, message.clone());
        let read = MessageEnvelope::decoded(header, message, 20);
        assert_eq!(built, read);
        assert_eq!(read.encoded_size(), Some(20));
        assert_eq!(read.directives(), 0xA5);
    }
}
