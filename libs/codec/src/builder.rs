//! # Message Builder - Whole-Envelope Decoding
//!
//! ## Purpose
//!
//! Assembles [`StreamElement`]s into [`MessageEnvelope`] trees. The
//! [`MessageReader`] is the convenient front of the reading stack; the
//! [`crate::StreamReader`] underneath stays available for callers that want
//! elements one at a time.
//!
//! ## Lazy Sub-Messages
//!
//! ```text
//! SubMessageStart ─┬─ lazy + source can skip ──> FieldValue::Encoded (bytes kept)
//!                  └─ otherwise ───────────────> FieldValue::Message (decoded)
//! ```
//!
//! The first time a lazy read hits a source that cannot skip, the reader
//! logs a warning, turns lazy reads off for itself and decodes eagerly from
//! then on.

use bytes::Bytes;
use tracing::warn;

use crate::context::CodecContext;
use crate::encoded::EncodedMessage;
use crate::envelope::MessageEnvelope;
use crate::error::{CodecError, CodecResult};
use crate::message::{Field, Message, WireOrigin};
use crate::reader::{StreamElement, StreamReader};
use crate::source::ByteSource;
use crate::value::FieldValue;

/// Reads whole envelopes from a byte source
#[derive(Debug)]
pub struct MessageReader<S> {
    reader: StreamReader<S>,
    lazy_reads: bool,
    failed: bool,
}

impl<S: ByteSource> MessageReader<S> {
    pub fn new(source: S, context: CodecContext) -> Self {
        Self::from_stream_reader(StreamReader::new(source, context))
    }

    /// Build on an existing element reader, positioned between envelopes
    pub fn from_stream_reader(reader: StreamReader<S>) -> Self {
        let lazy_reads = reader.context().config().lazy_reads;
        Self {
            reader,
            lazy_reads,
            failed: false,
        }
    }

    pub fn is_lazy_reads(&self) -> bool {
        self.lazy_reads
    }

    pub fn set_lazy_reads(&mut self, lazy_reads: bool) {
        self.lazy_reads = lazy_reads;
    }

    /// Next envelope, or `None` once the source is exhausted
    pub fn read_envelope(&mut self) -> CodecResult<Option<MessageEnvelope>> {
        let result = self.next_envelope();
        if result.is_err() {
            self.failed = true;
        }
        result
    }

    /// Next envelope's message, discarding the header
    pub fn read_message(&mut self) -> CodecResult<Option<Message>> {
        Ok(self.read_envelope()?.map(MessageEnvelope::into_message))
    }

    pub fn stream_reader(&self) -> &StreamReader<S> {
        &self.reader
    }

    pub fn into_stream_reader(self) -> StreamReader<S> {
        self.reader
    }

    fn next_envelope(&mut self) -> CodecResult<Option<MessageEnvelope>> {
        match self.reader.next_element()? {
            None => Ok(None),
            Some(StreamElement::EnvelopeStart { header, total_size }) => {
                let message = self.process_fields(false)?;
                Ok(Some(MessageEnvelope::decoded(header, message, total_size)))
            }
            Some(other) => Err(CodecError::invalid_state(format!(
                "expected an envelope start, found {other:?}"
            ))),
        }
    }

    /// Collect fields until the end of the current level
    fn process_fields(&mut self, nested: bool) -> CodecResult<Message> {
        let mut message = Message::new();
        loop {
            match self.reader.next_element()? {
                None if !nested => return Ok(message),
                Some(StreamElement::SubMessageEnd) if nested => return Ok(message),
                Some(StreamElement::SimpleField(field)) => {
                    message.add_field(field);
                }
                Some(StreamElement::SubMessageStart {
                    name,
                    ordinal,
                    field_type,
                    name_from_taxonomy,
                }) => {
                    let origin = WireOrigin {
                        taxonomy_id: self.reader.taxonomy_id(),
                        name_on_wire: !name_from_taxonomy,
                    };
                    let value = self.sub_message_value()?;
                    message.add_field(Field::decoded(name, ordinal, field_type, value, origin));
                }
                other => {
                    return Err(CodecError::invalid_state(format!(
                        "unexpected {other:?} while reading fields"
                    )))
                }
            }
        }
    }

    fn sub_message_value(&mut self) -> CodecResult<FieldValue> {
        if self.lazy_reads {
            // Level of the sub-message just started; skipping closes it
            let depth = self.reader.depth();
            match self.reader.skip_sub_message() {
                Ok(bytes) => {
                    let taxonomy_id = self.reader.taxonomy_id();
                    return Ok(FieldValue::Encoded(
                        EncodedMessage::new(bytes, taxonomy_id).with_depth(depth),
                    ));
                }
                Err(CodecError::UnsupportedOperation { reason, .. }) => {
                    warn!("Lazy reads disabled: {}", reason);
                    self.lazy_reads = false;
                }
                Err(error) => return Err(error),
            }
        }
        Ok(FieldValue::Message(self.process_fields(true)?))
    }
}

/// Envelopes until the source is exhausted; stops after the first error
impl<S: ByteSource> Iterator for MessageReader<S> {
    type Item = CodecResult<MessageEnvelope>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        self.read_envelope().transpose()
    }
}

/// Decode a bare field stream captured from a skipped sub-message at `depth`
pub(crate) fn decode_fields(
    bytes: Bytes,
    taxonomy_id: i16,
    depth: usize,
    context: &CodecContext,
) -> CodecResult<Message> {
    let reader = StreamReader::fields_only(bytes, taxonomy_id, depth, context);
    MessageReader::from_stream_reader(reader).process_fields(false)
}
