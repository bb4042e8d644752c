//! # Stream Reader - Element-at-a-Time Decoding
//!
//! ## Purpose
//!
//! Pull parser over a [`ByteSource`]. Each call to
//! [`StreamReader::next_element`] yields one structural element, which lets
//! callers process envelopes larger than memory or stop early.
//!
//! ## Element Sequence
//!
//! ```text
//! EnvelopeStart
//!   SimpleField ...
//!   SubMessageStart ── SimpleField ... ── SubMessageEnd
//!   SimpleField ...
//! None                     (end of envelope; next call starts the next one)
//! ...
//! None                     (source exhausted between envelopes)
//! ```
//!
//! Every open level tracks the bytes it has left. A field whose header plus
//! value would overrun its enclosing level is a framing error, as is an
//! envelope size below the header size or above the configured limit.
//!
//! After any error the reader is closed and further calls fail with
//! [`CodecError::ReaderClosed`]. The one exception is
//! [`StreamReader::skip_sub_message`] on a source that cannot skip, which
//! leaves the reader untouched so the caller can fall back to walking the
//! sub-message element by element.

use std::fmt;
use std::io::Read;
use std::sync::Arc;

use byteorder::{BigEndian, ReadBytesExt};
use bytes::Bytes;
use tracing::{debug, trace};

use crate::constants::{
    FieldPrefix, ENVELOPE_HEADER_SIZE, EXTENDED_TYPE_ID_MARKER, NO_TAXONOMY,
};
use crate::context::CodecContext;
use crate::envelope::EnvelopeHeader;
use crate::error::{CodecError, CodecResult};
use crate::field_type::{FieldType, Width};
use crate::message::{Field, WireOrigin};
use crate::registry::RegistrySnapshot;
use crate::source::{ByteSource, BytesSource};
use crate::taxonomy::Taxonomy;

/// One structural element of the encoded stream
#[derive(Debug, Clone)]
pub enum StreamElement {
    EnvelopeStart {
        header: EnvelopeHeader,
        total_size: u32,
    },
    SimpleField(Field),
    SubMessageStart {
        name: Option<String>,
        ordinal: Option<i16>,
        field_type: Arc<FieldType>,
        /// The name was filled in from the envelope's taxonomy
        name_from_taxonomy: bool,
    },
    SubMessageEnd,
}

/// Sub-message starts compare their field types by id.
impl PartialEq for StreamElement {
    fn eq(&self, other: &Self) -> bool {
        use StreamElement::*;
        match (self, other) {
            (
                EnvelopeStart { header, total_size },
                EnvelopeStart {
                    header: other_header,
                    total_size: other_size,
                },
            ) => header == other_header && total_size == other_size,
            (SimpleField(a), SimpleField(b)) => a == b,
            (
                SubMessageStart {
                    name,
                    ordinal,
                    field_type,
                    name_from_taxonomy,
                },
                SubMessageStart {
                    name: other_name,
                    ordinal: other_ordinal,
                    field_type: other_type,
                    name_from_taxonomy: other_from_taxonomy,
                },
            ) => {
                name == other_name
                    && ordinal == other_ordinal
                    && field_type.id() == other_type.id()
                    && name_from_taxonomy == other_from_taxonomy
            }
            (SubMessageEnd, SubMessageEnd) => true,
            _ => false,
        }
    }
}

/// Decoded field header, before the value
struct FieldHeader {
    start: u64,
    name: Option<String>,
    ordinal: Option<i16>,
    name_on_wire: bool,
    field_type: Arc<FieldType>,
    size: u64,
}

/// Pull parser producing [`StreamElement`]s
pub struct StreamReader<S> {
    source: S,
    context: CodecContext,
    snapshot: Arc<RegistrySnapshot>,
    /// Bytes left at each open level; the bottom entry is the envelope body
    remaining: Vec<u64>,
    header: Option<EnvelopeHeader>,
    taxonomy: Option<Arc<dyn Taxonomy>>,
    offset: u64,
    at_sub_message_start: bool,
    closed: bool,
    fields_only: bool,
    /// Nesting level of the sub-message a fields-only reader was opened on
    base_depth: usize,
}

impl<S: ByteSource> StreamReader<S> {
    pub fn new(source: S, context: CodecContext) -> Self {
        let snapshot = context.registry().snapshot();
        Self {
            source,
            context,
            snapshot,
            remaining: Vec::new(),
            header: None,
            taxonomy: None,
            offset: 0,
            at_sub_message_start: false,
            closed: false,
            fields_only: false,
            base_depth: 0,
        }
    }

    /// Next element, or `None` at the end of an envelope or of the input
    pub fn next_element(&mut self) -> CodecResult<Option<StreamElement>> {
        if self.closed {
            return Err(CodecError::ReaderClosed);
        }
        self.at_sub_message_start = false;
        match self.step() {
            Ok(element) => Ok(element),
            Err(error) => {
                debug!("Stream reader closed at byte {}: {}", self.offset, error);
                self.closed = true;
                Err(error)
            }
        }
    }

    /// Capture the body of the sub-message just started, without decoding it
    ///
    /// Must directly follow a [`StreamElement::SubMessageStart`]. No
    /// [`StreamElement::SubMessageEnd`] is produced for a skipped sub-message.
    /// Sources that cannot skip return [`CodecError::UnsupportedOperation`]
    /// and leave the reader positioned at the first child.
    pub fn skip_sub_message(&mut self) -> CodecResult<Bytes> {
        if self.closed {
            return Err(CodecError::ReaderClosed);
        }
        let length = match (self.at_sub_message_start, self.remaining.last()) {
            (true, Some(&length)) => length,
            _ => {
                return Err(CodecError::invalid_state(
                    "skip_sub_message must directly follow a sub-message start",
                ))
            }
        };

        match self.source.take_slice(length as usize) {
            None => Err(CodecError::unsupported(
                "skip_sub_message",
                "byte source cannot skip ahead",
            )),
            Some(Err(error)) => {
                let error = CodecError::from_read(error, self.offset, "skipped sub-message");
                debug!("Stream reader closed at byte {}: {}", self.offset, error);
                self.closed = true;
                Err(error)
            }
            Some(Ok(bytes)) => {
                self.offset += length;
                self.remaining.pop();
                self.at_sub_message_start = false;
                trace!("Skipped sub-message of {} bytes", length);
                Ok(bytes)
            }
        }
    }

    /// Header of the envelope being read
    pub fn header(&self) -> Option<&EnvelopeHeader> {
        self.header.as_ref()
    }

    /// Taxonomy id of the envelope being read
    pub fn taxonomy_id(&self) -> i16 {
        self.header.map_or(NO_TAXONOMY, |header| header.taxonomy_id)
    }

    /// Taxonomy resolved for the envelope being read, if any
    pub fn taxonomy(&self) -> Option<&Arc<dyn Taxonomy>> {
        self.taxonomy.as_ref()
    }

    /// Nesting level of the innermost open sub-message, 0 at envelope level
    ///
    /// A reader over captured sub-message bytes starts at the level they were
    /// captured at.
    pub fn depth(&self) -> usize {
        self.base_depth + self.remaining.len().saturating_sub(1)
    }

    /// Bytes consumed from the source so far
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn supports_skip(&self) -> bool {
        self.source.supports_skip()
    }

    pub fn context(&self) -> &CodecContext {
        &self.context
    }

    pub fn get_ref(&self) -> &S {
        &self.source
    }

    pub fn into_source(self) -> S {
        self.source
    }

    fn step(&mut self) -> CodecResult<Option<StreamElement>> {
        let Some(&left) = self.remaining.last() else {
            if self.fields_only || self.source.is_exhausted()? {
                return Ok(None);
            }
            return self.read_envelope_header().map(Some);
        };

        if left == 0 {
            self.remaining.pop();
            if self.remaining.is_empty() {
                trace!("End of envelope at byte {}", self.offset);
                return Ok(None);
            }
            return Ok(Some(StreamElement::SubMessageEnd));
        }

        let FieldHeader {
            start,
            name,
            ordinal,
            name_on_wire,
            field_type,
            size,
        } = self.read_field_header()?;

        if field_type.is_sub_message() {
            let depth = self.base_depth + self.remaining.len();
            let limit = self.context.config().max_nesting_depth;
            if depth > limit {
                return Err(CodecError::framing(
                    start,
                    format!("sub-message nests deeper than the limit of {limit}"),
                ));
            }
            self.remaining.push(size);
            self.at_sub_message_start = true;
            return Ok(Some(StreamElement::SubMessageStart {
                name_from_taxonomy: name.is_some() && !name_on_wire,
                name,
                ordinal,
                field_type,
            }));
        }

        let value_offset = self.offset;
        let bytes = self.read_bytes(size, "field value")?;
        let value = field_type
            .read_value(bytes)
            .map_err(|error| error.at_offset(value_offset))?;
        trace!(
            "Read field {:?}/{:?} as {} ({} bytes)",
            name,
            ordinal,
            field_type.name(),
            size
        );
        let origin = WireOrigin {
            taxonomy_id: self.taxonomy_id(),
            name_on_wire,
        };
        Ok(Some(StreamElement::SimpleField(Field::decoded(
            name, ordinal, field_type, value, origin,
        ))))
    }

    fn read_envelope_header(&mut self) -> CodecResult<StreamElement> {
        let start = self.offset;
        let context = "envelope header";
        let directives = self.read_u8(context)?;
        let schema_version = self.read_u8(context)?;
        let taxonomy_id = self.read_i16(context)?;
        let total_size = self.read_u32(context)?;

        if (total_size as usize) < ENVELOPE_HEADER_SIZE {
            return Err(CodecError::framing(
                start,
                format!("envelope size {total_size} is smaller than its header"),
            ));
        }
        let limit = self.context.config().max_message_size;
        if total_size > limit {
            return Err(CodecError::framing(
                start,
                format!("envelope size {total_size} exceeds the limit of {limit}"),
            ));
        }

        let header = EnvelopeHeader::new(directives, schema_version, taxonomy_id);
        self.snapshot = self.context.registry().snapshot();
        self.taxonomy = self.context.resolve_taxonomy(taxonomy_id);
        self.header = Some(header);
        self.remaining
            .push(u64::from(total_size) - ENVELOPE_HEADER_SIZE as u64);

        debug!(
            "Reading envelope at byte {}: {} bytes, taxonomy {}",
            start, total_size, taxonomy_id
        );
        Ok(StreamElement::EnvelopeStart { header, total_size })
    }

    fn read_field_header(&mut self) -> CodecResult<FieldHeader> {
        let start = self.offset;
        let prefix = FieldPrefix::from_byte(self.read_u8("field prefix")?);

        let first = self.read_u8("field type")?;
        let type_id = if first >= EXTENDED_TYPE_ID_MARKER {
            let low = self.read_u8("field type")?;
            let full = (u16::from(first & !EXTENDED_TYPE_ID_MARKER) << 8) | u16::from(low);
            u8::try_from(full).map_err(|_| {
                CodecError::framing(start, format!("type id {full} exceeds 255"))
            })?
        } else {
            first
        };

        let ordinal = if prefix.has_ordinal {
            Some(self.read_i16("field ordinal")?)
        } else {
            None
        };

        let mut name = if prefix.has_name {
            let length = self.read_u8("field name length")?;
            let name_offset = self.offset;
            let bytes = self.read_bytes(u64::from(length), "field name")?;
            let name = std::str::from_utf8(&bytes).map_err(|_| {
                CodecError::framing(name_offset, "field name is not valid UTF-8")
            })?;
            Some(name.to_string())
        } else {
            None
        };

        let field_type = self.snapshot.lookup_by_id(type_id).ok_or_else(|| {
            CodecError::framing(start, format!("type id {type_id} is not registered"))
        })?;
        if field_type.is_fixed_width() != prefix.fixed_width {
            return Err(CodecError::framing(
                start,
                format!(
                    "fixed-width flag disagrees with type {} ({})",
                    type_id,
                    field_type.name()
                ),
            ));
        }

        let size = match field_type.width() {
            Width::Fixed(width) => width as u64,
            Width::Variable => self.read_size(prefix.size_width)?,
        };

        let consumed = self.offset - start + size;
        let Some(left) = self.remaining.last_mut() else {
            return Err(CodecError::invalid_state("field read outside an envelope"));
        };
        if consumed > *left {
            return Err(CodecError::framing(
                start,
                format!(
                    "field of {consumed} bytes overruns its enclosing {} bytes",
                    *left
                ),
            ));
        }
        *left -= consumed;

        let name_on_wire = name.is_some();
        if name.is_none() {
            if let (Some(ordinal), Some(taxonomy)) = (ordinal, &self.taxonomy) {
                name = taxonomy.field_name(ordinal).map(str::to_string);
            }
        }

        Ok(FieldHeader {
            start,
            name,
            ordinal,
            name_on_wire,
            field_type,
            size,
        })
    }

    fn read_size(&mut self, width: usize) -> CodecResult<u64> {
        let offset = self.offset;
        let size = match width {
            0 => 0,
            1 => i64::from(self.read_u8("field size")?),
            2 => i64::from(self.read_i16("field size")?),
            _ => i64::from(self.read_i32("field size")?),
        };
        u64::try_from(size)
            .map_err(|_| CodecError::framing(offset, format!("negative field size {size}")))
    }

    fn read_bytes(&mut self, length: u64, context: &str) -> CodecResult<Bytes> {
        let offset = self.offset;
        let bytes = match self.source.take_slice(length as usize) {
            Some(slice) => slice.map_err(|error| CodecError::from_read(error, offset, context))?,
            None => {
                let mut buffer = Vec::new();
                (&mut self.source)
                    .take(length)
                    .read_to_end(&mut buffer)
                    .map_err(|error| CodecError::from_read(error, offset, context))?;
                if (buffer.len() as u64) < length {
                    return Err(CodecError::truncated(offset, context));
                }
                Bytes::from(buffer)
            }
        };
        self.offset += length;
        Ok(bytes)
    }

    fn read_u8(&mut self, context: &str) -> CodecResult<u8> {
        let value = self
            .source
            .read_u8()
            .map_err(|error| CodecError::from_read(error, self.offset, context))?;
        self.offset += 1;
        Ok(value)
    }

    fn read_i16(&mut self, context: &str) -> CodecResult<i16> {
        let value = self
            .source
            .read_i16::<BigEndian>()
            .map_err(|error| CodecError::from_read(error, self.offset, context))?;
        self.offset += 2;
        Ok(value)
    }

    fn read_i32(&mut self, context: &str) -> CodecResult<i32> {
        let value = self
            .source
            .read_i32::<BigEndian>()
            .map_err(|error| CodecError::from_read(error, self.offset, context))?;
        self.offset += 4;
        Ok(value)
    }

    fn read_u32(&mut self, context: &str) -> CodecResult<u32> {
        let value = self
            .source
            .read_u32::<BigEndian>()
            .map_err(|error| CodecError::from_read(error, self.offset, context))?;
        self.offset += 4;
        Ok(value)
    }
}

impl StreamReader<BytesSource> {
    /// Reader over a bare field stream, as captured from a skipped sub-message
    ///
    /// `depth` is the nesting level the sub-message was captured at; its own
    /// sub-messages count against the nesting limit from there.
    pub(crate) fn fields_only(
        bytes: Bytes,
        taxonomy_id: i16,
        depth: usize,
        context: &CodecContext,
    ) -> Self {
        let length = bytes.len() as u64;
        let mut reader = Self::new(BytesSource::new(bytes), context.clone());
        reader.header = Some(EnvelopeHeader::with_taxonomy(taxonomy_id));
        reader.taxonomy = context.resolve_taxonomy(taxonomy_id);
        reader.remaining.push(length);
        reader.fields_only = true;
        reader.base_depth = depth;
        reader
    }
}

impl<S> fmt::Debug for StreamReader<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamReader")
            .field("offset", &self.offset)
            .field("depth", &(self.base_depth + self.remaining.len().saturating_sub(1)))
            .field("header", &self.header)
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::MessageEnvelope;
    use crate::message::Message;
    use crate::source::StreamSource;
    use crate::value::FieldValue;

    fn encoded_quote(context: &CodecContext) -> Bytes {
        let mut meta = Message::new();
        meta.add_named("source", "feedA");
        let mut message = Message::new();
        message
            .add_named("ask", 101.5)
            .add_named("meta", meta)
            .add_ordinal(2, 250);
        context.to_bytes(&MessageEnvelope::new(message)).unwrap()
    }

    #[test]
    fn test_element_sequence() {
        let context = CodecContext::default();
        let bytes = encoded_quote(&context);
        let mut reader = StreamReader::new(BytesSource::new(bytes.clone()), context);

        match reader.next_element().unwrap() {
            Some(StreamElement::EnvelopeStart { total_size, .. }) => {
                assert_eq!(total_size as usize, bytes.len())
            }
            other => panic!("expected envelope start, got {other:?}"),
        }
        match reader.next_element().unwrap() {
            Some(StreamElement::SimpleField(field)) => {
                assert_eq!(field.name(), Some("ask"));
                assert_eq!(field.value(), &FieldValue::Double(101.5));
            }
            other => panic!("expected ask, got {other:?}"),
        }
        assert!(matches!(
            reader.next_element().unwrap(),
            Some(StreamElement::SubMessageStart { name: Some(ref n), .. }) if n == "meta"
        ));
        assert_eq!(reader.depth(), 1);
        assert!(matches!(
            reader.next_element().unwrap(),
            Some(StreamElement::SimpleField(_))
        ));
        assert_eq!(
            reader.next_element().unwrap(),
            Some(StreamElement::SubMessageEnd)
        );
        assert!(matches!(
            reader.next_element().unwrap(),
            Some(StreamElement::SimpleField(ref f)) if f.ordinal() == Some(2)
        ));
        assert_eq!(reader.next_element().unwrap(), None);
        assert_eq!(reader.next_element().unwrap(), None);
        assert_eq!(reader.offset() as usize, bytes.len());
    }

    #[test]
    fn test_skip_captures_sub_message_bytes() {
        let context = CodecContext::default();
        let bytes = encoded_quote(&context);
        let mut reader = StreamReader::new(BytesSource::new(bytes), context);

        reader.next_element().unwrap();
        reader.next_element().unwrap();
        assert!(matches!(
            reader.skip_sub_message(),
            Err(CodecError::InvalidState(_))
        ));
        reader.next_element().unwrap();
        let body = reader.skip_sub_message().unwrap();
        // prefix, type, name(1+6), size, "feedA"
        assert_eq!(body.len(), 15);
        assert_eq!(reader.depth(), 0);
        assert!(matches!(
            reader.next_element().unwrap(),
            Some(StreamElement::SimpleField(_))
        ));
    }

    #[test]
    fn test_stream_source_cannot_skip_but_keeps_going() {
        let context = CodecContext::default();
        let bytes = encoded_quote(&context);
        let mut reader = StreamReader::new(StreamSource::new(&bytes[..]), context);

        reader.next_element().unwrap();
        reader.next_element().unwrap();
        reader.next_element().unwrap();
        let error = reader.skip_sub_message().unwrap_err();
        assert!(error.is_recoverable());
        assert!(!reader.is_closed());

        match reader.next_element().unwrap() {
            Some(StreamElement::SimpleField(field)) => {
                assert_eq!(field.value().as_str(), Some("feedA"))
            }
            other => panic!("expected source, got {other:?}"),
        }
    }

    #[test]
    fn test_truncated_input_closes_reader() {
        let context = CodecContext::default();
        let bytes = encoded_quote(&context);
        let mut reader = StreamReader::new(BytesSource::new(bytes.slice(..12)), context);

        reader.next_element().unwrap();
        // Input ends inside the name of the first field
        let error = reader.next_element().unwrap_err();
        assert!(matches!(error, CodecError::Framing { offset: 11, .. }));
        assert!(reader.is_closed());
        assert!(matches!(
            reader.next_element(),
            Err(CodecError::ReaderClosed)
        ));
    }

    #[test]
    fn test_undersized_envelope_is_framing_error() {
        let mut reader = StreamReader::new(
            BytesSource::new(vec![0u8, 0, 0, 0, 0, 0, 0, 4]),
            CodecContext::default(),
        );
        assert!(matches!(
            reader.next_element(),
            Err(CodecError::Framing { offset: 0, .. })
        ));
    }

    #[test]
    fn test_unregistered_type_id_is_framing_error() {
        // Envelope of 10 bytes holding a field of unknown type 99
        let bytes = vec![0u8, 0, 0, 0, 0, 0, 0, 10, 0x00, 99];
        let mut reader = StreamReader::new(BytesSource::new(bytes), CodecContext::default());
        reader.next_element().unwrap();
        assert!(matches!(
            reader.next_element(),
            Err(CodecError::Framing { offset: 8, .. })
        ));
    }

    #[test]
    fn test_field_overrunning_envelope_is_rejected() {
        // Envelope declares 12 bytes, the int field needs 6 from byte 8
        let bytes = vec![0u8, 0, 0, 0, 0, 0, 0, 12, 0x80, 4, 0, 0, 0, 1];
        let mut reader = StreamReader::new(BytesSource::new(bytes), CodecContext::default());
        reader.next_element().unwrap();
        let error = reader.next_element().unwrap_err();
        assert!(error.to_string().contains("overruns"));
    }

    #[test]
    fn test_oversized_type_id_is_rejected() {
        let bytes = vec![0u8, 0, 0, 0, 0, 0, 0, 11, 0x80, 0x81, 0x00];
        let mut reader = StreamReader::new(BytesSource::new(bytes), CodecContext::default());
        reader.next_element().unwrap();
        let error = reader.next_element().unwrap_err();
        assert!(error.to_string().contains("exceeds 255"));
    }

    #[test]
    fn test_taxonomy_names_are_marked_as_filled_in() {
        use crate::config::CodecConfig;
        use crate::taxonomy::{MapTaxonomy, MapTaxonomyResolver};

        let taxonomy: MapTaxonomy = [(2, "volume"), (3, "meta")].into_iter().collect();
        let context = CodecContext::default()
            .with_resolver(Arc::new(MapTaxonomyResolver::new().with_taxonomy(5, taxonomy)))
            .with_config(CodecConfig::default().with_compress_names(false));
        let mut inner = Message::new();
        inner.add_named("x", 1);
        let mut message = Message::new();
        message
            .add_ordinal(2, 250)
            .add_field(Field::new(Some("volume".into()), Some(2), 1))
            .add_ordinal(3, inner);
        let bytes = context
            .to_bytes(&MessageEnvelope::with_header(
                EnvelopeHeader::with_taxonomy(5),
                message,
            ))
            .unwrap();
        let mut reader = StreamReader::new(BytesSource::new(bytes), context);
        reader.next_element().unwrap();

        match reader.next_element().unwrap() {
            Some(StreamElement::SimpleField(field)) => {
                assert_eq!(field.name(), Some("volume"));
                assert!(field.is_name_from_taxonomy());
            }
            other => panic!("expected ordinal-only field, got {other:?}"),
        }
        match reader.next_element().unwrap() {
            Some(StreamElement::SimpleField(field)) => {
                assert_eq!(field.name(), Some("volume"));
                assert!(!field.is_name_from_taxonomy());
            }
            other => panic!("expected named field, got {other:?}"),
        }
        match reader.next_element().unwrap() {
            Some(StreamElement::SubMessageStart {
                name,
                name_from_taxonomy,
                ..
            }) => {
                assert_eq!(name.as_deref(), Some("meta"));
                assert!(name_from_taxonomy);
            }
            other => panic!("expected sub-message, got {other:?}"),
        }
    }
}
