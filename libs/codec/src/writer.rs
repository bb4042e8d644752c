//! # Message Writer - Envelope Encoding
//!
//! ## Purpose
//!
//! Serializes envelopes onto any `std::io::Write`. Sizes come from the
//! [`SizeCalculator`] before a byte is emitted, so a write that fails
//! validation (unregistered value, oversized name or value, nesting limit)
//! fails before touching the output.
//!
//! ## Wire Layout
//!
//! ```text
//! ┌────────────┬────────┬──────────┬───────────────┐
//! │ directives │ schema │ taxonomy │ total size    │  envelope header (8 bytes)
//! │ u8         │ u8     │ i16 BE   │ u32 BE        │
//! └────────────┴────────┴──────────┴───────────────┘
//! ┌────────┬─────────┬──────────┬─────────────┬───────┬───────┐
//! │ prefix │ type id │ ordinal? │ len + name? │ size? │ value │  per field
//! │ u8     │ 1-2 B   │ i16 BE   │ u8 + UTF-8  │ 0-4 B │       │
//! └────────┴─────────┴──────────┴─────────────┴───────┴───────┘
//! ```
//!
//! I/O failures after validation can leave a partial envelope in the output,
//! as can a custom codec that writes a different number of bytes than it
//! sized; the latter is reported as [`CodecError::InvalidType`].

use std::io::Write;

use byteorder::{BigEndian, WriteBytesExt};
use tracing::{debug, trace};

use crate::constants::EXTENDED_TYPE_ID_MARKER;
use crate::context::CodecContext;
use crate::envelope::{EnvelopeHeader, MessageEnvelope};
use crate::error::{CodecError, CodecResult};
use crate::message::Message;
use crate::size::{FieldLayout, SizeCalculator, SubMessageBody};

/// Writes envelopes to an output
#[derive(Debug)]
pub struct MessageWriter<W: Write> {
    output: W,
    context: CodecContext,
}

impl<W: Write> MessageWriter<W> {
    pub fn new(output: W, context: CodecContext) -> Self {
        Self { output, context }
    }

    pub fn context(&self) -> &CodecContext {
        &self.context
    }

    /// Encode one envelope, returning its total size in bytes
    pub fn write_envelope(&mut self, envelope: &MessageEnvelope) -> CodecResult<u32> {
        self.encode(envelope.header(), envelope.message())
    }

    /// Encode a message under a default header
    pub fn write_message(&mut self, message: &Message) -> CodecResult<u32> {
        self.encode(&EnvelopeHeader::default(), message)
    }

    fn encode(&mut self, header: &EnvelopeHeader, message: &Message) -> CodecResult<u32> {
        let calculator = SizeCalculator::new(&self.context, header.taxonomy_id);
        let (total, layouts) = calculator.plan_envelope(message)?;

        write_header(&mut self.output, header, total)?;
        write_fields(&mut self.output, &mut layouts.iter(), message)?;

        debug!(
            "Wrote envelope: {} fields, {} bytes, taxonomy {}",
            message.len(),
            total,
            header.taxonomy_id
        );
        Ok(total)
    }

    pub fn flush(&mut self) -> CodecResult<()> {
        self.output.flush()?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.output
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.output
    }

    pub fn into_inner(self) -> W {
        self.output
    }
}

fn write_header<W: Write>(output: &mut W, header: &EnvelopeHeader, total: u32) -> CodecResult<()> {
    output.write_u8(header.directives)?;
    output.write_u8(header.schema_version)?;
    output.write_i16::<BigEndian>(header.taxonomy_id)?;
    output.write_u32::<BigEndian>(total)?;
    Ok(())
}

/// Write `message`'s fields, taking one planned layout per field in order
fn write_fields<'p, 'f: 'p, W: Write>(
    output: &mut W,
    layouts: &mut std::slice::Iter<'p, FieldLayout<'f>>,
    message: &Message,
) -> CodecResult<()> {
    for index in 0..message.len() {
        let layout = layouts.next().ok_or_else(|| {
            CodecError::invalid_state(format!("no planned layout for field [{index}]"))
        })?;
        write_field(output, layouts, layout, index)?;
    }
    Ok(())
}

fn write_field<'p, 'f: 'p, W: Write>(
    output: &mut W,
    layouts: &mut std::slice::Iter<'p, FieldLayout<'f>>,
    layout: &'p FieldLayout<'f>,
    index: usize,
) -> CodecResult<()> {
    let field = layout.field;
    write_field_header(output, layout)?;

    let within = |error: CodecError| error.within(&field.path_segment(index));
    match layout.body {
        Some(SubMessageBody::Fields(message)) => {
            write_fields(output, layouts, message).map_err(within)?
        }
        Some(SubMessageBody::Verbatim(bytes)) => output.write_all(bytes)?,
        None => {
            let mut counted = CountingWriter::new(&mut *output);
            layout
                .field_type
                .write_value(&mut counted, field.value())
                .map_err(within)?;
            if counted.count != layout.value_size {
                return Err(CodecError::invalid_type(
                    layout.field_type.id(),
                    layout.field_type.name(),
                    format!(
                        "codec wrote {} bytes for {}, which was sized at {}",
                        counted.count,
                        field.path_segment(index),
                        layout.value_size
                    ),
                ));
            }
        }
    }

    trace!(
        "Wrote field {} as {} ({} bytes)",
        field.path_segment(index),
        layout.field_type.name(),
        layout.total()
    );
    Ok(())
}

/// Counts the bytes a value codec emits
struct CountingWriter<'w, W> {
    inner: &'w mut W,
    count: usize,
}

impl<'w, W: Write> CountingWriter<'w, W> {
    fn new(inner: &'w mut W) -> Self {
        Self { inner, count: 0 }
    }
}

impl<W: Write> Write for CountingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.count += written;
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

fn write_field_header<W: Write>(output: &mut W, layout: &FieldLayout<'_>) -> CodecResult<()> {
    output.write_u8(layout.prefix().to_byte())?;

    let type_id = layout.field_type.id();
    if type_id >= EXTENDED_TYPE_ID_MARKER {
        // Ids fit in one byte, so the high byte is the marker alone
        output.write_u8(EXTENDED_TYPE_ID_MARKER)?;
    }
    output.write_u8(type_id)?;

    if let Some(ordinal) = layout.identity.ordinal {
        output.write_i16::<BigEndian>(ordinal)?;
    }
    if let Some(name) = layout.identity.name {
        // Length was checked against MAX_NAME_LENGTH by the layout
        output.write_u8(name.len() as u8)?;
        output.write_all(name.as_bytes())?;
    }

    let size = layout.value_size;
    match layout.size_width {
        0 => {}
        1 => output.write_u8(size as u8)?,
        2 => output.write_u16::<BigEndian>(size as u16)?,
        _ => output.write_u32::<BigEndian>(size as u32)?,
    }
    Ok(())
}
