//! # Size Calculator - Encoded Size Planning
//!
//! ## Purpose
//!
//! Every variable width field is preceded by its size, so a sub-message's
//! size must be known before any of its bytes are written. The
//! [`SizeCalculator`] walks a message bottom-up and computes the exact number
//! of bytes the writer will produce.
//!
//! ## Field Layout Decision
//!
//! ```text
//! Field ──wire_identity()──> name? ordinal?   (taxonomy compression)
//!       ──registry─────────> FieldType        (explicit or inferred)
//!       ──value size───────> size prefix width
//!                 │
//!                 └──> FieldLayout ──> SizeCalculator (sum)
//!                                 └──> MessageWriter  (bytes)
//! ```
//!
//! The writer consumes the same [`FieldLayout`] list the calculator sums, in
//! write order, so the size planned for a field is always the size written
//! for it and each field is planned exactly once.
//!
//! ```text
//! meta { source, feed { id } }, ask   ──plan──>   [meta, source, feed, id, ask]
//! ```

use std::sync::Arc;

use bytes::Bytes;

use crate::constants::{
    size_prefix_width, type_id_width, FieldPrefix, ENVELOPE_HEADER_SIZE, MAX_NAME_LENGTH,
    MAX_VARIABLE_SIZE,
};
use crate::context::CodecContext;
use crate::error::{CodecError, CodecResult};
use crate::field_type::FieldType;
use crate::message::{Field, Message};
use crate::registry::RegistrySnapshot;
use crate::taxonomy::Taxonomy;
use crate::value::FieldValue;

/// Name and ordinal a field carries on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WireIdentity<'a> {
    pub name: Option<&'a str>,
    pub ordinal: Option<i16>,
}

/// Decide the name and ordinal written for `field` into an envelope using
/// `taxonomy_id`
///
/// A field decoded under that same taxonomy is written exactly as it was
/// read. Otherwise, with compression on, a name the taxonomy maps to an
/// ordinal is replaced by that ordinal, unless the field already carries a
/// different ordinal.
pub(crate) fn wire_identity<'a>(
    field: &'a Field,
    taxonomy: Option<&dyn Taxonomy>,
    taxonomy_id: i16,
    compress_names: bool,
) -> WireIdentity<'a> {
    if let Some(origin) = field.origin().filter(|origin| origin.taxonomy_id == taxonomy_id) {
        return WireIdentity {
            name: field.name().filter(|_| origin.name_on_wire),
            ordinal: field.ordinal(),
        };
    }

    let as_given = WireIdentity {
        name: field.name(),
        ordinal: field.ordinal(),
    };
    let (Some(name), Some(taxonomy), true) = (field.name(), taxonomy, compress_names) else {
        return as_given;
    };
    match taxonomy.field_ordinal(name) {
        Some(ordinal) if field.ordinal().map_or(true, |given| given == ordinal) => WireIdentity {
            name: None,
            ordinal: Some(ordinal),
        },
        _ => as_given,
    }
}

/// Content written for a sub-message field
#[derive(Debug, Clone, Copy)]
pub(crate) enum SubMessageBody<'a> {
    /// Fields planned right after this layout
    Fields(&'a Message),
    Verbatim(&'a Bytes),
}

/// Everything the writer needs to emit one field
#[derive(Debug)]
pub(crate) struct FieldLayout<'a> {
    pub field: &'a Field,
    pub identity: WireIdentity<'a>,
    pub field_type: Arc<FieldType>,
    pub header_size: usize,
    pub size_width: usize,
    pub value_size: usize,
    /// Set for sub-message fields only
    pub body: Option<SubMessageBody<'a>>,
}

impl FieldLayout<'_> {
    pub fn total(&self) -> usize {
        self.header_size + self.size_width + self.value_size
    }

    pub fn prefix(&self) -> FieldPrefix {
        FieldPrefix {
            fixed_width: self.field_type.is_fixed_width(),
            size_width: self.size_width,
            has_ordinal: self.identity.ordinal.is_some(),
            has_name: self.identity.name.is_some(),
        }
    }
}

/// Computes encoded sizes against one registry snapshot and one taxonomy
pub struct SizeCalculator<'c> {
    context: &'c CodecContext,
    snapshot: Arc<RegistrySnapshot>,
    taxonomy: Option<Arc<dyn Taxonomy>>,
    taxonomy_id: i16,
}

impl<'c> SizeCalculator<'c> {
    pub fn new(context: &'c CodecContext, taxonomy_id: i16) -> Self {
        Self {
            context,
            snapshot: context.registry().snapshot(),
            taxonomy: context.resolve_taxonomy(taxonomy_id),
            taxonomy_id,
        }
    }

    pub fn taxonomy_id(&self) -> i16 {
        self.taxonomy_id
    }

    /// Envelope total: header plus every top-level field
    pub fn envelope_size(&self, message: &Message) -> CodecResult<u32> {
        self.plan_envelope(message).map(|(total, _)| total)
    }

    /// Sum of the encoded sizes of the message's fields
    pub fn message_size(&self, message: &Message) -> CodecResult<usize> {
        self.plan_fields(message, 0, &mut Vec::new())
    }

    /// Encoded size of one top-level field, headers included
    pub fn field_size(&self, field: &Field) -> CodecResult<usize> {
        self.plan_field(field, 0, 0, &mut Vec::new())
    }

    /// Envelope total and the layout of every field, nested ones included,
    /// in the order the writer emits them
    pub(crate) fn plan_envelope<'f>(
        &self,
        message: &'f Message,
    ) -> CodecResult<(u32, Vec<FieldLayout<'f>>)> {
        let mut layouts = Vec::with_capacity(message.len());
        let total = ENVELOPE_HEADER_SIZE + self.plan_fields(message, 0, &mut layouts)?;
        let total = u32::try_from(total).map_err(|_| {
            CodecError::value_too_large(total as u64, u32::MAX as u64).within("<envelope>")
        })?;
        Ok((total, layouts))
    }

    fn plan_fields<'f>(
        &self,
        message: &'f Message,
        depth: usize,
        out: &mut Vec<FieldLayout<'f>>,
    ) -> CodecResult<usize> {
        message
            .iter()
            .enumerate()
            .try_fold(0usize, |total, (index, field)| {
                Ok(total + self.plan_field(field, index, depth, out)?)
            })
    }

    /// Append the layout of `field`, then those of its sub-fields, and return
    /// the field's encoded size
    fn plan_field<'f>(
        &self,
        field: &'f Field,
        index: usize,
        depth: usize,
        out: &mut Vec<FieldLayout<'f>>,
    ) -> CodecResult<usize> {
        let within = |error: CodecError| error.within(&field.path_segment(index));
        let identity = wire_identity(
            field,
            self.taxonomy.as_deref(),
            self.taxonomy_id,
            self.context.config().compress_names,
        );

        let field_type = match field.field_type() {
            Some(field_type) => field_type.clone(),
            None => self.snapshot.resolve(field.value()).ok_or_else(|| {
                within(CodecError::unregistered_type(format!(
                    "native type {}",
                    field.value().native_type().name()
                )))
            })?,
        };

        let mut header_size = 1 + type_id_width(field_type.id());
        if identity.ordinal.is_some() {
            header_size += 2;
        }
        if let Some(name) = identity.name {
            if name.len() > MAX_NAME_LENGTH {
                return Err(within(CodecError::name_too_long(name.len())));
            }
            header_size += 1 + name.len();
        }

        if !field_type.is_sub_message() {
            let value_size = field_type.variable_size(field.value()).map_err(within)?;
            let size_width = size_width_for(&field_type, value_size).map_err(within)?;
            let layout = FieldLayout {
                field,
                identity,
                field_type,
                header_size,
                size_width,
                value_size,
                body: None,
            };
            let total = layout.total();
            out.push(layout);
            return Ok(total);
        }

        let nested = depth + 1;
        let limit = self.context.config().max_nesting_depth;
        if nested > limit {
            return Err(CodecError::framing(
                0,
                format!(
                    "sub-message {} nests deeper than the limit of {limit}",
                    field.path_segment(index)
                ),
            ));
        }
        let body = self.sub_message_body(field.value(), nested).map_err(within)?;

        // The parent's size depends on its children, so its slot is filled in
        // once they are planned
        let slot = out.len();
        out.push(FieldLayout {
            field,
            identity,
            field_type: field_type.clone(),
            header_size,
            size_width: 0,
            value_size: 0,
            body: Some(body),
        });
        let value_size = match body {
            SubMessageBody::Fields(message) => {
                self.plan_fields(message, nested, out).map_err(within)?
            }
            SubMessageBody::Verbatim(bytes) => bytes.len(),
        };
        let size_width = size_width_for(&field_type, value_size).map_err(within)?;

        let layout = &mut out[slot];
        layout.value_size = value_size;
        layout.size_width = size_width;
        Ok(layout.total())
    }

    /// Resolve what a sub-message field at `nested` writes: its fields, or
    /// captured bytes
    ///
    /// A lazy handle is written verbatim only under the taxonomy it was
    /// captured with and no deeper than it was captured; otherwise it is
    /// decoded so that its fields are re-encoded and checked at this level.
    fn sub_message_body<'f>(
        &self,
        value: &'f FieldValue,
        nested: usize,
    ) -> CodecResult<SubMessageBody<'f>> {
        match value {
            FieldValue::Message(message) => Ok(SubMessageBody::Fields(message)),
            FieldValue::Encoded(encoded)
                if encoded.is_verbatim_for(self.taxonomy_id) && nested <= encoded.depth() =>
            {
                Ok(SubMessageBody::Verbatim(encoded.bytes()))
            }
            FieldValue::Encoded(encoded) => {
                Ok(SubMessageBody::Fields(encoded.decoded(self.context)?))
            }
            other => Err(CodecError::type_mismatch("message", other.kind_name())),
        }
    }
}

fn size_width_for(field_type: &FieldType, value_size: usize) -> CodecResult<usize> {
    if field_type.is_fixed_width() {
        return Ok(0);
    }
    size_prefix_width(value_size)
        .ok_or_else(|| CodecError::value_too_large(value_size as u64, MAX_VARIABLE_SIZE as u64))
}
