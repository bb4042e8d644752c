//! # Type Registry - Wire Type Lookup
//!
//! ## Purpose
//!
//! Maps wire type ids and native Rust types to [`FieldType`] descriptors. The
//! writer consults it to infer the wire type of untyped values; the reader
//! consults it to decode every field header.
//!
//! ## Architecture Role
//!
//! ```text
//! register() ──build──> RegistrySnapshot ──ArcSwap::rcu──> published
//!                                                             │
//! MessageWriter / StreamReader ──snapshot()── load_full ──────┘
//! ```
//!
//! Each registration clones the current snapshot, applies the change and
//! publishes the result atomically. Readers hold an `Arc<RegistrySnapshot>`
//! for a whole encode or decode and never take a lock, so registering a new
//! type never blocks or disturbs decodes already in flight.
//!
//! The registry is an explicit instance, never a global: [`TypeRegistry::new`]
//! registers the standard Fudge types, [`TypeRegistry::empty`] registers none.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::debug;

use crate::constants::{StandardTypeId, FIXED_BYTE_ARRAYS, SUB_MESSAGE_TYPE_ID};
use crate::encoded::EncodedMessage;
use crate::error::{CodecError, CodecResult};
use crate::field_type::{FieldCodec, FieldType, StandardKind, Width};
use crate::value::{FieldValue, NativeType};

/// Immutable view of the registry at one point in time
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    by_id: Vec<Option<Arc<FieldType>>>,
    by_native: HashMap<NativeType, Arc<FieldType>>,
}

impl RegistrySnapshot {
    pub fn lookup_by_id(&self, id: u8) -> Option<Arc<FieldType>> {
        self.by_id.get(id as usize).and_then(Clone::clone)
    }

    pub fn lookup_by_native_type(&self, native: NativeType) -> Option<Arc<FieldType>> {
        self.by_native.get(&native).cloned()
    }

    /// Descriptor for an untyped value
    ///
    /// Byte arrays whose length matches a registered fixed width narrow to
    /// that fixed type.
    pub fn resolve(&self, value: &FieldValue) -> Option<Arc<FieldType>> {
        if let FieldValue::ByteArray(bytes) = value {
            let fixed = FIXED_BYTE_ARRAYS
                .iter()
                .find(|(_, width)| *width == bytes.len())
                .and_then(|(id, _)| self.lookup_by_id(id.id()))
                .filter(|field_type| field_type.width() == Width::Fixed(bytes.len()));
            if fixed.is_some() {
                return fixed;
            }
        }
        self.lookup_by_native_type(value.native_type())
    }

    /// Number of id slots, including unset ones
    pub fn id_capacity(&self) -> usize {
        self.by_id.len()
    }

    /// Registered descriptors in id order
    pub fn field_types(&self) -> impl Iterator<Item = &Arc<FieldType>> {
        self.by_id.iter().flatten()
    }

    fn insert(&mut self, field_type: Arc<FieldType>, alternates: &[NativeType]) {
        let slot = field_type.id() as usize;
        if self.by_id.len() <= slot {
            self.by_id.resize(slot + 1, None);
        }
        self.by_id[slot] = Some(field_type.clone());
        self.by_native
            .insert(field_type.native_type(), field_type.clone());
        for alternate in alternates {
            self.by_native.insert(*alternate, field_type.clone());
        }
    }
}

/// Shareable, lock-free registry of wire types
#[derive(Debug)]
pub struct TypeRegistry {
    snapshot: ArcSwap<RegistrySnapshot>,
}

impl TypeRegistry {
    /// Registry with the standard Fudge types
    pub fn new() -> Self {
        let mut snapshot = RegistrySnapshot::default();
        for (field_type, alternates) in standard_types() {
            snapshot.insert(Arc::new(field_type), &alternates);
        }
        Self {
            snapshot: ArcSwap::from_pointee(snapshot),
        }
    }

    /// Registry with nothing registered
    pub fn empty() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(RegistrySnapshot::default()),
        }
    }

    /// Register a descriptor and map its native type plus `alternates` to it
    ///
    /// A descriptor for an id already in use replaces it.
    pub fn register(
        &self,
        field_type: FieldType,
        alternates: &[NativeType],
    ) -> CodecResult<Arc<FieldType>> {
        validate(&field_type)?;
        let field_type = Arc::new(field_type);
        let previous = self.snapshot.rcu(|current| {
            let mut next = RegistrySnapshot::clone(current);
            next.insert(field_type.clone(), alternates);
            next
        });
        match previous.lookup_by_id(field_type.id()) {
            Some(replaced) => debug!(
                "Replaced field type {} ({}) with {}",
                field_type.id(),
                replaced.name(),
                field_type.name()
            ),
            None => debug!(
                "Registered field type {} ({})",
                field_type.id(),
                field_type.name()
            ),
        }
        Ok(field_type)
    }

    pub fn lookup_by_id(&self, id: u8) -> Option<Arc<FieldType>> {
        self.snapshot.load().lookup_by_id(id)
    }

    pub fn lookup_by_native_type(&self, native: NativeType) -> Option<Arc<FieldType>> {
        self.snapshot.load().lookup_by_native_type(native)
    }

    pub fn resolve(&self, value: &FieldValue) -> Option<Arc<FieldType>> {
        self.snapshot.load().resolve(value)
    }

    /// Consistent view for one whole encode or decode
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.snapshot.load_full()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn validate(field_type: &FieldType) -> CodecResult<()> {
    let reject = |reason: &str| {
        Err(CodecError::invalid_type(
            field_type.id(),
            field_type.name(),
            reason,
        ))
    };
    match (field_type.is_sub_message(), field_type.id() == SUB_MESSAGE_TYPE_ID) {
        (true, false) => reject("sub-message behaviour is reserved for type id 15"),
        (false, true) => reject("type id 15 is reserved for sub-messages"),
        (true, true) if field_type.is_fixed_width() => reject("sub-messages are variable width"),
        _ => match field_type.codec() {
            FieldCodec::Standard(kind) if kind.width() != field_type.width() => {
                reject(&format!("{kind:?} values are {:?}", kind.width()))
            }
            _ => Ok(()),
        },
    }
}

fn standard_types() -> Vec<(FieldType, Vec<NativeType>)> {
    use StandardKind as K;
    use StandardTypeId as Id;

    // Fixed byte arrays share `Bytes` as their native type; registering them
    // first leaves byte[] as the type inferred for arbitrary lengths.
    let mut types: Vec<_> = FIXED_BYTE_ARRAYS
        .iter()
        .map(|&(id, width)| {
            (
                FieldType::standard(id, &format!("byte[{width}]"), K::FixedByteArray(width)),
                vec![],
            )
        })
        .collect();

    types.extend([
        (FieldType::standard(Id::Indicator, "indicator", K::Indicator), vec![]),
        (FieldType::standard(Id::Boolean, "boolean", K::Boolean), vec![]),
        (FieldType::standard(Id::Byte, "byte", K::Byte), vec![]),
        (FieldType::standard(Id::Short, "short", K::Short), vec![]),
        (FieldType::standard(Id::Int, "int", K::Int), vec![]),
        (FieldType::standard(Id::Long, "long", K::Long), vec![]),
        (
            FieldType::standard(Id::ByteArray, "byte[]", K::ByteArray),
            vec![NativeType::of::<Vec<u8>>(), NativeType::of::<[u8]>()],
        ),
        (FieldType::standard(Id::ShortArray, "short[]", K::ShortArray), vec![]),
        (FieldType::standard(Id::IntArray, "int[]", K::IntArray), vec![]),
        (FieldType::standard(Id::LongArray, "long[]", K::LongArray), vec![]),
        (FieldType::standard(Id::Float, "float", K::Float), vec![]),
        (FieldType::standard(Id::Double, "double", K::Double), vec![]),
        (FieldType::standard(Id::FloatArray, "float[]", K::FloatArray), vec![]),
        (FieldType::standard(Id::DoubleArray, "double[]", K::DoubleArray), vec![]),
        (
            FieldType::standard(Id::String, "string", K::String),
            vec![NativeType::of::<&'static str>(), NativeType::of::<str>()],
        ),
        (FieldType::sub_message(), vec![NativeType::of::<EncodedMessage>()]),
        (FieldType::standard(Id::Date, "date", K::Date), vec![]),
        (FieldType::standard(Id::Time, "time", K::Time), vec![]),
        (FieldType::standard(Id::DateTime, "datetime", K::DateTime), vec![]),
    ]);
    types
}
