//! # Message Container
//!
//! ## Purpose
//!
//! A [`Message`] is an ordered multiset of [`Field`]s. Names and ordinals are
//! optional and need not be unique; appending never merges or overwrites, and
//! iteration follows insertion order.
//!
//! Read-only access is a shared reference (`&Message` or `Arc<Message>`):
//! there is no separate unmodifiable container type.

use std::sync::Arc;

use crate::field_type::FieldType;
use crate::value::FieldValue;

/// How a decoded field's name and ordinal appeared on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WireOrigin {
    /// Taxonomy of the envelope the field was read from
    pub taxonomy_id: i16,
    /// False when the name was filled in from that taxonomy
    pub name_on_wire: bool,
}

/// One value tagged with an optional name, ordinal and wire type
///
/// A field built by the application may leave its type unset; the writer then
/// infers it from the registry. Decoded fields always carry their type, and
/// written back under the taxonomy they were read with they keep exactly the
/// name and ordinal they arrived with.
#[derive(Debug, Clone)]
pub struct Field {
    name: Option<String>,
    ordinal: Option<i16>,
    field_type: Option<Arc<FieldType>>,
    value: FieldValue,
    origin: Option<WireOrigin>,
}

impl Field {
    pub fn new(name: Option<String>, ordinal: Option<i16>, value: impl Into<FieldValue>) -> Self {
        Self {
            name,
            ordinal,
            field_type: None,
            value: value.into(),
            origin: None,
        }
    }

    /// Field whose wire type is fixed instead of inferred
    pub fn typed(
        name: Option<String>,
        ordinal: Option<i16>,
        field_type: Arc<FieldType>,
        value: impl Into<FieldValue>,
    ) -> Self {
        Self {
            name,
            ordinal,
            field_type: Some(field_type),
            value: value.into(),
            origin: None,
        }
    }

    /// Field as read from an envelope using `origin.taxonomy_id`
    pub(crate) fn decoded(
        name: Option<String>,
        ordinal: Option<i16>,
        field_type: Arc<FieldType>,
        value: FieldValue,
        origin: WireOrigin,
    ) -> Self {
        Self {
            origin: Some(origin),
            ..Self::typed(name, ordinal, field_type, value)
        }
    }

    pub fn named(name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::new(Some(name.into()), None, value)
    }

    pub fn with_ordinal(ordinal: i16, value: impl Into<FieldValue>) -> Self {
        Self::new(None, Some(ordinal), value)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn ordinal(&self) -> Option<i16> {
        self.ordinal
    }

    pub fn field_type(&self) -> Option<&Arc<FieldType>> {
        self.field_type.as_ref()
    }

    pub fn type_id(&self) -> Option<u8> {
        self.field_type.as_ref().map(|field_type| field_type.id())
    }

    pub fn value(&self) -> &FieldValue {
        &self.value
    }

    pub fn into_value(self) -> FieldValue {
        self.value
    }

    /// Whether the name was supplied by a taxonomy rather than read from the wire
    pub fn is_name_from_taxonomy(&self) -> bool {
        self.origin.map_or(false, |origin| !origin.name_on_wire) && self.name.is_some()
    }

    pub(crate) fn origin(&self) -> Option<WireOrigin> {
        self.origin
    }

    /// Path segment naming this field in diagnostics
    pub(crate) fn path_segment(&self, index: usize) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("[{index}]"),
        }
    }
}

/// Type ids are compared only when both fields carry one.
impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        let types_match = match (self.type_id(), other.type_id()) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        };
        self.name == other.name
            && self.ordinal == other.ordinal
            && types_match
            && self.value == other.value
    }
}

/// Ordered multiset of fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    fields: Vec<Field>,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Append a field with neither name nor ordinal
    pub fn add(&mut self, value: impl Into<FieldValue>) -> &mut Self {
        self.add_field(Field::new(None, None, value))
    }

    pub fn add_named(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> &mut Self {
        self.add_field(Field::named(name, value))
    }

    pub fn add_ordinal(&mut self, ordinal: i16, value: impl Into<FieldValue>) -> &mut Self {
        self.add_field(Field::with_ordinal(ordinal, value))
    }

    pub fn add_field(&mut self, field: Field) -> &mut Self {
        self.fields.push(field);
        self
    }

    /// Append a field with an explicit wire type
    pub fn add_typed(
        &mut self,
        name: Option<&str>,
        ordinal: Option<i16>,
        field_type: Arc<FieldType>,
        value: impl Into<FieldValue>,
    ) -> &mut Self {
        self.add_field(Field::typed(
            name.map(str::to_string),
            ordinal,
            field_type,
            value,
        ))
    }

    /// Remove every field whose name equals `name` (`None` matches unnamed fields)
    ///
    /// Returns the number of fields removed.
    pub fn remove_by_name(&mut self, name: Option<&str>) -> usize {
        self.retain(|field| field.name() != name)
    }

    /// Remove every field whose ordinal equals `ordinal` (`None` matches fields without one)
    pub fn remove_by_ordinal(&mut self, ordinal: Option<i16>) -> usize {
        self.retain(|field| field.ordinal() != ordinal)
    }

    /// Remove every field matching both name and ordinal exactly
    pub fn remove_matching(&mut self, name: Option<&str>, ordinal: Option<i16>) -> usize {
        self.retain(|field| !(field.name() == name && field.ordinal() == ordinal))
    }

    /// Keep only the fields for which `keep` returns true
    pub fn retain(&mut self, mut keep: impl FnMut(&Field) -> bool) -> usize {
        let before = self.fields.len();
        self.fields.retain(|field| keep(field));
        before - self.fields.len()
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.fields.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name() == Some(name))
    }

    pub fn fields_by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Field> + 'a {
        self.fields
            .iter()
            .filter(move |field| field.name() == Some(name))
    }

    pub fn field_by_ordinal(&self, ordinal: i16) -> Option<&Field> {
        self.fields
            .iter()
            .find(|field| field.ordinal() == Some(ordinal))
    }

    pub fn fields_by_ordinal(&self, ordinal: i16) -> impl Iterator<Item = &Field> + '_ {
        self.fields
            .iter()
            .filter(move |field| field.ordinal() == Some(ordinal))
    }

    pub fn value_by_name(&self, name: &str) -> Option<&FieldValue> {
        self.field_by_name(name).map(Field::value)
    }

    pub fn value_by_ordinal(&self, ordinal: i16) -> Option<&FieldValue> {
        self.field_by_ordinal(ordinal).map(Field::value)
    }

    /// First sub-message named `name`, if it has been decoded
    pub fn message_by_name(&self, name: &str) -> Option<&Message> {
        self.value_by_name(name).and_then(FieldValue::as_message)
    }
}

impl<'a> IntoIterator for &'a Message {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl IntoIterator for Message {
    type Item = Field;
    type IntoIter = std::vec::IntoIter<Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl FromIterator<Field> for Message {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl Extend<Field> for Message {
    fn extend<I: IntoIterator<Item = Field>>(&mut self, iter: I) {
        self.fields.extend(iter);
    }
}
