//! # Field Type Descriptors
//!
//! ## Purpose
//!
//! A [`FieldType`] describes one wire type: its id, its primary native type,
//! whether its width is fixed, and how values are sized, written and read.
//! Descriptors are immutable once built and shared through the
//! [`crate::TypeRegistry`] as `Arc<FieldType>`.
//!
//! ## Behaviour Dispatch
//!
//! ```text
//! FieldCodec::Standard(kind)  → built-in primitive, array, string and date rules
//! FieldCodec::SubMessage      → recursion driven by the writer and StreamReader
//! FieldCodec::Custom(codec)   → caller supplied ValueCodec
//! ```
//!
//! The sub-message descriptor refuses the primitive size, read and write
//! path with [`CodecError::UnsupportedOperation`]; only the stream layer can
//! encode or decode nested fields.

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use bytes::Bytes;
use types::{FudgeDate, FudgeDateTime, FudgeTime};

use crate::constants::{StandardTypeId, SUB_MESSAGE_TYPE_ID};
use crate::error::{CodecError, CodecResult};
use crate::message::Message;
use crate::value::{FieldValue, NativeType};

/// Encoded width of a type's values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    Fixed(usize),
    Variable,
}

impl Width {
    pub fn is_fixed(self) -> bool {
        matches!(self, Width::Fixed(_))
    }
}

/// Value rules for a caller-registered type
///
/// `read_value` receives exactly the value's bytes; for fixed width types the
/// slice length always equals the declared width.
pub trait ValueCodec: Send + Sync + fmt::Debug {
    /// Encoded size of `value` in bytes
    fn variable_size(&self, value: &FieldValue) -> CodecResult<usize>;

    fn write_value(&self, output: &mut dyn Write, value: &FieldValue) -> CodecResult<()>;

    fn read_value(&self, input: Bytes) -> CodecResult<FieldValue>;
}

/// Built-in value rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardKind {
    Indicator,
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    ByteArray,
    ShortArray,
    IntArray,
    LongArray,
    FloatArray,
    DoubleArray,
    String,
    FixedByteArray(usize),
    Date,
    Time,
    DateTime,
}

impl StandardKind {
    pub(crate) fn width(self) -> Width {
        match self {
            StandardKind::Indicator => Width::Fixed(0),
            StandardKind::Boolean | StandardKind::Byte => Width::Fixed(1),
            StandardKind::Short => Width::Fixed(2),
            StandardKind::Int | StandardKind::Float => Width::Fixed(4),
            StandardKind::Long | StandardKind::Double => Width::Fixed(8),
            StandardKind::FixedByteArray(width) => Width::Fixed(width),
            StandardKind::Date => Width::Fixed(FudgeDate::SIZE),
            StandardKind::Time => Width::Fixed(FudgeTime::SIZE),
            StandardKind::DateTime => Width::Fixed(FudgeDateTime::SIZE),
            _ => Width::Variable,
        }
    }

    fn native_type(self) -> NativeType {
        match self {
            StandardKind::Indicator => NativeType::of::<()>(),
            StandardKind::Boolean => NativeType::of::<bool>(),
            StandardKind::Byte => NativeType::of::<i8>(),
            StandardKind::Short => NativeType::of::<i16>(),
            StandardKind::Int => NativeType::of::<i32>(),
            StandardKind::Long => NativeType::of::<i64>(),
            StandardKind::Float => NativeType::of::<f32>(),
            StandardKind::Double => NativeType::of::<f64>(),
            StandardKind::ByteArray | StandardKind::FixedByteArray(_) => NativeType::of::<Bytes>(),
            StandardKind::ShortArray => NativeType::of::<Vec<i16>>(),
            StandardKind::IntArray => NativeType::of::<Vec<i32>>(),
            StandardKind::LongArray => NativeType::of::<Vec<i64>>(),
            StandardKind::FloatArray => NativeType::of::<Vec<f32>>(),
            StandardKind::DoubleArray => NativeType::of::<Vec<f64>>(),
            StandardKind::String => NativeType::of::<String>(),
            StandardKind::Date => NativeType::of::<FudgeDate>(),
            StandardKind::Time => NativeType::of::<FudgeTime>(),
            StandardKind::DateTime => NativeType::of::<FudgeDateTime>(),
        }
    }

    /// Whether `value` has the shape this kind encodes
    fn accepts(self, value: &FieldValue) -> bool {
        if let (StandardKind::FixedByteArray(width), FieldValue::ByteArray(bytes)) = (self, value) {
            return bytes.len() == width;
        }
        matches!(
            (self, value),
            (StandardKind::Indicator, FieldValue::Indicator)
                | (StandardKind::Boolean, FieldValue::Boolean(_))
                | (StandardKind::Byte, FieldValue::Byte(_))
                | (StandardKind::Short, FieldValue::Short(_))
                | (StandardKind::Int, FieldValue::Int(_))
                | (StandardKind::Long, FieldValue::Long(_))
                | (StandardKind::Float, FieldValue::Float(_))
                | (StandardKind::Double, FieldValue::Double(_))
                | (StandardKind::ByteArray, FieldValue::ByteArray(_))
                | (StandardKind::ShortArray, FieldValue::ShortArray(_))
                | (StandardKind::IntArray, FieldValue::IntArray(_))
                | (StandardKind::LongArray, FieldValue::LongArray(_))
                | (StandardKind::FloatArray, FieldValue::FloatArray(_))
                | (StandardKind::DoubleArray, FieldValue::DoubleArray(_))
                | (StandardKind::String, FieldValue::String(_))
                | (StandardKind::Date, FieldValue::Date(_))
                | (StandardKind::Time, FieldValue::Time(_))
                | (StandardKind::DateTime, FieldValue::DateTime(_))
        )
    }

    fn variable_size(self, value: &FieldValue) -> Option<usize> {
        match value {
            FieldValue::ByteArray(bytes) => Some(bytes.len()),
            FieldValue::ShortArray(values) => Some(values.len() * 2),
            FieldValue::IntArray(values) => Some(values.len() * 4),
            FieldValue::LongArray(values) => Some(values.len() * 8),
            FieldValue::FloatArray(values) => Some(values.len() * 4),
            FieldValue::DoubleArray(values) => Some(values.len() * 8),
            FieldValue::String(value) => Some(value.len()),
            _ => None,
        }
    }

    fn write(self, output: &mut dyn Write, value: &FieldValue) -> CodecResult<()> {
        match value {
            FieldValue::Indicator => {}
            FieldValue::Boolean(value) => output.write_u8(*value as u8)?,
            FieldValue::Byte(value) => output.write_i8(*value)?,
            FieldValue::Short(value) => output.write_i16::<BigEndian>(*value)?,
            FieldValue::Int(value) => output.write_i32::<BigEndian>(*value)?,
            FieldValue::Long(value) => output.write_i64::<BigEndian>(*value)?,
            FieldValue::Float(value) => output.write_f32::<BigEndian>(*value)?,
            FieldValue::Double(value) => output.write_f64::<BigEndian>(*value)?,
            FieldValue::ByteArray(bytes) => output.write_all(bytes)?,
            FieldValue::ShortArray(values) => {
                for value in values {
                    output.write_i16::<BigEndian>(*value)?;
                }
            }
            FieldValue::IntArray(values) => {
                for value in values {
                    output.write_i32::<BigEndian>(*value)?;
                }
            }
            FieldValue::LongArray(values) => {
                for value in values {
                    output.write_i64::<BigEndian>(*value)?;
                }
            }
            FieldValue::FloatArray(values) => {
                for value in values {
                    output.write_f32::<BigEndian>(*value)?;
                }
            }
            FieldValue::DoubleArray(values) => {
                for value in values {
                    output.write_f64::<BigEndian>(*value)?;
                }
            }
            FieldValue::String(value) => output.write_all(value.as_bytes())?,
            FieldValue::Date(value) => output.write_all(&value.to_bytes())?,
            FieldValue::Time(value) => output.write_all(&value.to_bytes())?,
            FieldValue::DateTime(value) => output.write_all(&value.to_bytes())?,
            other => {
                return Err(CodecError::type_mismatch(
                    format!("{self:?}"),
                    other.kind_name(),
                ))
            }
        }
        Ok(())
    }

    fn read(self, input: Bytes) -> CodecResult<FieldValue> {
        if let Width::Fixed(width) = self.width() {
            if input.len() != width {
                return Err(CodecError::framing(
                    0,
                    format!("{self:?} value must be {width} bytes, got {}", input.len()),
                ));
            }
        }
        let value = match self {
            StandardKind::Indicator => FieldValue::Indicator,
            StandardKind::Boolean => FieldValue::Boolean(input[0] != 0),
            StandardKind::Byte => FieldValue::Byte(input[0] as i8),
            StandardKind::Short => FieldValue::Short(BigEndian::read_i16(&input)),
            StandardKind::Int => FieldValue::Int(BigEndian::read_i32(&input)),
            StandardKind::Long => FieldValue::Long(BigEndian::read_i64(&input)),
            StandardKind::Float => FieldValue::Float(BigEndian::read_f32(&input)),
            StandardKind::Double => FieldValue::Double(BigEndian::read_f64(&input)),
            StandardKind::ByteArray | StandardKind::FixedByteArray(_) => {
                FieldValue::ByteArray(input)
            }
            StandardKind::ShortArray => {
                FieldValue::ShortArray(read_elements(&input, 2, BigEndian::read_i16)?)
            }
            StandardKind::IntArray => {
                FieldValue::IntArray(read_elements(&input, 4, BigEndian::read_i32)?)
            }
            StandardKind::LongArray => {
                FieldValue::LongArray(read_elements(&input, 8, BigEndian::read_i64)?)
            }
            StandardKind::FloatArray => {
                FieldValue::FloatArray(read_elements(&input, 4, BigEndian::read_f32)?)
            }
            StandardKind::DoubleArray => {
                FieldValue::DoubleArray(read_elements(&input, 8, BigEndian::read_f64)?)
            }
            StandardKind::String => match std::str::from_utf8(&input) {
                Ok(value) => FieldValue::String(value.to_string()),
                Err(error) => {
                    return Err(CodecError::framing(
                        error.valid_up_to() as u64,
                        "string value is not valid UTF-8",
                    ))
                }
            },
            StandardKind::Date => FieldValue::Date(FudgeDate::from_bytes(fixed_array(&input))?),
            StandardKind::Time => FieldValue::Time(FudgeTime::from_bytes(fixed_array(&input))?),
            StandardKind::DateTime => {
                FieldValue::DateTime(FudgeDateTime::from_bytes(fixed_array(&input))?)
            }
        };
        Ok(value)
    }
}

fn read_elements<T>(input: &[u8], element: usize, read: fn(&[u8]) -> T) -> CodecResult<Vec<T>> {
    if input.len() % element != 0 {
        return Err(CodecError::framing(
            0,
            format!(
                "array of {} bytes is not a multiple of its {element} byte element",
                input.len()
            ),
        ));
    }
    Ok(input.chunks_exact(element).map(read).collect())
}

/// Caller guarantees `input.len() == N` via the fixed width check
fn fixed_array<const N: usize>(input: &[u8]) -> [u8; N] {
    let mut bytes = [0u8; N];
    bytes.copy_from_slice(&input[..N]);
    bytes
}

/// How a descriptor encodes and decodes its values
#[derive(Clone)]
pub enum FieldCodec {
    Standard(StandardKind),
    SubMessage,
    Custom(Arc<dyn ValueCodec>),
}

impl fmt::Debug for FieldCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldCodec::Standard(kind) => write!(f, "Standard({kind:?})"),
            FieldCodec::SubMessage => f.write_str("SubMessage"),
            FieldCodec::Custom(codec) => write!(f, "Custom({codec:?})"),
        }
    }
}

/// Descriptor of one wire type
#[derive(Debug, Clone)]
pub struct FieldType {
    id: u8,
    name: String,
    native: NativeType,
    width: Width,
    codec: FieldCodec,
}

impl FieldType {
    pub fn new(
        id: u8,
        name: impl Into<String>,
        native: NativeType,
        width: Width,
        codec: FieldCodec,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            native,
            width,
            codec,
        }
    }

    /// Descriptor for a caller-defined value kind
    pub fn custom(
        id: u8,
        name: impl Into<String>,
        native: NativeType,
        width: Width,
        codec: Arc<dyn ValueCodec>,
    ) -> Self {
        Self::new(id, name, native, width, FieldCodec::Custom(codec))
    }

    pub fn standard(id: StandardTypeId, name: &str, kind: StandardKind) -> Self {
        Self::new(id.id(), name, kind.native_type(), kind.width(), FieldCodec::Standard(kind))
    }

    pub fn sub_message() -> Self {
        Self::new(
            SUB_MESSAGE_TYPE_ID,
            "message",
            NativeType::of::<Message>(),
            Width::Variable,
            FieldCodec::SubMessage,
        )
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn native_type(&self) -> NativeType {
        self.native
    }

    pub fn width(&self) -> Width {
        self.width
    }

    pub fn codec(&self) -> &FieldCodec {
        &self.codec
    }

    pub fn is_fixed_width(&self) -> bool {
        self.width.is_fixed()
    }

    pub fn is_sub_message(&self) -> bool {
        matches!(self.codec, FieldCodec::SubMessage)
    }

    fn check_accepts(&self, value: &FieldValue) -> CodecResult<()> {
        match &self.codec {
            FieldCodec::Standard(kind) if !kind.accepts(value) => {
                Err(CodecError::type_mismatch(&self.name, value.kind_name()))
            }
            _ => Ok(()),
        }
    }

    /// Encoded size of `value`, excluding field headers
    pub fn variable_size(&self, value: &FieldValue) -> CodecResult<usize> {
        self.check_accepts(value)?;
        match (&self.codec, self.width) {
            (FieldCodec::SubMessage, _) => Err(self.sub_message_refusal("variable_size")),
            (_, Width::Fixed(width)) => Ok(width),
            (FieldCodec::Standard(kind), Width::Variable) => kind
                .variable_size(value)
                .ok_or_else(|| CodecError::type_mismatch(&self.name, value.kind_name())),
            (FieldCodec::Custom(codec), Width::Variable) => codec.variable_size(value),
        }
    }

    pub fn write_value(&self, output: &mut dyn Write, value: &FieldValue) -> CodecResult<()> {
        self.check_accepts(value)?;
        match &self.codec {
            FieldCodec::Standard(kind) => kind.write(output, value),
            FieldCodec::SubMessage => Err(self.sub_message_refusal("write_value")),
            FieldCodec::Custom(codec) => codec.write_value(output, value),
        }
    }

    /// Decode one value from exactly its encoded bytes
    pub fn read_value(&self, input: Bytes) -> CodecResult<FieldValue> {
        if let Width::Fixed(width) = self.width {
            if input.len() != width {
                return Err(CodecError::framing(
                    0,
                    format!(
                        "{} value must be {width} bytes, got {}",
                        self.name,
                        input.len()
                    ),
                ));
            }
        }
        match &self.codec {
            FieldCodec::Standard(kind) => kind.read(input),
            FieldCodec::SubMessage => Err(self.sub_message_refusal("read_value")),
            FieldCodec::Custom(codec) => codec.read_value(input),
        }
    }

    fn sub_message_refusal(&self, operation: &'static str) -> CodecError {
        CodecError::unsupported(
            operation,
            "sub-message fields are encoded and decoded by the stream layer",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(field_type: &FieldType, value: &FieldValue) -> Vec<u8> {
        let mut out = Vec::new();
        field_type.write_value(&mut out, value).unwrap();
        assert_eq!(out.len(), field_type.variable_size(value).unwrap());
        out
    }

    #[test]
    fn test_double_is_big_endian() {
        let double = FieldType::standard(StandardTypeId::Double, "double", StandardKind::Double);
        let bytes = encode(&double, &FieldValue::Double(101.5));
        assert_eq!(bytes, 101.5f64.to_be_bytes());
        assert_eq!(
            double.read_value(Bytes::from(bytes)).unwrap(),
            FieldValue::Double(101.5)
        );
    }

    #[test]
    fn test_arrays_round_trip() {
        let ints = FieldType::standard(StandardTypeId::IntArray, "int[]", StandardKind::IntArray);
        let value = FieldValue::IntArray(vec![1, -2, i32::MAX]);
        let bytes = encode(&ints, &value);
        assert_eq!(bytes.len(), 12);
        assert_eq!(ints.read_value(Bytes::from(bytes)).unwrap(), value);
    }

    #[test]
    fn test_ragged_array_is_framing_error() {
        let shorts =
            FieldType::standard(StandardTypeId::ShortArray, "short[]", StandardKind::ShortArray);
        assert!(matches!(
            shorts.read_value(Bytes::from_static(&[0, 1, 2])),
            Err(CodecError::Framing { .. })
        ));
    }

    #[test]
    fn test_fixed_width_enforced_on_read() {
        let int = FieldType::standard(StandardTypeId::Int, "int", StandardKind::Int);
        assert!(matches!(
            int.read_value(Bytes::from_static(&[0, 0, 1])),
            Err(CodecError::Framing { .. })
        ));
    }

    #[test]
    fn test_type_mismatch() {
        let int = FieldType::standard(StandardTypeId::Int, "int", StandardKind::Int);
        let error = int
            .write_value(&mut Vec::new(), &FieldValue::from("nope"))
            .unwrap_err();
        assert!(matches!(error, CodecError::TypeMismatch { .. }));
        assert!(error.to_string().contains("int cannot encode a string"));
    }

    #[test]
    fn test_fixed_byte_array_requires_exact_length() {
        let fixed = FieldType::standard(
            StandardTypeId::ByteArray4,
            "byte[4]",
            StandardKind::FixedByteArray(4),
        );
        assert_eq!(fixed.variable_size(&FieldValue::from(vec![1u8, 2, 3, 4])).unwrap(), 4);
        assert!(fixed.variable_size(&FieldValue::from(vec![1u8, 2])).is_err());
    }

    #[test]
    fn test_invalid_utf8_string() {
        let string = FieldType::standard(StandardTypeId::String, "string", StandardKind::String);
        assert!(matches!(
            string.read_value(Bytes::from_static(&[b'o', 0xFF])),
            Err(CodecError::Framing { offset: 1, .. })
        ));
    }

    #[test]
    fn test_sub_message_refuses_primitive_path() {
        let sub = FieldType::sub_message();
        let value = FieldValue::Message(Message::new());
        assert!(matches!(
            sub.write_value(&mut Vec::new(), &value),
            Err(CodecError::UnsupportedOperation { .. })
        ));
        assert!(matches!(
            sub.read_value(Bytes::new()),
            Err(CodecError::UnsupportedOperation { .. })
        ));
        assert!(matches!(
            sub.variable_size(&value),
            Err(CodecError::UnsupportedOperation { .. })
        ));
    }

    #[test]
    fn test_standard_kind_checks_its_own_width() {
        // Descriptor width disagrees with the kind; the kind still refuses
        let flag = FieldType::new(
            40,
            "flag",
            NativeType::of::<u128>(),
            Width::Variable,
            FieldCodec::Standard(StandardKind::Boolean),
        );
        assert!(matches!(
            flag.read_value(Bytes::new()),
            Err(CodecError::Framing { .. })
        ));
        assert!(matches!(
            flag.read_value(Bytes::from_static(&[1, 0])),
            Err(CodecError::Framing { .. })
        ));
        assert_eq!(
            flag.read_value(Bytes::from_static(&[1])).unwrap(),
            FieldValue::Boolean(true)
        );
    }

    #[test]
    fn test_date_value() {
        let date = FieldType::standard(StandardTypeId::Date, "date", StandardKind::Date);
        let value = FieldValue::Date(FudgeDate::new(2024, 3, 15).unwrap());
        let bytes = encode(&date, &value);
        assert_eq!(date.read_value(Bytes::from(bytes)).unwrap(), value);
    }
}
