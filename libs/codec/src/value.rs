//! # Field Values - Native Value Representation
//!
//! ## Purpose
//!
//! [`FieldValue`] is the closed set of native values a field can hold, plus an
//! escape hatch ([`CustomValue`]) for kinds registered by callers. The `From`
//! conversions and typed accessors on [`FieldValue`] are the conversion
//! interface that any object mapping layer above the codec implements against.
//!
//! ## Native Types
//!
//! The registry infers a wire type for an untyped value from its
//! [`NativeType`], a comparable handle on the Rust type behind the value.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use bytes::Bytes;
use types::{FudgeDate, FudgeDateTime, FudgeTime};

use crate::encoded::EncodedMessage;
use crate::message::Message;

/// Identity of the Rust type behind a value
#[derive(Clone, Copy)]
pub struct NativeType {
    id: TypeId,
    name: &'static str,
}

impl NativeType {
    pub fn of<T: Any + ?Sized>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for NativeType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for NativeType {}

impl Hash for NativeType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A value of a caller-registered kind
///
/// Implemented for every `Debug + PartialEq` type that is `Send + Sync + 'static`.
pub trait CustomValue: Any + Send + Sync + fmt::Debug {
    fn as_any(&self) -> &dyn Any;

    fn eq_value(&self, other: &dyn CustomValue) -> bool;

    fn native_type(&self) -> NativeType;
}

impl<T> CustomValue for T
where
    T: Any + Send + Sync + fmt::Debug + PartialEq,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_value(&self, other: &dyn CustomValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .map_or(false, |other| other == self)
    }

    fn native_type(&self) -> NativeType {
        NativeType::of::<T>()
    }
}

/// Native value carried by a field
#[derive(Debug, Clone)]
pub enum FieldValue {
    /// Presence-only marker with no payload
    Indicator,
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Bytes),
    ShortArray(Vec<i16>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
    FloatArray(Vec<f32>),
    DoubleArray(Vec<f64>),
    String(String),
    Date(FudgeDate),
    Time(FudgeTime),
    DateTime(FudgeDateTime),
    Message(Message),
    /// Sub-message kept in its encoded form
    Encoded(EncodedMessage),
    Custom(Arc<dyn CustomValue>),
}

impl FieldValue {
    /// Wrap a caller-registered value
    pub fn custom<T: CustomValue>(value: T) -> Self {
        FieldValue::Custom(Arc::new(value))
    }

    pub fn native_type(&self) -> NativeType {
        match self {
            FieldValue::Indicator => NativeType::of::<()>(),
            FieldValue::Boolean(_) => NativeType::of::<bool>(),
            FieldValue::Byte(_) => NativeType::of::<i8>(),
            FieldValue::Short(_) => NativeType::of::<i16>(),
            FieldValue::Int(_) => NativeType::of::<i32>(),
            FieldValue::Long(_) => NativeType::of::<i64>(),
            FieldValue::Float(_) => NativeType::of::<f32>(),
            FieldValue::Double(_) => NativeType::of::<f64>(),
            FieldValue::ByteArray(_) => NativeType::of::<Bytes>(),
            FieldValue::ShortArray(_) => NativeType::of::<Vec<i16>>(),
            FieldValue::IntArray(_) => NativeType::of::<Vec<i32>>(),
            FieldValue::LongArray(_) => NativeType::of::<Vec<i64>>(),
            FieldValue::FloatArray(_) => NativeType::of::<Vec<f32>>(),
            FieldValue::DoubleArray(_) => NativeType::of::<Vec<f64>>(),
            FieldValue::String(_) => NativeType::of::<String>(),
            FieldValue::Date(_) => NativeType::of::<FudgeDate>(),
            FieldValue::Time(_) => NativeType::of::<FudgeTime>(),
            FieldValue::DateTime(_) => NativeType::of::<FudgeDateTime>(),
            FieldValue::Message(_) => NativeType::of::<Message>(),
            FieldValue::Encoded(_) => NativeType::of::<EncodedMessage>(),
            FieldValue::Custom(value) => value.native_type(),
        }
    }

    /// Short name of the value's kind, used in diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldValue::Indicator => "indicator",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::Byte(_) => "byte",
            FieldValue::Short(_) => "short",
            FieldValue::Int(_) => "int",
            FieldValue::Long(_) => "long",
            FieldValue::Float(_) => "float",
            FieldValue::Double(_) => "double",
            FieldValue::ByteArray(_) => "byte[]",
            FieldValue::ShortArray(_) => "short[]",
            FieldValue::IntArray(_) => "int[]",
            FieldValue::LongArray(_) => "long[]",
            FieldValue::FloatArray(_) => "float[]",
            FieldValue::DoubleArray(_) => "double[]",
            FieldValue::String(_) => "string",
            FieldValue::Date(_) => "date",
            FieldValue::Time(_) => "time",
            FieldValue::DateTime(_) => "datetime",
            FieldValue::Message(_) => "message",
            FieldValue::Encoded(_) => "encoded message",
            FieldValue::Custom(value) => value.native_type().name(),
        }
    }

    pub fn is_sub_message(&self) -> bool {
        matches!(self, FieldValue::Message(_) | FieldValue::Encoded(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    /// Any integer kind, widened
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Byte(value) => Some(*value as i64),
            FieldValue::Short(value) => Some(*value as i64),
            FieldValue::Int(value) => Some(*value as i64),
            FieldValue::Long(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        self.as_i64().and_then(|value| i32::try_from(value).ok())
    }

    /// Any floating point kind, widened
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(value) => Some(*value as f64),
            FieldValue::Double(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            FieldValue::ByteArray(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&Message> {
        match self {
            FieldValue::Message(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_encoded(&self) -> Option<&EncodedMessage> {
        match self {
            FieldValue::Encoded(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<FudgeDate> {
        match self {
            FieldValue::Date(value) => Some(*value),
            FieldValue::DateTime(value) => Some(value.date()),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<FudgeTime> {
        match self {
            FieldValue::Time(value) => Some(*value),
            FieldValue::DateTime(value) => Some(value.time()),
            _ => None,
        }
    }

    pub fn as_custom<T: Any>(&self) -> Option<&T> {
        match self {
            FieldValue::Custom(value) => value.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }
}

/// Floats compare by bit pattern so that decoded NaNs equal their source.
impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        use FieldValue::*;
        match (self, other) {
            (Indicator, Indicator) => true,
            (Boolean(a), Boolean(b)) => a == b,
            (Byte(a), Byte(b)) => a == b,
            (Short(a), Short(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Long(a), Long(b)) => a == b,
            (Float(a), Float(b)) => a.to_bits() == b.to_bits(),
            (Double(a), Double(b)) => a.to_bits() == b.to_bits(),
            (ByteArray(a), ByteArray(b)) => a == b,
            (ShortArray(a), ShortArray(b)) => a == b,
            (IntArray(a), IntArray(b)) => a == b,
            (LongArray(a), LongArray(b)) => a == b,
            (FloatArray(a), FloatArray(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (DoubleArray(a), DoubleArray(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (String(a), String(b)) => a == b,
            (Date(a), Date(b)) => a == b,
            (Time(a), Time(b)) => a == b,
            (DateTime(a), DateTime(b)) => a == b,
            (Message(a), Message(b)) => a == b,
            (Encoded(a), Encoded(b)) => a == b,
            (Custom(a), Custom(b)) => a.eq_value(&**b),
            _ => false,
        }
    }
}

macro_rules! impl_from_value {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$source> for FieldValue {
                fn from(value: $source) -> Self {
                    FieldValue::$variant(value.into())
                }
            }
        )*
    };
}

impl_from_value! {
    bool => Boolean,
    i8 => Byte,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    Bytes => ByteArray,
    Vec<u8> => ByteArray,
    Vec<i16> => ShortArray,
    Vec<i32> => IntArray,
    Vec<i64> => LongArray,
    Vec<f32> => FloatArray,
    Vec<f64> => DoubleArray,
    String => String,
    &str => String,
    FudgeDate => Date,
    FudgeTime => Time,
    FudgeDateTime => DateTime,
    Message => Message,
    EncodedMessage => Encoded,
}

impl From<()> for FieldValue {
    fn from(_: ()) -> Self {
        FieldValue::Indicator
    }
}

impl From<&[u8]> for FieldValue {
    fn from(value: &[u8]) -> Self {
        FieldValue::ByteArray(Bytes::copy_from_slice(value))
    }
}
