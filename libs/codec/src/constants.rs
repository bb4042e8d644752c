//! # Wire Constants - Fudge Encoding Layout
//!
//! ## Purpose
//!
//! Central definition of the bit layout and reserved values of the Fudge wire
//! format. These values are fixed by the published encoding and must stay
//! stable for compatibility with every other Fudge implementation.
//!
//! ## Field Layout
//!
//! ```text
//! ┌────────┬─────────┬───────────┬──────────────┬────────────┬─────────┐
//! │ prefix │ type id │ ordinal   │ name         │ size       │ value   │
//! │ 1 byte │ 1 or 2  │ i16 (opt) │ u8+utf8 (opt)│ 0/1/2/4    │ n bytes │
//! └────────┴─────────┴───────────┴──────────────┴────────────┴─────────┘
//!
//! prefix bits:  0x80 fixed width
//!               0x60 size width (00 none, 01 one, 10 two, 11 four bytes)
//!               0x10 ordinal present
//!               0x08 name present
//! ```
//!
//! ## Envelope Layout
//!
//! ```text
//! directives(u8) schema_version(u8) taxonomy_id(i16) total_size(u32) fields...
//! ```

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Prefix bit set when the field type has a fixed width
pub const FIXED_WIDTH_MASK: u8 = 0x80;
/// Prefix bits carrying the width of the size prefix
pub const SIZE_WIDTH_MASK: u8 = 0x60;
pub const SIZE_WIDTH_SHIFT: u8 = 5;
/// Prefix bit set when an ordinal follows the type id
pub const ORDINAL_PRESENT_MASK: u8 = 0x10;
/// Prefix bit set when a name follows the ordinal
pub const NAME_PRESENT_MASK: u8 = 0x08;

/// First type id that needs the two byte form
pub const EXTENDED_TYPE_ID_MARKER: u8 = 0x80;

/// Envelope header size in bytes, counted in the envelope's total size
pub const ENVELOPE_HEADER_SIZE: usize = 8;

/// Taxonomy id meaning "no taxonomy"
pub const NO_TAXONOMY: i16 = 0;

pub const MAX_NAME_LENGTH: usize = u8::MAX as usize;
/// Largest value a two byte size prefix may carry
pub const MAX_SHORT_SIZE: usize = i16::MAX as usize;
/// Largest value a four byte size prefix may carry
pub const MAX_VARIABLE_SIZE: usize = i32::MAX as usize;

pub const DEFAULT_MAX_NESTING_DEPTH: usize = 32;

/// Type ids registered by [`crate::TypeRegistry::new`]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
pub enum StandardTypeId {
    Indicator = 0,
    Boolean = 1,
    Byte = 2,
    Short = 3,
    Int = 4,
    Long = 5,
    ByteArray = 6,
    ShortArray = 7,
    IntArray = 8,
    LongArray = 9,
    Float = 10,
    Double = 11,
    FloatArray = 12,
    DoubleArray = 13,
    String = 14,
    SubMessage = 15,
    ByteArray4 = 17,
    ByteArray8 = 18,
    ByteArray16 = 19,
    ByteArray20 = 20,
    ByteArray32 = 21,
    ByteArray64 = 22,
    ByteArray128 = 23,
    ByteArray256 = 24,
    ByteArray512 = 25,
    Date = 26,
    Time = 27,
    DateTime = 28,
}

impl StandardTypeId {
    pub fn id(self) -> u8 {
        self.into()
    }
}

/// The sub-message type id; the only id whose values are driven by the stream layer
pub const SUB_MESSAGE_TYPE_ID: u8 = StandardTypeId::SubMessage as u8;

/// Fixed byte array types and their widths, narrowest first
pub const FIXED_BYTE_ARRAYS: [(StandardTypeId, usize); 9] = [
    (StandardTypeId::ByteArray4, 4),
    (StandardTypeId::ByteArray8, 8),
    (StandardTypeId::ByteArray16, 16),
    (StandardTypeId::ByteArray20, 20),
    (StandardTypeId::ByteArray32, 32),
    (StandardTypeId::ByteArray64, 64),
    (StandardTypeId::ByteArray128, 128),
    (StandardTypeId::ByteArray256, 256),
    (StandardTypeId::ByteArray512, 512),
];

/// Smallest size prefix width (0, 1, 2 or 4 bytes) able to carry `size`
pub fn size_prefix_width(size: usize) -> Option<usize> {
    match size {
        0 => Some(0),
        1..=0xFF => Some(1),
        0x100..=MAX_SHORT_SIZE => Some(2),
        _ if size <= MAX_VARIABLE_SIZE => Some(4),
        _ => None,
    }
}

/// Bytes the type id occupies on the wire
pub fn type_id_width(type_id: u8) -> usize {
    if type_id < EXTENDED_TYPE_ID_MARKER {
        1
    } else {
        2
    }
}

/// Decoded form of the field prefix byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPrefix {
    pub fixed_width: bool,
    pub size_width: usize,
    pub has_ordinal: bool,
    pub has_name: bool,
}

impl FieldPrefix {
    pub fn to_byte(self) -> u8 {
        let width_bits = match self.size_width {
            0 => 0,
            1 => 1,
            2 => 2,
            _ => 3,
        };
        let mut prefix = width_bits << SIZE_WIDTH_SHIFT;
        if self.fixed_width {
            prefix |= FIXED_WIDTH_MASK;
        }
        if self.has_ordinal {
            prefix |= ORDINAL_PRESENT_MASK;
        }
        if self.has_name {
            prefix |= NAME_PRESENT_MASK;
        }
        prefix
    }

    pub fn from_byte(prefix: u8) -> Self {
        let size_width = match (prefix & SIZE_WIDTH_MASK) >> SIZE_WIDTH_SHIFT {
            0 => 0,
            1 => 1,
            2 => 2,
            _ => 4,
        };
        Self {
            fixed_width: prefix & FIXED_WIDTH_MASK != 0,
            size_width,
            has_ordinal: prefix & ORDINAL_PRESENT_MASK != 0,
            has_name: prefix & NAME_PRESENT_MASK != 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_prefix_boundaries() {
        assert_eq!(size_prefix_width(0), Some(0));
        assert_eq!(size_prefix_width(255), Some(1));
        assert_eq!(size_prefix_width(256), Some(2));
        assert_eq!(size_prefix_width(32767), Some(2));
        assert_eq!(size_prefix_width(32768), Some(4));
        assert_eq!(size_prefix_width(MAX_VARIABLE_SIZE), Some(4));
        assert_eq!(size_prefix_width(MAX_VARIABLE_SIZE + 1), None);
    }

    #[test]
    fn test_prefix_bits() {
        let prefix = FieldPrefix {
            fixed_width: false,
            size_width: 2,
            has_ordinal: true,
            has_name: true,
        };
        assert_eq!(prefix.to_byte(), 0x40 | 0x10 | 0x08);
        assert_eq!(FieldPrefix::from_byte(prefix.to_byte()), prefix);

        let fixed = FieldPrefix::from_byte(0x80);
        assert!(fixed.fixed_width);
        assert_eq!(fixed.size_width, 0);
        assert_eq!(FieldPrefix::from_byte(0x60).size_width, 4);
    }

    #[test]
    fn test_standard_ids() {
        assert_eq!(StandardTypeId::try_from(15u8).unwrap(), StandardTypeId::SubMessage);
        assert_eq!(StandardTypeId::DateTime.id(), 28);
        // 16 is unassigned
        assert!(StandardTypeId::try_from(16u8).is_err());
        assert_eq!(type_id_width(127), 1);
        assert_eq!(type_id_width(128), 2);
    }
}
