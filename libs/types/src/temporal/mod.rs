//! # Temporal Values - Date and Time Field Payloads
//!
//! ## Purpose
//!
//! Pure data types carried by the date (26), time (27) and datetime (28) wire
//! types. Each value knows its packed big-endian wire form so the codec can
//! treat it as one more fixed-width field type without knowing calendar rules.
//!
//! ## Wire Forms
//!
//! ```text
//! date     (4 bytes)  : year(23, signed) | month(4) | day(5)
//! time     (8 bytes)  : tz(8) | accuracy(4) | seconds(20)   fraction_nanos(32)
//! datetime (12 bytes) : date(4) time(8)
//! ```
//!
//! A timezone byte of `0x80` means "no offset"; month and day of zero mean
//! "unspecified" (used by year or month accuracy dates).

mod date;
mod datetime;
mod time;

pub use date::FudgeDate;
pub use datetime::FudgeDateTime;
pub use time::FudgeTime;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::ValueError;

/// Resolution of a date or time value
///
/// Finer resolutions have smaller codes; a time value must be hour accuracy or
/// finer.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DateTimeAccuracy {
    Nanosecond = 0,
    Microsecond = 1,
    Millisecond = 2,
    Second = 3,
    Minute = 4,
    Hour = 5,
    Day = 6,
    Month = 7,
    Year = 8,
    Century = 9,
    Millennium = 10,
}

impl DateTimeAccuracy {
    /// Encoded nibble written to the wire
    pub fn code(self) -> u8 {
        self.into()
    }

    /// Decode the accuracy nibble
    pub fn from_code(code: u8) -> Result<Self, ValueError> {
        Self::try_from(code).map_err(|_| ValueError::UnknownAccuracy { code })
    }

    /// Whether this accuracy is meaningful for a time of day
    pub fn is_time_accuracy(self) -> bool {
        self <= DateTimeAccuracy::Hour
    }

    pub fn name(self) -> &'static str {
        match self {
            DateTimeAccuracy::Nanosecond => "nanosecond",
            DateTimeAccuracy::Microsecond => "microsecond",
            DateTimeAccuracy::Millisecond => "millisecond",
            DateTimeAccuracy::Second => "second",
            DateTimeAccuracy::Minute => "minute",
            DateTimeAccuracy::Hour => "hour",
            DateTimeAccuracy::Day => "day",
            DateTimeAccuracy::Month => "month",
            DateTimeAccuracy::Year => "year",
            DateTimeAccuracy::Century => "century",
            DateTimeAccuracy::Millennium => "millennium",
        }
    }
}
