//! Error types for date/time value validation
//!
//! Every constructor in [`crate::temporal`] validates its components and reports
//! the offending component and its accepted range.

use thiserror::Error;

/// Errors raised when a value cannot be represented in its wire form
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// Calendar month outside 0-12 (0 means "unspecified")
    #[error("Month {month} is out of range [0, 12]")]
    MonthOutOfRange { month: u8 },

    /// Day of month outside 0-31 (0 means "unspecified")
    #[error("Day {day} is out of range [0, 31]")]
    DayOutOfRange { day: u8 },

    /// Year does not fit the 23-bit signed wire field
    #[error("Year {year} is out of range [{min}, {max}]")]
    YearOutOfRange { year: i32, min: i32, max: i32 },

    /// Time of day beyond 24 hours
    #[error("Time {nanos}ns since midnight exceeds one day")]
    TimeOutOfRange { nanos: u64 },

    /// Timezone offset outside -127..=127 quarter hours
    #[error("Timezone offset {offset} (15 minute units) is out of range [-127, 127]")]
    TimezoneOutOfRange { offset: i8 },

    /// Accuracy is too coarse for the value type
    #[error("Accuracy {accuracy} is not valid for {context}")]
    InvalidAccuracy {
        accuracy: &'static str,
        context: &'static str,
    },

    /// Encoded accuracy nibble does not name a known accuracy
    #[error("Unknown accuracy code {code}")]
    UnknownAccuracy { code: u8 },

    /// Value has no equivalent in the target representation
    #[error("Conversion failed: {0}")]
    Conversion(String),
}
