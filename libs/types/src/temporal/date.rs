use std::fmt;

use crate::ValueError;

/// Calendar date with optional month/day precision
///
/// Month and day of zero mean "unspecified" so that year or month accuracy
/// dates survive a round trip unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FudgeDate {
    year: i32,
    month: u8,
    day: u8,
}

impl FudgeDate {
    /// Encoded width in bytes
    pub const SIZE: usize = 4;
    /// Smallest year the 23-bit signed field can carry
    pub const MIN_YEAR: i32 = -(1 << 22);
    /// Largest year the 23-bit signed field can carry
    pub const MAX_YEAR: i32 = (1 << 22) - 1;

    pub fn new(year: i32, month: u8, day: u8) -> Result<Self, ValueError> {
        if !(Self::MIN_YEAR..=Self::MAX_YEAR).contains(&year) {
            return Err(ValueError::YearOutOfRange {
                year,
                min: Self::MIN_YEAR,
                max: Self::MAX_YEAR,
            });
        }
        if month > 12 {
            return Err(ValueError::MonthOutOfRange { month });
        }
        if day > 31 {
            return Err(ValueError::DayOutOfRange { day });
        }
        Ok(Self { year, month, day })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Month 1-12, or 0 when unspecified
    pub fn month(&self) -> u8 {
        self.month
    }

    /// Day 1-31, or 0 when unspecified
    pub fn day(&self) -> u8 {
        self.day
    }

    /// Pack into the 32-bit wire word
    pub fn to_bits(&self) -> u32 {
        ((self.year as u32) << 9) | ((self.month as u32) << 5) | self.day as u32
    }

    /// Unpack the 32-bit wire word
    pub fn from_bits(bits: u32) -> Result<Self, ValueError> {
        // Arithmetic shift restores the year's sign
        let year = (bits as i32) >> 9;
        let month = ((bits >> 5) & 0x0F) as u8;
        let day = (bits & 0x1F) as u8;
        Self::new(year, month, day)
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        self.to_bits().to_be_bytes()
    }

    pub fn from_bytes(bytes: [u8; Self::SIZE]) -> Result<Self, ValueError> {
        Self::from_bits(u32::from_be_bytes(bytes))
    }
}

impl fmt::Display for FudgeDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.year)?;
        if self.month != 0 {
            write!(f, "-{:02}", self.month)?;
            if self.day != 0 {
                write!(f, "-{:02}", self.day)?;
            }
        }
        Ok(())
    }
}

#[cfg(feature = "chrono")]
impl From<chrono::NaiveDate> for FudgeDate {
    fn from(date: chrono::NaiveDate) -> Self {
        use chrono::Datelike;
        // chrono's year range (+/-262143) fits the 23-bit field
        Self {
            year: date.year(),
            month: date.month() as u8,
            day: date.day() as u8,
        }
    }
}

/// Unspecified month or day converts to the first of the period.
#[cfg(feature = "chrono")]
impl TryFrom<FudgeDate> for chrono::NaiveDate {
    type Error = ValueError;

    fn try_from(date: FudgeDate) -> Result<Self, Self::Error> {
        chrono::NaiveDate::from_ymd_opt(
            date.year,
            date.month.max(1) as u32,
            date.day.max(1) as u32,
        )
        .ok_or_else(|| ValueError::Conversion(format!("{date} is not a calendar date")))
    }
}
