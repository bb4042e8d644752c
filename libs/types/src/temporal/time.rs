use std::fmt;

use super::DateTimeAccuracy;
use crate::ValueError;

const NANOS_PER_SECOND: u64 = 1_000_000_000;
const NANOS_PER_DAY: u64 = 86_400 * NANOS_PER_SECOND;
const NO_TIMEZONE: u8 = 0x80;

/// Time of day with an accuracy and an optional timezone offset
///
/// The offset is counted in 15 minute units, so `-20` is UTC-05:00.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FudgeTime {
    accuracy: DateTimeAccuracy,
    timezone_offset: Option<i8>,
    nanos: u64,
}

impl FudgeTime {
    /// Encoded width in bytes
    pub const SIZE: usize = 8;

    /// Time without a timezone offset
    pub fn new(accuracy: DateTimeAccuracy, nanos: u64) -> Result<Self, ValueError> {
        Self::build(accuracy, None, nanos)
    }

    /// Time with a timezone offset in 15 minute units
    pub fn with_timezone(
        accuracy: DateTimeAccuracy,
        timezone_offset: i8,
        nanos: u64,
    ) -> Result<Self, ValueError> {
        Self::build(accuracy, Some(timezone_offset), nanos)
    }

    fn build(
        accuracy: DateTimeAccuracy,
        timezone_offset: Option<i8>,
        nanos: u64,
    ) -> Result<Self, ValueError> {
        if !accuracy.is_time_accuracy() {
            return Err(ValueError::InvalidAccuracy {
                accuracy: accuracy.name(),
                context: "a time of day",
            });
        }
        if nanos >= NANOS_PER_DAY {
            return Err(ValueError::TimeOutOfRange { nanos });
        }
        if let Some(offset) = timezone_offset {
            // -128 collides with the "no timezone" marker
            if offset == i8::MIN {
                return Err(ValueError::TimezoneOutOfRange { offset });
            }
        }
        Ok(Self {
            accuracy,
            timezone_offset,
            nanos,
        })
    }

    pub fn accuracy(&self) -> DateTimeAccuracy {
        self.accuracy
    }

    pub fn timezone_offset(&self) -> Option<i8> {
        self.timezone_offset
    }

    /// Nanoseconds since midnight
    pub fn nanos(&self) -> u64 {
        self.nanos
    }

    pub fn seconds_since_midnight(&self) -> u32 {
        (self.nanos / NANOS_PER_SECOND) as u32
    }

    /// Pack into the 64-bit wire word
    pub fn to_bits(&self) -> u64 {
        let tz = self
            .timezone_offset
            .map(|offset| offset as u8)
            .unwrap_or(NO_TIMEZONE);
        let high = ((tz as u32) << 24)
            | ((self.accuracy.code() as u32) << 20)
            | self.seconds_since_midnight();
        let low = (self.nanos % NANOS_PER_SECOND) as u32;
        ((high as u64) << 32) | low as u64
    }

    /// Unpack the 64-bit wire word
    pub fn from_bits(bits: u64) -> Result<Self, ValueError> {
        let high = (bits >> 32) as u32;
        let fraction = bits & 0xFFFF_FFFF;
        let tz = (high >> 24) as u8;
        let accuracy = DateTimeAccuracy::from_code(((high >> 20) & 0x0F) as u8)?;
        let seconds = (high & 0x000F_FFFF) as u64;
        if fraction >= NANOS_PER_SECOND {
            return Err(ValueError::TimeOutOfRange {
                nanos: seconds * NANOS_PER_SECOND + fraction,
            });
        }
        let timezone_offset = (tz != NO_TIMEZONE).then_some(tz as i8);
        Self::build(
            accuracy,
            timezone_offset,
            seconds * NANOS_PER_SECOND + fraction,
        )
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        self.to_bits().to_be_bytes()
    }

    pub fn from_bytes(bytes: [u8; Self::SIZE]) -> Result<Self, ValueError> {
        Self::from_bits(u64::from_be_bytes(bytes))
    }
}

impl fmt::Display for FudgeTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fraction = self.nanos % NANOS_PER_SECOND;
        let total_seconds = self.nanos / NANOS_PER_SECOND;
        let hours = total_seconds / 3600;
        let minutes = (total_seconds / 60) % 60;
        let seconds = total_seconds % 60;

        write!(f, "{hours:02}")?;
        if self.accuracy < DateTimeAccuracy::Hour {
            write!(f, ":{minutes:02}")?;
            if self.accuracy < DateTimeAccuracy::Minute {
                write!(f, ":{seconds:02}")?;
                if self.accuracy < DateTimeAccuracy::Second {
                    write!(f, ".{fraction:09}")?;
                }
            }
        } else {
            f.write_str("h")?;
        }
        if let Some(offset) = self.timezone_offset {
            let minutes = offset as i32 * 15;
            let sign = if minutes < 0 { '-' } else { '+' };
            write!(f, " {sign}{}m", minutes.abs())?;
        }
        Ok(())
    }
}

#[cfg(feature = "chrono")]
impl From<chrono::NaiveTime> for FudgeTime {
    fn from(time: chrono::NaiveTime) -> Self {
        use chrono::Timelike;
        // Leap seconds report nanosecond() >= 1e9; clamp into the last second
        let fraction = (time.nanosecond() as u64).min(NANOS_PER_SECOND - 1);
        Self {
            accuracy: DateTimeAccuracy::Nanosecond,
            timezone_offset: None,
            nanos: time.num_seconds_from_midnight() as u64 * NANOS_PER_SECOND + fraction,
        }
    }
}

#[cfg(feature = "chrono")]
impl TryFrom<FudgeTime> for chrono::NaiveTime {
    type Error = ValueError;

    fn try_from(time: FudgeTime) -> Result<Self, Self::Error> {
        chrono::NaiveTime::from_num_seconds_from_midnight_opt(
            time.seconds_since_midnight(),
            (time.nanos % NANOS_PER_SECOND) as u32,
        )
        .ok_or_else(|| ValueError::Conversion(format!("{time} is not a time of day")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOON: u64 = 12 * 3600 * NANOS_PER_SECOND;

    #[test]
    fn test_time_bits_round_trip() {
        let time = FudgeTime::new(DateTimeAccuracy::Nanosecond, NOON + 123_456_789).unwrap();
        let decoded = FudgeTime::from_bits(time.to_bits()).unwrap();
        assert_eq!(decoded, time);
        assert_eq!(decoded.timezone_offset(), None);
    }

    #[test]
    fn test_timezone_round_trip() {
        let time = FudgeTime::with_timezone(DateTimeAccuracy::Second, -20, NOON).unwrap();
        let decoded = FudgeTime::from_bytes(time.to_bytes()).unwrap();
        assert_eq!(decoded.timezone_offset(), Some(-20));
        assert_eq!(decoded.accuracy(), DateTimeAccuracy::Second);
    }

    #[test]
    fn test_rejects_date_accuracy() {
        assert!(matches!(
            FudgeTime::new(DateTimeAccuracy::Day, 0),
            Err(ValueError::InvalidAccuracy { .. })
        ));
    }

    #[test]
    fn test_rejects_out_of_day_and_reserved_offset() {
        assert!(matches!(
            FudgeTime::new(DateTimeAccuracy::Second, NANOS_PER_DAY),
            Err(ValueError::TimeOutOfRange { .. })
        ));
        assert!(matches!(
            FudgeTime::with_timezone(DateTimeAccuracy::Second, i8::MIN, 0),
            Err(ValueError::TimezoneOutOfRange { .. })
        ));
    }

    #[test]
    fn test_display_by_accuracy() {
        let nanos = (13 * 3600 + 5 * 60 + 9) * NANOS_PER_SECOND + 42;
        let full = FudgeTime::new(DateTimeAccuracy::Nanosecond, nanos).unwrap();
        assert_eq!(full.to_string(), "13:05:09.000000042");

        let minute = FudgeTime::new(DateTimeAccuracy::Minute, nanos).unwrap();
        assert_eq!(minute.to_string(), "13:05");

        let hour = FudgeTime::with_timezone(DateTimeAccuracy::Hour, 4, nanos).unwrap();
        assert_eq!(hour.to_string(), "13h +60m");
    }

    #[cfg(feature = "chrono")]
    #[test]
    fn test_chrono_conversion() {
        let naive = chrono::NaiveTime::from_hms_nano_opt(9, 30, 15, 500).unwrap();
        let time = FudgeTime::from(naive);
        assert_eq!(time.accuracy(), DateTimeAccuracy::Nanosecond);
        assert_eq!(chrono::NaiveTime::try_from(time).unwrap(), naive);
    }
}
