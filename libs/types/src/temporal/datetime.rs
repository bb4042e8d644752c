use std::fmt;

use super::{FudgeDate, FudgeTime};
use crate::ValueError;

/// A date and a time of day, encoded back to back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FudgeDateTime {
    date: FudgeDate,
    time: FudgeTime,
}

impl FudgeDateTime {
    /// Encoded width in bytes
    pub const SIZE: usize = FudgeDate::SIZE + FudgeTime::SIZE;

    pub fn new(date: FudgeDate, time: FudgeTime) -> Self {
        Self { date, time }
    }

    pub fn date(&self) -> FudgeDate {
        self.date
    }

    pub fn time(&self) -> FudgeTime {
        self.time
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[..FudgeDate::SIZE].copy_from_slice(&self.date.to_bytes());
        bytes[FudgeDate::SIZE..].copy_from_slice(&self.time.to_bytes());
        bytes
    }

    pub fn from_bytes(bytes: [u8; Self::SIZE]) -> Result<Self, ValueError> {
        let mut date = [0u8; FudgeDate::SIZE];
        let mut time = [0u8; FudgeTime::SIZE];
        date.copy_from_slice(&bytes[..FudgeDate::SIZE]);
        time.copy_from_slice(&bytes[FudgeDate::SIZE..]);
        Ok(Self {
            date: FudgeDate::from_bytes(date)?,
            time: FudgeTime::from_bytes(time)?,
        })
    }
}

impl fmt::Display for FudgeDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}T{}", self.date, self.time)
    }
}

#[cfg(feature = "chrono")]
impl From<chrono::NaiveDateTime> for FudgeDateTime {
    fn from(value: chrono::NaiveDateTime) -> Self {
        Self {
            date: FudgeDate::from(value.date()),
            time: FudgeTime::from(value.time()),
        }
    }
}

#[cfg(feature = "chrono")]
impl TryFrom<FudgeDateTime> for chrono::NaiveDateTime {
    type Error = ValueError;

    fn try_from(value: FudgeDateTime) -> Result<Self, Self::Error> {
        let date = chrono::NaiveDate::try_from(value.date)?;
        let time = chrono::NaiveTime::try_from(value.time)?;
        Ok(chrono::NaiveDateTime::new(date, time))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DateTimeAccuracy;

    #[test]
    fn test_datetime_bytes_round_trip() {
        let date = FudgeDate::new(2009, 11, 30).unwrap();
        let time = FudgeTime::with_timezone(DateTimeAccuracy::Millisecond, 0, 3_600_000_000_000)
            .unwrap();
        let value = FudgeDateTime::new(date, time);

        let bytes = value.to_bytes();
        assert_eq!(&bytes[..4], &date.to_bytes());
        assert_eq!(FudgeDateTime::from_bytes(bytes).unwrap(), value);
    }

    #[test]
    fn test_corrupt_time_half_is_rejected() {
        let mut bytes = FudgeDateTime::new(
            FudgeDate::new(2020, 1, 1).unwrap(),
            FudgeTime::new(DateTimeAccuracy::Second, 0).unwrap(),
        )
        .to_bytes();
        // Accuracy nibble 0xF is unassigned
        bytes[5] |= 0xF0;
        assert!(FudgeDateTime::from_bytes(bytes).is_err());
    }
}
