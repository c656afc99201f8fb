use crate::scnp_error::prot_err;
use crate::types::julian;
use crate::{ScnpResult, Value};
use byteorder::{LittleEndian, ReadBytesExt};

pub(crate) const NULL_REPRESENTATION: i64 = 315_538_070_401;

const DAY_FACTOR: i64 = 86_400;
const HOUR_FACTOR: i64 = 3_600;
const MINUTE_FACTOR: i64 = 60;

/// Wire representation of a second-precision timestamp: seconds since
/// 0001-01-01 00:00:00, offset by 1. The special value 0 reads as
/// 0001-01-01 00:00:00.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SecondDate(i64);

impl SecondDate {
    pub(crate) fn new(raw: i64) -> Self {
        debug_assert!((0..NULL_REPRESENTATION).contains(&raw));
        Self(raw)
    }

    pub(crate) fn raw(self) -> i64 {
        self.0
    }

    /// Builds a `SecondDate` from date and time of day.
    #[must_use]
    pub fn from_ymd_hms(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Self {
        let days = julian::days_from_ymd(year, month, day);
        Self(
            days * DAY_FACTOR
                + i64::from(hour) * HOUR_FACTOR
                + i64::from(minute) * MINUTE_FACTOR
                + i64::from(second)
                + 1,
        )
    }

    /// (year, month, day, hour, minute, second).
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_sign_loss)]
    #[must_use]
    pub fn as_ymd_hms(self) -> (i32, u32, u32, u32, u32, u32) {
        let value = match self.0 {
            0 => 0,
            v => v - 1,
        };
        let days = value / DAY_FACTOR;
        let mut seconds = value - days * DAY_FACTOR;
        let hour = seconds / HOUR_FACTOR;
        seconds -= hour * HOUR_FACTOR;
        let minute = seconds / MINUTE_FACTOR;
        let second = seconds - minute * MINUTE_FACTOR;

        let (year, month, day) = julian::ymd_from_days(days);
        (year, month, day, hour as u32, minute as u32, second as u32)
    }
}

impl std::fmt::Display for SecondDate {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let (year, month, day, hour, minute, second) = self.as_ymd_hms();
        write!(f, "{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}")
    }
}

pub(crate) fn parse_seconddate(
    nullable: bool,
    rdr: &mut dyn std::io::Read,
) -> ScnpResult<Value<'static>> {
    let i = rdr.read_i64::<LittleEndian>()?;
    if i == NULL_REPRESENTATION {
        if nullable {
            Ok(Value::Null)
        } else {
            Err(prot_err!("found NULL value for NOT NULL SECONDDATE column"))
        }
    } else {
        Ok(Value::SecondDate(SecondDate::new(i)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ymd_hms_roundtrip() {
        let sd = SecondDate::from_ymd_hms(2026, 8, 1, 13, 14, 15);
        assert_eq!(sd.as_ymd_hms(), (2026, 8, 1, 13, 14, 15));
        assert_eq!(SecondDate::from_ymd_hms(1, 1, 1, 0, 0, 0).raw(), 1);
    }
}
