use crate::scnp_error::prot_err;
use crate::types::julian;
use crate::{ScnpResult, Value};
use byteorder::{LittleEndian, ReadBytesExt};

pub(crate) const NULL_REPRESENTATION: i64 = 3_155_380_704_000_000_001;

const SECOND_FACTOR: i64 = 10_000_000;
const MINUTE_FACTOR: i64 = 600_000_000;
const HOUR_FACTOR: i64 = 36_000_000_000;
const DAY_FACTOR: i64 = 864_000_000_000;

/// Wire representation of a timestamp with 100ns precision: 100ns ticks
/// since 0001-01-01 00:00:00, offset by 1. The special value 0 reads as
/// 0001-01-01 00:00:00.000000000.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LongDate(i64);

impl LongDate {
    pub(crate) fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub(crate) fn raw(self) -> i64 {
        self.0
    }

    /// Builds a `LongDate` from date, time of day, and a sub-second
    /// fraction in 100ns units.
    #[must_use]
    pub fn from_ymd_hms_f(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
        fraction: u32,
    ) -> Self {
        let days = julian::days_from_ymd(year, month, day);
        Self(
            days * DAY_FACTOR
                + i64::from(hour) * HOUR_FACTOR
                + i64::from(minute) * MINUTE_FACTOR
                + i64::from(second) * SECOND_FACTOR
                + i64::from(fraction)
                + 1,
        )
    }

    /// (year, month, day, hour, minute, second, fraction-in-100ns).
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_sign_loss)]
    #[must_use]
    pub fn as_ymd_hms_f(self) -> (i32, u32, u32, u32, u32, u32, u32) {
        let value = match self.0 {
            0 => 0,
            v => v - 1,
        };
        let days = value / DAY_FACTOR;
        let mut ticks = value - days * DAY_FACTOR;
        let hour = ticks / HOUR_FACTOR;
        ticks -= hour * HOUR_FACTOR;
        let minute = ticks / MINUTE_FACTOR;
        ticks -= minute * MINUTE_FACTOR;
        let second = ticks / SECOND_FACTOR;
        let fraction = ticks - second * SECOND_FACTOR;

        let (year, month, day) = julian::ymd_from_days(days);
        (
            year,
            month,
            day,
            hour as u32,
            minute as u32,
            second as u32,
            fraction as u32,
        )
    }
}

impl std::fmt::Display for LongDate {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let (year, month, day, hour, minute, second, fraction) = self.as_ymd_hms_f();
        write!(
            f,
            "{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}.{fraction:07}"
        )
    }
}

pub(crate) fn parse_longdate(
    nullable: bool,
    rdr: &mut dyn std::io::Read,
) -> ScnpResult<Value<'static>> {
    let i = rdr.read_i64::<LittleEndian>()?;
    if i == NULL_REPRESENTATION {
        if nullable {
            Ok(Value::Null)
        } else {
            Err(prot_err!("found NULL value for NOT NULL LONGDATE column"))
        }
    } else {
        Ok(Value::LongDate(LongDate::new(i)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_arithmetic_roundtrip() {
        let ld = LongDate::from_ymd_hms_f(2026, 8, 1, 23, 59, 59, 9_999_999);
        assert_eq!(ld.as_ymd_hms_f(), (2026, 8, 1, 23, 59, 59, 9_999_999));
        assert_eq!(LongDate::from_ymd_hms_f(1, 1, 1, 0, 0, 0, 0).raw(), 1);
        assert!(
            LongDate::from_ymd_hms_f(9999, 12, 31, 23, 59, 59, 9_999_999).raw()
                < NULL_REPRESENTATION
        );
    }
}
