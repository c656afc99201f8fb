use crate::scnp_error::prot_err;
use crate::types::julian;
use crate::{ScnpResult, Value};
use byteorder::{LittleEndian, ReadBytesExt};

pub(crate) const NULL_REPRESENTATION: i32 = 3_652_062;

/// Wire representation of a DATE value: days since 0001-01-01, offset by 1.
///
/// The special value 0 (HANA accepts the empty string as date input) reads
/// as 0001-01-01. The type is agnostic of timezones.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DayDate(i32);

impl DayDate {
    pub(crate) fn new(raw: i32) -> Self {
        debug_assert!((0..NULL_REPRESENTATION).contains(&raw));
        Self(raw)
    }

    pub(crate) fn raw(self) -> i32 {
        self.0
    }

    /// Builds a `DayDate` from a calendar date.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Self {
        Self(julian::days_from_ymd(year, month, day) as i32 + 1)
    }

    /// (year, month, day).
    #[must_use]
    pub fn as_ymd(self) -> (i32, u32, u32) {
        let days = match self.0 {
            0 => 0,
            v => i64::from(v) - 1,
        };
        julian::ymd_from_days(days)
    }

    /// Converts into a `time::Date`.
    pub fn to_date(self) -> ScnpResult<time::Date> {
        let (y, m, d) = self.as_ymd();
        time::Date::from_calendar_date(
            y,
            time::Month::try_from(m as u8)
                .map_err(|e| crate::ScnpError::InvalidArgument(e.to_string()))?,
            d as u8,
        )
        .map_err(|e| crate::ScnpError::InvalidArgument(e.to_string()))
    }

    /// Builds a `DayDate` from a `time::Date`.
    #[must_use]
    pub fn from_date(date: time::Date) -> Self {
        Self::from_ymd(date.year(), u32::from(u8::from(date.month())), u32::from(date.day()))
    }
}

impl std::fmt::Display for DayDate {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let (year, month, day) = self.as_ymd();
        write!(f, "{year:04}-{month:02}-{day:02}")
    }
}

pub(crate) fn parse_daydate(
    nullable: bool,
    rdr: &mut dyn std::io::Read,
) -> ScnpResult<Value<'static>> {
    let i = rdr.read_i32::<LittleEndian>()?;
    if i == NULL_REPRESENTATION {
        if nullable {
            Ok(Value::Null)
        } else {
            Err(prot_err!("found NULL value for NOT NULL DAYDATE column"))
        }
    } else {
        Ok(Value::DayDate(DayDate::new(i)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_offset_and_ymd_agree() {
        assert_eq!(DayDate::from_ymd(1, 1, 1).raw(), 1);
        assert_eq!(DayDate::from_ymd(1, 1, 1).as_ymd(), (1, 1, 1));
        let d = DayDate::from_ymd(2024, 2, 29);
        assert_eq!(d.as_ymd(), (2024, 2, 29));
        assert_eq!(format!("{d}"), "2024-02-29");
    }

    #[test]
    fn last_supported_day_is_below_the_null_sentinel() {
        let d = DayDate::from_ymd(9999, 12, 31);
        assert!(d.raw() < NULL_REPRESENTATION);
        assert_eq!(d.as_ymd(), (9999, 12, 31));
    }
}
