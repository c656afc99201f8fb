use crate::scnp_error::prot_err;
use crate::{ScnpResult, Value};
use byteorder::{LittleEndian, ReadBytesExt};

pub(crate) const NULL_REPRESENTATION: i32 = 86_402;

const MINUTE_FACTOR: u32 = 60;
const HOUR_FACTOR: u32 = 3_600;

/// Wire representation of a TIME value: seconds since midnight, offset
/// by 1. The special value 0 reads as 00:00:00.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SecondTime(u32);

impl SecondTime {
    #[allow(clippy::cast_sign_loss)]
    pub(crate) fn new(raw: i32) -> Self {
        debug_assert!((0..NULL_REPRESENTATION).contains(&raw));
        Self(raw as u32)
    }

    pub(crate) fn raw(self) -> u32 {
        self.0
    }

    /// Builds a `SecondTime` from hour, minute and second.
    #[must_use]
    pub fn from_hms(hour: u32, minute: u32, second: u32) -> Self {
        Self(hour * HOUR_FACTOR + minute * MINUTE_FACTOR + second + 1)
    }

    /// (hour, minute, second).
    #[must_use]
    pub fn as_hms(self) -> (u32, u32, u32) {
        let mut total = self.0.saturating_sub(1);
        let hour = total / HOUR_FACTOR;
        total -= hour * HOUR_FACTOR;
        let minute = total / MINUTE_FACTOR;
        let second = total - minute * MINUTE_FACTOR;
        (hour, minute, second)
    }
}

impl std::fmt::Display for SecondTime {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let (hour, minute, second) = self.as_hms();
        write!(f, "{hour:02}:{minute:02}:{second:02}")
    }
}

pub(crate) fn parse_secondtime(
    nullable: bool,
    rdr: &mut dyn std::io::Read,
) -> ScnpResult<Value<'static>> {
    let i = rdr.read_i32::<LittleEndian>()?;
    if i == NULL_REPRESENTATION {
        if nullable {
            Ok(Value::Null)
        } else {
            Err(prot_err!("found NULL value for NOT NULL SECONDTIME column"))
        }
    } else {
        Ok(Value::SecondTime(SecondTime::new(i)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hms_roundtrip() {
        for (h, m, s) in [(0, 0, 0), (12, 34, 56), (23, 59, 59)] {
            assert_eq!(SecondTime::from_hms(h, m, s).as_hms(), (h, m, s));
        }
        assert!(SecondTime::from_hms(23, 59, 59).raw() < NULL_REPRESENTATION as u32);
    }
}
