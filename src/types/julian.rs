// Julian-day arithmetic shared by the wire date/time types.
//
// The wire encodes dates as days since 0001-01-01 (proleptic, with the
// Julian/Gregorian switch in October 1582), offset by 1; the conversions
// below work on the unshifted day count.

// Julian day number of 0001-01-01.
const ZEITENWENDE: i64 = 1_721_424;
// First Julian day number of the Gregorian calendar (1582-10-15).
const JGREG: i64 = 2_299_161;
// Gregorian-start threshold for the (day + 31*(month + 12*year)) key.
const IGREG_KEY: i64 = 588_829;

// Days since 0001-01-01 for the given calendar date (0 for 0001-01-01).
// Years < 1 are interpreted as BC (there is no year zero).
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn days_from_ymd(year: i32, month: u32, day: u32) -> i64 {
    let y = i64::from(if year < 0 { year + 1 } else { year });
    let (jy, jm) = if month > 2 {
        (y, i64::from(month) + 1)
    } else {
        (y - 1, i64::from(month) + 13)
    };
    let mut julian = (365.25_f64 * jy as f64).floor() as i64
        + (30.6001_f64 * jm as f64).floor() as i64
        + i64::from(day)
        + 1_720_995;
    if i64::from(day) + 31 * (i64::from(month) + 12 * i64::from(year)) >= IGREG_KEY {
        let ja = (0.01_f64 * jy as f64).floor() as i64;
        julian += 2 - ja + (0.25_f64 * ja as f64).floor() as i64;
    }
    julian - ZEITENWENDE
}

// Inverse of days_from_ymd.
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_precision_loss)]
#[allow(clippy::cast_sign_loss)]
pub(crate) fn ymd_from_days(days: i64) -> (i32, u32, u32) {
    let julian: i64 = days + ZEITENWENDE;
    let ja: i64 = if julian >= JGREG {
        let jalpha: i64 = (((julian - 1_867_216) as f64 - 0.25_f64) / 36_524.25_f64) as i64;
        julian + 1 + jalpha - ((0.25_f64 * jalpha as f64) as i64)
    } else {
        julian
    };

    let jb: i64 = ja + 1524;
    let jc: i64 = (6680_f64 + ((jb - 2_439_870) as f64 - 122.1_f64) / 365.25_f64) as i64;
    let jd: i64 = ((365 * jc) as f64 + (0.25_f64 * jc as f64)) as i64;
    let je: i64 = ((jb - jd) as f64 / 30.6001) as i64;

    let day: u32 = (jb - jd - ((30.6001 * je as f64) as i64)) as u32;
    let mut month: u32 = je as u32 - 1;
    let mut year: i32 = jc as i32 - 4715;

    if month > 12 {
        month -= 12;
    }
    if month > 2 {
        year -= 1;
    }
    if year <= 0 {
        year -= 1;
    }
    (year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_is_year_one() {
        assert_eq!(days_from_ymd(1, 1, 1), 0);
        assert_eq!(ymd_from_days(0), (1, 1, 1));
    }

    #[test]
    fn gregorian_switch_is_seamless() {
        // 1582-10-04 (Julian) is directly followed by 1582-10-15 (Gregorian)
        let last_julian = days_from_ymd(1582, 10, 4);
        let first_gregorian = days_from_ymd(1582, 10, 15);
        assert_eq!(first_gregorian, last_julian + 1);
        assert_eq!(ymd_from_days(last_julian), (1582, 10, 4));
        assert_eq!(ymd_from_days(first_gregorian), (1582, 10, 15));
    }

    #[test]
    fn roundtrip_over_the_full_supported_range() {
        // Walk from 0001-01-01 to beyond 9999-12-31 in large steps plus
        // every day around the range borders and the calendar switch.
        let last = days_from_ymd(9999, 12, 31);
        let mut samples: Vec<i64> = (0..last).step_by(997).collect();
        samples.extend(0..400);
        samples.extend((last - 400)..=last);
        let switch = days_from_ymd(1582, 10, 4);
        samples.extend((switch - 5)..(switch + 5));
        for days in samples {
            let (y, m, d) = ymd_from_days(days);
            assert_eq!(
                days_from_ymd(y, m, d),
                days,
                "roundtrip failed for {y:04}-{m:02}-{d:02}"
            );
        }
    }

    #[test]
    fn known_dates() {
        // 1970-01-01 is Julian day 2440588
        assert_eq!(days_from_ymd(1970, 1, 1), 2_440_588 - 1_721_424);
        assert_eq!(ymd_from_days(2_440_588 - 1_721_424), (1970, 1, 1));
        assert_eq!(ymd_from_days(days_from_ymd(2000, 2, 29)), (2000, 2, 29));
        assert_eq!(ymd_from_days(days_from_ymd(2024, 12, 31)), (2024, 12, 31));
    }
}
