//! Meter-relative date arithmetic.
//!
//! The meter stores years as a byte offset from a reference year and billing
//! dates as a day count since January 1st of that year.

use chrono::NaiveDate;

/// Converts a calendar year to the meter's year byte.
pub fn to_meter_year(year: i32, reference_year: i32) -> Option<u8> {
    u8::try_from(year - reference_year).ok()
}

/// Converts the meter's year byte back to a calendar year.
pub fn from_meter_year(offset: u8, reference_year: i32) -> i32 {
    reference_year + i32::from(offset)
}

/// Days since January 1st of the reference year, if it fits a u16 and is not
/// the end-of-list marker.
pub fn days_since_reference(date: NaiveDate, reference_year: i32) -> Option<u16> {
    let epoch = NaiveDate::from_ymd_opt(reference_year, 1, 1)?;
    let days = (date - epoch).num_days();
    u16::try_from(days).ok().filter(|d| *d != u16::MAX)
}

/// Inverse of [`days_since_reference`].
pub fn date_from_reference_days(days: u16, reference_year: i32) -> Option<NaiveDate> {
    let epoch = NaiveDate::from_ymd_opt(reference_year, 1, 1)?;
    epoch.checked_add_signed(chrono::Duration::days(i64::from(days)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meter_year() {
        assert_eq!(to_meter_year(2026, 2000), Some(26));
        assert_eq!(to_meter_year(1999, 2000), None);
        assert_eq!(from_meter_year(26, 2000), 2026);
    }

    #[test]
    fn test_day_counts() {
        let d = NaiveDate::from_ymd_opt(2000, 1, 31).unwrap();
        assert_eq!(days_since_reference(d, 2000), Some(30));
        assert_eq!(date_from_reference_days(30, 2000), Some(d));

        let before = NaiveDate::from_ymd_opt(1999, 12, 31).unwrap();
        assert_eq!(days_since_reference(before, 2000), None);
    }
}
