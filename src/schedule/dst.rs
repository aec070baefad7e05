//! DST schedule: one `from`/`to` date pair per year plus the switch time and
//! the size of the jump.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::schedule::ScheduleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DstDates {
    /// Clocks go forward on this date.
    pub from: NaiveDate,
    /// Clocks go back on this date.
    pub to: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DstSchedule {
    /// Local time of both switches, minutes since midnight.
    pub switch_time: u16,
    /// Jump length in minutes.
    pub jump_minutes: u8,
    pub dates: Vec<DstDates>,
}

impl DstSchedule {
    /// The entry whose `from` date falls in `year`.
    pub fn for_year(&self, year: i32) -> Option<&DstDates> {
        self.dates.iter().find(|d| d.from.year() == year)
    }

    pub fn switch_hour(&self) -> u8 {
        (self.switch_time / 60) as u8
    }

    pub fn switch_minute(&self) -> u8 {
        (self.switch_time % 60) as u8
    }

    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.switch_time >= 24 * 60 {
            return Err(ScheduleError::Invalid(format!(
                "DST switch time {} past end of day",
                self.switch_time
            )));
        }
        if self.jump_minutes == 0 {
            return Err(ScheduleError::Invalid("DST jump must be non-zero".into()));
        }
        if let Some(d) = self.dates.iter().find(|d| d.to <= d.from) {
            return Err(ScheduleError::Invalid(format!(
                "DST end {} not after start {}",
                d.to, d.from
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_lookup() {
        let schedule: DstSchedule = serde_json::from_str(
            r#"{"switch_time": 120, "jump_minutes": 60, "dates": [
                {"from": "2026-03-08", "to": "2026-11-01"},
                {"from": "2027-03-14", "to": "2027-11-07"}
            ]}"#,
        )
        .unwrap();
        assert!(schedule.validate().is_ok());
        assert_eq!(schedule.switch_hour(), 2);
        assert_eq!(
            schedule.for_year(2027).map(|d| d.to),
            NaiveDate::from_ymd_opt(2027, 11, 7)
        );
        assert!(schedule.for_year(2028).is_none());
    }
}
