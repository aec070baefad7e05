//! Custom (billing) schedules.
//!
//! A custom schedule file holds any number of named schedules. Each lists
//! explicit dates and optionally a monthly recurrence; expansion merges both
//! into a sorted, de-duplicated list of dates inside a window.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::schedule::ScheduleError;

/// Repeats on `day` of every `interval_months` month from `start`.
///
/// Days past the end of a short month fall on its last day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyRecurrence {
    pub start: NaiveDate,
    pub day: u32,
    #[serde(default = "default_interval")]
    pub interval_months: u32,
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

fn default_interval() -> u32 {
    1
}

impl MonthlyRecurrence {
    /// Occurrences from `start` up to the earlier of `end` and `until`.
    pub fn occurrences(&self, until: NaiveDate) -> Vec<NaiveDate> {
        let until = self.end.map_or(until, |end| end.min(until));
        let Some(first_month) = self.start.with_day(1) else {
            return Vec::new();
        };

        let mut dates = Vec::new();
        let mut step = 0u32;
        while let Some(month) = first_month.checked_add_months(Months::new(step * self.interval_months)) {
            let Some(date) = clamp_day(month, self.day) else {
                break;
            };
            if date > until {
                break;
            }
            if date >= self.start {
                dates.push(date);
            }
            step += 1;
        }
        dates
    }
}

/// `day` of the month starting at `month_start`, clamped to the month length.
fn clamp_day(month_start: NaiveDate, day: u32) -> Option<NaiveDate> {
    let next = month_start.checked_add_months(Months::new(1))?;
    let last = next.pred_opt()?.day();
    month_start.with_day(day.clamp(1, last))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomSchedule {
    pub name: String,
    #[serde(default)]
    pub dates: Vec<NaiveDate>,
    #[serde(default)]
    pub recurrence: Option<MonthlyRecurrence>,
}

impl CustomSchedule {
    /// Dates in `[from, until]`, sorted and de-duplicated.
    pub fn expand(&self, from: NaiveDate, until: NaiveDate) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self
            .dates
            .iter()
            .copied()
            .chain(self.recurrence.iter().flat_map(|r| r.occurrences(until)))
            .filter(|d| *d >= from && *d <= until)
            .collect();
        dates.sort_unstable();
        dates.dedup();
        dates
    }

    pub fn validate(&self) -> Result<(), ScheduleError> {
        if let Some(r) = &self.recurrence {
            if !(1..=31).contains(&r.day) || r.interval_months == 0 {
                return Err(ScheduleError::Invalid(format!(
                    "schedule {:?}: bad recurrence day {} / interval {}",
                    self.name, r.day, r.interval_months
                )));
            }
        }
        Ok(())
    }
}

/// Contents of a custom schedule file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomScheduleFile {
    pub schedules: Vec<CustomSchedule>,
}

impl CustomScheduleFile {
    pub fn find(&self, name: &str) -> Result<&CustomSchedule, ScheduleError> {
        self.schedules
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ScheduleError::UnknownSchedule(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_monthly_clamps_short_months() {
        let r = MonthlyRecurrence {
            start: date(2026, 1, 31),
            day: 31,
            interval_months: 1,
            end: None,
        };
        let dates = r.occurrences(date(2026, 4, 30));
        assert_eq!(
            dates,
            vec![date(2026, 1, 31), date(2026, 2, 28), date(2026, 3, 31), date(2026, 4, 30)]
        );
    }

    #[test]
    fn test_expand_merges_and_filters() {
        let schedule = CustomSchedule {
            name: "billing".into(),
            dates: vec![date(2026, 3, 1), date(2025, 12, 1), date(2026, 6, 15)],
            recurrence: Some(MonthlyRecurrence {
                start: date(2026, 1, 1),
                day: 1,
                interval_months: 2,
                end: Some(date(2026, 7, 1)),
            }),
        };
        let dates = schedule.expand(date(2026, 2, 1), date(2027, 1, 1));
        assert_eq!(
            dates,
            vec![date(2026, 3, 1), date(2026, 5, 1), date(2026, 6, 15), date(2026, 7, 1)]
        );
    }

    #[test]
    fn test_unknown_name() {
        let file = CustomScheduleFile::default();
        assert_eq!(
            file.find("missing"),
            Err(ScheduleError::UnknownSchedule("missing".into()))
        );
    }
}
