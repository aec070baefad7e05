//! TOU schedule model.
//!
//! A schedule names a set of day patterns (lists of switchpoints), a set of
//! seasons that assign patterns to daytypes, and per-year event lists that
//! start seasons and mark holidays. It declares which device types may load
//! it and the range of years it covers.

use crate::constants::HOLIDAY_DAYTYPE;
use crate::schedule::ScheduleError;
use crate::tables::layout::DeviceType;
use crate::tables::tou::{MAX_OUTPUTS, MAX_RATES};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

const MINUTES_PER_DAY: u16 = 24 * 60;

/// Years a schedule may start in.
pub const SCHEDULE_YEARS: std::ops::RangeInclusive<i32> = 1900..=2999;

/// Longest schedule, in years.
pub const MAX_SCHEDULE_DURATION: u32 = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchpointKind {
    Rate,
    Output,
}

/// A time-of-day change of rate, or an interval during which an output is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Switchpoint {
    #[serde(rename = "type")]
    pub kind: SwitchpointKind,
    /// 0-based rate or output index
    pub index: u8,
    /// Minutes since midnight
    pub start: u16,
    /// Minutes since midnight; only meaningful for outputs
    #[serde(default)]
    pub stop: u16,
}

impl Switchpoint {
    pub fn rate(index: u8, start: u16) -> Self {
        Self {
            kind: SwitchpointKind::Rate,
            index,
            start,
            stop: 0,
        }
    }

    pub fn output(index: u8, start: u16, stop: u16) -> Self {
        Self {
            kind: SwitchpointKind::Output,
            index,
            start,
            stop,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    pub id: u16,
    #[serde(default)]
    pub name: String,
    pub switchpoints: Vec<Switchpoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    #[serde(default)]
    pub name: String,
    /// Pattern id for each normal daytype, daytype 0 first.
    pub daytypes: Vec<u16>,
    /// Pattern id for the holiday daytype.
    #[serde(default)]
    pub holiday: Option<u16>,
    /// Normal daytype index for each weekday, Sunday first.
    pub typical_week: [u8; 7],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum YearEventKind {
    /// Start of a season; the index is 0-based into the schedule's seasons.
    SeasonStart { season: usize },
    Holiday,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearEvent {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub kind: YearEventKind,
}

impl YearEvent {
    pub fn season_start(date: NaiveDate, season: usize) -> Self {
        Self {
            date,
            kind: YearEventKind::SeasonStart { season },
        }
    }

    pub fn holiday(date: NaiveDate) -> Self {
        Self {
            date,
            kind: YearEventKind::Holiday,
        }
    }

    pub fn season(&self) -> Option<usize> {
        match self.kind {
            YearEventKind::SeasonStart { season } => Some(season),
            YearEventKind::Holiday => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleYear {
    pub year: i32,
    /// Events in the order the schedule lists them.
    pub events: Vec<YearEvent>,
}

impl ScheduleYear {
    /// The last season start listed for this year.
    pub fn last_season_start(&self) -> Option<usize> {
        self.events.iter().rev().find_map(YearEvent::season)
    }

    /// Whether a season starts on January 1st.
    pub fn has_new_year_season_start(&self) -> bool {
        self.events
            .iter()
            .any(|e| e.season().is_some() && e.date.month() == 1 && e.date.day() == 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TouSchedule {
    /// Written to the device as the TOU id; must be non-zero.
    pub id: u16,
    #[serde(default)]
    pub name: String,
    pub start_year: i32,
    /// Number of years covered, starting at `start_year`.
    pub duration: u32,
    pub supported_devices: Vec<DeviceType>,
    pub patterns: Vec<Pattern>,
    pub seasons: Vec<Season>,
    pub years: Vec<ScheduleYear>,
}

impl TouSchedule {
    /// Last year the schedule covers.
    pub fn end_year(&self) -> i32 {
        let duration = i32::try_from(self.duration).unwrap_or(i32::MAX);
        self.start_year.saturating_add(duration).saturating_sub(1)
    }

    pub fn is_expired(&self, current_year: i32) -> bool {
        self.end_year() < current_year
    }

    /// Whether a device of `device_type` may load this schedule.
    pub fn supports(&self, device_type: DeviceType) -> bool {
        self.supported_devices
            .iter()
            .any(|&declared| device_type.accepts(declared))
    }

    pub fn pattern(&self, id: u16) -> Option<&Pattern> {
        self.patterns.iter().find(|p| p.id == id)
    }

    pub fn year(&self, year: i32) -> Option<&ScheduleYear> {
        self.years.iter().find(|y| y.year == year)
    }

    /// Index of `year` in the schedule's year list.
    pub fn year_index(&self, year: i32) -> Option<usize> {
        self.years.iter().position(|y| y.year == year)
    }

    /// Checks internal consistency: non-zero id, known pattern references,
    /// switchpoint ranges, daytype indices and event dates.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.id == 0 {
            return Err(ScheduleError::Invalid("TOU id must be non-zero".into()));
        }
        if self.duration == 0 || self.duration > MAX_SCHEDULE_DURATION {
            return Err(ScheduleError::Invalid(format!(
                "duration {} outside 1-{MAX_SCHEDULE_DURATION} years",
                self.duration
            )));
        }
        if !SCHEDULE_YEARS.contains(&self.start_year) {
            return Err(ScheduleError::Invalid(format!(
                "start year {} outside {}-{}",
                self.start_year,
                SCHEDULE_YEARS.start(),
                SCHEDULE_YEARS.end()
            )));
        }

        for pattern in &self.patterns {
            for sp in &pattern.switchpoints {
                validate_switchpoint(pattern.id, sp)?;
            }
        }

        for (i, season) in self.seasons.iter().enumerate() {
            if season.daytypes.is_empty() || season.daytypes.len() > usize::from(HOLIDAY_DAYTYPE) {
                return Err(ScheduleError::Invalid(format!(
                    "season {i} has {} normal daytypes, expected 1-{HOLIDAY_DAYTYPE}",
                    season.daytypes.len()
                )));
            }
            for id in season.daytypes.iter().chain(season.holiday.iter()) {
                if self.pattern(*id).is_none() {
                    return Err(ScheduleError::Invalid(format!(
                        "season {i} references unknown pattern {id}"
                    )));
                }
            }
            if let Some(day) = season
                .typical_week
                .iter()
                .find(|&&d| usize::from(d) >= season.daytypes.len())
            {
                return Err(ScheduleError::Invalid(format!(
                    "season {i} typical week uses undefined daytype {day}"
                )));
            }
        }

        for year in &self.years {
            for event in &year.events {
                if event.date.year() != year.year {
                    return Err(ScheduleError::Invalid(format!(
                        "event on {} listed under year {}",
                        event.date, year.year
                    )));
                }
                if let Some(season) = event.season() {
                    if season >= self.seasons.len() {
                        return Err(ScheduleError::Invalid(format!(
                            "event on {} starts unknown season {season}",
                            event.date
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

fn validate_switchpoint(pattern: u16, sp: &Switchpoint) -> Result<(), ScheduleError> {
    let invalid = |what: String| Err(ScheduleError::Invalid(format!("pattern {pattern}: {what}")));

    if sp.start >= MINUTES_PER_DAY {
        return invalid(format!("start {} past end of day", sp.start));
    }
    match sp.kind {
        SwitchpointKind::Rate if sp.index >= MAX_RATES => invalid(format!("rate {} out of range", sp.index)),
        SwitchpointKind::Output if sp.index >= MAX_OUTPUTS => {
            invalid(format!("output {} out of range", sp.index))
        }
        SwitchpointKind::Output if sp.stop <= sp.start || sp.stop > MINUTES_PER_DAY => {
            invalid(format!("output {} stop {} not after start {}", sp.index, sp.stop, sp.start))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn schedule() -> TouSchedule {
        TouSchedule {
            id: 7,
            name: "test".into(),
            start_year: 2010,
            duration: 5,
            supported_devices: vec![DeviceType::Basic],
            patterns: vec![Pattern {
                id: 1,
                name: "flat".into(),
                switchpoints: vec![Switchpoint::rate(0, 0)],
            }],
            seasons: vec![Season {
                name: "all".into(),
                daytypes: vec![1],
                holiday: None,
                typical_week: [0; 7],
            }],
            years: vec![ScheduleYear {
                year: 2010,
                events: vec![YearEvent::season_start(date(2010, 3, 1), 0)],
            }],
        }
    }

    #[test]
    fn test_expiry() {
        let s = schedule();
        assert_eq!(s.end_year(), 2014);
        assert!(!s.is_expired(2014));
        assert!(s.is_expired(2020));
    }

    #[test]
    fn test_extreme_years() {
        let mut s = schedule();
        s.start_year = i32::MAX;
        assert_eq!(s.end_year(), i32::MAX - 1);
        assert!(matches!(s.validate(), Err(ScheduleError::Invalid(_))));

        let mut s = schedule();
        s.duration = u32::MAX;
        assert_eq!(s.end_year(), i32::MAX - 1);
        assert!(s.validate().is_err());

        s.duration = MAX_SCHEDULE_DURATION;
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_device_support() {
        let mut s = schedule();
        assert!(s.supports(DeviceType::Advanced));
        assert!(s.supports(DeviceType::Basic));
        s.supported_devices = vec![DeviceType::Advanced];
        assert!(!s.supports(DeviceType::Basic));
    }

    #[test]
    fn test_validate_rejects_bad_references() {
        assert!(schedule().validate().is_ok());

        let mut s = schedule();
        s.seasons[0].daytypes = vec![9];
        assert!(matches!(s.validate(), Err(ScheduleError::Invalid(_))));

        let mut s = schedule();
        s.patterns[0].switchpoints.push(Switchpoint::output(0, 600, 500));
        assert!(s.validate().is_err());

        let mut s = schedule();
        s.years[0].events.push(YearEvent::holiday(date(2011, 1, 1)));
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_json_shape() {
        let json = r#"{
            "id": 3, "start_year": 2026, "duration": 2,
            "supported_devices": ["BASIC"],
            "patterns": [{"id": 1, "switchpoints": [
                {"type": "rate", "index": 0, "start": 0},
                {"type": "output", "index": 1, "start": 480, "stop": 1020}
            ]}],
            "seasons": [{"daytypes": [1], "typical_week": [0,0,0,0,0,0,0]}],
            "years": [{"year": 2026, "events": [
                {"date": "2026-01-01", "type": "season_start", "season": 0},
                {"date": "2026-12-25", "type": "holiday"}
            ]}]
        }"#;
        let s: TouSchedule = serde_json::from_str(json).unwrap();
        assert!(s.validate().is_ok());
        assert!(s.years[0].has_new_year_season_start());
        assert_eq!(s.patterns[0].switchpoints[1], Switchpoint::output(1, 480, 1020));
    }
}
