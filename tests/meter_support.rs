// Shared fixtures for the integration tests: simulated meters and schedules.
#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use psem_rs::schedule::{
    CustomSchedule, CustomScheduleFile, DstDates, DstSchedule, MemoryScheduleSource,
    MonthlyRecurrence, Pattern, ScheduleYear, Season, Switchpoint, TouSchedule, YearEvent,
};
use psem_rs::{Device, DeviceType, MemoryTransport, MeterProfile, SessionConfig};

pub const TOU_PATH: &str = "tou.json";
pub const DST_PATH: &str = "dst.json";
pub const CUSTOM_PATH: &str = "custom.json";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn date_time(y: i32, m: u32, d: u32, hh: u32, mm: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(hh, mm, 0).unwrap()
}

/// A blank meter built from `profile`, opened with `schedules`.
pub fn open_meter(profile: MeterProfile, schedules: MemoryScheduleSource) -> Device<MemoryTransport> {
    let transport = profile.build().unwrap();
    Device::open(transport, SessionConfig::default(), Box::new(schedules)).unwrap()
}

/// Like [`open_meter`] with the journal cleared, so tests only see calls made
/// after the session was opened.
pub fn open_quiet(profile: MeterProfile, schedules: MemoryScheduleSource) -> Device<MemoryTransport> {
    let mut device = open_meter(profile, schedules);
    device.transport_mut().clear_journal();
    device
}

/// Winter/summer schedule with a weekday peak, an output interval from 08:00
/// to 17:00, and a Christmas holiday every year.
pub fn two_season_schedule(start_year: i32, duration: u32) -> TouSchedule {
    let years = (start_year..start_year + duration as i32)
        .map(|year| ScheduleYear {
            year,
            events: vec![
                YearEvent::season_start(date(year, 4, 1), 1),
                YearEvent::season_start(date(year, 10, 1), 0),
                YearEvent::holiday(date(year, 12, 25)),
            ],
        })
        .collect();

    TouSchedule {
        id: 42,
        name: "two season".into(),
        start_year,
        duration,
        supported_devices: vec![DeviceType::Basic],
        patterns: vec![
            Pattern {
                id: 1,
                name: "weekday".into(),
                switchpoints: vec![
                    Switchpoint::rate(0, 0),
                    Switchpoint::rate(1, 7 * 60),
                    Switchpoint::output(0, 8 * 60, 17 * 60),
                    Switchpoint::rate(0, 19 * 60),
                ],
            },
            Pattern {
                id: 2,
                name: "off peak".into(),
                switchpoints: vec![Switchpoint::rate(0, 0)],
            },
        ],
        seasons: vec![
            Season {
                name: "winter".into(),
                daytypes: vec![2, 1],
                holiday: Some(2),
                typical_week: [0, 1, 1, 1, 1, 1, 0],
            },
            Season {
                name: "summer".into(),
                daytypes: vec![2, 1],
                holiday: Some(2),
                typical_week: [0, 1, 1, 1, 1, 1, 0],
            },
        ],
        years,
    }
}

pub fn dst_schedule(years: std::ops::RangeInclusive<i32>) -> DstSchedule {
    DstSchedule {
        switch_time: 120,
        jump_minutes: 60,
        dates: years
            .map(|year| DstDates {
                from: date(year, 3, 10),
                to: date(year, 11, 3),
            })
            .collect(),
    }
}

pub fn custom_file(schedules: Vec<CustomSchedule>) -> CustomScheduleFile {
    CustomScheduleFile { schedules }
}

pub fn monthly(name: &str, start: NaiveDate) -> CustomSchedule {
    CustomSchedule {
        name: name.into(),
        dates: Vec::new(),
        recurrence: Some(MonthlyRecurrence {
            start,
            day: 1,
            interval_months: 1,
            end: None,
        }),
    }
}

pub fn explicit(name: &str, dates: Vec<NaiveDate>) -> CustomSchedule {
    CustomSchedule {
        name: name.into(),
        dates,
        recurrence: None,
    }
}
