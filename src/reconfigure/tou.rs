//! # TOU / Calendar Reconfiguration
//!
//! Translates a TOU schedule (and optional DST schedule) into the device's
//! TOU and calendar sub-blocks and commits both in one open/write/close
//! sequence.
//!
//! Preflight order: clock running, device configured for TOU, DST data
//! present when the device applies DST, schedule files readable, schedule
//! declared for this device type, schedule not expired.
//!
//! The builders are pure functions over the parsed schedule so they can be
//! exercised without a device.

use crate::constants::{CALENDAR_DST_SLOTS, CALENDAR_EVENTS_PER_YEAR, HOLIDAY_DAYTYPE, MFG_TABLE_CONFIG};
use crate::psem::procedure::{commit, CommitResult, DataResetFlags, TableWrite};
use crate::psem::transport::Transport;
use crate::reconfigure::result::TouReconfigResult;
use crate::schedule::{DstSchedule, Pattern, ScheduleSource, SwitchpointKind, TouSchedule, YearEventKind};
use crate::tables::calendar::{CalendarConfig, CalendarEvent, CalendarEventType, CalendarYear, MAX_SEASON_NUMBER};
use crate::tables::header::ConfigHeader;
use crate::tables::layout::{DeviceType, MeterLayout};
use crate::tables::tou::{typical_week, DayEvent, TouConfig, TouEvent};
use crate::util::dates::to_meter_year;
use chrono::{Datelike, NaiveDate};
use log::{debug, info, warn};
use thiserror::Error;

/// Why a schedule cannot be expressed in the device's blocks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("schedule not supported: {0}")]
    NotSupported(String),

    #[error("no DST dates for {0}")]
    DstDataMissing(i32),
}

impl From<BuildError> for TouReconfigResult {
    fn from(err: BuildError) -> Self {
        match err {
            BuildError::NotSupported(_) => TouReconfigResult::ScheduleNotSupported,
            BuildError::DstDataMissing(_) => TouReconfigResult::DstDataMissing,
        }
    }
}

fn calendar_date(date: NaiveDate) -> (u8, u8) {
    (date.month0() as u8, date.day0() as u8)
}

/// Day events for one pattern.
///
/// A rate switchpoint yields one event. An output switchpoint yields an on
/// event at its start and an off event at its stop; the list is then
/// re-sorted by time since outputs may overlap.
pub fn pattern_day_events(pattern: &Pattern, capacity: usize) -> Result<Vec<DayEvent>, BuildError> {
    let mut events = Vec::with_capacity(pattern.switchpoints.len());
    let mut has_output = false;

    for sp in &pattern.switchpoints {
        match sp.kind {
            SwitchpointKind::Rate => events.push(DayEvent::at_minutes(TouEvent::Rate(sp.index), sp.start)),
            SwitchpointKind::Output => {
                events.push(DayEvent::at_minutes(TouEvent::OutputOn(sp.index), sp.start));
                events.push(DayEvent::at_minutes(TouEvent::OutputOff(sp.index), sp.stop));
                has_output = true;
            }
        }
    }

    if has_output {
        events.sort_by_key(DayEvent::minutes_since_midnight);
    }

    if events.len() > capacity {
        return Err(BuildError::NotSupported(format!(
            "pattern {} needs {} day events, device holds {}",
            pattern.id,
            events.len(),
            capacity
        )));
    }
    Ok(events)
}

/// Builds the TOU block: one device season per schedule season.
pub fn build_tou_config(schedule: &TouSchedule, layout: &MeterLayout) -> Result<TouConfig, BuildError> {
    if schedule.seasons.len() > layout.seasons {
        return Err(BuildError::NotSupported(format!(
            "{} seasons, device holds {}",
            schedule.seasons.len(),
            layout.seasons
        )));
    }

    let mut tou = TouConfig::cleared(layout);
    tou.tou_id = schedule.id;

    for (season, target) in schedule.seasons.iter().zip(tou.seasons.iter_mut()) {
        target.is_programmed = true;
        target.daytypes = typical_week(season.typical_week, HOLIDAY_DAYTYPE);

        let assignments = season
            .daytypes
            .iter()
            .enumerate()
            .map(|(daytype, &id)| (daytype, id))
            .chain(season.holiday.map(|id| (usize::from(HOLIDAY_DAYTYPE), id)));

        for (daytype, pattern_id) in assignments {
            let pattern = schedule.pattern(pattern_id).ok_or_else(|| {
                BuildError::NotSupported(format!("unknown pattern {pattern_id}"))
            })?;
            let events = pattern_day_events(pattern, layout.day_events)?;
            let slots = target.day_events.get_mut(daytype).ok_or_else(|| {
                BuildError::NotSupported(format!("daytype {daytype} out of range"))
            })?;
            slots[..events.len()].copy_from_slice(&events);
        }
    }
    Ok(tou)
}

fn season_event(season: usize, layout: &MeterLayout) -> Result<CalendarEventType, BuildError> {
    let number = season + 1;
    if number > layout.seasons || number > usize::from(MAX_SEASON_NUMBER) {
        return Err(BuildError::NotSupported(format!("season {number} beyond device capacity")));
    }
    Ok(CalendarEventType::Season(number as u8))
}

/// Season in effect on January 1st of `year`: the last season started in
/// the latest earlier schedule year that starts one, or `year`'s own last
/// season start when no earlier year does.
pub fn season_at_new_year(schedule: &TouSchedule, year: i32) -> Option<usize> {
    let mut earlier: Vec<_> = schedule.years.iter().filter(|y| y.year < year).collect();
    earlier.sort_by_key(|y| std::cmp::Reverse(y.year));
    earlier
        .into_iter()
        .find_map(|y| y.last_season_start())
        .or_else(|| schedule.year(year).and_then(|y| y.last_season_start()))
}

/// Inputs to [`build_calendar_config`] taken from the device.
#[derive(Debug, Clone, Copy)]
pub struct CalendarTarget<'a> {
    pub layout: &'a MeterLayout,
    /// Year records the device holds.
    pub years: usize,
    pub current_year: i32,
    pub reference_year: i32,
    /// Control flags to keep from the current device calendar.
    pub control: u8,
}

/// A built calendar and whether the schedule ran past the device's years.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltCalendar {
    pub calendar: CalendarConfig,
    pub truncated: bool,
}

/// Builds the calendar block for the years starting at the current year.
///
/// With `dst` supplied, each year opens with its add/subtract DST pair.
/// Season starts and holidays follow in schedule order. The first year gets
/// a January 1st season start when it has none.
pub fn build_calendar_config(
    schedule: &TouSchedule,
    dst: Option<&DstSchedule>,
    target: &CalendarTarget<'_>,
) -> Result<BuiltCalendar, BuildError> {
    let mut calendar = CalendarConfig::cleared(target.years);
    calendar.calendar_id = schedule.id;
    calendar.control = target.control;
    if let Some(dst) = dst {
        calendar.dst_hour = dst.switch_hour();
        calendar.dst_minute = dst.switch_minute();
        calendar.dst_offset_minutes = dst.jump_minutes;
    }

    let first_year = target.current_year.max(schedule.start_year);
    let last_year = schedule.end_year();
    let years = i32::try_from(target.years).unwrap_or(i32::MAX);
    let capacity_end = first_year.saturating_add(years).saturating_sub(1);

    for (slot, year) in (first_year..=last_year.min(capacity_end)).enumerate() {
        let mut events = Vec::with_capacity(CALENDAR_EVENTS_PER_YEAR);

        if let Some(dst) = dst {
            let dates = dst.for_year(year).ok_or(BuildError::DstDataMissing(year))?;
            let (month, day) = calendar_date(dates.from);
            events.push(CalendarEvent::new(CalendarEventType::AddDst, month, day));
            let (month, day) = calendar_date(dates.to);
            events.push(CalendarEvent::new(CalendarEventType::SubDst, month, day));
        }
        let dst_slots = if dst.is_some() { CALENDAR_DST_SLOTS } else { 0 };

        let schedule_year = schedule.year(year);
        for event in schedule_year.iter().flat_map(|y| y.events.iter()) {
            let event_type = match event.kind {
                YearEventKind::SeasonStart { season } => season_event(season, target.layout)?,
                YearEventKind::Holiday => CalendarEventType::Holiday,
            };
            let (month, day) = calendar_date(event.date);
            events.push(CalendarEvent::new(event_type, month, day));
        }

        if slot == 0 && !schedule_year.map_or(false, |y| y.has_new_year_season_start()) {
            let season = season_at_new_year(schedule, year).ok_or_else(|| {
                BuildError::NotSupported(format!("no season in effect on January 1st {year}"))
            })?;
            debug!("Inserting January 1st start of season {} for {}", season + 1, year);
            events.insert(dst_slots, CalendarEvent::new(season_event(season, target.layout)?, 0, 0));
        }

        if events.len() > CALENDAR_EVENTS_PER_YEAR {
            return Err(BuildError::NotSupported(format!(
                "{} calendar events in {}, device holds {}",
                events.len(),
                year,
                CALENDAR_EVENTS_PER_YEAR
            )));
        }

        let year_byte = to_meter_year(year, target.reference_year)
            .ok_or_else(|| BuildError::NotSupported(format!("year {year} outside device range")))?;
        let mut record = CalendarYear::empty(year_byte);
        record.events[..events.len()].copy_from_slice(&events);
        calendar.years[slot] = record;
    }

    Ok(BuiltCalendar {
        calendar,
        truncated: last_year > capacity_end,
    })
}

/// Device state consulted by [`reconfigure_tou`].
#[derive(Debug, Clone, Copy)]
pub struct TouDeviceState<'a> {
    pub layout: &'static MeterLayout,
    pub header: &'a ConfigHeader,
    pub device_type: DeviceType,
    pub clock_running: bool,
    pub current_year: i32,
    pub reference_year: i32,
    pub tou: &'a TouConfig,
    pub calendar: &'a CalendarConfig,
}

/// Validates, builds and commits a TOU schedule.
pub fn reconfigure_tou(
    transport: &mut dyn Transport,
    schedules: &dyn ScheduleSource,
    device: &TouDeviceState<'_>,
    tou_file: &str,
    dst_file: Option<&str>,
) -> TouReconfigResult {
    if !device.clock_running {
        warn!("TOU reconfiguration refused: device clock not running");
        return TouReconfigResult::ClockNotRunning;
    }
    if !device.tou.is_configured() {
        info!("Device not configured for TOU; nothing written");
        return TouReconfigResult::SuccessNotConfiguredForTou;
    }

    let dst_required = device.calendar.dst_enabled();
    let dst = match (dst_required, dst_file) {
        (true, None) => {
            warn!("Device applies DST but no DST file was supplied");
            return TouReconfigResult::DstDataMissing;
        }
        (true, Some(path)) => match schedules.dst_schedule(path) {
            Ok(dst) => Some(dst),
            Err(e) => {
                warn!("DST schedule {} rejected: {}", path, e);
                return TouReconfigResult::ScheduleNotValid;
            }
        },
        (false, _) => None,
    };

    let schedule = match schedules.tou_schedule(tou_file) {
        Ok(schedule) => schedule,
        Err(e) => {
            warn!("TOU schedule {} rejected: {}", tou_file, e);
            return TouReconfigResult::ScheduleNotValid;
        }
    };

    if !schedule.supports(device.device_type) {
        warn!(
            "TOU schedule {} not declared for {:?} devices",
            schedule.id, device.device_type
        );
        return TouReconfigResult::ScheduleNotSupported;
    }
    if schedule.is_expired(device.current_year) {
        warn!(
            "TOU schedule {} ended in {}, current year is {}",
            schedule.id,
            schedule.end_year(),
            device.current_year
        );
        return TouReconfigResult::ScheduleExpired;
    }

    let target = CalendarTarget {
        layout: device.layout,
        years: usize::from(device.header.calendar_years),
        current_year: device.current_year,
        reference_year: device.reference_year,
        control: device.calendar.control,
    };
    let built = build_tou_config(&schedule, device.layout)
        .and_then(|tou| build_calendar_config(&schedule, dst.as_ref(), &target).map(|cal| (tou, cal)));
    let (tou, built) = match built {
        Ok(blocks) => blocks,
        Err(e) => {
            warn!("TOU schedule {} cannot be built: {}", schedule.id, e);
            return e.into();
        }
    };

    let writes = vec![
        TableWrite::at(MFG_TABLE_CONFIG, device.header.calendar, built.calendar.encode(), "calendar"),
        TableWrite::at(MFG_TABLE_CONFIG, device.header.tou, tou.encode(), "TOU"),
    ];

    match commit(transport, writes, DataResetFlags::empty()) {
        CommitResult::Success if dst_file.is_some() && !dst_required => TouReconfigResult::SuccessDstNotApplicable,
        CommitResult::Success if built.truncated => TouReconfigResult::SuccessScheduleTruncated,
        other => TouReconfigResult::from_commit(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{ScheduleYear, Season, Switchpoint, YearEvent};
    use crate::tables::layout::SINGLE_PHASE_LAYOUT;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn schedule() -> TouSchedule {
        TouSchedule {
            id: 12,
            name: "two season".into(),
            start_year: 2025,
            duration: 3,
            supported_devices: vec![DeviceType::Advanced],
            patterns: vec![
                Pattern {
                    id: 1,
                    name: "weekday".into(),
                    switchpoints: vec![
                        Switchpoint::rate(0, 0),
                        Switchpoint::output(0, 8 * 60, 17 * 60),
                        Switchpoint::rate(1, 12 * 60),
                    ],
                },
                Pattern {
                    id: 2,
                    name: "flat".into(),
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
                    holiday: None,
                    typical_week: [0, 1, 1, 1, 1, 1, 0],
                },
            ],
            years: vec![
                ScheduleYear {
                    year: 2025,
                    events: vec![
                        YearEvent::season_start(date(2025, 4, 1), 1),
                        YearEvent::season_start(date(2025, 10, 1), 0),
                    ],
                },
                ScheduleYear {
                    year: 2026,
                    events: vec![
                        YearEvent::season_start(date(2026, 4, 1), 1),
                        YearEvent::holiday(date(2026, 12, 25)),
                        YearEvent::season_start(date(2026, 10, 1), 0),
                    ],
                },
            ],
        }
    }

    fn target(current_year: i32, years: usize) -> CalendarTarget<'static> {
        CalendarTarget {
            layout: &SINGLE_PHASE_LAYOUT,
            years,
            current_year,
            reference_year: 2000,
            control: 0,
        }
    }

    #[test]
    fn test_output_switchpoint_expands_sorted() {
        let s = schedule();
        let events = pattern_day_events(&s.patterns[0], 24).unwrap();
        let summary: Vec<(TouEvent, u16)> = events
            .iter()
            .map(|e| (e.event, e.minutes_since_midnight()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (TouEvent::Rate(0), 0),
                (TouEvent::OutputOn(0), 480),
                (TouEvent::Rate(1), 720),
                (TouEvent::OutputOff(0), 1020),
            ]
        );
    }

    #[test]
    fn test_tou_block_layout() {
        let tou = build_tou_config(&schedule(), &SINGLE_PHASE_LAYOUT).unwrap();
        assert_eq!(tou.tou_id, 12);
        assert!(tou.seasons[0].is_programmed);
        assert!(tou.seasons[1].is_programmed);
        assert!(!tou.seasons[2].is_programmed);
        assert_eq!(tou.seasons[0].events(1).count(), 4);
        assert_eq!(tou.seasons[0].events(3).count(), 1);
        assert_eq!(tou.seasons[1].events(3).count(), 0);
        assert_eq!(
            tou.seasons[0].daytypes,
            typical_week([0, 1, 1, 1, 1, 1, 0], HOLIDAY_DAYTYPE)
        );
    }

    #[test]
    fn test_too_many_day_events() {
        let mut s = schedule();
        s.patterns[1].switchpoints = (0..13).map(|i| Switchpoint::output(0, i * 100, i * 100 + 50)).collect();
        assert!(matches!(
            build_tou_config(&s, &SINGLE_PHASE_LAYOUT),
            Err(BuildError::NotSupported(_))
        ));
    }

    #[test]
    fn test_new_year_season_inserted_from_previous_year() {
        let built = build_calendar_config(&schedule(), None, &target(2026, 5)).unwrap();
        let year = &built.calendar.years[0];
        assert_eq!(year.year, 26);
        // 2025 ended in season 1 (index 0), so 2026 opens with it.
        assert_eq!(year.events[0], CalendarEvent::new(CalendarEventType::Season(1), 0, 0));
        assert_eq!(year.events[1], CalendarEvent::new(CalendarEventType::Season(2), 3, 0));
        assert_eq!(year.events[2], CalendarEvent::new(CalendarEventType::Holiday, 11, 24));
        assert_eq!(year.events[3], CalendarEvent::new(CalendarEventType::Season(1), 9, 0));
        // 2027 has no events of its own
        assert_eq!(built.calendar.years[1].year, 27);
        assert!(!built.calendar.years[2].is_programmed());
        assert!(!built.truncated);
    }

    #[test]
    fn test_new_year_season_found_past_years_without_starts() {
        let mut s = schedule();
        s.years[1].events = vec![YearEvent::holiday(date(2026, 12, 25))];
        assert_eq!(season_at_new_year(&s, 2027), Some(0));

        let built = build_calendar_config(&s, None, &target(2027, 5)).unwrap();
        assert_eq!(
            built.calendar.years[0].events[0],
            CalendarEvent::new(CalendarEventType::Season(1), 0, 0)
        );
    }

    #[test]
    fn test_first_schedule_year_uses_own_last_season() {
        let built = build_calendar_config(&schedule(), None, &target(2025, 5)).unwrap();
        let year = &built.calendar.years[0];
        assert_eq!(year.events[0], CalendarEvent::new(CalendarEventType::Season(1), 0, 0));
        assert_eq!(year.used_events().count(), 3);
    }

    #[test]
    fn test_existing_new_year_start_untouched() {
        let mut s = schedule();
        s.years[1].events.insert(0, YearEvent::season_start(date(2026, 1, 1), 1));
        let built = build_calendar_config(&s, None, &target(2026, 5)).unwrap();
        let year = &built.calendar.years[0];
        assert_eq!(year.events[0], CalendarEvent::new(CalendarEventType::Season(2), 0, 0));
        assert_eq!(
            year.used_events().filter(|e| e.is_new_year_season_start()).count(),
            1
        );
    }

    #[test]
    fn test_dst_slots_precede_seasons() {
        let dst = DstSchedule {
            switch_time: 120,
            jump_minutes: 60,
            dates: vec![
                crate::schedule::DstDates {
                    from: date(2026, 3, 8),
                    to: date(2026, 11, 1),
                },
                crate::schedule::DstDates {
                    from: date(2027, 3, 14),
                    to: date(2027, 11, 7),
                },
            ],
        };
        let built = build_calendar_config(&schedule(), Some(&dst), &target(2026, 5)).unwrap();
        let year = &built.calendar.years[0];
        assert_eq!(year.events[0], CalendarEvent::new(CalendarEventType::AddDst, 2, 7));
        assert_eq!(year.events[1], CalendarEvent::new(CalendarEventType::SubDst, 10, 0));
        assert!(year.events[2].is_new_year_season_start());
        assert_eq!(built.calendar.dst_hour, 2);

        let mut short = dst.clone();
        short.dates.pop();
        assert_eq!(
            build_calendar_config(&schedule(), Some(&short), &target(2026, 5)),
            Err(BuildError::DstDataMissing(2027))
        );
    }

    #[test]
    fn test_insertion_overflow_is_not_supported() {
        let mut s = schedule();
        s.years[1].events = (0..44)
            .map(|i| YearEvent::holiday(date(2026, 2, 1) + chrono::Duration::days(i)))
            .collect();
        assert!(matches!(
            build_calendar_config(&s, None, &target(2026, 5)),
            Err(BuildError::NotSupported(_))
        ));
    }

    #[test]
    fn test_truncated_when_schedule_outlasts_device() {
        let mut s = schedule();
        s.duration = 10;
        let built = build_calendar_config(&s, None, &target(2026, 2)).unwrap();
        assert!(built.truncated);
        assert_eq!(built.calendar.years.len(), 2);
    }
}
