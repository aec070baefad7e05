//! Status derived from the programmed calendar and TOU blocks and the
//! device clock: when the schedule runs out, which season and daytype are
//! in effect, how many rates the season uses, and whether DST is active.

use crate::tables::calendar::{CalendarConfig, CalendarEventType};
use crate::tables::identity::MeterClock;
use crate::tables::tou::{holiday_daytype, weekday_daytype, TouConfig};
use crate::util::dates::from_meter_year;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TouStatus {
    /// Last day covered by the programmed calendar.
    pub expiration: Option<NaiveDate>,
    /// 1-based season in effect today.
    pub current_season: Option<u8>,
    pub current_daytype: Option<u8>,
    /// Distinct rates used by the current season.
    pub rate_count: usize,
    pub dst_active: bool,
}

impl TouStatus {
    pub fn derive(
        calendar: &CalendarConfig,
        tou: &TouConfig,
        clock: &MeterClock,
        reference_year: i32,
    ) -> Self {
        let expiration = calendar
            .years
            .iter()
            .filter(|y| y.is_programmed())
            .map(|y| from_meter_year(y.year, reference_year))
            .max()
            .and_then(|year| NaiveDate::from_ymd_opt(year, 12, 31));

        let today = clock.date();
        let this_year = calendar
            .years
            .iter()
            .find(|y| y.is_programmed() && from_meter_year(y.year, reference_year) == today.year());

        let month = today.month0() as u8;
        let day = today.day0() as u8;

        let current_season = this_year.and_then(|year| {
            year.used_events()
                .filter(|e| (e.month, e.day) <= (month, day))
                .filter_map(|e| e.season().map(|s| ((e.month, e.day), s)))
                .max_by_key(|(date, _)| *date)
                .map(|(_, season)| season)
        });

        let season = current_season
            .and_then(|n| tou.seasons.get(usize::from(n).saturating_sub(1)))
            .filter(|s| s.is_programmed);

        let is_holiday = this_year.map_or(false, |year| {
            year.used_events().any(|e| {
                e.event_type == CalendarEventType::Holiday && e.month == month && e.day == day
            })
        });

        let current_daytype = season.map(|s| {
            if is_holiday {
                holiday_daytype(s.daytypes)
            } else {
                weekday_daytype(s.daytypes, today.weekday().num_days_from_sunday())
            }
        });

        Self {
            expiration,
            current_season,
            current_daytype,
            rate_count: season.map_or(0, |s| s.rates().len()),
            dst_active: clock.dst_active(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::calendar::{CalendarEvent, CalendarYear};
    use crate::tables::layout::SINGLE_PHASE_LAYOUT;
    use crate::tables::tou::{typical_week, DayEvent, TouEvent};

    fn fixture() -> (CalendarConfig, TouConfig) {
        let mut calendar = CalendarConfig::cleared(2);
        let mut year = CalendarYear::empty(26);
        year.events[2] = CalendarEvent::new(CalendarEventType::Season(1), 0, 0);
        year.events[3] = CalendarEvent::new(CalendarEventType::Season(2), 5, 0);
        year.events[4] = CalendarEvent::new(CalendarEventType::Holiday, 11, 24);
        calendar.years[0] = year;

        let mut tou = TouConfig::cleared(&SINGLE_PHASE_LAYOUT);
        tou.tou_id = 1;
        for season in tou.seasons.iter_mut().take(2) {
            season.is_programmed = true;
            season.daytypes = typical_week([0, 1, 1, 1, 1, 1, 0], 3);
            season.day_events[1][0] = DayEvent::new(TouEvent::Rate(0), 0, 0);
            season.day_events[1][1] = DayEvent::new(TouEvent::Rate(2), 16, 0);
        }
        (calendar, tou)
    }

    #[test]
    fn test_summer_weekday() {
        let (calendar, tou) = fixture();
        let now = NaiveDate::from_ymd_opt(2026, 7, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let status = TouStatus::derive(&calendar, &tou, &MeterClock::new(now, true), 2000);

        assert_eq!(status.expiration, NaiveDate::from_ymd_opt(2026, 12, 31));
        assert_eq!(status.current_season, Some(2));
        assert_eq!(status.current_daytype, Some(1));
        assert_eq!(status.rate_count, 2);
        assert!(status.dst_active);
    }

    #[test]
    fn test_holiday_daytype() {
        let (calendar, tou) = fixture();
        let christmas = NaiveDate::from_ymd_opt(2026, 12, 25)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let status = TouStatus::derive(&calendar, &tou, &MeterClock::new(christmas, false), 2000);
        assert_eq!(status.current_daytype, Some(3));
    }

    #[test]
    fn test_outside_calendar() {
        let (calendar, tou) = fixture();
        let later = NaiveDate::from_ymd_opt(2028, 1, 5)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let status = TouStatus::derive(&calendar, &tou, &MeterClock::new(later, false), 2000);
        assert_eq!(status.current_season, None);
        assert_eq!(status.current_daytype, None);
        assert_eq!(status.rate_count, 0);
    }
}
