//! Calendar-config sub-block.
//!
//! A header (calendar id, control flags, DST switch time and jump) followed by
//! one record per supported year. Each year holds a year byte and a fixed
//! array of 44 events; slots 0 and 1 carry the DST add/subtract pair when DST
//! is enabled.
//!
//! Event word layout:
//!
//! ```text
//! bits 15-9: event type  (0 unused, 1 add DST, 2 sub DST, 3 holiday, 3+n season n)
//! bits  8-5: month       (0-based)
//! bits  4-0: day         (0-based)
//! ```

use crate::constants::{CALENDAR_EVENTS_PER_YEAR, MFG_TABLE_CONFIG};
use crate::error::PsemError;
use crate::tables::codec::run_parser;
use crate::tables::layout::MeterLayout;
use bytes::{BufMut, BytesMut};
use nom::{
    multi::count,
    number::complete::{le_u16, le_u8},
    IResult,
};

pub const CALENDAR_HEADER_LEN: usize = 6;

/// Control bit: device applies DST.
pub const CALENDAR_CONTROL_DST: u8 = 0x01;

/// Highest season number an event word can carry.
pub const MAX_SEASON_NUMBER: u8 = 8;

const EVENT_TYPE_SHIFT: u16 = 9;
const EVENT_TYPE_MASK: u16 = 0x7F;
const EVENT_MONTH_SHIFT: u16 = 5;
const EVENT_MONTH_MASK: u16 = 0x0F;
const EVENT_DAY_MASK: u16 = 0x1F;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarEventType {
    NotUsed,
    AddDst,
    SubDst,
    Holiday,
    /// 1-based season number
    Season(u8),
    /// A type code this crate does not interpret; kept for re-encoding.
    Unknown(u8),
}

impl CalendarEventType {
    pub fn code(self) -> u8 {
        match self {
            CalendarEventType::NotUsed => 0,
            CalendarEventType::AddDst => 1,
            CalendarEventType::SubDst => 2,
            CalendarEventType::Holiday => 3,
            CalendarEventType::Season(n) => 3 + n,
            CalendarEventType::Unknown(code) => code,
        }
    }

    pub fn from_code(code: u8) -> Self {
        match code {
            0 => CalendarEventType::NotUsed,
            1 => CalendarEventType::AddDst,
            2 => CalendarEventType::SubDst,
            3 => CalendarEventType::Holiday,
            c if c <= 3 + MAX_SEASON_NUMBER => CalendarEventType::Season(c - 3),
            c => CalendarEventType::Unknown(c),
        }
    }
}

/// A dated calendar event; month and day are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarEvent {
    pub event_type: CalendarEventType,
    pub month: u8,
    pub day: u8,
}

impl CalendarEvent {
    pub const UNUSED: CalendarEvent = CalendarEvent {
        event_type: CalendarEventType::NotUsed,
        month: 0,
        day: 0,
    };

    pub fn new(event_type: CalendarEventType, month: u8, day: u8) -> Self {
        Self {
            event_type,
            month,
            day,
        }
    }

    pub fn from_word(word: u16) -> Self {
        Self {
            event_type: CalendarEventType::from_code(((word >> EVENT_TYPE_SHIFT) & EVENT_TYPE_MASK) as u8),
            month: ((word >> EVENT_MONTH_SHIFT) & EVENT_MONTH_MASK) as u8,
            day: (word & EVENT_DAY_MASK) as u8,
        }
    }

    pub fn to_word(self) -> u16 {
        ((u16::from(self.event_type.code()) & EVENT_TYPE_MASK) << EVENT_TYPE_SHIFT)
            | ((u16::from(self.month) & EVENT_MONTH_MASK) << EVENT_MONTH_SHIFT)
            | (u16::from(self.day) & EVENT_DAY_MASK)
    }

    pub fn is_used(&self) -> bool {
        self.event_type != CalendarEventType::NotUsed
    }

    /// Season number if this is a season start.
    pub fn season(&self) -> Option<u8> {
        match self.event_type {
            CalendarEventType::Season(n) => Some(n),
            _ => None,
        }
    }

    /// True for a season start on January 1st.
    pub fn is_new_year_season_start(&self) -> bool {
        self.season().is_some() && self.month == 0 && self.day == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarYear {
    /// Offset from the meter reference year
    pub year: u8,
    /// Always [`CALENDAR_EVENTS_PER_YEAR`] entries
    pub events: Vec<CalendarEvent>,
}

impl CalendarYear {
    pub fn empty(year: u8) -> Self {
        Self {
            year,
            events: vec![CalendarEvent::UNUSED; CALENDAR_EVENTS_PER_YEAR],
        }
    }

    pub fn is_programmed(&self) -> bool {
        self.events.iter().any(CalendarEvent::is_used)
    }

    pub fn used_events(&self) -> impl Iterator<Item = &CalendarEvent> {
        self.events.iter().filter(|e| e.is_used())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarConfig {
    pub calendar_id: u16,
    pub control: u8,
    pub dst_hour: u8,
    pub dst_minute: u8,
    pub dst_offset_minutes: u8,
    pub years: Vec<CalendarYear>,
}

fn calendar_year(i: &[u8]) -> IResult<&[u8], CalendarYear> {
    let (i, year) = le_u8(i)?;
    let (i, words) = count(le_u16, CALENDAR_EVENTS_PER_YEAR)(i)?;
    Ok((
        i,
        CalendarYear {
            year,
            events: words.into_iter().map(CalendarEvent::from_word).collect(),
        },
    ))
}

impl CalendarConfig {
    /// An all-zero block with `years` empty year records.
    pub fn cleared(years: usize) -> Self {
        Self {
            calendar_id: 0,
            control: 0,
            dst_hour: 0,
            dst_minute: 0,
            dst_offset_minutes: 0,
            years: (0..years).map(|_| CalendarYear::empty(0)).collect(),
        }
    }

    pub fn dst_enabled(&self) -> bool {
        self.control & CALENDAR_CONTROL_DST != 0
    }

    pub fn decode(bytes: &[u8], layout: &MeterLayout, years: usize) -> Result<Self, PsemError> {
        run_parser(MFG_TABLE_CONFIG, layout.calendar_len(years), bytes, |i| {
            let (i, calendar_id) = le_u16(i)?;
            let (i, control) = le_u8(i)?;
            let (i, dst_hour) = le_u8(i)?;
            let (i, dst_minute) = le_u8(i)?;
            let (i, dst_offset_minutes) = le_u8(i)?;
            let (i, years) = count(calendar_year, years)(i)?;
            Ok((
                i,
                CalendarConfig {
                    calendar_id,
                    control,
                    dst_hour,
                    dst_minute,
                    dst_offset_minutes,
                    years,
                },
            ))
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf =
            BytesMut::with_capacity(CALENDAR_HEADER_LEN + self.years.len() * (1 + CALENDAR_EVENTS_PER_YEAR * 2));
        buf.put_u16_le(self.calendar_id);
        buf.put_u8(self.control);
        buf.put_u8(self.dst_hour);
        buf.put_u8(self.dst_minute);
        buf.put_u8(self.dst_offset_minutes);
        for year in &self.years {
            buf.put_u8(year.year);
            for slot in 0..CALENDAR_EVENTS_PER_YEAR {
                let event = year.events.get(slot).copied().unwrap_or(CalendarEvent::UNUSED);
                buf.put_u16_le(event.to_word());
            }
        }
        buf.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_word_packing() {
        let event = CalendarEvent::new(CalendarEventType::Season(2), 11, 30);
        let word = event.to_word();
        assert_eq!(word, (5 << 9) | (11 << 5) | 30);
        assert_eq!(CalendarEvent::from_word(word), event);
    }

    #[test]
    fn test_event_type_codes() {
        assert_eq!(CalendarEventType::from_code(4), CalendarEventType::Season(1));
        assert_eq!(CalendarEventType::from_code(11), CalendarEventType::Season(8));
        assert_eq!(CalendarEventType::from_code(12), CalendarEventType::Unknown(12));
        assert_eq!(CalendarEventType::Unknown(99).code(), 99);
    }

    #[test]
    fn test_new_year_season_start() {
        assert!(CalendarEvent::new(CalendarEventType::Season(1), 0, 0).is_new_year_season_start());
        assert!(!CalendarEvent::new(CalendarEventType::Holiday, 0, 0).is_new_year_season_start());
        assert!(!CalendarEvent::new(CalendarEventType::Season(1), 0, 1).is_new_year_season_start());
    }
}
