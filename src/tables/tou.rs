//! TOU-config sub-block.
//!
//! A TOU id followed by a fixed number of seasons. Each season carries a
//! programmed flag, the typical-week daytype word and, for each of the four
//! daytypes, a fixed array of day events.
//!
//! Daytype word: two bits per weekday, Sunday in bits 0-1 through Saturday in
//! bits 12-13, and the holiday daytype in bits 14-15.
//!
//! Day event word:
//!
//! ```text
//! bits 15-11: TOU event code (0 none, 1-7 rate A-G, 8+2k output k on, 9+2k output k off)
//! bits 10-6:  hour
//! bits  5-0:  minute
//! ```

use crate::constants::{DAYTYPES_PER_SEASON, MFG_TABLE_CONFIG};
use crate::error::PsemError;
use crate::tables::codec::run_parser;
use crate::tables::layout::MeterLayout;
use bytes::{BufMut, BytesMut};
use nom::{
    combinator::map,
    multi::count,
    number::complete::{le_u16, le_u8},
    IResult,
};

/// Number of rate outputs (A-G).
pub const MAX_RATES: u8 = 7;

/// Number of switchable output channels.
pub const MAX_OUTPUTS: u8 = 4;

const DAYTYPE_BITS: u16 = 2;
const DAYTYPE_MASK: u16 = 0x03;
const HOLIDAY_SHIFT: u16 = 14;

const EVENT_CODE_SHIFT: u16 = 11;
const EVENT_CODE_MASK: u16 = 0x1F;
const EVENT_HOUR_SHIFT: u16 = 6;
const EVENT_HOUR_MASK: u16 = 0x1F;
const EVENT_MINUTE_MASK: u16 = 0x3F;

const FIRST_OUTPUT_CODE: u8 = 1 + MAX_RATES;

/// What happens at a day event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouEvent {
    None,
    /// 0-based rate index (0 = rate A)
    Rate(u8),
    /// 0-based output channel switched on
    OutputOn(u8),
    /// 0-based output channel switched off
    OutputOff(u8),
    Unknown(u8),
}

impl TouEvent {
    /// 1-based TOU event code.
    pub fn code(self) -> u8 {
        match self {
            TouEvent::None => 0,
            TouEvent::Rate(r) => 1 + r,
            TouEvent::OutputOn(k) => FIRST_OUTPUT_CODE + 2 * k,
            TouEvent::OutputOff(k) => FIRST_OUTPUT_CODE + 2 * k + 1,
            TouEvent::Unknown(code) => code,
        }
    }

    pub fn from_code(code: u8) -> Self {
        match code {
            0 => TouEvent::None,
            c if c <= MAX_RATES => TouEvent::Rate(c - 1),
            c if c < FIRST_OUTPUT_CODE + 2 * MAX_OUTPUTS => {
                let k = (c - FIRST_OUTPUT_CODE) / 2;
                if (c - FIRST_OUTPUT_CODE) % 2 == 0 {
                    TouEvent::OutputOn(k)
                } else {
                    TouEvent::OutputOff(k)
                }
            }
            c => TouEvent::Unknown(c),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayEvent {
    pub event: TouEvent,
    pub hour: u8,
    pub minute: u8,
}

impl DayEvent {
    pub const NONE: DayEvent = DayEvent {
        event: TouEvent::None,
        hour: 0,
        minute: 0,
    };

    pub fn new(event: TouEvent, hour: u8, minute: u8) -> Self {
        Self {
            event,
            hour,
            minute,
        }
    }

    /// Builds an event from minutes since midnight.
    pub fn at_minutes(event: TouEvent, minutes: u16) -> Self {
        Self::new(event, (minutes / 60) as u8, (minutes % 60) as u8)
    }

    pub fn minutes_since_midnight(&self) -> u16 {
        u16::from(self.hour) * 60 + u16::from(self.minute)
    }

    pub fn is_used(&self) -> bool {
        self.event != TouEvent::None
    }

    pub fn from_word(word: u16) -> Self {
        Self {
            event: TouEvent::from_code(((word >> EVENT_CODE_SHIFT) & EVENT_CODE_MASK) as u8),
            hour: ((word >> EVENT_HOUR_SHIFT) & EVENT_HOUR_MASK) as u8,
            minute: (word & EVENT_MINUTE_MASK) as u8,
        }
    }

    pub fn to_word(self) -> u16 {
        ((u16::from(self.event.code()) & EVENT_CODE_MASK) << EVENT_CODE_SHIFT)
            | ((u16::from(self.hour) & EVENT_HOUR_MASK) << EVENT_HOUR_SHIFT)
            | (u16::from(self.minute) & EVENT_MINUTE_MASK)
    }
}

/// Packs a Sunday-first weekday→daytype assignment and the holiday daytype.
pub fn typical_week(week: [u8; 7], holiday_daytype: u8) -> u16 {
    let days = week.iter().enumerate().fold(0u16, |word, (day, &daytype)| {
        word | ((u16::from(daytype) & DAYTYPE_MASK) << (DAYTYPE_BITS * day as u16))
    });
    days | ((u16::from(holiday_daytype) & DAYTYPE_MASK) << HOLIDAY_SHIFT)
}

/// Daytype assigned to a weekday (0 = Sunday) by a daytype word.
pub fn weekday_daytype(daytypes: u16, weekday: u32) -> u8 {
    ((daytypes >> (DAYTYPE_BITS * weekday as u16)) & DAYTYPE_MASK) as u8
}

/// Holiday daytype held in a daytype word.
pub fn holiday_daytype(daytypes: u16) -> u8 {
    ((daytypes >> HOLIDAY_SHIFT) & DAYTYPE_MASK) as u8
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TouSeason {
    pub is_programmed: bool,
    pub daytypes: u16,
    /// `[daytype][slot]`, four daytypes of `day_events` slots each
    pub day_events: Vec<Vec<DayEvent>>,
}

impl TouSeason {
    pub fn empty(layout: &MeterLayout) -> Self {
        Self {
            is_programmed: false,
            daytypes: 0,
            day_events: vec![vec![DayEvent::NONE; layout.day_events]; DAYTYPES_PER_SEASON],
        }
    }

    /// Used events of one daytype, in slot order.
    pub fn events(&self, daytype: u8) -> impl Iterator<Item = &DayEvent> {
        self.day_events
            .get(usize::from(daytype))
            .into_iter()
            .flatten()
            .filter(|e| e.is_used())
    }

    /// Distinct rates switched to anywhere in this season.
    pub fn rates(&self) -> Vec<u8> {
        let mut rates: Vec<u8> = self
            .day_events
            .iter()
            .flatten()
            .filter_map(|e| match e.event {
                TouEvent::Rate(r) => Some(r),
                _ => None,
            })
            .collect();
        rates.sort_unstable();
        rates.dedup();
        rates
    }
}

fn day_event(i: &[u8]) -> IResult<&[u8], DayEvent> {
    map(le_u16, DayEvent::from_word)(i)
}

fn tou_season(day_events: usize) -> impl Fn(&[u8]) -> IResult<&[u8], TouSeason> {
    move |i| {
        let (i, programmed) = le_u8(i)?;
        let (i, daytypes) = le_u16(i)?;
        let (i, day_events) = count(count(day_event, day_events), DAYTYPES_PER_SEASON)(i)?;
        Ok((
            i,
            TouSeason {
                is_programmed: programmed != 0,
                daytypes,
                day_events,
            },
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TouConfig {
    pub tou_id: u16,
    pub seasons: Vec<TouSeason>,
}

impl TouConfig {
    pub fn cleared(layout: &MeterLayout) -> Self {
        Self {
            tou_id: 0,
            seasons: (0..layout.seasons).map(|_| TouSeason::empty(layout)).collect(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.tou_id != 0
    }

    pub fn decode(bytes: &[u8], layout: &MeterLayout) -> Result<Self, PsemError> {
        run_parser(MFG_TABLE_CONFIG, layout.tou_len(), bytes, |i| {
            let (i, tou_id) = le_u16(i)?;
            let (i, seasons) = count(tou_season(layout.day_events), layout.seasons)(i)?;
            Ok((i, TouConfig { tou_id, seasons }))
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::new();
        buf.put_u16_le(self.tou_id);
        for season in &self.seasons {
            buf.put_u8(u8::from(season.is_programmed));
            buf.put_u16_le(season.daytypes);
            for daytype in &season.day_events {
                for event in daytype {
                    buf.put_u16_le(event.to_word());
                }
            }
        }
        buf.to_vec()
    }
}
