//! # Meter Tables
//!
//! Typed views of the standard and manufacturer tables the configuration
//! engine reads and writes. Every type decodes from and encodes to the exact
//! bytes the device holds; geometry that varies by meter family comes from
//! the active [`MeterLayout`].

pub mod billing;
pub mod cache;
pub mod calendar;
pub mod codec;
pub mod constants_block;
pub mod display;
pub mod header;
pub mod history_log;
pub mod identity;
pub mod layout;
pub mod option_board;
pub mod security;
pub mod tou;
pub mod tou_status;

pub use billing::BillingSchedule;
pub use cache::{CacheState, CacheStats, TableCell};
pub use calendar::{CalendarConfig, CalendarEvent, CalendarEventType, CalendarYear};
pub use codec::{AsciiField, DigitFormat, FieldSpec, FieldWidth};
pub use constants_block::ConstantsConfig;
pub use display::{DisplayConfig, DisplayItem};
pub use header::ConfigHeader;
pub use history_log::HistoryLogConfig;
pub use identity::{EdModeStatus, GeneralMfgId, MeterClock};
pub use layout::{
    device_type_for_model, layout_for_model, ConfigBlock, DeviceType, MeterFamily, MeterLayout,
    POLYPHASE_LAYOUT, SINGLE_PHASE_LAYOUT,
};
pub use option_board::OptionBoardConfig;
pub use security::{PasswordLevel, SecurityEntry, SecurityTable};
pub use tou::{DayEvent, TouConfig, TouEvent, TouSeason};
pub use tou_status::TouStatus;
