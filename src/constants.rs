//! PSEM Protocol Constants
//!
//! This module defines table numbers, procedure numbers and fixed field sizes
//! used by the configuration engine, based on ANSI C12.19 plus the
//! manufacturer (MFG) table space starting at 2048.

// ----------------------------------------------------------------------------
// Standard tables (ANSI C12.19)
// ----------------------------------------------------------------------------

/// GENERAL_MFG_ID: manufacturer, model, hardware and firmware revisions
pub const STD_TABLE_GENERAL_MFG_ID: u16 = 1;

/// ED_MODE_STATUS: end device mode and status flags
pub const STD_TABLE_ED_MODE_STATUS: u16 = 3;

/// CURRENT_REGISTER_DATA: summations and demands per tier
pub const STD_TABLE_CURRENT_REGISTER_DATA: u16 = 23;

/// SECURITY: password and access permission entries
pub const STD_TABLE_SECURITY: u16 = 42;

/// CLOCK: current date and time with qualifier
pub const STD_TABLE_CLOCK: u16 = 52;

// ----------------------------------------------------------------------------
// Manufacturer tables
// ----------------------------------------------------------------------------

/// Offset added to a manufacturer table or procedure number
pub const MFG_OFFSET: u16 = 2048;

/// Configuration table holding the header and all configuration sub-blocks
pub const MFG_TABLE_CONFIG: u16 = MFG_OFFSET;

/// Legacy (pre standard-security firmware) password table
pub const MFG_TABLE_LEGACY_PASSWORDS: u16 = MFG_OFFSET + 42;

/// Diagnostic counters
pub const MFG_TABLE_DIAGNOSTICS: u16 = MFG_OFFSET + 43;

/// Voltage quality event counters
pub const MFG_TABLE_VQ_COUNTERS: u16 = MFG_OFFSET + 44;

// ----------------------------------------------------------------------------
// Procedures
// ----------------------------------------------------------------------------

/// SET_DATE_TIME standard procedure
pub const STD_PROC_SET_DATE_TIME: u16 = 10;

/// Clear the history (event) log
pub const MFG_PROC_CLEAR_HISTORY_LOG: u16 = MFG_OFFSET + 4;

/// Reset all passwords on legacy firmware
pub const MFG_PROC_RESET_PASSWORDS: u16 = MFG_OFFSET + 26;

/// Enter the configuration staging state
pub const MFG_PROC_OPEN_CONFIG_FILE: u16 = MFG_OFFSET + 30;

/// Validate and swap in the staged configuration
pub const MFG_PROC_CLOSE_CONFIG_FILE: u16 = MFG_OFFSET + 31;

// SET_DATE_TIME set mask bits
pub const SET_DATE_TIME_MASK_TIME: u8 = 0x01;
pub const SET_DATE_TIME_MASK_DATE: u8 = 0x02;
pub const SET_DATE_TIME_MASK_DOW: u8 = 0x04;

// ----------------------------------------------------------------------------
// Field sizes and limits
// ----------------------------------------------------------------------------

/// Length of the manufacturer field in GENERAL_MFG_ID
pub const MFG_ID_MANUFACTURER_LEN: usize = 4;

/// Length of the model field in GENERAL_MFG_ID
pub const MFG_ID_MODEL_LEN: usize = 8;

/// Length of the serial number field in GENERAL_MFG_ID
pub const MFG_ID_SERIAL_LEN: usize = 16;

/// Size of GENERAL_MFG_ID
pub const MFG_ID_TABLE_LEN: usize =
    MFG_ID_MANUFACTURER_LEN + MFG_ID_MODEL_LEN + 4 + MFG_ID_SERIAL_LEN;

/// Size of ED_MODE_STATUS
pub const ED_MODE_STATUS_LEN: usize = 5;

/// CLOCK_ERROR_FLAG within ED_STD_STATUS1
pub const ED_STD_STATUS1_CLOCK_ERROR: u16 = 0x0040;

/// Size of CLOCK (LTIME_DATE + qualifier)
pub const CLOCK_TABLE_LEN: usize = 7;

/// Day-of-week bits within the clock qualifier
pub const CLOCK_QUAL_DOW_MASK: u8 = 0x07;

/// DST active bit within the clock qualifier
pub const CLOCK_QUAL_DST_FLAG: u8 = 0x08;

/// Number of password levels on every supported meter
pub const PASSWORD_LEVELS: usize = 4;

/// Size of the CLOSE_CONFIG_FILE data-reset parameter
pub const CLOSE_CONFIG_PARAM_LEN: usize = 4;

/// Events per calendar year
pub const CALENDAR_EVENTS_PER_YEAR: usize = 44;

/// Calendar slots reserved for the add/subtract DST pair
pub const CALENDAR_DST_SLOTS: usize = 2;

/// Daytype index reserved for holidays
pub const HOLIDAY_DAYTYPE: u8 = 3;

/// Number of daytypes per season (three normal plus holiday)
pub const DAYTYPES_PER_SEASON: usize = 4;

/// End-of-list marker for the billing schedule
pub const BILLING_SCHEDULE_END: u16 = 0xFFFF;

/// Reference year for meter-relative years and day counts
pub const DEFAULT_REFERENCE_YEAR: i32 = 2000;
