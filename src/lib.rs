//! # psem-rs - ANSI C12.18/C12.19 Meter Configuration
//!
//! The psem-rs crate reads and reprograms the configuration of electricity
//! meters that speak PSEM, the table/procedure protocol of ANSI C12.18 and
//! C12.19.
//!
//! ## Features
//!
//! - Typed codecs for the standard tables and the sub-blocks of the
//!   manufacturer configuration table (constants, billing schedule, display,
//!   history log, calendar, TOU, option board)
//! - The open/write/close commit sequence, with writes ordered by offset
//! - Password reconfiguration for legacy and standard-security firmware
//! - TOU and calendar programming from TOU and DST schedules
//! - Custom billing schedules, clock setting and history log clearing
//! - LID (long identifier) resolution, batched reads and counter presets
//! - An in-memory meter simulator backed by JSON images
//!
//! ## Usage
//!
//! ```rust
//! use psem_rs::{Device, JsonScheduleSource, MeterProfile, SessionConfig, TouReconfigResult};
//!
//! let transport = MeterProfile::default().build().unwrap();
//! let mut device = Device::open(
//!     transport,
//!     SessionConfig::default(),
//!     Box::new(JsonScheduleSource::new()),
//! )
//! .unwrap();
//!
//! assert_eq!(device.identity().model, "SPA1");
//! let result = device.reconfigure_tou("missing.json", None);
//! assert_eq!(result, TouReconfigResult::ScheduleNotValid);
//! ```

pub mod config;
pub mod constants;
pub mod device;
pub mod error;
pub mod lid;
pub mod logging;
pub mod psem;
pub mod reconfigure;
pub mod schedule;
pub mod tables;
pub mod util;

pub use crate::config::SessionConfig;
pub use crate::device::Device;
pub use crate::error::PsemError;
pub use crate::logging::{init_logger_with_level, log_debug, log_error, log_info};

pub use lid::{Lid, LidClass, LidResolver};
pub use psem::{
    CommitResult, DataResetFlags, MemoryTransport, MeterImage, MeterProfile, ProcedureResponse,
    ProcedureResult, PsemResponse, TableWrite, Transport, TransportError,
};
pub use reconfigure::{
    ClockReconfigResult, CsReconfigResult, PasswordReconfigResult, ProcedureReconfigResult,
    SecurityBackend, TouReconfigResult,
};
pub use schedule::{
    CustomSchedule, DstSchedule, JsonScheduleSource, MemoryScheduleSource, ScheduleError,
    ScheduleSource, TouSchedule,
};
pub use tables::{
    CalendarConfig, ConfigHeader, DeviceType, MeterFamily, MeterLayout, TouConfig, TouStatus,
};
