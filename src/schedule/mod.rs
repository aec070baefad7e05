//! # Schedule Sources
//!
//! TOU, DST and custom (billing) schedules come from outside the engine. The
//! reconfigurators only see the parsed types in this module and the
//! [`ScheduleSource`] capability that produces them from an opaque path.
//! [`JsonScheduleSource`] reads JSON files; [`MemoryScheduleSource`] serves
//! schedules registered in memory.

pub mod custom;
pub mod dst;
pub mod source;
pub mod tou;

pub use custom::{CustomSchedule, CustomScheduleFile, MonthlyRecurrence};
pub use dst::{DstDates, DstSchedule};
pub use source::{JsonScheduleSource, MemoryScheduleSource};
pub use tou::{
    Pattern, ScheduleYear, Season, Switchpoint, SwitchpointKind, TouSchedule, YearEvent,
    YearEventKind,
};

use thiserror::Error;

/// Why a schedule could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// The path does not name a readable schedule.
    #[error("schedule file not found: {0}")]
    NotFound(String),

    /// The file exists but is not a well-formed schedule.
    #[error("schedule parse error: {0}")]
    Parse(String),

    /// The schedule parsed but is internally inconsistent.
    #[error("invalid schedule: {0}")]
    Invalid(String),

    /// The file holds no schedule with the requested name.
    #[error("no schedule named {0:?}")]
    UnknownSchedule(String),
}

/// Capability producing parsed schedules from caller-supplied paths.
pub trait ScheduleSource {
    fn tou_schedule(&self, path: &str) -> Result<TouSchedule, ScheduleError>;

    fn dst_schedule(&self, path: &str) -> Result<DstSchedule, ScheduleError>;

    /// The schedule called `name` within the custom schedule file at `path`.
    fn custom_schedule(&self, path: &str, name: &str) -> Result<CustomSchedule, ScheduleError>;
}

impl<S: ScheduleSource + ?Sized> ScheduleSource for Box<S> {
    fn tou_schedule(&self, path: &str) -> Result<TouSchedule, ScheduleError> {
        (**self).tou_schedule(path)
    }

    fn dst_schedule(&self, path: &str) -> Result<DstSchedule, ScheduleError> {
        (**self).dst_schedule(path)
    }

    fn custom_schedule(&self, path: &str, name: &str) -> Result<CustomSchedule, ScheduleError> {
        (**self).custom_schedule(path, name)
    }
}
