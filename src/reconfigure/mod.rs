//! # Reconfiguration
//!
//! Each operation validates its input against the device state, builds the
//! sub-block payloads and runs them through the open/write/close commit.
//! Outcomes are closed result enumerations; no reconfiguration returns a
//! `Result`.

pub mod custom_schedule;
pub mod result;
pub mod security;
pub mod tou;

pub use custom_schedule::{write_custom_schedule, CustomScheduleTarget};
pub use result::{
    ClockReconfigResult, CsReconfigResult, PasswordReconfigResult, ProcedureReconfigResult,
    TouReconfigResult,
};
pub use security::{LegacySecurity, PasswordReconfigure, SecurityBackend, StandardSecurity};
pub use tou::{build_calendar_config, build_tou_config, reconfigure_tou, CalendarTarget, TouDeviceState};

use crate::constants::{
    MFG_PROC_CLEAR_HISTORY_LOG, SET_DATE_TIME_MASK_DATE, SET_DATE_TIME_MASK_DOW, SET_DATE_TIME_MASK_TIME,
    STD_PROC_SET_DATE_TIME,
};
use crate::error::PsemError;
use crate::psem::procedure::execute;
use crate::psem::transport::{ProcedureResult, Transport};
use crate::tables::identity::MeterClock;
use chrono::NaiveDateTime;
use log::{info, warn};

/// SET_DATE_TIME parameters: set mask, the six date/time bytes, qualifier.
pub fn set_date_time_params(clock: &MeterClock, reference_year: i32) -> Result<Vec<u8>, PsemError> {
    let mut params = vec![SET_DATE_TIME_MASK_TIME | SET_DATE_TIME_MASK_DATE | SET_DATE_TIME_MASK_DOW];
    params.extend(clock.encode(reference_year)?);
    Ok(params)
}

/// Sets the device clock to `date_time`.
pub fn set_clock(
    transport: &mut dyn Transport,
    date_time: NaiveDateTime,
    dst_active: bool,
    reference_year: i32,
) -> ClockReconfigResult {
    let clock = MeterClock::new(date_time, dst_active);
    let params = match set_date_time_params(&clock, reference_year) {
        Ok(params) => params,
        Err(e) => {
            warn!("Cannot set clock to {}: {}", date_time, e);
            return ClockReconfigResult::InvalidTime;
        }
    };

    let result = match execute(transport, STD_PROC_SET_DATE_TIME, &params) {
        Ok(resp) => match resp.result {
            ProcedureResult::Completed => ClockReconfigResult::Success,
            ProcedureResult::NoAuthorization => ClockReconfigResult::SecurityError,
            ProcedureResult::InvalidParameter => ClockReconfigResult::InvalidTime,
            _ => ClockReconfigResult::GeneralError,
        },
        Err(e) => ClockReconfigResult::from_error(&PsemError::Transport(e)),
    };
    info!("Clock set to {}: {}", date_time, result);
    result
}

/// Clears the device history log.
pub fn clear_history_log(transport: &mut dyn Transport) -> ProcedureReconfigResult {
    let result = match execute(transport, MFG_PROC_CLEAR_HISTORY_LOG, &[]) {
        Ok(resp) => match resp.result {
            ProcedureResult::Completed => ProcedureReconfigResult::Success,
            ProcedureResult::NoAuthorization => ProcedureReconfigResult::SecurityError,
            _ => ProcedureReconfigResult::GeneralError,
        },
        Err(e) => ProcedureReconfigResult::from_error(&PsemError::Transport(e)),
    };
    info!("History log clear: {}", result);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_set_date_time_params() {
        let dt = NaiveDate::from_ymd_opt(2026, 3, 8)
            .unwrap()
            .and_hms_opt(2, 30, 15)
            .unwrap();
        let params = set_date_time_params(&MeterClock::new(dt, true), 2000).unwrap();
        // 2026-03-08 is a Sunday
        assert_eq!(params, vec![0x07, 26, 3, 8, 2, 30, 15, 0x08]);
    }

    #[test]
    fn test_year_before_reference_rejected() {
        let dt = NaiveDate::from_ymd_opt(1999, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert!(set_date_time_params(&MeterClock::new(dt, false), 2000).is_err());
    }
}
