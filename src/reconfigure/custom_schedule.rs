//! Custom (billing) schedule reconfiguration.
//!
//! The named schedule is expanded from the device's current date up to a
//! look-ahead horizon, converted to day counts since the meter reference
//! year and written over the billing-schedule sub-block.

use crate::constants::MFG_TABLE_CONFIG;
use crate::psem::procedure::{commit, DataResetFlags, TableWrite};
use crate::psem::transport::Transport;
use crate::reconfigure::result::CsReconfigResult;
use crate::schedule::ScheduleSource;
use crate::tables::billing::BillingSchedule;
use crate::tables::header::ConfigHeader;
use crate::tables::layout::MeterLayout;
use crate::util::dates::days_since_reference;
use chrono::{Months, NaiveDate};
use log::{debug, info, warn};

/// Device state consulted by [`write_custom_schedule`].
#[derive(Debug, Clone, Copy)]
pub struct CustomScheduleTarget<'a> {
    pub layout: &'static MeterLayout,
    pub header: &'a ConfigHeader,
    /// Device clock date; earlier dates are dropped.
    pub today: NaiveDate,
    pub horizon_years: u32,
    pub reference_year: i32,
}

impl CustomScheduleTarget<'_> {
    fn horizon(&self) -> NaiveDate {
        self.today
            .checked_add_months(Months::new(self.horizon_years.saturating_mul(12)))
            .unwrap_or(NaiveDate::MAX)
    }
}

/// Meter day counts for the schedule's future dates. Dates the meter cannot
/// represent are skipped.
pub fn schedule_days(dates: &[NaiveDate], reference_year: i32) -> Vec<u16> {
    dates
        .iter()
        .filter_map(|&date| {
            let days = days_since_reference(date, reference_year);
            if days.is_none() {
                warn!("Billing date {} outside the meter's date range; skipped", date);
            }
            days
        })
        .collect()
}

/// Expands the custom schedule `name` from the file at `path` and writes it.
pub fn write_custom_schedule(
    transport: &mut dyn Transport,
    schedules: &dyn ScheduleSource,
    target: &CustomScheduleTarget<'_>,
    path: &str,
    name: &str,
) -> CsReconfigResult {
    let schedule = match schedules.custom_schedule(path, name) {
        Ok(schedule) => schedule,
        Err(e) => {
            warn!("Custom schedule {:?} in {} rejected: {}", name, path, e);
            return CsReconfigResult::ErrorFileNotFound;
        }
    };

    let dates = schedule.expand(target.today, target.horizon());
    let days = schedule_days(&dates, target.reference_year);
    if days.is_empty() {
        warn!("Custom schedule {:?} has no dates on or after {}", name, target.today);
        return CsReconfigResult::ErrorFileNotFound;
    }

    let capacity = target.layout.billing_dates;
    let truncated = days.len() > capacity;
    if truncated {
        info!(
            "Custom schedule {:?} has {} dates; writing the first {}",
            name,
            days.len(),
            capacity
        );
    }
    debug!("Custom schedule {:?}: {} dates from {}", name, days.len().min(capacity), target.today);

    let billing = BillingSchedule::from_days(target.layout, &days);
    let writes = vec![TableWrite::at(
        MFG_TABLE_CONFIG,
        target.header.billing_schedule,
        billing.encode(),
        "billing schedule",
    )];

    match CsReconfigResult::from_commit(commit(transport, writes, DataResetFlags::empty())) {
        CsReconfigResult::Success if truncated => CsReconfigResult::SuccessScheduleTruncated,
        other => other,
    }
}
