//! Billing-schedule sub-block: a fixed-capacity list of billing dates stored
//! as day counts since the meter's reference epoch.

use crate::constants::{BILLING_SCHEDULE_END, MFG_TABLE_CONFIG};
use crate::error::PsemError;
use crate::tables::codec::run_parser;
use crate::tables::layout::MeterLayout;
use bytes::{BufMut, BytesMut};
use nom::{multi::count, number::complete::le_u16};

/// Raw billing-schedule entries, `capacity` of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingSchedule {
    pub entries: Vec<u16>,
}

impl BillingSchedule {
    /// An all-zero block.
    pub fn cleared(layout: &MeterLayout) -> Self {
        Self {
            entries: vec![0; layout.billing_dates],
        }
    }

    /// Builds the block from meter day counts.
    ///
    /// At most `capacity` dates are kept. When fewer are given, the end
    /// marker follows the last date and the remainder stays cleared.
    pub fn from_days(layout: &MeterLayout, days: &[u16]) -> Self {
        let mut schedule = Self::cleared(layout);
        let used = days.len().min(layout.billing_dates);
        schedule.entries[..used].copy_from_slice(&days[..used]);
        if used < layout.billing_dates {
            schedule.entries[used] = BILLING_SCHEDULE_END;
        }
        schedule
    }

    /// Day counts up to the end marker.
    pub fn dates(&self) -> &[u16] {
        let end = self
            .entries
            .iter()
            .position(|&d| d == BILLING_SCHEDULE_END)
            .unwrap_or(self.entries.len());
        &self.entries[..end]
    }

    pub fn decode(bytes: &[u8], layout: &MeterLayout) -> Result<Self, PsemError> {
        run_parser(MFG_TABLE_CONFIG, layout.billing_schedule_len(), bytes, |i| {
            let (i, entries) = count(le_u16, layout.billing_dates)(i)?;
            Ok((i, BillingSchedule { entries }))
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(self.entries.len() * 2);
        for &entry in &self.entries {
            buf.put_u16_le(entry);
        }
        buf.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::layout::SINGLE_PHASE_LAYOUT;

    #[test]
    fn test_end_marker_when_short() {
        let schedule = BillingSchedule::from_days(&SINGLE_PHASE_LAYOUT, &[10, 20]);
        assert_eq!(schedule.entries[..3], [10, 20, BILLING_SCHEDULE_END]);
        assert_eq!(schedule.dates(), &[10, 20]);
    }

    #[test]
    fn test_full_schedule_has_no_marker() {
        let days: Vec<u16> = (1..=25).collect();
        let schedule = BillingSchedule::from_days(&SINGLE_PHASE_LAYOUT, &days);
        assert!(!schedule.entries.contains(&BILLING_SCHEDULE_END));
        assert_eq!(schedule.dates().len(), 25);
    }
}
