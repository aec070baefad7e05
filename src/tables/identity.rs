//! Standard tables read at session start and during preflight checks:
//! GENERAL_MFG_ID (Table 1), ED_MODE_STATUS (Table 3) and CLOCK (Table 52).

use crate::constants::*;
use crate::error::PsemError;
use crate::tables::codec::{ascii, put_ascii, run_parser, AsciiField};
use crate::util::dates::{from_meter_year, to_meter_year};
use bytes::{BufMut, BytesMut};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use nom::number::complete::{le_u16, le_u8};

/// GENERAL_MFG_ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneralMfgId {
    pub manufacturer: AsciiField<MFG_ID_MANUFACTURER_LEN>,
    pub model: AsciiField<MFG_ID_MODEL_LEN>,
    pub hw_version: u8,
    pub hw_revision: u8,
    pub fw_version: u8,
    pub fw_revision: u8,
    pub serial_number: AsciiField<MFG_ID_SERIAL_LEN>,
}

impl GeneralMfgId {
    /// Firmware revision as `version.revision`, e.g. 5.002.
    pub fn firmware_revision(&self) -> f32 {
        f32::from(self.fw_version) + f32::from(self.fw_revision) / 1000.0
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, PsemError> {
        run_parser(STD_TABLE_GENERAL_MFG_ID, MFG_ID_TABLE_LEN, bytes, |i| {
            let (i, manufacturer) = ascii(i)?;
            let (i, model) = ascii(i)?;
            let (i, hw_version) = le_u8(i)?;
            let (i, hw_revision) = le_u8(i)?;
            let (i, fw_version) = le_u8(i)?;
            let (i, fw_revision) = le_u8(i)?;
            let (i, serial_number) = ascii(i)?;
            Ok((
                i,
                GeneralMfgId {
                    manufacturer,
                    model,
                    hw_version,
                    hw_revision,
                    fw_version,
                    fw_revision,
                    serial_number,
                },
            ))
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(MFG_ID_TABLE_LEN);
        put_ascii(&mut buf, &self.manufacturer);
        put_ascii(&mut buf, &self.model);
        buf.put_u8(self.hw_version);
        buf.put_u8(self.hw_revision);
        buf.put_u8(self.fw_version);
        buf.put_u8(self.fw_revision);
        put_ascii(&mut buf, &self.serial_number);
        buf.to_vec()
    }
}

/// ED_MODE_STATUS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EdModeStatus {
    pub ed_mode: u8,
    pub std_status1: u16,
    pub std_status2: u8,
    pub mfg_status: u8,
}

impl EdModeStatus {
    pub fn clock_running(&self) -> bool {
        self.std_status1 & ED_STD_STATUS1_CLOCK_ERROR == 0
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, PsemError> {
        run_parser(STD_TABLE_ED_MODE_STATUS, ED_MODE_STATUS_LEN, bytes, |i| {
            let (i, ed_mode) = le_u8(i)?;
            let (i, std_status1) = le_u16(i)?;
            let (i, std_status2) = le_u8(i)?;
            let (i, mfg_status) = le_u8(i)?;
            Ok((
                i,
                EdModeStatus {
                    ed_mode,
                    std_status1,
                    std_status2,
                    mfg_status,
                },
            ))
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(ED_MODE_STATUS_LEN);
        buf.put_u8(self.ed_mode);
        buf.put_u16_le(self.std_status1);
        buf.put_u8(self.std_status2);
        buf.put_u8(self.mfg_status);
        buf.to_vec()
    }
}

/// CLOCK: meter local time plus the time/date qualifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeterClock {
    pub date_time: NaiveDateTime,
    pub qualifier: u8,
}

impl MeterClock {
    /// Builds a clock reading with the weekday bits derived from the date.
    pub fn new(date_time: NaiveDateTime, dst_active: bool) -> Self {
        let dow = date_time.weekday().num_days_from_sunday() as u8;
        let dst = if dst_active { CLOCK_QUAL_DST_FLAG } else { 0 };
        Self {
            date_time,
            qualifier: (dow & CLOCK_QUAL_DOW_MASK) | dst,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date_time.date()
    }

    pub fn year(&self) -> i32 {
        self.date_time.year()
    }

    pub fn dst_active(&self) -> bool {
        self.qualifier & CLOCK_QUAL_DST_FLAG != 0
    }

    pub fn decode(bytes: &[u8], reference_year: i32) -> Result<Self, PsemError> {
        let raw = run_parser(STD_TABLE_CLOCK, CLOCK_TABLE_LEN, bytes, |i| {
            let (i, fields) = nom::bytes::complete::take(CLOCK_TABLE_LEN)(i)?;
            Ok((i, fields))
        })?;

        let invalid = || PsemError::InvalidField {
            field: "clock",
            value: raw.iter().take(6).fold(0u64, |acc, &b| (acc << 8) | u64::from(b)),
        };

        let date = NaiveDate::from_ymd_opt(
            from_meter_year(raw[0], reference_year),
            u32::from(raw[1]),
            u32::from(raw[2]),
        )
        .ok_or_else(invalid)?;
        let date_time = date
            .and_hms_opt(u32::from(raw[3]), u32::from(raw[4]), u32::from(raw[5]))
            .ok_or_else(invalid)?;

        Ok(Self {
            date_time,
            qualifier: raw[6],
        })
    }

    pub fn encode(&self, reference_year: i32) -> Result<Vec<u8>, PsemError> {
        let year = to_meter_year(self.date_time.year(), reference_year).ok_or(PsemError::InvalidField {
            field: "clock_year",
            value: self.date_time.year().max(0) as u64,
        })?;
        Ok(vec![
            year,
            self.date_time.month() as u8,
            self.date_time.day() as u8,
            self.date_time.hour() as u8,
            self.date_time.minute() as u8,
            self.date_time.second() as u8,
            self.qualifier,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_firmware_revision() {
        let id = GeneralMfgId {
            manufacturer: "ITRN".into(),
            model: "SPA1".into(),
            hw_version: 1,
            hw_revision: 0,
            fw_version: 5,
            fw_revision: 2,
            serial_number: "00012345".into(),
        };
        assert!((id.firmware_revision() - 5.002).abs() < 1e-6);
        let decoded = GeneralMfgId::decode(&id.encode()).unwrap();
        assert_eq!(decoded, id);
    }

    #[test]
    fn test_clock_round_trip() {
        let dt = NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_opt(13, 45, 0)
            .unwrap();
        let clock = MeterClock::new(dt, true);
        assert!(clock.dst_active());
        assert_eq!(clock.qualifier & CLOCK_QUAL_DOW_MASK, 5); // Friday

        let bytes = clock.encode(2000).unwrap();
        assert_eq!(bytes[..6], [26, 10, 16, 13, 45, 0]);
        assert_eq!(MeterClock::decode(&bytes, 2000).unwrap(), clock);
    }

    #[test]
    fn test_invalid_clock() {
        let bytes = [26, 13, 1, 0, 0, 0, 0];
        assert!(matches!(
            MeterClock::decode(&bytes, 2000),
            Err(PsemError::InvalidField { field: "clock", .. })
        ));
    }

    #[test]
    fn test_clock_error_flag() {
        let status = EdModeStatus {
            std_status1: ED_STD_STATUS1_CLOCK_ERROR,
            ..Default::default()
        };
        assert!(!status.clock_running());
        assert!(EdModeStatus::default().clock_running());
    }
}
