//! # Meter Images
//!
//! A meter image is the set of table payloads a [`MemoryTransport`] serves,
//! persisted as JSON with hex-encoded tables. [`MeterProfile`] builds a
//! consistent blank image for either meter family: identity, status, clock,
//! security, register data and a configuration table laid out from the
//! family's geometry.

use crate::constants::*;
use crate::error::PsemError;
use crate::psem::memory_transport::MemoryTransport;
use crate::tables::calendar::{CalendarConfig, CALENDAR_CONTROL_DST};
use crate::tables::header::ConfigHeader;
use crate::tables::identity::{EdModeStatus, GeneralMfgId, MeterClock};
use crate::tables::layout::{ConfigBlock, DeviceType, MeterFamily, MeterLayout};
use crate::tables::security::SecurityTable;
use crate::tables::tou::TouConfig;
use crate::util::hex::{decode_hex, encode_hex};
use chrono::{NaiveDate, NaiveDateTime};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Serializable table payloads keyed by table number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeterImage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tables: BTreeMap<u16, String>,
}

impl MeterImage {
    pub fn from_transport(transport: &MemoryTransport) -> Self {
        Self {
            description: None,
            tables: transport
                .tables()
                .iter()
                .map(|(&table, data)| (table, encode_hex(data)))
                .collect(),
        }
    }

    pub fn into_transport(self) -> Result<MemoryTransport, PsemError> {
        let tables = self
            .tables
            .into_iter()
            .map(|(table, hex)| {
                decode_hex(&hex)
                    .map(|data| (table, data))
                    .map_err(|e| PsemError::Image(format!("table {table}: {e}")))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(MemoryTransport::with_tables(tables))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PsemError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| PsemError::Image(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&json).map_err(|e| PsemError::Image(format!("{}: {e}", path.display())))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), PsemError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(|e| PsemError::Image(e.to_string()))?;
        fs::write(path, json).map_err(|e| PsemError::Image(format!("{}: {e}", path.display())))?;
        info!("Saved meter image with {} tables to {}", self.tables.len(), path.display());
        Ok(())
    }
}

/// Parameters of a blank simulated meter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeterProfile {
    pub family: MeterFamily,
    pub device_type: DeviceType,
    pub fw_version: u8,
    pub fw_revision: u8,
    pub serial_number: String,
    pub calendar_years: u8,
    /// Place the TOU block before the calendar block in the configuration table.
    pub tou_before_calendar: bool,
    /// Zero leaves the meter unconfigured for TOU.
    pub tou_id: u16,
    pub dst_enabled: bool,
    pub clock: NaiveDateTime,
    pub clock_running: bool,
    pub reference_year: i32,
}

impl Default for MeterProfile {
    fn default() -> Self {
        Self {
            family: MeterFamily::SinglePhase,
            device_type: DeviceType::Advanced,
            fw_version: 5,
            fw_revision: 2,
            serial_number: "000000000001".into(),
            calendar_years: 5,
            tou_before_calendar: false,
            tou_id: 1,
            dst_enabled: false,
            clock: NaiveDate::from_ymd_opt(DEFAULT_REFERENCE_YEAR + 26, 1, 15)
                .and_then(|d| d.and_hms_opt(12, 0, 0))
                .unwrap_or_default(),
            clock_running: true,
            reference_year: DEFAULT_REFERENCE_YEAR,
        }
    }
}

impl MeterProfile {
    pub fn layout(&self) -> &'static MeterLayout {
        MeterLayout::for_family(self.family)
    }

    /// Model string carried in GENERAL_MFG_ID, e.g. `SPA1`.
    pub fn model(&self) -> String {
        let kind = match self.device_type {
            DeviceType::Advanced => 'A',
            DeviceType::Basic => 'B',
        };
        format!("{}{}1", self.layout().model_prefix, kind)
    }

    pub fn identity(&self) -> GeneralMfgId {
        GeneralMfgId {
            manufacturer: "PSEM".into(),
            model: self.model().as_str().into(),
            hw_version: 1,
            hw_revision: 0,
            fw_version: self.fw_version,
            fw_revision: self.fw_revision,
            serial_number: self.serial_number.as_str().into(),
        }
    }

    pub fn header(&self) -> ConfigHeader {
        let order: &[ConfigBlock] = if self.tou_before_calendar {
            &[ConfigBlock::Tou]
        } else {
            &[]
        };
        ConfigHeader::sequential(self.layout(), self.calendar_years, order)
    }

    /// The configuration table: header plus every sub-block, cleared except
    /// for the calendar control flags and the TOU id.
    pub fn config_table(&self) -> Result<Vec<u8>, PsemError> {
        let layout = self.layout();
        let header = self.header();
        let mut table = vec![0u8; header.table_len(layout)];

        let mut calendar = CalendarConfig::cleared(usize::from(self.calendar_years));
        if self.dst_enabled {
            calendar.control |= CALENDAR_CONTROL_DST;
            calendar.dst_hour = 2;
            calendar.dst_offset_minutes = 60;
        }
        let mut tou = TouConfig::cleared(layout);
        tou.tou_id = self.tou_id;

        let header_bytes = header.encode(layout)?;
        for (offset, data) in [
            (0usize, header_bytes),
            (header.calendar as usize, calendar.encode()),
            (header.tou as usize, tou.encode()),
        ] {
            table[offset..offset + data.len()].copy_from_slice(&data);
        }
        Ok(table)
    }

    pub fn build(&self) -> Result<MemoryTransport, PsemError> {
        let layout = self.layout();
        let status = EdModeStatus {
            std_status1: if self.clock_running {
                0
            } else {
                ED_STD_STATUS1_CLOCK_ERROR
            },
            ..EdModeStatus::default()
        };

        let mut tables = BTreeMap::new();
        tables.insert(STD_TABLE_GENERAL_MFG_ID, self.identity().encode());
        tables.insert(STD_TABLE_ED_MODE_STATUS, status.encode());
        tables.insert(STD_TABLE_CURRENT_REGISTER_DATA, vec![0; layout.register_data_len()]);
        tables.insert(
            STD_TABLE_SECURITY,
            SecurityTable::empty(layout.password_len).encode().to_vec(),
        );
        tables.insert(
            STD_TABLE_CLOCK,
            MeterClock::new(self.clock, false).encode(self.reference_year)?,
        );
        tables.insert(MFG_TABLE_CONFIG, self.config_table()?);
        tables.insert(
            MFG_TABLE_LEGACY_PASSWORDS,
            vec![0; PASSWORD_LEVELS * layout.password_len],
        );
        tables.insert(MFG_TABLE_DIAGNOSTICS, vec![0; layout.diagnostics_len()]);
        tables.insert(MFG_TABLE_VQ_COUNTERS, vec![0; layout.vq_len()]);

        Ok(MemoryTransport::with_tables(tables))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::psem::transport::Transport;

    #[test]
    fn test_blank_meter_tables() {
        let mut meter = MeterProfile::default().build().unwrap();
        let id = GeneralMfgId::decode(&meter.read_table(STD_TABLE_GENERAL_MFG_ID).unwrap()).unwrap();
        assert_eq!(id.model, "SPA1");

        let config = meter.read_table(MFG_TABLE_CONFIG).unwrap();
        let header = ConfigHeader::decode(&config, MeterLayout::for_family(MeterFamily::SinglePhase)).unwrap();
        assert_eq!(header.calendar_years, 5);
        assert_eq!(config.len(), header.table_len(MeterLayout::for_family(MeterFamily::SinglePhase)));
    }

    #[test]
    fn test_image_file_round_trip() {
        let meter = MeterProfile {
            family: MeterFamily::Polyphase,
            ..MeterProfile::default()
        }
        .build()
        .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meter.json");

        MeterImage::from_transport(&meter).save(&path).unwrap();
        let restored = MeterImage::load(&path).unwrap().into_transport().unwrap();
        assert_eq!(restored.tables(), meter.tables());
    }

    #[test]
    fn test_bad_hex_rejected() {
        let mut image = MeterImage::default();
        image.tables.insert(1, "ABC".into());
        assert!(matches!(image.into_transport(), Err(PsemError::Image(_))));
    }
}
