//! Configuration table header.
//!
//! The header at offset 0 of the configuration table gives the offset of
//! every sub-block and the number of calendar years the device supports. It
//! is read once per session.

use crate::constants::MFG_TABLE_CONFIG;
use crate::error::PsemError;
use crate::tables::codec::{decode_fields, encode_fields};
use crate::tables::layout::{ConfigBlock, MeterLayout};

/// Sub-block offsets within the configuration table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigHeader {
    pub constants: u32,
    pub billing_schedule: u32,
    pub display: u32,
    pub history_log: u32,
    pub calendar: u32,
    pub tou: u32,
    pub option_board: u32,
    pub calendar_years: u8,
}

impl ConfigHeader {
    pub fn decode(bytes: &[u8], layout: &MeterLayout) -> Result<Self, PsemError> {
        let v = decode_fields(MFG_TABLE_CONFIG, bytes, layout.header_fields)?;
        Ok(Self {
            constants: v[0],
            billing_schedule: v[1],
            display: v[2],
            history_log: v[3],
            calendar: v[4],
            tou: v[5],
            option_board: v[6],
            calendar_years: v[7] as u8,
        })
    }

    pub fn encode(&self, layout: &MeterLayout) -> Result<Vec<u8>, PsemError> {
        encode_fields(
            &[
                self.constants,
                self.billing_schedule,
                self.display,
                self.history_log,
                self.calendar,
                self.tou,
                self.option_board,
                u32::from(self.calendar_years),
            ],
            layout.header_fields,
        )
    }

    pub fn offset(&self, block: ConfigBlock) -> u32 {
        match block {
            ConfigBlock::Constants => self.constants,
            ConfigBlock::BillingSchedule => self.billing_schedule,
            ConfigBlock::Display => self.display,
            ConfigBlock::HistoryLog => self.history_log,
            ConfigBlock::Calendar => self.calendar,
            ConfigBlock::Tou => self.tou,
            ConfigBlock::OptionBoard => self.option_board,
        }
    }

    fn set_offset(&mut self, block: ConfigBlock, offset: u32) {
        match block {
            ConfigBlock::Constants => self.constants = offset,
            ConfigBlock::BillingSchedule => self.billing_schedule = offset,
            ConfigBlock::Display => self.display = offset,
            ConfigBlock::HistoryLog => self.history_log = offset,
            ConfigBlock::Calendar => self.calendar = offset,
            ConfigBlock::Tou => self.tou = offset,
            ConfigBlock::OptionBoard => self.option_board = offset,
        }
    }

    /// Lays the blocks out back to back after the header, in `order`.
    ///
    /// Blocks missing from `order` are appended in header order.
    pub fn sequential(layout: &MeterLayout, calendar_years: u8, order: &[ConfigBlock]) -> Self {
        let mut header = ConfigHeader {
            constants: 0,
            billing_schedule: 0,
            display: 0,
            history_log: 0,
            calendar: 0,
            tou: 0,
            option_board: 0,
            calendar_years,
        };

        let mut blocks: Vec<ConfigBlock> = order.to_vec();
        blocks.extend(ConfigBlock::ALL.iter().filter(|b| !order.contains(b)));

        let mut offset = layout.header_len() as u32;
        for block in blocks {
            header.set_offset(block, offset);
            offset += layout.block_len(block, usize::from(calendar_years)) as u32;
        }
        header
    }

    /// Total size of the configuration table described by this header.
    pub fn table_len(&self, layout: &MeterLayout) -> usize {
        ConfigBlock::ALL
            .iter()
            .map(|&b| self.offset(b) as usize + layout.block_len(b, usize::from(self.calendar_years)))
            .max()
            .unwrap_or(0)
            .max(layout.header_len())
    }

    /// Whether the calendar block precedes the TOU block.
    pub fn calendar_first(&self) -> bool {
        self.calendar < self.tou
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::layout::{POLYPHASE_LAYOUT, SINGLE_PHASE_LAYOUT};

    #[test]
    fn test_sequential_layout() {
        let header = ConfigHeader::sequential(&SINGLE_PHASE_LAYOUT, 5, &[]);
        assert_eq!(header.constants, 15);
        assert_eq!(header.billing_schedule, 15 + 33);
        assert!(header.calendar_first());

        let bytes = header.encode(&SINGLE_PHASE_LAYOUT).unwrap();
        assert_eq!(bytes.len(), 15);
        assert_eq!(ConfigHeader::decode(&bytes, &SINGLE_PHASE_LAYOUT).unwrap(), header);
    }

    #[test]
    fn test_tou_before_calendar() {
        let header = ConfigHeader::sequential(&POLYPHASE_LAYOUT, 3, &[ConfigBlock::Tou]);
        assert_eq!(header.tou, 29);
        assert!(!header.calendar_first());
        let bytes = header.encode(&POLYPHASE_LAYOUT).unwrap();
        assert_eq!(ConfigHeader::decode(&bytes, &POLYPHASE_LAYOUT).unwrap(), header);
    }

    #[test]
    fn test_single_phase_offset_overflow() {
        let mut header = ConfigHeader::sequential(&SINGLE_PHASE_LAYOUT, 5, &[]);
        header.option_board = 0x1_0000;
        assert!(header.encode(&SINGLE_PHASE_LAYOUT).is_err());
    }
}
