//! Option-board sub-block: installed board identifier and its opaque
//! configuration bytes.

use crate::constants::MFG_TABLE_CONFIG;
use crate::error::PsemError;
use crate::tables::layout::MeterLayout;

/// Board identifier written when no option board is installed.
pub const NO_OPTION_BOARD: u8 = 0x00;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionBoardConfig {
    pub board_id: u8,
    pub settings: Vec<u8>,
}

impl OptionBoardConfig {
    pub fn is_installed(&self) -> bool {
        self.board_id != NO_OPTION_BOARD
    }

    pub fn decode(bytes: &[u8], layout: &MeterLayout) -> Result<Self, PsemError> {
        let len = layout.option_board_len();
        match bytes.get(..len) {
            Some([board_id, settings @ ..]) => Ok(Self {
                board_id: *board_id,
                settings: settings.to_vec(),
            }),
            _ => Err(PsemError::TruncatedTable {
                table: MFG_TABLE_CONFIG,
                expected: len,
                actual: bytes.len(),
            }),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.settings.len());
        out.push(self.board_id);
        out.extend_from_slice(&self.settings);
        out
    }
}
