//! History-log sub-block: one enable bit per loggable event.

use crate::constants::MFG_TABLE_CONFIG;
use crate::error::PsemError;
use crate::tables::layout::MeterLayout;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryLogConfig {
    /// Event enable bitmask, event `n` at bit `n % 8` of byte `n / 8`.
    pub event_mask: Vec<u8>,
}

impl HistoryLogConfig {
    pub fn decode(bytes: &[u8], layout: &MeterLayout) -> Result<Self, PsemError> {
        let len = layout.history_log_len();
        if bytes.len() < len {
            return Err(PsemError::TruncatedTable {
                table: MFG_TABLE_CONFIG,
                expected: len,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            event_mask: bytes[..len].to_vec(),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        self.event_mask.clone()
    }

    /// Number of events this log can track.
    pub fn capacity(&self) -> usize {
        self.event_mask.len() * 8
    }

    pub fn is_enabled(&self, event: usize) -> bool {
        self.event_mask
            .get(event / 8)
            .map_or(false, |byte| byte & (1 << (event % 8)) != 0)
    }

    /// Enables or disables an event; events past the mask are ignored.
    pub fn set_enabled(&mut self, event: usize, enabled: bool) {
        if let Some(byte) = self.event_mask.get_mut(event / 8) {
            if enabled {
                *byte |= 1 << (event % 8);
            } else {
                *byte &= !(1 << (event % 8));
            }
        }
    }

    pub fn enabled_events(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.capacity()).filter(|&e| self.is_enabled(e))
    }
}
