//! # Meter Family Layouts
//!
//! Table geometry differs between meter families: the width of the
//! configuration header offsets, the number of display items and billing
//! dates, the size of the history log mask, and the shape of the register
//! data used by LID resolution. These differences are expressed as const
//! [`MeterLayout`] data and selected once per session from the model string
//! in GENERAL_MFG_ID.

use crate::constants::{CALENDAR_EVENTS_PER_YEAR, DAYTYPES_PER_SEASON};
use crate::error::PsemError;
use crate::tables::codec::{record_len, FieldSpec, FieldWidth};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Meter families with distinct table layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeterFamily {
    SinglePhase,
    Polyphase,
}

/// Extended device type declared by TOU schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceType {
    Basic,
    Advanced,
}

impl DeviceType {
    /// Whether a device of this type may load a schedule declared for `declared`.
    ///
    /// Advanced devices accept Basic schedules; Basic devices only accept Basic.
    pub fn accepts(self, declared: DeviceType) -> bool {
        match self {
            DeviceType::Advanced => true,
            DeviceType::Basic => declared == DeviceType::Basic,
        }
    }
}

/// Configuration sub-blocks of the manufacturer configuration table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigBlock {
    Constants,
    BillingSchedule,
    Display,
    HistoryLog,
    Calendar,
    Tou,
    OptionBoard,
}

impl ConfigBlock {
    /// All blocks in header order.
    pub const ALL: [ConfigBlock; 7] = [
        ConfigBlock::Constants,
        ConfigBlock::BillingSchedule,
        ConfigBlock::Display,
        ConfigBlock::HistoryLog,
        ConfigBlock::Calendar,
        ConfigBlock::Tou,
        ConfigBlock::OptionBoard,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ConfigBlock::Constants => "constants",
            ConfigBlock::BillingSchedule => "billing schedule",
            ConfigBlock::Display => "display",
            ConfigBlock::HistoryLog => "history log",
            ConfigBlock::Calendar => "calendar",
            ConfigBlock::Tou => "TOU",
            ConfigBlock::OptionBoard => "option board",
        }
    }
}

/// Geometry of one meter family.
#[derive(Debug, PartialEq, Eq)]
pub struct MeterLayout {
    pub family: MeterFamily,
    /// Model string prefix that selects this layout.
    pub model_prefix: &'static str,
    /// Configuration header fields: seven offsets then max calendar years.
    pub header_fields: &'static [FieldSpec],
    pub display_items: usize,
    pub billing_dates: usize,
    pub history_mask_bytes: usize,
    pub option_board_bytes: usize,
    pub seasons: usize,
    pub day_events: usize,
    pub password_len: usize,
    /// Aggregate slot plus one per phase.
    pub phase_slots: u8,
    pub energy_quantities: u8,
    pub demand_quantities: u8,
    /// Rate tiers in CURRENT_REGISTER_DATA, excluding the total block.
    pub tiers: u8,
    pub diagnostic_counters: u8,
    pub vq_quantities: u8,
}

const SINGLE_PHASE_HEADER: &[FieldSpec] = &[
    FieldSpec::new("constants_offset", FieldWidth::U16),
    FieldSpec::new("billing_schedule_offset", FieldWidth::U16),
    FieldSpec::new("display_offset", FieldWidth::U16),
    FieldSpec::new("history_log_offset", FieldWidth::U16),
    FieldSpec::new("calendar_offset", FieldWidth::U16),
    FieldSpec::new("tou_offset", FieldWidth::U16),
    FieldSpec::new("option_board_offset", FieldWidth::U16),
    FieldSpec::new("calendar_years", FieldWidth::U8),
];

const POLYPHASE_HEADER: &[FieldSpec] = &[
    FieldSpec::new("constants_offset", FieldWidth::U32),
    FieldSpec::new("billing_schedule_offset", FieldWidth::U32),
    FieldSpec::new("display_offset", FieldWidth::U32),
    FieldSpec::new("history_log_offset", FieldWidth::U32),
    FieldSpec::new("calendar_offset", FieldWidth::U32),
    FieldSpec::new("tou_offset", FieldWidth::U32),
    FieldSpec::new("option_board_offset", FieldWidth::U32),
    FieldSpec::new("calendar_years", FieldWidth::U8),
];

pub static SINGLE_PHASE_LAYOUT: MeterLayout = MeterLayout {
    family: MeterFamily::SinglePhase,
    model_prefix: "SP",
    header_fields: SINGLE_PHASE_HEADER,
    display_items: 24,
    billing_dates: 25,
    history_mask_bytes: 8,
    option_board_bytes: 16,
    seasons: 8,
    day_events: 24,
    password_len: 20,
    phase_slots: 1,
    energy_quantities: 4,
    demand_quantities: 2,
    tiers: 4,
    diagnostic_counters: 8,
    vq_quantities: 4,
};

pub static POLYPHASE_LAYOUT: MeterLayout = MeterLayout {
    family: MeterFamily::Polyphase,
    model_prefix: "PP",
    header_fields: POLYPHASE_HEADER,
    display_items: 48,
    billing_dates: 50,
    history_mask_bytes: 16,
    option_board_bytes: 32,
    seasons: 8,
    day_events: 24,
    password_len: 20,
    phase_slots: 4,
    energy_quantities: 8,
    demand_quantities: 4,
    tiers: 7,
    diagnostic_counters: 16,
    vq_quantities: 6,
};

static LAYOUTS: Lazy<HashMap<&'static str, &'static MeterLayout>> = Lazy::new(|| {
    [&SINGLE_PHASE_LAYOUT, &POLYPHASE_LAYOUT]
        .into_iter()
        .map(|layout| (layout.model_prefix, layout))
        .collect()
});

/// Selects the layout for a GENERAL_MFG_ID model string such as `"SPA1"`.
pub fn layout_for_model(model: &str) -> Result<&'static MeterLayout, PsemError> {
    model
        .get(..2)
        .and_then(|prefix| LAYOUTS.get(prefix).copied())
        .ok_or_else(|| PsemError::UnknownMeterModel(model.to_string()))
}

/// The third character of the model string is `A` on Advanced devices.
pub fn device_type_for_model(model: &str) -> DeviceType {
    match model.as_bytes().get(2) {
        Some(b'A') => DeviceType::Advanced,
        _ => DeviceType::Basic,
    }
}

impl MeterLayout {
    pub fn for_family(family: MeterFamily) -> &'static MeterLayout {
        match family {
            MeterFamily::SinglePhase => &SINGLE_PHASE_LAYOUT,
            MeterFamily::Polyphase => &POLYPHASE_LAYOUT,
        }
    }

    pub fn header_len(&self) -> usize {
        record_len(self.header_fields)
    }

    pub fn constants_len(&self) -> usize {
        crate::tables::constants_block::CONSTANTS_LEN
    }

    pub fn billing_schedule_len(&self) -> usize {
        self.billing_dates * 2
    }

    pub fn display_len(&self) -> usize {
        3 + self.display_items * crate::tables::display::DISPLAY_ITEM_LEN
    }

    pub fn history_log_len(&self) -> usize {
        self.history_mask_bytes
    }

    pub fn calendar_year_len(&self) -> usize {
        1 + CALENDAR_EVENTS_PER_YEAR * 2
    }

    pub fn calendar_len(&self, years: usize) -> usize {
        crate::tables::calendar::CALENDAR_HEADER_LEN + years * self.calendar_year_len()
    }

    pub fn season_len(&self) -> usize {
        3 + DAYTYPES_PER_SEASON * self.day_events * 2
    }

    pub fn tou_len(&self) -> usize {
        2 + self.seasons * self.season_len()
    }

    pub fn option_board_len(&self) -> usize {
        self.option_board_bytes
    }

    /// Encoded size of a sub-block.
    pub fn block_len(&self, block: ConfigBlock, calendar_years: usize) -> usize {
        match block {
            ConfigBlock::Constants => self.constants_len(),
            ConfigBlock::BillingSchedule => self.billing_schedule_len(),
            ConfigBlock::Display => self.display_len(),
            ConfigBlock::HistoryLog => self.history_log_len(),
            ConfigBlock::Calendar => self.calendar_len(calendar_years),
            ConfigBlock::Tou => self.tou_len(),
            ConfigBlock::OptionBoard => self.option_board_len(),
        }
    }

    /// Size of a CURRENT_REGISTER_DATA tier block.
    pub fn register_block_len(&self) -> usize {
        4 * usize::from(self.phase_slots)
            * (usize::from(self.energy_quantities) + usize::from(self.demand_quantities))
    }

    /// Size of CURRENT_REGISTER_DATA.
    pub fn register_data_len(&self) -> usize {
        1 + (usize::from(self.tiers) + 1) * self.register_block_len()
    }

    pub fn diagnostics_len(&self) -> usize {
        usize::from(self.diagnostic_counters) * 2
    }

    pub fn vq_len(&self) -> usize {
        usize::from(self.vq_quantities) * usize::from(self.phase_slots) * 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_selection() {
        assert_eq!(layout_for_model("SPA1").unwrap().family, MeterFamily::SinglePhase);
        assert_eq!(layout_for_model("PPB2    ").unwrap().family, MeterFamily::Polyphase);
        assert!(matches!(
            layout_for_model("XX"),
            Err(PsemError::UnknownMeterModel(_))
        ));
        assert!(layout_for_model("S").is_err());
    }

    #[test]
    fn test_device_type() {
        assert_eq!(device_type_for_model("SPA1"), DeviceType::Advanced);
        assert_eq!(device_type_for_model("SPB1"), DeviceType::Basic);
        assert!(DeviceType::Advanced.accepts(DeviceType::Basic));
        assert!(!DeviceType::Basic.accepts(DeviceType::Advanced));
    }

    #[test]
    fn test_header_widths_differ() {
        assert_eq!(SINGLE_PHASE_LAYOUT.header_len(), 15);
        assert_eq!(POLYPHASE_LAYOUT.header_len(), 29);
    }
}
