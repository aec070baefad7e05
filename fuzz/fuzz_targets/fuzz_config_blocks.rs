#![no_main]

use libfuzzer_sys::fuzz_target;
use psem_rs::tables::{
    BillingSchedule, CalendarConfig, ConfigHeader, DisplayConfig, HistoryLogConfig, MeterClock,
    OptionBoardConfig, TouConfig, POLYPHASE_LAYOUT, SINGLE_PHASE_LAYOUT,
};

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }
    // first byte picks the layout and calendar depth
    let layout = if data[0] & 0x80 != 0 {
        &POLYPHASE_LAYOUT
    } else {
        &SINGLE_PHASE_LAYOUT
    };
    let years = (data[0] & 0x0F) as usize + 1;
    let body = &data[1..];

    let _ = ConfigHeader::decode(body, layout);
    let _ = BillingSchedule::decode(body, layout);
    let _ = DisplayConfig::decode(body, layout);
    let _ = HistoryLogConfig::decode(body, layout);
    let _ = OptionBoardConfig::decode(body, layout);
    let _ = MeterClock::decode(body, 2000);

    // decoded blocks must re-encode without panicking
    if let Ok(calendar) = CalendarConfig::decode(body, layout, years) {
        let _ = calendar.encode();
    }
    if let Ok(tou) = TouConfig::decode(body, layout) {
        let _ = TouConfig::decode(&tou.encode(), layout);
    }
});
