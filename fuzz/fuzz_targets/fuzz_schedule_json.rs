#![no_main]

use libfuzzer_sys::fuzz_target;
use psem_rs::schedule::{CustomScheduleFile, DstSchedule, TouSchedule};

fuzz_target!(|data: &[u8]| {
    // schedule files are read from disk by the CLI
    if let Ok(schedule) = serde_json::from_slice::<TouSchedule>(data) {
        let _ = schedule.validate();
    }
    if let Ok(dst) = serde_json::from_slice::<DstSchedule>(data) {
        let _ = dst.validate();
    }
    let _ = serde_json::from_slice::<CustomScheduleFile>(data);
});
