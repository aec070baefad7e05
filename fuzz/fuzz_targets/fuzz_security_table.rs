#![no_main]

use libfuzzer_sys::fuzz_target;
use psem_rs::tables::SecurityTable;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }
    let password_len = (data[0] as usize % 32) + 1;
    if let Ok(table) = SecurityTable::decode(&data[1..], password_len) {
        let _ = table.encode();
    }
});
