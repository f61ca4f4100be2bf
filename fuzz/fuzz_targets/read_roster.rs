#![no_main]

use libfuzzer_sys::fuzz_target;
use mingle_core::roster::read_roster;

fuzz_target!(|data: &[u8]| {
    if let Ok(records) = read_roster(data) {
        assert!(records.iter().all(|r| !r.id.trim().is_empty()));
    }
});
