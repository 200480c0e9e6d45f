#![no_main]

use libfuzzer_sys::fuzz_target;
use pescope::pe;

fuzz_target!(|data: &[u8]| {
    let inspection = pe::inspect(data);
    let _ = inspection.headers().to_string();
    let _ = inspection.violations().to_string();
});
