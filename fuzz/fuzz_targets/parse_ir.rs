#![no_main]
use libfuzzer_sys::fuzz_target;

use entrytrace::Module;

fuzz_target!(|data: &[u8]| {
    let _ = env_logger::try_init();
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = Module::from_text(text);
    }
});
