#![no_main]
use libfuzzer_sys::fuzz_target;

use entrytrace::Module;

fuzz_target!(|data: &[u8]| {
    let _ = env_logger::try_init();
    let text = match std::str::from_utf8(data) {
        Ok(text) => text,
        Err(_) => return,
    };
    let module = match Module::from_text(text) {
        Ok(module) => module,
        Err(_) => return,
    };
    let printed = module.to_text();
    log::debug!("printed module:\n{}", printed);
    let reparsed = Module::from_text(&printed).unwrap();
    assert_eq!(printed, reparsed.to_text());
});
