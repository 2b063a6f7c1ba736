#![no_main]
use libfuzzer_sys::fuzz_target;

use entrytrace::passes::entry_trace::{self, EntryTraceOptions};
use entrytrace::Module;

fuzz_target!(|data: &[u8]| {
    let _ = env_logger::try_init();
    let text = match std::str::from_utf8(data) {
        Ok(text) => text,
        Err(_) => return,
    };
    let mut module = match Module::from_text(text) {
        Ok(module) => module,
        Err(_) => return,
    };
    let report = entry_trace::run(&mut module, &EntryTraceOptions::default());
    let printed = module.to_text();
    log::debug!("instrumented module:\n{}", printed);
    if report.modified() {
        Module::from_text(&printed).unwrap();
    }
});
