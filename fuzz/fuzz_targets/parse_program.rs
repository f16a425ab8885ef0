#![no_main]

use libfuzzer_sys::fuzz_target;
use pandaura_syntax::validate::validate;

const MAX_SOURCE_BYTES: usize = 4096;

fn decode_source(bytes: &[u8]) -> String {
    let capped = &bytes[..bytes.len().min(MAX_SOURCE_BYTES)];
    String::from_utf8_lossy(capped).into_owned()
}

fuzz_target!(|data: &[u8]| {
    let source = decode_source(data);
    // The parser must never panic; structured errors only.
    let _ = pandaura_syntax::parse_program(&source);
    let report = validate(&source);
    // Validation is total: every source yields a report.
    let _ = report.is_valid;
});
