#![no_main]

use libfuzzer_sys::fuzz_target;

use redfish_vmedia::security::logging::sanitize_log_message;

fuzz_target!(|data: &str| {
    // The concern is ReDoS: libFuzzer flags inputs that make the
    // redaction patterns backtrack past its per-input timeout.
    let _ = sanitize_log_message(data);
});
