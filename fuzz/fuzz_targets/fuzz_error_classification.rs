#![no_main]

use libfuzzer_sys::fuzz_target;

use redfish_vmedia::RedfishError;

fuzz_target!(|input: (u16, &str)| {
    // Arbitrary status codes and error bodies must classify without panicking.
    let (status, body) = input;
    let err = RedfishError::from_response("https://bmc/redfish/v1/", status, body);
    let _ = err.diagnostic();
    let _ = err.kind();
});
