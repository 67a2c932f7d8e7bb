#![no_main]

use libfuzzer_sys::fuzz_target;

use redfish_vmedia::inventory::METADATA_FIELDS;
use redfish_vmedia::redfish::{link, member_links};
use redfish_vmedia::VirtualMediaRecord;

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };

    let _ = link(&value, "VirtualMedia");
    let _ = member_links(&value);

    if let Ok(record) = VirtualMediaRecord::from_resource("/fuzz", value) {
        for key in record.fields().keys() {
            assert!(!METADATA_FIELDS.iter().any(|m| m.eq_ignore_ascii_case(key)));
        }
    }
});
