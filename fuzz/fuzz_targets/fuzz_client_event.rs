#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // This is the hostile path: every inbound text frame from an anonymous
    // client goes through this deserializer before anything else sees it.
    let _ = serde_json::from_slice::<matchwire_server::protocol::ClientEvent>(data);

    // Also exercise the str-based path used by the connection reader.
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = serde_json::from_str::<matchwire_server::protocol::ClientEvent>(s);
    }
});
