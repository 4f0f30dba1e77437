#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Outbound events are only ever produced by this server, but clients of
    // the protocol parse them; keep the deserializer panic-free anyway.
    let _ = serde_json::from_slice::<matchwire_server::protocol::ServerEvent>(data);

    if let Ok(s) = std::str::from_utf8(data) {
        let _ = serde_json::from_str::<matchwire_server::protocol::ServerEvent>(s);
    }
});
