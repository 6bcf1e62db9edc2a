#![no_main]

use codec::{decode_frame, decode_payload, default_registries, encode_frame};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(registries) = default_registries() else {
        return;
    };
    let limits = wire::Limits::for_testing();

    // Any frame the wire layer accepts must not panic the payload decoder.
    if let Ok(wire::Frame::Payload(frame)) = wire::decode_frame(data, &limits) {
        let _ = decode_payload(&registries, &frame);
    }

    // A payload that decodes must encode again under the same route.
    if let Ok(envelope) = decode_frame(&registries, data, &limits) {
        let _ = encode_frame(
            &registries,
            &envelope.origin.route,
            envelope.origin.session_id,
            &envelope.payload,
            &wire::Limits::unlimited(),
        );
    }
});
