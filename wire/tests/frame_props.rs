use proptest::prelude::*;
use uuid::Uuid;
use wire::{
    decode_frame, encode_payload_frame, payload_frame_len, EncodeError, Frame, Limits, Route,
};

fn route_strategy() -> impl Strategy<Value = Route> {
    prop_oneof![
        Just(Route::Client),
        Just(Route::Broadcast),
        any::<u128>().prop_map(|raw| Route::Targeted(Uuid::from_u128(raw))),
        prop::collection::vec(any::<u128>(), 0..6)
            .prop_map(|ids| Route::Exclude(ids.into_iter().map(Uuid::from_u128).collect())),
    ]
}

proptest! {
    #[test]
    fn prop_decode_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = decode_frame(&bytes, &Limits::for_testing());
    }

    #[test]
    fn prop_payload_frames_decode_to_their_parts(
        route in route_strategy(),
        session_id in any::<u8>(),
        type_id in "[a-z]{1,8}:[a-z_]{1,16}",
        body in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let limits = Limits::default();
        let bytes = encode_payload_frame(&route, session_id, &type_id, &body, &limits).unwrap();
        prop_assert_eq!(bytes.len(), payload_frame_len(&route, &type_id, body.len()));

        let Frame::Payload(frame) = decode_frame(&bytes, &limits).unwrap() else {
            return Err(TestCaseError::fail("expected payload frame"));
        };
        prop_assert_eq!(frame.route, route);
        prop_assert_eq!(frame.session_id, session_id);
        prop_assert_eq!(frame.type_id, type_id.as_str());
        prop_assert_eq!(frame.body, body.as_slice());
    }

    #[test]
    fn prop_size_limit_is_exact(body_len in 0usize..96, max_frame_bytes in 8usize..128) {
        let limits = Limits { max_frame_bytes, ..Limits::default() };
        let size = payload_frame_len(&Route::Broadcast, "t:x", body_len);
        let result = encode_payload_frame(&Route::Broadcast, 1, "t:x", &vec![0; body_len], &limits);
        if size <= max_frame_bytes {
            prop_assert_eq!(result.map(|bytes| bytes.len()), Ok(size));
        } else {
            let expected = EncodeError::FrameTooLarge { size, limit: max_frame_bytes };
            prop_assert_eq!(result, Err(expected));
        }
    }
}
