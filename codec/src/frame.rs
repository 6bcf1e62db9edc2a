//! Typed payload frames.

use bytestream::ByteWriter;
use protocol::{Direction, Identifier, Registries};
use wire::{Limits, PayloadFrame, Route};

use crate::error::{CodecError, CodecResult};
use crate::payload::Payload;

/// Where a received payload came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub route: Route,
    pub session_id: u8,
}

/// A decoded payload with its origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub origin: Origin,
    pub payload: Payload,
}

/// Direction implied by a route: client frames go to the server.
#[must_use]
pub const fn route_direction(route: &Route) -> Direction {
    match route {
        Route::Client => Direction::ToServer,
        Route::Broadcast | Route::Targeted(_) | Route::Exclude(_) => Direction::ToClient,
    }
}

/// Encodes `payload` into a complete frame.
///
/// The payload must be registered in the direction its route implies.
/// Fails with [`CodecError::FrameTooLarge`] when the frame exceeds
/// `limits.max_frame_bytes`.
pub fn encode_frame(
    registries: &Registries<Payload>,
    route: &Route,
    session_id: u8,
    payload: &Payload,
    limits: &Limits,
) -> CodecResult<Vec<u8>> {
    let registry = registries.registry(route_direction(route));
    let mut body = ByteWriter::new();
    let entry = registry.encode(payload, &mut body)?;
    let type_id = entry.id().to_string();
    Ok(wire::encode_payload_frame(
        route,
        session_id,
        &type_id,
        body.as_slice(),
        limits,
    )?)
}

/// Decodes the payload carried by a wire frame.
pub fn decode_payload(
    registries: &Registries<Payload>,
    frame: &PayloadFrame<'_>,
) -> CodecResult<Envelope> {
    let id = Identifier::parse(frame.type_id).map_err(CodecError::InvalidTypeId)?;
    let (registered, _) = registries
        .get_global(&id)
        .ok_or_else(|| CodecError::UnknownType {
            type_id: frame.type_id.to_owned(),
        })?;
    let expected = route_direction(&frame.route);
    let direction = if registered == expected {
        registered
    } else if registries.get(expected, &id).is_some() {
        expected
    } else {
        return Err(CodecError::DirectionMismatch {
            id,
            registered,
            header: frame.route.header(),
        });
    };
    let payload = registries.registry(direction).decode_body(&id, frame.body)?;
    Ok(Envelope {
        origin: Origin {
            route: frame.route.clone(),
            session_id: frame.session_id,
        },
        payload,
    })
}

/// Decodes a complete frame that must be a payload frame.
pub fn decode_frame(
    registries: &Registries<Payload>,
    bytes: &[u8],
    limits: &Limits,
) -> CodecResult<Envelope> {
    match wire::decode_frame(bytes, limits)? {
        wire::Frame::Payload(frame) => decode_payload(registries, &frame),
        other => Err(CodecError::NotPayloadFrame {
            header: other.header(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::default_registries;
    use crate::payload::{Batch, EntityMove, PayloadKind, PlayerInput};
    use crate::types::{EntityId, Vec2};
    use protocol::PayloadError;
    use uuid::Uuid;

    #[test]
    fn broadcast_frame_roundtrip() {
        let registries = default_registries().unwrap();
        let payload = Payload::EntityMove(EntityMove {
            id: EntityId::from_u128(3),
            dx: 2458,
            dy: 0,
        });
        let bytes =
            encode_frame(&registries, &Route::Broadcast, 7, &payload, &Limits::default()).unwrap();
        assert_eq!(bytes[0], 0x11);
        assert_eq!(bytes[1], 7);

        let envelope = decode_frame(&registries, &bytes, &Limits::default()).unwrap();
        assert_eq!(envelope.payload, payload);
        assert_eq!(envelope.origin.session_id, 7);
        assert_eq!(envelope.origin.route, Route::Broadcast);
    }

    #[test]
    fn to_client_payload_cannot_ride_client_route() {
        let registries = default_registries().unwrap();
        let payload = Payload::EntityMove(EntityMove {
            id: EntityId::from_u128(3),
            dx: 1,
            dy: 1,
        });
        let err =
            encode_frame(&registries, &Route::Client, 1, &payload, &Limits::default()).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Payload(PayloadError::Unregistered { .. })
        ));
    }

    #[test]
    fn mismatched_direction_on_decode() {
        let registries = default_registries().unwrap();
        let body = 5u32.to_le_bytes();
        let bytes = wire::encode_payload_frame(
            &Route::Broadcast,
            1,
            "tether:keep_alive",
            &body,
            &Limits::default(),
        )
        .unwrap();
        assert!(matches!(
            decode_frame(&registries, &bytes, &Limits::default()),
            Err(CodecError::DirectionMismatch { .. })
        ));
    }

    #[test]
    fn unknown_and_invalid_type_ids() {
        let registries = default_registries().unwrap();
        let unknown =
            wire::encode_payload_frame(&Route::Client, 1, "tether:nope", &[], &Limits::default())
                .unwrap();
        assert!(matches!(
            decode_frame(&registries, &unknown, &Limits::default()),
            Err(CodecError::UnknownType { .. })
        ));

        let invalid =
            wire::encode_payload_frame(&Route::Client, 1, "NoColon", &[], &Limits::default())
                .unwrap();
        assert!(matches!(
            decode_frame(&registries, &invalid, &Limits::default()),
            Err(CodecError::InvalidTypeId(_))
        ));
    }

    #[test]
    fn oversize_batch_surfaces_frame_too_large() {
        let registries = default_registries().unwrap();
        let items = (0..400)
            .map(|i| {
                Payload::PlayerInput(PlayerInput {
                    position: Vec2::new(f64::from(i), 0.0),
                    yaw: 0,
                })
            })
            .collect();
        let batch = Payload::Batch(Batch { items });
        let err = encode_frame(&registries, &Route::Client, 1, &batch, &Limits::default())
            .unwrap_err();
        assert!(matches!(err, CodecError::FrameTooLarge { limit: 4096, .. }));
    }

    #[test]
    fn exclude_route_frame() {
        let registries = default_registries().unwrap();
        let route = Route::Exclude(vec![Uuid::from_u128(1)]);
        let payload = Payload::EntityRemove(crate::payload::EntityRemove {
            ids: vec![EntityId::from_u128(9)],
        });
        let bytes = encode_frame(&registries, &route, 2, &payload, &Limits::default()).unwrap();
        let envelope = decode_frame(&registries, &bytes, &Limits::default()).unwrap();
        assert_eq!(envelope.origin.route, route);
        assert_eq!(envelope.payload.kind(), PayloadKind::EntityRemove);
    }

    #[test]
    fn control_frame_is_not_a_payload() {
        let registries = default_registries().unwrap();
        let bytes = wire::encode_control_frame(0, &wire::ControlMessage::Registered(1)).unwrap();
        assert!(matches!(
            decode_frame(&registries, &bytes, &Limits::default()),
            Err(CodecError::NotPayloadFrame { .. })
        ));
    }
}
